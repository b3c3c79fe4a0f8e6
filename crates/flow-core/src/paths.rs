use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Target layout (relative to the project root)
// ---------------------------------------------------------------------------

pub const AGENTS_DIR: &str = ".claude/agents";
pub const COMMANDS_DIR: &str = "commands/dl";
pub const MCP_FILE: &str = "mcp.json";
pub const CLAUDE_MD: &str = "CLAUDE.md";

// ---------------------------------------------------------------------------
// Asset layout (relative to the asset directory)
// ---------------------------------------------------------------------------

pub const ASSET_AGENTS_DIR: &str = "agents";
pub const ASSET_COMMANDS_DIR: &str = "commands";
pub const ASSET_MCP_FILE: &str = "mcp.json";
pub const ASSET_PROMPT_MD: &str = "PROMPT.md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn agents_dir(root: &Path) -> PathBuf {
    root.join(AGENTS_DIR)
}

pub fn commands_dir(root: &Path) -> PathBuf {
    root.join(COMMANDS_DIR)
}

pub fn mcp_path(root: &Path) -> PathBuf {
    root.join(MCP_FILE)
}

pub fn claude_md_path(root: &Path) -> PathBuf {
    root.join(CLAUDE_MD)
}

pub fn asset_agents_dir(assets: &Path) -> PathBuf {
    assets.join(ASSET_AGENTS_DIR)
}

pub fn asset_commands_dir(assets: &Path) -> PathBuf {
    assets.join(ASSET_COMMANDS_DIR)
}

pub fn asset_mcp_path(assets: &Path) -> PathBuf {
    assets.join(ASSET_MCP_FILE)
}

pub fn asset_prompt_path(assets: &Path) -> PathBuf {
    assets.join(ASSET_PROMPT_MD)
}
