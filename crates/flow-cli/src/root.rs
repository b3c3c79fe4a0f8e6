use anyhow::Context;
use std::path::{Path, PathBuf};

/// Resolve the target project root.
///
/// Priority:
/// 1. `--cwd` flag / `CLAUDE_CODE_FLOW_ROOT` env var (passed in as `explicit`)
/// 2. The process working directory
///
/// Relative paths are resolved against the working directory. The result must
/// be an existing directory.
pub fn resolve_root(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let root = match explicit {
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => cwd.join(p),
        None => cwd,
    };

    if !root.is_dir() {
        anyhow::bail!("target directory does not exist: {}", root.display());
    }
    Ok(root)
}
