use anyhow::Context;
use flow_core::io;
use rust_embed::Embed;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Embed)]
#[folder = "$CARGO_MANIFEST_DIR/assets/"]
struct BundledAssets;

/// Directory holding agents/, commands/, mcp.json and PROMPT.md.
pub enum AssetDir {
    /// User-supplied directory (`--assets` / `CLAUDE_CODE_FLOW_ASSETS`).
    External(PathBuf),
    /// Bundle extracted from the binary; removed on drop.
    Extracted(TempDir),
}

impl AssetDir {
    pub fn path(&self) -> &Path {
        match self {
            AssetDir::External(p) => p,
            AssetDir::Extracted(dir) => dir.path(),
        }
    }
}

/// Use `explicit` if given, otherwise extract the embedded bundle.
pub fn resolve(explicit: Option<&Path>) -> anyhow::Result<AssetDir> {
    if let Some(p) = explicit {
        if !p.is_dir() {
            anyhow::bail!("asset directory does not exist: {}", p.display());
        }
        return Ok(AssetDir::External(p.to_path_buf()));
    }

    let dir = TempDir::new().context("failed to create temporary asset directory")?;
    let written = extract_bundle(dir.path())?;
    tracing::debug!(files = written, dir = %dir.path().display(), "extracted bundled assets");
    Ok(AssetDir::Extracted(dir))
}

/// Write every embedded asset under `dest`, returning the number of files.
pub fn extract_bundle(dest: &Path) -> anyhow::Result<usize> {
    let mut count = 0;
    for name in <BundledAssets as Embed>::iter() {
        let Some(file) = <BundledAssets as Embed>::get(&name) else {
            continue;
        };
        let target = name
            .split('/')
            .fold(dest.to_path_buf(), |acc, part| acc.join(part));
        io::atomic_write(&target, &file.data)
            .with_context(|| format!("failed to extract asset {name}"))?;
        count += 1;
    }
    Ok(count)
}
