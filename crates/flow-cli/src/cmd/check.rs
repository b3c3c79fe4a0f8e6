use crate::output::print_json;
use anyhow::Context;
use flow_core::{io, paths, section};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub path: PathBuf,
    pub exists: bool,
    pub section_found: bool,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Inspect `text` without modifying anything.
pub fn inspect(path: &Path, text: Option<&str>) -> CheckReport {
    let Some(text) = text else {
        return CheckReport {
            path: path.to_path_buf(),
            exists: false,
            section_found: false,
            valid: true,
            error: None,
        };
    };

    match section::read_section(text) {
        Ok(found) => CheckReport {
            path: path.to_path_buf(),
            exists: true,
            section_found: found.is_some(),
            valid: true,
            error: None,
        },
        Err(violation) => CheckReport {
            path: path.to_path_buf(),
            exists: true,
            section_found: false,
            valid: false,
            error: Some(violation.to_string()),
        },
    }
}

/// `claude-code-flow check` — validate the managed section in CLAUDE.md.
pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let path = paths::claude_md_path(root);
    let text = io::read_text_if_exists(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let report = inspect(&path, text.as_deref());

    if json {
        print_json(&report)?;
    } else if !report.exists {
        println!("{}: not found (run `claude-code-flow init`)", paths::CLAUDE_MD);
    } else if report.section_found {
        println!("{}: workflow section present and well-formed", paths::CLAUDE_MD);
    } else if report.valid {
        println!("{}: no workflow section", paths::CLAUDE_MD);
    }

    if let Some(err) = &report.error {
        anyhow::bail!("{} is malformed: {err}", paths::CLAUDE_MD);
    }
    Ok(())
}
