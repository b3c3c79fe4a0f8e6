use crate::assets;
use crate::output::{print_json, print_table, rel};
use anyhow::Context;
use flow_core::{
    mcp, paths, section, tree,
    types::{ConfigMergeReport, FileAction, FileOutcome, MergeAction, OutcomeCounts, SectionReport},
    FlowError,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct InitSummary {
    pub agents: Vec<FileOutcome>,
    pub commands: Vec<FileOutcome>,
    pub mcp: ConfigMergeReport,
    pub claude_md: SectionReport,
    /// Asset groups missing from the asset directory.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_assets: Vec<String>,
}

impl InitSummary {
    pub fn conflicts(&self) -> impl Iterator<Item = &FileOutcome> {
        self.agents
            .iter()
            .chain(&self.commands)
            .filter(|o| o.action == FileAction::Conflict)
    }
}

/// Destinations a real run would touch.
#[derive(Debug, Serialize)]
pub struct InitPlan {
    pub dry_run: bool,
    pub agents: PathBuf,
    pub commands: PathBuf,
    pub mcp: PathBuf,
    pub claude_md: PathBuf,
}

impl InitPlan {
    pub fn for_root(root: &Path) -> Self {
        Self {
            dry_run: true,
            agents: paths::agents_dir(root),
            commands: paths::commands_dir(root),
            mcp: paths::mcp_path(root),
            claude_md: paths::claude_md_path(root),
        }
    }
}

pub fn run(
    root: &Path,
    assets_dir: Option<&Path>,
    dry_run: bool,
    force: bool,
    json: bool,
) -> anyhow::Result<()> {
    if dry_run {
        let plan = InitPlan::for_root(root);
        if json {
            return print_json(&plan);
        }
        println!("Initializing claude-code-flow in: {}", root.display());
        println!("\nPlanning actions (dry-run mode):");
        println!("  would copy agents to:   {}", plan.agents.display());
        println!("  would copy commands to: {}", plan.commands.display());
        println!("  would merge MCP config: {}", plan.mcp.display());
        println!("  would update CLAUDE.md: {}", plan.claude_md.display());
        return Ok(());
    }

    if !json {
        println!("Initializing claude-code-flow in: {}", root.display());
    }

    let assets = assets::resolve(assets_dir)?;
    let summary = execute(root, assets.path(), force, json)?;

    if json {
        print_json(&summary)
    } else {
        print_summary(root, &summary);
        Ok(())
    }
}

/// Run the four init steps against `root` using assets from `assets`.
///
/// Steps run in order; the first failure aborts the remaining ones.
pub fn execute(root: &Path, assets: &Path, force: bool, quiet: bool) -> anyhow::Result<InitSummary> {
    let mut missing_assets = Vec::new();

    if !quiet {
        println!("\nCopying agents:");
    }
    let agents = copy_group(
        root,
        &paths::asset_agents_dir(assets),
        &paths::agents_dir(root),
        force,
        quiet,
        &mut missing_assets,
    )?;

    if !quiet {
        println!("\nCopying commands:");
    }
    let commands = copy_group(
        root,
        &paths::asset_commands_dir(assets),
        &paths::commands_dir(root),
        force,
        quiet,
        &mut missing_assets,
    )?;

    if !quiet {
        println!("\nMerging MCP configuration:");
    }
    let mcp = merge_mcp(root, assets, quiet, &mut missing_assets)?;

    if !quiet {
        println!("\nUpdating CLAUDE.md:");
    }
    let claude_md = update_claude_md(root, assets, quiet, &mut missing_assets)?;

    Ok(InitSummary {
        agents,
        commands,
        mcp,
        claude_md,
        missing_assets,
    })
}

fn copy_group(
    root: &Path,
    src: &Path,
    dest: &Path,
    force: bool,
    quiet: bool,
    missing: &mut Vec<String>,
) -> anyhow::Result<Vec<FileOutcome>> {
    if !src.exists() {
        tracing::warn!(dir = %src.display(), "asset directory missing, skipping");
        if !quiet {
            println!("  warning: no {} in assets, skipped", src.display());
        }
        missing.push(src.display().to_string());
        return Ok(Vec::new());
    }

    match tree::merge_copy(src, dest, force) {
        Ok(outcomes) => {
            if !quiet {
                print_outcomes(root, &outcomes);
            }
            tracing::info!(dest = %dest.display(), files = outcomes.len(), "tree merged");
            Ok(outcomes)
        }
        Err(FlowError::CopyInterrupted { outcomes, source }) => {
            // Report what was already written before surfacing the failure.
            if !quiet {
                print_outcomes(root, &outcomes);
            }
            Err(anyhow::Error::from(*source)).with_context(|| {
                format!(
                    "copy into {} stopped after {} file(s)",
                    rel(root, dest),
                    outcomes.len()
                )
            })
        }
        Err(e) => Err(e).with_context(|| format!("failed to copy into {}", rel(root, dest))),
    }
}

fn merge_mcp(
    root: &Path,
    assets: &Path,
    quiet: bool,
    missing: &mut Vec<String>,
) -> anyhow::Result<ConfigMergeReport> {
    let package_path = paths::asset_mcp_path(assets);
    if !package_path.exists() {
        tracing::warn!(path = %package_path.display(), "package mcp.json missing, skipping");
        if !quiet {
            println!("  warning: no mcp.json in assets, skipped");
        }
        missing.push(package_path.display().to_string());
        return Ok(ConfigMergeReport::skipped());
    }

    let package = mcp::load_package_config(&package_path)
        .with_context(|| format!("failed to read {}", package_path.display()))?;
    let user_path = paths::mcp_path(root);
    let report = mcp::merge_config(&user_path, &package)
        .with_context(|| format!("failed to merge {}", rel(root, &user_path)))?;

    if !quiet {
        match report.action {
            MergeAction::Created => println!(
                "  created: {} ({} entries)",
                paths::MCP_FILE,
                report.entries_added
            ),
            MergeAction::Updated => println!(
                "  updated: {} (added {} entries)",
                paths::MCP_FILE,
                report.entries_added
            ),
            MergeAction::Skipped => {
                println!("  skipped: {} (all entries already present)", paths::MCP_FILE)
            }
        }
        if let Some(backup) = &report.backup_path {
            println!("  backup:  {}", rel(root, backup));
        }
    }
    Ok(report)
}

fn update_claude_md(
    root: &Path,
    assets: &Path,
    quiet: bool,
    missing: &mut Vec<String>,
) -> anyhow::Result<SectionReport> {
    let prompt_path = paths::asset_prompt_path(assets);
    if !prompt_path.exists() {
        tracing::warn!(path = %prompt_path.display(), "PROMPT.md missing, skipping");
        if !quiet {
            println!("  warning: no PROMPT.md in assets, skipped");
        }
        missing.push(prompt_path.display().to_string());
        return Ok(SectionReport::skipped());
    }

    let prompt = std::fs::read_to_string(&prompt_path)
        .with_context(|| format!("failed to read {}", prompt_path.display()))?;
    let claude_md = paths::claude_md_path(root);
    let report = section::upsert_section(&claude_md, prompt.trim())
        .with_context(|| format!("failed to update {}", paths::CLAUDE_MD))?;

    if !quiet {
        let detail = match (report.action, report.section_found) {
            (MergeAction::Created, _) => "created with workflow section",
            (MergeAction::Updated, true) => "workflow section refreshed",
            (MergeAction::Updated, false) => "workflow section added",
            (MergeAction::Skipped, _) => "workflow section unchanged",
        };
        println!("  {}: {} ({detail})", report.action, paths::CLAUDE_MD);
    }
    Ok(report)
}

fn print_outcomes(root: &Path, outcomes: &[FileOutcome]) {
    for o in outcomes {
        let path = rel(root, &o.path);
        match (o.action, &o.reason) {
            (FileAction::Conflict, Some(reason)) => println!("  conflict: {path} ({reason})"),
            (action, _) => println!("  {action}: {path}"),
        }
    }
}

fn counts_cell(outcomes: &[FileOutcome]) -> String {
    let c = OutcomeCounts::tally(outcomes);
    format!(
        "{} created, {} updated, {} skipped, {} conflict",
        c.created, c.updated, c.skipped, c.conflict
    )
}

fn print_summary(root: &Path, summary: &InitSummary) {
    let mcp_detail = match &summary.mcp.backup_path {
        Some(b) => format!("{} entries added, backup {}", summary.mcp.entries_added, rel(root, b)),
        None => format!("{} entries added", summary.mcp.entries_added),
    };

    println!("\nSummary:");
    print_table(
        &["STEP", "RESULT"],
        vec![
            vec![paths::AGENTS_DIR.to_string(), counts_cell(&summary.agents)],
            vec![paths::COMMANDS_DIR.to_string(), counts_cell(&summary.commands)],
            vec![
                paths::MCP_FILE.to_string(),
                format!("{} ({mcp_detail})", summary.mcp.action),
            ],
            vec![paths::CLAUDE_MD.to_string(), summary.claude_md.action.to_string()],
        ],
    );

    let conflicts: Vec<_> = summary.conflicts().collect();
    if !conflicts.is_empty() {
        println!(
            "\n{} file(s) differ from the bundled version and were left untouched:",
            conflicts.len()
        );
        for c in &conflicts {
            println!("  - {}", rel(root, &c.path));
        }
        println!("Re-run with --force to overwrite them.");
    }

    println!("\nclaude-code-flow initialized.");
}
