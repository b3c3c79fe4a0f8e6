mod assets;
mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "claude-code-flow",
    about = "Initialize the DL Agentic Workflow for Claude Code",
    version,
    propagate_version = true
)]
struct Cli {
    /// Target directory (default: current working directory)
    #[arg(long, global = true, env = "CLAUDE_CODE_FLOW_ROOT")]
    cwd: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the DL Agentic Workflow in the target project
    Init {
        /// Show what would be done without making changes
        #[arg(long)]
        dry_run: bool,

        /// Overwrite existing files when they differ
        #[arg(long)]
        force: bool,

        /// Use template assets from this directory instead of the bundled set
        #[arg(long, env = "CLAUDE_CODE_FLOW_ASSETS")]
        assets: Option<PathBuf>,
    },

    /// Validate the workflow section markers in CLAUDE.md
    Check,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::WARN.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = root::resolve_root(cli.cwd.as_deref()).and_then(|root| match cli.command {
        Commands::Init {
            dry_run,
            force,
            assets,
        } => cmd::init::run(&root, assets.as_deref(), dry_run, force, cli.json),
        Commands::Check => cmd::check::run(&root, cli.json),
    });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
