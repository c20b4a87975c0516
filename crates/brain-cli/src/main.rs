mod cmd;
mod output;

use anyhow::Context;
use brain_core::installer::ToolInstaller;
use brain_core::registry;
use brain_core::source::TemplateSource;
use brain_core::tools_config::ToolsConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "brain",
    about = "Install Brain templates into AI coding tools",
    version,
    propagate_version = true
)]
struct Cli {
    /// Template project root (default: current directory)
    #[arg(long, global = true, env = "BRAIN_SOURCE")]
    source: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build templates and place them for one or more targets
    Install {
        /// Target names (omit to install every configured target)
        tools: Vec<String>,

        /// Scope override, e.g. "project" or "global"
        #[arg(long)]
        scope: Option<String>,
    },

    /// Remove a previous install, restoring user-owned content
    Uninstall {
        tool: String,

        /// Scope override for the no-manifest fallback clean
        #[arg(long)]
        scope: Option<String>,
    },

    /// List configured targets with detection status
    Targets,

    /// Show the install manifest for a target
    Status { tool: String },
}

/// Build an installer per tools.yaml record and freeze the registry.
fn register_targets(source: &TemplateSource) -> anyhow::Result<()> {
    let config = ToolsConfig::load(source).context("failed to load tools.yaml")?;
    for (_, target) in config.tools {
        // Config-driven entries yield to installers registered earlier.
        registry::register_if_absent(ToolInstaller::new(target, source.clone())?);
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let source_root = cli
        .source
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let source = TemplateSource::new(source_root);

    let result = register_targets(&source).and_then(|()| match cli.command {
        Commands::Install { tools, scope } => {
            cmd::install::run(&source, &tools, scope.as_deref(), cli.json)
        }
        Commands::Uninstall { tool, scope } => cmd::uninstall::run(&tool, scope.as_deref()),
        Commands::Targets => cmd::targets::run(cli.json),
        Commands::Status { tool } => cmd::status::run(&tool, cli.json),
    });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
