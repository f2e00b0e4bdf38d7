use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use trace_lens::TraceLensConfig;
use tracing::debug;

pub mod lens_cmd;
pub mod show_cmd;

use lens_cmd::LensCommand;
use show_cmd::ShowCommand;

/// Show the HTTP and SQL traces recorded for a single test.
#[derive(Debug, Parser)]
#[command(name = "trace-lens", version)]
pub struct TraceLensCli {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    #[command(subcommand)]
    pub command: TraceLensCommand,
}

#[derive(Debug, Subcommand)]
pub enum TraceLensCommand {
    /// List the test declarations of a file with their lens lines
    Tests(LensCommand),

    /// Show the traces recorded for one test
    Show(ShowCommand),
}

#[derive(Debug, Args)]
pub struct WorkspaceArgs {
    /// Workspace root holding the traces directory (defaults to current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Configuration file (defaults to <workspace>/trace-lens.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl WorkspaceArgs {
    pub fn root(&self) -> Result<PathBuf> {
        match &self.workspace {
            Some(dir) => absolutize(dir),
            None => std::env::current_dir().context("failed to read current directory"),
        }
    }

    pub fn load_config(&self, root: &Path) -> Result<TraceLensConfig> {
        let config = match &self.config {
            Some(path) => TraceLensConfig::from_file(path),
            None => TraceLensConfig::load(root),
        };
        config.context("failed to load trace-lens configuration")
    }
}

impl TraceLensCli {
    pub fn run(self) -> Result<()> {
        let root = self.workspace.root()?;
        let config = self.workspace.load_config(&root)?;
        debug!(
            "workspace {} with traces in {}",
            root.display(),
            config.traces_path(&root).display()
        );
        match self.command {
            TraceLensCommand::Tests(cmd) => cmd.run(&config),
            TraceLensCommand::Show(cmd) => cmd.run(&root, &config),
        }
    }
}

pub(crate) fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    Ok(cwd.join(path))
}
