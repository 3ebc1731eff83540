use crate::run::{list_organizations, run_harvest};
use crate::RunStatus;
use ats_harvest::config::Backend;
use ats_harvest::error::AppError;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "harvest",
    about = "Collect job listings from ATS boards into per-organization CSV files",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest the selected organizations (default command)
    Run(RunArgs),
    /// List the organizations in the catalog
    Orgs(OrgsArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum BackendArg {
    Greenhouse,
    Lever,
}

impl From<BackendArg> for Backend {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::Greenhouse => Backend::Greenhouse,
            BackendArg::Lever => Backend::Lever,
        }
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Organization to harvest; repeat for several. Defaults to the whole catalog
    #[arg(long = "org", value_name = "NAME")]
    pub(crate) organizations: Vec<String>,
    /// Only harvest organizations hosted on this backend
    #[arg(long, value_enum)]
    pub(crate) backend: Option<BackendArg>,
    /// Override the configured output directory
    #[arg(long)]
    pub(crate) output_dir: Option<PathBuf>,
    /// Override how many organizations are harvested at once
    #[arg(long)]
    pub(crate) concurrency: Option<usize>,
    /// Organization catalog (JSON) to use instead of the built-in one
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Print the run report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct OrgsArgs {
    /// Organization catalog (JSON) to list instead of the built-in one
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Only list organizations hosted on this backend
    #[arg(long, value_enum)]
    pub(crate) backend: Option<BackendArg>,
}

pub(crate) async fn run() -> Result<RunStatus, AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Run(RunArgs::default()));

    match command {
        Command::Run(args) => run_harvest(args).await,
        Command::Orgs(args) => list_organizations(args).map(|_| RunStatus::Completed),
    }
}
