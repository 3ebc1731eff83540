mod cli;
mod infra;
mod run;

use ats_harvest::error::AppError;

/// How the process should exit once a command finished without a startup
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// A harvest ran but every selected organization failed.
    NothingSucceeded,
}

pub async fn run() -> Result<RunStatus, AppError> {
    cli::run().await
}
