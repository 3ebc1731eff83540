use ats_harvest_cli::{run, RunStatus};

#[tokio::main]
async fn main() {
    match run().await {
        Ok(RunStatus::Completed) => {}
        Ok(RunStatus::NothingSucceeded) => std::process::exit(1),
        Err(err) => {
            eprintln!("application error: {err}");
            std::process::exit(1);
        }
    }
}
