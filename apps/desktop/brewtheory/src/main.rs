use brewtheory::cli::Args;
use brewtheory::service;

use std::process::ExitCode;

use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match service::run(&args).await {
        Ok(shutdown) if shutdown.success => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
