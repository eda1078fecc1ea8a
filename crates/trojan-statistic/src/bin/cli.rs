//! Trojan statistic standalone binary.

use std::process::ExitCode;

use clap::Parser;
use trojan_statistic::{StatisticArgs, cli};

#[tokio::main]
async fn main() -> ExitCode {
    let args = StatisticArgs::parse();

    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
