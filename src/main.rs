use std::process::ExitCode;

use ci_failure_notifier::{cli::Cli, run};
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("notify-on-failure: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
