//! Send commands from a file and print the replies that come back

use clap::Parser;
use restcmd::StdinPrompt;
use restcmd_http::cli::{Cli, run_session};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    restcmd::telemetry::init();
    let cli = Cli::parse();

    let mut prompt = StdinPrompt::new();
    let interrupt = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    match run_session(&cli, &mut prompt, interrupt).await {
        Ok(summary) => {
            println!("\n{summary}");
            println!("Exiting...");
            ExitCode::SUCCESS
        }
        // Exit status 2 when the run was refused before any dispatch.
        Err(e) if e.is_fatal() => {
            tracing::error!("{e}");
            eprintln!("\nERROR: {e}");
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("\nERROR: {e}");
            ExitCode::FAILURE
        }
    }
}
