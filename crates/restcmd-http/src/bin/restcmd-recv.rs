//! Listen for command replies and print them

use clap::Parser;
use restcmd_http::cli::{RecvCli, run_receiver};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    restcmd::telemetry::init();
    let cli = RecvCli::parse();

    let interrupt = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    match run_receiver(&cli, interrupt).await {
        Ok(received) => {
            tracing::info!("Received {received} replies");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}
