mod cli;
mod commands;
mod config;
mod logging;
mod render;

use std::process::ExitCode;

use clap::Parser;
use engine_logging::engine_error;

use crate::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Before parsing, so `.env` values feed the flags' env fallbacks.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    logging::initialize(cli.global.log_to, cli.global.log_level);

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            engine_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
