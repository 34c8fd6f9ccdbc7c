//! dbtriagectl - diagnostic triage CLI

use clap::error::ErrorKind;
use clap::Parser;
use dbtriagectl::cli::Cli;
use dbtriagectl::logging::init_logging;
use dbtriagectl::runner;

/// Exit code for usage and configuration errors
const EXIT_GENERAL_ERROR: i32 = 1;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => EXIT_GENERAL_ERROR,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_logging(cli.verbose);

    let code = match runner::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            EXIT_GENERAL_ERROR
        }
    };
    std::process::exit(code);
}
