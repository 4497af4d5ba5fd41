//! depdump - write the `deps` manifest of a module to a JSON file.

mod cli;
mod logging;

use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    logging::init(cli.quiet, cli.verbose);

    match cli::run(&cli) {
        Ok(report) => {
            tracing::info!("{report}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_error(&err);
            ExitCode::from(cli::exit_code(&err))
        }
    }
}

fn report_error(err: &anyhow::Error) {
    // Dump errors already carry their cause in the message
    if err.downcast_ref::<depdump_core::Error>().is_some() {
        eprintln!("{} {err}", "error:".red().bold());
    } else {
        eprintln!("{} {err:#}", "error:".red().bold());
    }
}
