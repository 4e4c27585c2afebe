use clap::Parser;
use colored::*;
use std::process;
use steamboat::cli::{self, NwssBatchCli};

fn main() {
    let args = NwssBatchCli::parse();
    cli::init_logging(&args.common);

    if let Err(e) = cli::commands::nwss_batch::run(args) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(cli::exit_code(&e));
    }
}
