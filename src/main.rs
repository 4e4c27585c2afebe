use clap::Parser;
use colored::*;
use std::process;
use steamboat::cli::{self, GisaidBatchCli};

fn main() {
    let args = GisaidBatchCli::parse();
    cli::init_logging(&args.common);

    if let Err(e) = cli::commands::gisaid_batch::run(args) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(cli::exit_code(&e));
    }
}
