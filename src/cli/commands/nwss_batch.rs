use crate::cli::output::*;
use crate::cli::NwssBatchCli;
use crate::io::check::{check_file, file_exists_error};
use crate::repos::nwss::{parse_results, write_results, NwssMappings};
use crate::utils::format::format_number;
use crate::SteamboatError;
use anyhow::Context;
use clap::Args;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub struct NwssBatchArgs {
    /// A TSV (or CSV) file with the dPCR results
    #[arg(short, long, value_name = "FILE", help_heading = "Required Options")]
    pub results: PathBuf,

    /// A YAML formatted file containing constant information for NWSS fields
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "NWSS_YAML",
        help_heading = "Required Options"
    )]
    pub yaml: PathBuf,

    /// Prefix to use for output files
    #[arg(short, long, default_value = "nwss-batch", help_heading = "Additional Options")]
    pub prefix: String,

    /// Directory to write output
    #[arg(short, long, value_name = "DIR", default_value = "./", help_heading = "Additional Options")]
    pub outdir: PathBuf,
}

pub fn run(cli: NwssBatchCli) -> anyhow::Result<()> {
    let NwssBatchCli { args, common } = cli;

    let results_file = check_file(&args.results)?;
    let yaml_file = check_file(&args.yaml)?;

    std::fs::create_dir_all(&args.outdir)
        .with_context(|| format!("Failed to create output directory {}", args.outdir.display()))?;
    let nwss_csv = args.outdir.join(format!("{}.csv", args.prefix));
    file_exists_error(&nwss_csv, common.force)?;

    let mappings = NwssMappings::load(&yaml_file)?;
    let records = parse_results(&results_file, &mappings)?;

    info!("Writing {}", nwss_csv.display());
    write_results(BufWriter::new(File::create(&nwss_csv).map_err(SteamboatError::from)?), &records)?;

    if !common.silent {
        section_header_with_line("NWSS Batch Summary");
        tree_item(false, "Records", Some(&format_number(records.len())));
        tree_item(true, "Output", Some(&nwss_csv.display().to_string()));
        if records.is_empty() {
            warning("No records were produced, check the site and target mappings");
        }
    }
    Ok(())
}
