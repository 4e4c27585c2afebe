use crate::cli::output::*;
use crate::cli::{CommonArgs, GisaidBatchCli};
use crate::core::gisaid_batch::{BatchOutputs, GisaidBatch, Submission, DEFAULT_MAX_NS, DEFAULT_MIN_COVERAGE};
use crate::io::check::check_file;
use crate::io::table::{detect_delimiter, read_table};
use crate::repos::gisaid::{parse_consensus_assemblies, parse_results, GisaidConstants, Pipeline, Sequencer};
use crate::utils::format::format_number;
use crate::utils::parallel::configure_thread_pool;
use anyhow::Context;
use clap::Args;
use comfy_table::Cell;
use std::path::PathBuf;
use tracing::debug;

#[derive(Args, Debug)]
pub struct GisaidBatchArgs {
    /// A CSV or TSV file with the results of pipeline analysis
    #[arg(short, long, value_name = "FILE", help_heading = "Required Options")]
    pub results: PathBuf,

    /// Directory of FASTA assemblies to be uploaded
    #[arg(short, long, value_name = "DIR", help_heading = "Required Options")]
    pub assemblies: PathBuf,

    /// A TSV or CSV file of metadata associated with input samples
    #[arg(short, long, value_name = "FILE", help_heading = "Required Options")]
    pub metadata: PathBuf,

    /// Sequencer used to generate sequences
    #[arg(short, long, value_enum, help_heading = "Required Options")]
    pub sequencer: Sequencer,

    /// A YAML formatted file containing constant information for GISAID fields
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "GISAID_YAML",
        help_heading = "Required Options"
    )]
    pub yaml: PathBuf,

    /// Minimum percent coverage for a sample to be submitted
    #[arg(long, default_value_t = DEFAULT_MIN_COVERAGE, help_heading = "Filtering Options")]
    pub min_coverage: f64,

    /// Maximum number of Ns allowed in an assembly
    #[arg(long, default_value_t = DEFAULT_MAX_NS, help_heading = "Filtering Options")]
    pub max_ns: u64,

    /// Pipeline used for analysis
    #[arg(long, value_enum, default_value_t = Pipeline::Cecret, help_heading = "Additional Options")]
    pub pipeline: Pipeline,

    /// The extension used for assemblies
    #[arg(short, long, default_value = "consensus.fa", help_heading = "Additional Options")]
    pub extension: String,

    /// Add this to the beginning of sample names in the metadata file
    #[arg(long, help_heading = "Additional Options")]
    pub sample_prefix: Option<String>,

    /// Prefix to use for output files
    #[arg(short, long, default_value = "gisaid-batch", help_heading = "Additional Options")]
    pub prefix: String,

    /// Directory to write output
    #[arg(short, long, value_name = "DIR", default_value = "./", help_heading = "Additional Options")]
    pub outdir: PathBuf,

    /// Number of threads used to read assemblies (0 = all available)
    #[arg(short = 'j', long, default_value = "0", help_heading = "Additional Options")]
    pub threads: usize,
}

pub fn run(cli: GisaidBatchCli) -> anyhow::Result<()> {
    let GisaidBatchCli { args, common } = cli;

    let threads = configure_thread_pool(args.threads).context("Failed to initialize thread pool")?;
    debug!("Using {} threads", threads);

    // Verify input files
    let results_file = check_file(&args.results)?;
    let metadata_file = check_file(&args.metadata)?;
    let yaml_file = check_file(&args.yaml)?;

    std::fs::create_dir_all(&args.outdir)
        .with_context(|| format!("Failed to create output directory {}", args.outdir.display()))?;
    let outputs = BatchOutputs::new(&args.outdir, &args.prefix);
    outputs.check_writable(common.force)?;

    let results = parse_results(&results_file, args.pipeline)?;
    let metadata = read_table(&metadata_file, detect_delimiter(&metadata_file), true)?;
    let constants = GisaidConstants::load(&yaml_file)?;
    let assemblies = parse_consensus_assemblies(&args.assemblies, &args.extension)?;

    let batch = GisaidBatch::new(args.sequencer, outputs.fasta_name())
        .with_min_coverage(args.min_coverage)
        .with_max_ns(args.max_ns)
        .with_sample_prefix(args.sample_prefix);
    let submission = batch.build(&metadata, &results, &assemblies, &constants)?;
    submission.write(&outputs)?;

    if !common.silent {
        print_summary(&submission, metadata.len(), &outputs, &common);
    }
    Ok(())
}

fn print_summary(submission: &Submission, total: usize, outputs: &BatchOutputs, common: &CommonArgs) {
    section_header_with_line("GISAID Batch Summary");

    tree_item(false, "Metadata samples", Some(&format_number(total)));
    tree_section(
        "Samples",
        vec![
            ("Accepted", format_number(submission.accepted.len())),
            ("Excluded", format_number(submission.excluded.len())),
            ("Skipped", format_number(submission.skipped.len())),
        ],
        false,
    );
    tree_section(
        "Outputs",
        vec![
            ("FASTA", outputs.fasta.display().to_string()),
            ("Metadata", outputs.metadata.display().to_string()),
            ("Excluded", outputs.excluded.display().to_string()),
        ],
        true,
    );

    if !submission.excluded.is_empty() {
        let mut table = create_standard_table();
        table.set_header(vec![header_cell("Sample"), header_cell("Reason")]);
        for exclusion in &submission.excluded {
            table.add_row(vec![
                Cell::new(&exclusion.sample_id),
                Cell::new(exclusion.reasons.join("\n")),
            ]);
        }
        println!("\n{}", table);
    }

    if submission.accepted.is_empty() {
        warning("No samples passed the filters, the submission files only contain headers");
    } else {
        success(&format!(
            "{} samples ready for GISAID upload",
            format_number(submission.accepted.len())
        ));
    }

    if common.verbose && !submission.skipped.is_empty() {
        tree_item(true, "Skipped", Some(&submission.skipped.join(", ")));
    }
}
