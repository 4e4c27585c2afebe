pub mod commands;
pub mod output;

use crate::SteamboatError;
use clap::{Args, Parser};
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the log filter
pub const LOG_ENV: &str = "STEAMBOAT_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "gisaid-batch",
    version,
    about = "gisaid-batch - Format data for GISAID submission.",
    long_about = "gisaid-batch - Format data for GISAID submission.\n\n\
                  Joins pipeline results, consensus assemblies and sample metadata into a \
                  GISAID bulk upload: a multi-FASTA, a metadata CSV and a report of samples \
                  excluded by the quality filters.",
    arg_required_else_help = true
)]
pub struct GisaidBatchCli {
    #[command(flatten)]
    pub args: commands::gisaid_batch::GisaidBatchArgs,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser, Debug)]
#[command(
    name = "nwss-batch",
    version,
    about = "nwss-batch - Format data for NWSS submission.",
    arg_required_else_help = true
)]
pub struct NwssBatchCli {
    #[command(flatten)]
    pub args: commands::nwss_batch::NwssBatchArgs,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Flags shared by every batch command
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Overwrite existing reports
    #[arg(long, help_heading = "Additional Options")]
    pub force: bool,

    /// Increase the verbosity of output
    #[arg(long, help_heading = "Additional Options")]
    pub verbose: bool,

    /// Only critical errors will be printed
    #[arg(long, help_heading = "Additional Options")]
    pub silent: bool,
}

impl CommonArgs {
    pub fn log_level(&self) -> &'static str {
        if self.silent {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// Initialize logging to stderr, honouring STEAMBOAT_LOG when set
pub fn init_logging(common: &CommonArgs) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(common.log_level()));

    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    output::init();
}

/// Map an error to the process exit code
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<SteamboatError>() {
        Some(SteamboatError::Config(_)) => 2,
        Some(SteamboatError::Io(_)) => 3,
        Some(SteamboatError::Parse(_)) => 4,
        Some(
            SteamboatError::NotFound(_)
            | SteamboatError::InvalidInput(_)
            | SteamboatError::AlreadyExists(_),
        ) => 5,
        _ => 1,
    }
}
