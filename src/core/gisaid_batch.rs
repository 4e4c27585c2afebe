use crate::io::check::file_exists_error;
use crate::io::table::TableRow;
use crate::repos::gisaid::{gisaid_formatter, gisaid_header, GisaidConstants, GisaidRecord, PipelineResult, Sequencer};
use crate::utils::format::format_float;
use crate::{Result, SteamboatError};
use indexmap::IndexMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_MIN_COVERAGE: f64 = 70.0;
pub const DEFAULT_MAX_NS: u64 = 7500;

/// Joins metadata, pipeline results and assemblies into a GISAID submission
#[derive(Debug, Clone)]
pub struct GisaidBatch {
    pub sequencer: Sequencer,
    /// File name written into the `fn` column
    pub fasta_name: String,
    pub min_coverage: f64,
    pub max_ns: u64,
    /// Prepended to metadata sample ids when looking up results and assemblies
    pub sample_prefix: Option<String>,
}

/// A sample accepted for upload
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    pub record: GisaidRecord,
    pub sequence: String,
}

/// A sample that failed the quality filters
#[derive(Debug, Clone, PartialEq)]
pub struct Exclusion {
    pub sample_id: String,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Submission {
    /// Keyed by metadata sample id, in metadata order
    pub accepted: IndexMap<String, Accepted>,
    pub excluded: Vec<Exclusion>,
    /// Samples with no results row or no assembly
    pub skipped: Vec<String>,
}

/// Output paths for one batch
#[derive(Debug, Clone)]
pub struct BatchOutputs {
    pub fasta: PathBuf,
    pub metadata: PathBuf,
    pub excluded: PathBuf,
}

impl BatchOutputs {
    pub fn new<P: AsRef<Path>>(outdir: P, prefix: &str) -> Self {
        let outdir = outdir.as_ref();
        Self {
            fasta: outdir.join(format!("{}.fasta", prefix)),
            metadata: outdir.join(format!("{}.csv", prefix)),
            excluded: outdir.join(format!("{}.excluded.txt", prefix)),
        }
    }

    /// Fail if any output exists and `force` is not set
    pub fn check_writable(&self, force: bool) -> Result<()> {
        file_exists_error(&self.fasta, force)?;
        file_exists_error(&self.metadata, force)?;
        file_exists_error(&self.excluded, force)?;
        Ok(())
    }

    /// The FASTA file name as it appears in the metadata `fn` column
    pub fn fasta_name(&self) -> String {
        self.fasta
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

impl GisaidBatch {
    pub fn new(sequencer: Sequencer, fasta_name: impl Into<String>) -> Self {
        Self {
            sequencer,
            fasta_name: fasta_name.into(),
            min_coverage: DEFAULT_MIN_COVERAGE,
            max_ns: DEFAULT_MAX_NS,
            sample_prefix: None,
        }
    }

    pub fn with_min_coverage(mut self, min_coverage: f64) -> Self {
        self.min_coverage = min_coverage;
        self
    }

    pub fn with_max_ns(mut self, max_ns: u64) -> Self {
        self.max_ns = max_ns;
        self
    }

    pub fn with_sample_prefix(mut self, prefix: Option<String>) -> Self {
        self.sample_prefix = prefix.filter(|p| !p.is_empty());
        self
    }

    /// Quality filter failures for one sample; empty means it passes
    fn exclusion_reasons(&self, sample_id: &str, result: &PipelineResult) -> Result<Vec<String>> {
        let mut reasons = Vec::new();

        if result.coverage()? < self.min_coverage {
            reasons.push(format!(
                "{} - Low percent coverage ({}%). Expected >= {}%",
                sample_id,
                result.percent_coverage,
                format_float(self.min_coverage)
            ));
        }

        if result.ns()? > self.max_ns {
            reasons.push(format!(
                "{} - Too many Ns ({}). Expected <= {}",
                sample_id, result.total_ns, self.max_ns
            ));
        }

        for reason in &reasons {
            warn!("{}", reason);
        }
        Ok(reasons)
    }

    /// Process each metadata row in order
    pub fn build(
        &self,
        metadata: &[TableRow],
        results: &IndexMap<String, PipelineResult>,
        assemblies: &IndexMap<String, String>,
        constants: &GisaidConstants,
    ) -> Result<Submission> {
        let mut submission = Submission::default();

        for sample in metadata {
            let sample_id = sample.get("sample_id").ok_or_else(|| {
                SteamboatError::InvalidInput("Metadata is missing the 'sample_id' column".to_string())
            })?;
            let lookup_id = match &self.sample_prefix {
                Some(prefix) => format!("{}{}", prefix, sample_id),
                None => sample_id.clone(),
            };

            let Some(result) = results.get(&lookup_id) else {
                warn!("Results for {} not found, skipping", lookup_id);
                submission.skipped.push(lookup_id);
                continue;
            };

            let Some(sequence) = assemblies.get(&lookup_id) else {
                warn!("Consensus assembly for {} not found, skipping", lookup_id);
                submission.skipped.push(lookup_id);
                continue;
            };

            let reasons = self.exclusion_reasons(&lookup_id, result)?;
            if !reasons.is_empty() {
                submission.excluded.push(Exclusion {
                    sample_id: lookup_id,
                    reasons,
                });
                continue;
            }

            let record = gisaid_formatter(sample, &self.fasta_name, self.sequencer, constants)?;
            submission.accepted.insert(
                sample_id.clone(),
                Accepted {
                    record,
                    sequence: sequence.clone(),
                },
            );
        }

        Ok(submission)
    }
}

impl Submission {
    /// Metadata CSV: the two header lines, then every value quoted
    pub fn write_metadata<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(gisaid_header().as_bytes())?;

        let mut csv = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);
        for accepted in self.accepted.values() {
            csv.write_record(accepted.record.values())?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Submission FASTA, one unwrapped record per accepted sample
    pub fn write_fasta<W: Write>(&self, mut writer: W) -> Result<()> {
        for accepted in self.accepted.values() {
            writeln!(writer, ">{}", accepted.record.virus_name())?;
            writeln!(writer, "{}", accepted.sequence)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Tab-separated report of excluded samples and why
    pub fn write_excluded<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "sample_id\treason")?;
        for exclusion in &self.excluded {
            writeln!(writer, "{}\t{}", exclusion.sample_id, exclusion.reasons.join(";"))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write(&self, outputs: &BatchOutputs) -> Result<()> {
        info!("Writing {}", outputs.metadata.display());
        self.write_metadata(BufWriter::new(File::create(&outputs.metadata)?))?;

        info!("Writing {}", outputs.fasta.display());
        self.write_fasta(BufWriter::new(File::create(&outputs.fasta)?))?;

        info!("Writing {}", outputs.excluded.display());
        self.write_excluded(BufWriter::new(File::create(&outputs.excluded)?))?;
        Ok(())
    }
}
