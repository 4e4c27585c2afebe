//! GISAID bulk-upload formatting
//!
//! Field names and display headers follow the GISAID EpiCoV batch upload
//! template as of 2023/06/26.

use crate::bio::fasta::read_fasta_list;
use crate::io::table::{detect_delimiter, read_table, TableRow};
use crate::io::yaml::{read_yaml, Scalar};
use crate::{Result, SteamboatError};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

pub const GISAID_TYPE: &str = "betacoronavirus";

/// Template columns in upload order: (field key, display header)
pub const GISAID_FIELDS: [(&str, &str); 31] = [
    ("submitter", "Submitter"),
    ("fn", "FASTA filename"),
    ("covv_virus_name", "Virus name"),
    ("covv_type", "Type"),
    ("covv_passage", "Passage details/history"),
    ("covv_collection_date", "Collection date"),
    ("covv_location", "Location"),
    ("covv_add_location", "Additional location information"),
    ("covv_host", "Host"),
    ("covv_add_host_info", "Additional host information"),
    ("covv_sampling_strategy", "Sampling Strategy"),
    ("covv_gender", "Gender"),
    ("covv_patient_age", "Patient age"),
    ("covv_patient_status", "Patient status"),
    ("covv_specimen", "Specimen source"),
    ("covv_outbreak", "Outbreak"),
    ("covv_last_vaccinated", "Last vaccinated"),
    ("covv_treatment", "Treatment"),
    ("covv_seq_technology", "Sequencing technology"),
    ("covv_assembly_method", "Assembly method"),
    ("covv_coverage", "Coverage"),
    ("covv_orig_lab", "Originating lab"),
    ("covv_orig_lab_addr", "Address"),
    ("covv_provider_sample_id", "Sample ID given by the sample provider"),
    ("covv_subm_lab", "Submitting lab"),
    ("covv_subm_lab_addr", "Address"),
    ("covv_subm_sample_id", "Sample ID given by the submitting laboratory"),
    ("covv_consortium", "Sequencing consortium"),
    ("covv_authors", "Authors"),
    ("covv_comment", "Comment"),
    ("comment_type", "Comment Icon"),
];

/// Sequencing platform used to generate the assemblies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Sequencer {
    Clearlabs,
    Iseq,
    Hiseq,
    Miseq,
    Nextseq,
    Ont,
}

impl Sequencer {
    /// Text for the `covv_seq_technology` column
    pub fn technology(&self) -> &'static str {
        match self {
            Sequencer::Clearlabs => "Oxford Nanopore Technologies (via ClearLabs)",
            Sequencer::Iseq => "Illumina iSeq",
            Sequencer::Hiseq => "Illumina HiSeq",
            Sequencer::Miseq => "Illumina MiSeq",
            Sequencer::Nextseq => "Illumina NextSeq",
            Sequencer::Ont => "Oxford Nanopore Technologies",
        }
    }
}

/// Assembly pipeline that produced the results table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Pipeline {
    #[default]
    Cecret,
    Titan,
}

impl Pipeline {
    pub fn sample_column(&self) -> &'static str {
        match self {
            Pipeline::Cecret => "sample_id",
            Pipeline::Titan => "sample",
        }
    }

    pub fn total_ns_column(&self) -> &'static str {
        match self {
            Pipeline::Cecret => "num_N",
            Pipeline::Titan => "number_n",
        }
    }

    pub fn coverage_column(&self) -> &'static str {
        match self {
            Pipeline::Cecret => "samtools_per_1X_coverage_after_trimming",
            Pipeline::Titan => "percent_reference_coverage",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pipeline::Cecret => write!(f, "cecret"),
            Pipeline::Titan => write!(f, "titan"),
        }
    }
}

/// Constant submitter information loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GisaidConstants {
    #[serde(rename = "SUBMITTER")]
    pub submitter: Scalar,
    #[serde(rename = "AUTHORS")]
    pub authors: Vec<Scalar>,
    #[serde(rename = "COUNTRY")]
    pub country: Scalar,
    #[serde(rename = "CONTINENT")]
    pub continent: Scalar,
    #[serde(rename = "STATE")]
    pub state: Scalar,
    #[serde(rename = "SUBMISSION_ID_PREFIX")]
    pub submission_id_prefix: Scalar,
    #[serde(rename = "GISAID_PASSAGE")]
    pub passage: Scalar,
    #[serde(rename = "GISAID_HOST")]
    pub host: Scalar,
    #[serde(rename = "GISAID_PATIENT_STATUS")]
    pub patient_status: Scalar,
    #[serde(rename = "GISAID_SAMPLING_STRATEGY", default)]
    pub sampling_strategy: Scalar,
    #[serde(rename = "ORIGINATING_LAB")]
    pub originating_lab: Scalar,
    #[serde(rename = "ORIGINATING_LAB_ADDRESS")]
    pub originating_lab_address: Scalar,
    #[serde(rename = "SUBMITTING_LAB")]
    pub submitting_lab: Scalar,
    #[serde(rename = "SUBMITTING_LAB_ADDRESS")]
    pub submitting_lab_address: Scalar,
}

impl GisaidConstants {
    /// Load and validate constants from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let constants: GisaidConstants = read_yaml(path.as_ref())?;
        constants.validate()?;
        Ok(constants)
    }

    pub fn validate(&self) -> Result<()> {
        if self.authors.is_empty() {
            return Err(SteamboatError::Config(
                "AUTHORS must list at least one author".to_string(),
            ));
        }
        Ok(())
    }

    /// Authors joined as "A, B, and C"
    pub fn authors_text(&self) -> String {
        match self.authors.split_last() {
            None => String::new(),
            Some((last, [])) => last.to_string(),
            Some((last, rest)) => {
                let head: Vec<&str> = rest.iter().map(Scalar::as_str).collect();
                format!("{}, and {}", head.join(", "), last)
            }
        }
    }
}

/// One sample's row in the upload template, keyed by field in template order
#[derive(Debug, Clone, PartialEq)]
pub struct GisaidRecord {
    fields: IndexMap<&'static str, String>,
}

impl GisaidRecord {
    fn new() -> Self {
        Self {
            fields: GISAID_FIELDS
                .iter()
                .map(|(key, _)| (*key, String::new()))
                .collect(),
        }
    }

    fn set(&mut self, key: &'static str, value: impl Into<String>) {
        debug_assert!(self.fields.contains_key(key), "unknown GISAID field {}", key);
        self.fields.insert(key, value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn virus_name(&self) -> &str {
        self.get("covv_virus_name").unwrap_or_default()
    }

    /// Values in template order
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.values().map(String::as_str)
    }
}

/// The two header lines of the metadata CSV: field keys, then display names
pub fn gisaid_header() -> String {
    let keys: Vec<String> = GISAID_FIELDS.iter().map(|(key, _)| format!("\"{}\"", key)).collect();
    let names: Vec<String> = GISAID_FIELDS
        .iter()
        .map(|(_, name)| format!("\"{}\"", name))
        .collect();
    format!("{}\n{}\n", keys.join(","), names.join(","))
}

fn required<'a>(row: &'a TableRow, column: &str, sample: &str) -> Result<&'a str> {
    row.get(column).map(String::as_str).ok_or_else(|| {
        SteamboatError::InvalidInput(format!(
            "Metadata for sample '{}' is missing the '{}' column",
            sample, column
        ))
    })
}

/// Format one metadata row for GISAID submission
pub fn gisaid_formatter(
    metadata: &TableRow,
    fasta: &str,
    sequencer: Sequencer,
    constants: &GisaidConstants,
) -> Result<GisaidRecord> {
    let sample_id = metadata.get("sample_id").ok_or_else(|| {
        SteamboatError::InvalidInput("Metadata is missing the 'sample_id' column".to_string())
    })?;
    debug!("Formatting {} metadata for GISAID submission", sample_id);

    let collection_date = required(metadata, "collection_date", sample_id)?;
    let sex = required(metadata, "sex", sample_id)?;
    let age = required(metadata, "age", sample_id)?;

    let age_value: i64 = age.trim().parse().map_err(|_| {
        SteamboatError::Parse(format!(
            "Age '{}' for sample '{}' is not a whole number",
            age, sample_id
        ))
    })?;
    let patient_age = if age_value >= 90 { ">90" } else { age };

    let year = collection_date.split('-').next().unwrap_or_default();
    let virus_name = format!(
        "hCoV-19/{}/{}{}/{}",
        constants.country, constants.submission_id_prefix, sample_id, year
    );
    let location = format!(
        "{} / {} / {}",
        constants.continent, constants.country, constants.state
    );

    let mut record = GisaidRecord::new();
    record.set("submitter", constants.submitter.as_str());
    record.set("fn", fasta);
    record.set("covv_virus_name", virus_name);
    record.set("covv_type", GISAID_TYPE);
    record.set("covv_passage", constants.passage.as_str());
    record.set("covv_collection_date", collection_date);
    record.set("covv_location", location);
    record.set("covv_host", constants.host.as_str());
    record.set("covv_sampling_strategy", constants.sampling_strategy.as_str());
    record.set("covv_gender", sex.to_lowercase());
    record.set("covv_patient_age", patient_age);
    record.set("covv_patient_status", constants.patient_status.as_str());
    record.set(
        "covv_specimen",
        metadata.get("source").map(String::as_str).unwrap_or_default(),
    );
    record.set("covv_seq_technology", sequencer.technology());
    record.set("covv_orig_lab", constants.originating_lab.as_str());
    record.set("covv_orig_lab_addr", constants.originating_lab_address.as_str());
    record.set("covv_subm_lab", constants.submitting_lab.as_str());
    record.set("covv_subm_lab_addr", constants.submitting_lab_address.as_str());
    record.set("covv_authors", constants.authors_text());

    Ok(record)
}

/// Read a directory of single-record consensus assemblies keyed by sample name
///
/// Files with zero or several records are logged and left out.
pub fn parse_consensus_assemblies<P: AsRef<Path>>(
    assemblies: P,
    extension: &str,
) -> Result<IndexMap<String, String>> {
    let dir = assemblies.as_ref();
    if !dir.is_dir() {
        return Err(SteamboatError::NotFound(format!(
            "Assembly directory ('{}') not found, cannot continue",
            dir.display()
        )));
    }

    let suffix = format!(".{}", extension);
    let pattern = format!(
        "{}/*{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        glob::Pattern::escape(&suffix)
    );
    let mut paths: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| SteamboatError::InvalidInput(format!("Invalid assembly extension: {}", e)))?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let parsed: Vec<(PathBuf, Result<Vec<String>>)> = paths
        .into_par_iter()
        .map(|path| {
            let seqs = read_fasta_list(&path);
            (path, seqs)
        })
        .collect();

    let mut seqs = IndexMap::new();
    for (path, result) in parsed {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let sample = name.strip_suffix(&suffix).unwrap_or(&name).to_string();

        match result {
            Ok(mut fasta) if fasta.len() == 1 => {
                seqs.insert(sample, fasta.remove(0));
            }
            Ok(fasta) if fasta.len() > 1 => {
                error!(
                    "Consensus assembly for {} contains more than one sequence",
                    path.display()
                );
            }
            Ok(_) => error!("Consensus assembly for {} is empty", path.display()),
            Err(e) => error!("Consensus assembly for {} could not be read: {}", path.display(), e),
        }
    }

    debug!("Found {} consensus assemblies", seqs.len());
    Ok(seqs)
}

/// One sample's row from a pipeline results table
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub sample_id: String,
    pub total_ns: String,
    pub percent_coverage: String,
    pub row: TableRow,
}

impl PipelineResult {
    pub fn coverage(&self) -> Result<f64> {
        self.percent_coverage.trim().parse().map_err(|_| {
            SteamboatError::Parse(format!(
                "Percent coverage '{}' for sample '{}' is not a number",
                self.percent_coverage, self.sample_id
            ))
        })
    }

    pub fn ns(&self) -> Result<u64> {
        self.total_ns.trim().parse().map_err(|_| {
            SteamboatError::Parse(format!(
                "Total Ns '{}' for sample '{}' is not a whole number",
                self.total_ns, self.sample_id
            ))
        })
    }
}

/// Parse a pipeline results table keyed by sample
pub fn parse_results<P: AsRef<Path>>(
    input: P,
    pipeline: Pipeline,
) -> Result<IndexMap<String, PipelineResult>> {
    let input = input.as_ref();
    debug!("Parsing results from {} generated by {}", input.display(), pipeline);

    let mut results = IndexMap::new();
    for row in read_table(input, detect_delimiter(input), true)? {
        let column = |name: &str| -> Result<String> {
            row.get(name).cloned().ok_or_else(|| {
                SteamboatError::InvalidInput(format!(
                    "{} results in {} are missing the '{}' column",
                    pipeline,
                    input.display(),
                    name
                ))
            })
        };
        let sample_id = column(pipeline.sample_column())?;
        let total_ns = column(pipeline.total_ns_column())?;
        let percent_coverage = column(pipeline.coverage_column())?;

        results.insert(
            sample_id.clone(),
            PipelineResult {
                sample_id,
                total_ns,
                percent_coverage,
                row,
            },
        );
    }

    debug!("Found {} samples for {} results", results.len(), pipeline);
    Ok(results)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    pub(crate) fn constants() -> GisaidConstants {
        serde_yaml::from_str(
            r#"
SUBMITTER: jdoe
AUTHORS:
  - Jane Doe
  - John Roe
  - Alex Poe
COUNTRY: USA
CONTINENT: North America
STATE: Wyoming
SUBMISSION_ID_PREFIX: WY-WYPHL-
GISAID_PASSAGE: Original
GISAID_HOST: Human
GISAID_PATIENT_STATUS: unknown
ORIGINATING_LAB: Wyoming Public Health Laboratory
ORIGINATING_LAB_ADDRESS: 208 S College Dr, Cheyenne, WY 82007, USA
SUBMITTING_LAB: Wyoming Public Health Laboratory
SUBMITTING_LAB_ADDRESS: 208 S College Dr, Cheyenne, WY 82007, USA
"#,
        )
        .unwrap()
    }

    pub(crate) fn metadata(sample: &str, age: &str) -> TableRow {
        let mut row = TableRow::new();
        row.insert("sample_id".to_string(), sample.to_string());
        row.insert("collection_date".to_string(), "2023-06-01".to_string());
        row.insert("sex".to_string(), "Female".to_string());
        row.insert("age".to_string(), age.to_string());
        row
    }

    #[test]
    fn test_gisaid_header() {
        let header = gisaid_header();
        let lines: Vec<&str> = header.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(header.ends_with('\n'));
        assert_eq!(lines[0].split(',').count(), 31);
        assert!(lines[0].starts_with("\"submitter\",\"fn\",\"covv_virus_name\""));
        assert!(lines[0].ends_with("\"covv_comment\",\"comment_type\""));
        assert!(lines[1].starts_with("\"Submitter\",\"FASTA filename\",\"Virus name\""));
        assert!(lines[1].ends_with("\"Comment\",\"Comment Icon\""));
    }

    #[test]
    fn test_gisaid_formatter() {
        let record =
            gisaid_formatter(&metadata("23-0001", "45"), "batch.fasta", Sequencer::Miseq, &constants())
                .unwrap();

        assert_eq!(record.virus_name(), "hCoV-19/USA/WY-WYPHL-23-0001/2023");
        assert_eq!(record.get("submitter"), Some("jdoe"));
        assert_eq!(record.get("fn"), Some("batch.fasta"));
        assert_eq!(record.get("covv_type"), Some("betacoronavirus"));
        assert_eq!(record.get("covv_location"), Some("North America / USA / Wyoming"));
        assert_eq!(record.get("covv_gender"), Some("female"));
        assert_eq!(record.get("covv_patient_age"), Some("45"));
        assert_eq!(record.get("covv_specimen"), Some(""));
        assert_eq!(record.get("covv_sampling_strategy"), Some(""));
        assert_eq!(record.get("covv_seq_technology"), Some("Illumina MiSeq"));
        assert_eq!(record.get("covv_authors"), Some("Jane Doe, John Roe, and Alex Poe"));
        assert_eq!(record.values().count(), 31);
    }

    #[rstest]
    #[case("89", "89")]
    #[case("90", ">90")]
    #[case("104", ">90")]
    fn test_patient_age(#[case] age: &str, #[case] expected: &str) {
        let record =
            gisaid_formatter(&metadata("S1", age), "b.fasta", Sequencer::Ont, &constants()).unwrap();
        assert_eq!(record.get("covv_patient_age"), Some(expected));
    }

    #[test]
    fn test_non_numeric_age_is_an_error() {
        let err = gisaid_formatter(&metadata("S1", "unknown"), "b.fasta", Sequencer::Ont, &constants())
            .unwrap_err();
        assert!(matches!(err, SteamboatError::Parse(_)));
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let mut row = metadata("S1", "30");
        row.shift_remove("sex");
        let err = gisaid_formatter(&row, "b.fasta", Sequencer::Ont, &constants()).unwrap_err();
        assert!(err.to_string().contains("'sex'"));
    }

    #[test]
    fn test_specimen_from_source_column() {
        let mut row = metadata("S1", "30");
        row.insert("source".to_string(), "Nasopharyngeal swab".to_string());
        let record = gisaid_formatter(&row, "b.fasta", Sequencer::Ont, &constants()).unwrap();
        assert_eq!(record.get("covv_specimen"), Some("Nasopharyngeal swab"));
    }

    #[rstest]
    #[case(&["Jane Doe"], "Jane Doe")]
    #[case(&["Jane Doe", "John Roe"], "Jane Doe, and John Roe")]
    #[case(&["A", "B", "C"], "A, B, and C")]
    fn test_authors_text(#[case] authors: &[&str], #[case] expected: &str) {
        let mut constants = constants();
        constants.authors = authors.iter().map(|a| Scalar::from(*a)).collect();
        assert_eq!(constants.authors_text(), expected);
    }

    #[rstest]
    #[case(Sequencer::Clearlabs, "Oxford Nanopore Technologies (via ClearLabs)")]
    #[case(Sequencer::Iseq, "Illumina iSeq")]
    #[case(Sequencer::Hiseq, "Illumina HiSeq")]
    #[case(Sequencer::Nextseq, "Illumina NextSeq")]
    #[case(Sequencer::Ont, "Oxford Nanopore Technologies")]
    fn test_sequencer_technology(#[case] sequencer: Sequencer, #[case] expected: &str) {
        assert_eq!(sequencer.technology(), expected);
    }

    #[test]
    fn test_constants_require_authors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gisaid.yaml");
        let yaml = serde_yaml::to_string(&GisaidConstants {
            authors: Vec::new(),
            ..constants()
        })
        .unwrap();
        std::fs::write(&path, yaml).unwrap();

        let err = GisaidConstants::load(&path).unwrap_err();
        assert!(matches!(err, SteamboatError::Config(_)));
    }

    #[test]
    fn test_constants_missing_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gisaid.yaml");
        std::fs::write(&path, "SUBMITTER: jdoe\n").unwrap();

        let err = GisaidConstants::load(&path).unwrap_err();
        assert!(err.to_string().contains("AUTHORS"));
    }

    #[test]
    fn test_parse_consensus_assemblies() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("S1.consensus.fa"), ">S1\nACGT\nACGT\n").unwrap();
        std::fs::write(dir.path().join("S2.consensus.fa"), ">a\nAC\n>b\nGT\n").unwrap();
        std::fs::write(dir.path().join("S3.consensus.fa"), "").unwrap();
        std::fs::write(dir.path().join("S4.fasta"), ">S4\nACGT\n").unwrap();

        let seqs = parse_consensus_assemblies(dir.path(), "consensus.fa").unwrap();
        assert_eq!(seqs.len(), 1);
        assert_eq!(seqs.get("S1").map(String::as_str), Some("ACGTACGT"));
    }

    #[test]
    fn test_parse_consensus_assemblies_with_leading_comment() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("S1.consensus.fa"),
            "; generated by ivar\n>S1\nACGT\n",
        )
        .unwrap();

        let seqs = parse_consensus_assemblies(dir.path(), "consensus.fa").unwrap();
        assert_eq!(seqs.get("S1").map(String::as_str), Some("ACGT"));
    }

    #[test]
    fn test_parse_consensus_assemblies_missing_dir() {
        let dir = TempDir::new().unwrap();
        let err = parse_consensus_assemblies(dir.path().join("nope"), "fa").unwrap_err();
        assert!(matches!(err, SteamboatError::NotFound(_)));
    }

    #[test]
    fn test_parse_cecret_results() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cecret_results.csv");
        std::fs::write(
            &path,
            "sample_id,num_N,samtools_per_1X_coverage_after_trimming\nS1,120,99.1\nS2,9000,60.5\n",
        )
        .unwrap();

        let results = parse_results(&path, Pipeline::Cecret).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results["S1"].total_ns, "120");
        assert_eq!(results["S2"].percent_coverage, "60.5");
        assert_eq!(results["S2"].coverage().unwrap(), 60.5);
        assert_eq!(results["S2"].ns().unwrap(), 9000);
    }

    #[test]
    fn test_parse_titan_results() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("titan.tsv");
        std::fs::write(
            &path,
            "sample\tnumber_n\tpercent_reference_coverage\nS1\t0\t100\n",
        )
        .unwrap();

        let results = parse_results(&path, Pipeline::Titan).unwrap();
        assert_eq!(results["S1"].ns().unwrap(), 0);
        assert_eq!(results["S1"].coverage().unwrap(), 100.0);
    }

    #[test]
    fn test_parse_results_wrong_pipeline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("titan.tsv");
        std::fs::write(&path, "sample\tnumber_n\tpercent_reference_coverage\nS1\t0\t100\n").unwrap();

        let err = parse_results(&path, Pipeline::Cecret).unwrap_err();
        assert!(err.to_string().contains("'sample_id'"));
    }
}
