#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const GISAID_YAML: &str = r#"SUBMITTER: jdoe
AUTHORS:
  - Jane Doe
  - John Roe
COUNTRY: USA
CONTINENT: North America
STATE: Wyoming
SUBMISSION_ID_PREFIX: WY-WYPHL-
GISAID_PASSAGE: Original
GISAID_HOST: Human
GISAID_PATIENT_STATUS: unknown
GISAID_SAMPLING_STRATEGY: Baseline surveillance
ORIGINATING_LAB: Wyoming Public Health Laboratory
ORIGINATING_LAB_ADDRESS: 208 S College Dr, Cheyenne, WY 82007, USA
SUBMITTING_LAB: Wyoming Public Health Laboratory
SUBMITTING_LAB_ADDRESS: 208 S College Dr, Cheyenne, WY 82007, USA
"#;

pub const CECRET_RESULTS: &str = "sample_id,num_N,samtools_per_1X_coverage_after_trimming
S1,120,99.1
S2,9000,60.5
S3,50,98.0
";

pub const METADATA: &str = "sample_id\tcollection_date\tsex\tage\tsource
S1\t2023-06-01\tFemale\t45\tNasal swab
S2\t2023-06-02\tMale\t91\tNasal swab
S3\t2023-06-03\tMale\t93\tSaliva
S4\t2023-06-04\tFemale\t20\tSaliva
";

/// Temporary directory holding one batch's inputs and outputs
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn create_input_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    pub fn output_path(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    /// Results, metadata, constants and one assembly per listed sample
    pub fn gisaid_inputs(&self, samples: &[&str]) -> Result<()> {
        self.create_input_file("results.csv", CECRET_RESULTS)?;
        self.create_input_file("metadata.tsv", METADATA)?;
        self.create_input_file("gisaid.yaml", GISAID_YAML)?;
        fs::create_dir_all(self.path().join("assemblies"))?;
        for sample in samples {
            self.create_input_file(
                &format!("assemblies/{}.consensus.fa", sample),
                &format!(">{}\nACGTACGTNNNN\nACGTACGT\n", sample),
            )?;
        }
        Ok(())
    }
}

pub fn gisaid_cmd() -> Command {
    let mut cmd = Command::cargo_bin("gisaid-batch").expect("gisaid-batch binary");
    cmd.env_remove("GISAID_YAML")
        .env_remove("STEAMBOAT_LOG")
        .env("NO_COLOR", "1");
    cmd
}

pub fn nwss_cmd() -> Command {
    let mut cmd = Command::cargo_bin("nwss-batch").expect("nwss-batch binary");
    cmd.env_remove("NWSS_YAML")
        .env_remove("STEAMBOAT_LOG")
        .env("NO_COLOR", "1");
    cmd
}

/// A gisaid-batch invocation over the files made by `gisaid_inputs`
pub fn gisaid_batch(env: &TestEnvironment) -> Command {
    let mut cmd = gisaid_cmd();
    cmd.arg("--results")
        .arg(env.path().join("results.csv"))
        .arg("--assemblies")
        .arg(env.path().join("assemblies"))
        .arg("--metadata")
        .arg(env.path().join("metadata.tsv"))
        .arg("--sequencer")
        .arg("miseq")
        .arg("--yaml")
        .arg(env.path().join("gisaid.yaml"))
        .arg("--outdir")
        .arg(env.path().join("out"));
    cmd
}

/// Count FASTA records in a file
pub fn count_sequences(path: &Path) -> Result<usize> {
    let content = fs::read_to_string(path)?;
    Ok(content.lines().filter(|line| line.starts_with('>')).count())
}
