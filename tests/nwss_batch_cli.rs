mod common;

use anyhow::Result;
use predicates::prelude::*;
use std::fs;

use common::*;

const NWSS_YAML: &str = r#"rec_eff_spike_conc: 0.0
inhibition_detect: ""
inhibition_adjust: ""
lab_id: "WPHL"
lod_sewage: 1000
major_lab_method: 1
major_lab_method_desc: ""
ntc_amplify: "no"
pasteurized: ""
pcr_target_units: "copies/l wastewater"
column_mappings:
  sample_id: "WPHL ID#"
  site: "Site"
  collection_water_temp: "WastewaterTempF"
  flow_rate: "DailyTotalGallons"
  sample_collect_date: "SampleCollected"
  test_result_date: "SampleProcessed"
  rec_eff_percent: "Avg recovery eff"
  targets:
    sars_cov_2: "Avg est SC2 conc pre recovery cntrl"
sites:
  city_name:
    reporting_jurisdiction: "WY"
    site_id: "WY-001"
    county_names: 56021
    other_jurisdiction: ""
    zipcode: "82001"
    population_served: 65000
    sample_location: "wwtp"
    sample_location_specify: ""
    institution_type: ""
    epaid: ""
    wwtp_name: "Crow Creek"
    wwtp_jurisdiction: "WY"
    capacity_mgd: 13.0
    sample_type: "24-hr flow-weighted composite"
    sample_matrix: "raw wastewater"
    pretreatment: "no"
    concentration_method: ""
    extraction_method: ""
    rec_eff_target_name: "bcov"
    rec_eff_spike_matrix: "raw sample"
targets:
  sars_cov_2:
    pcr_target: "sars-cov-2"
    pcr_gene_target: "n1"
    pcr_gene_target_ref: ""
    pcr_type: "qiagen dpcr"
    lod_ref: ""
    quant_stan_type: ""
    stan_ref: ""
    inhibition_method: "none"
"#;

const RESULTS: &str = "WPHL ID#\tSite\tWastewaterTempF\tDailyTotalGallons\tSampleCollected\tSampleProcessed\tAvg recovery eff\tAvg est SC2 conc pre recovery cntrl
230000001\tCity_Name\t66\t3.941\t8/8/2023 7:00\t8/9/2023\t36.70%\t9466.67
230000002\tUnknown Site\t66\t3.941\t8/8/2023 7:00\t8/9/2023\t36.70%\t100
230000003\tCity Name\t66\t3.941\t8/15/2023 7:00\t8/16/2023\t40%\t
";

#[test]
fn test_nwss_help_command() {
    nwss_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Format data for NWSS submission"));
}

#[test]
fn test_nwss_batch_workflow() -> Result<()> {
    let env = TestEnvironment::new()?;
    let results = env.create_input_file("results.tsv", RESULTS)?;
    let yaml = env.create_input_file("nwss.yaml", NWSS_YAML)?;

    nwss_cmd()
        .arg("--results")
        .arg(&results)
        .arg("--yaml")
        .arg(&yaml)
        .arg("--outdir")
        .arg(env.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("NWSS Batch Summary"));

    let csv = fs::read_to_string(env.output_path("nwss-batch.csv"))?;
    let lines: Vec<&str> = csv.split("\r\n").filter(|l| !l.is_empty()).collect();
    // Unknown site and empty target value produce no rows
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("reporting_jurisdiction,site_id,county_names"));
    assert!(lines[1].starts_with("WY,WY-001,56021,"));
    assert!(lines[1].contains(",8/8/2023,7:00,3.941,18.89,230000001,WPHL,8/9/2023,"));
    Ok(())
}

#[test]
fn test_nwss_refuses_to_overwrite() -> Result<()> {
    let env = TestEnvironment::new()?;
    let results = env.create_input_file("results.tsv", RESULTS)?;
    env.create_input_file("nwss.yaml", NWSS_YAML)?;
    env.create_input_file("nwss-batch.csv", "existing\n")?;

    nwss_cmd()
        .arg("-r")
        .arg(&results)
        .arg("-o")
        .arg(env.path())
        .env("NWSS_YAML", env.path().join("nwss.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Use --force to overwrite"));
    Ok(())
}
