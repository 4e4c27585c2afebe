//! CDC NWSS wastewater submission formatting

use crate::io::table::{detect_delimiter, read_table, TableRow};
use crate::io::yaml::{read_yaml, Scalar};
use crate::utils::format::{format_float, is_unsigned_decimal};
use crate::{Result, SteamboatError};
use indexmap::IndexMap;
use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Columns of the NWSS upload CSV, in order
pub const NWSS_FIELDS: [&str; 47] = [
    "reporting_jurisdiction",
    "site_id",
    "county_names",
    "other_jurisdiction",
    "zipcode",
    "population_served",
    "sample_location",
    "sample_location_specify",
    "institution_type",
    "epaid",
    "wwtp_name",
    "wwtp_jurisdiction",
    "capacity_mgd",
    "sample_type",
    "sample_matrix",
    "pretreatment",
    "concentration_method",
    "extraction_method",
    "rec_eff_target_name",
    "rec_eff_spike_matrix",
    "rec_eff_spike_conc",
    "pasteurized",
    "pcr_target",
    "pcr_gene_target",
    "pcr_gene_target_ref",
    "pcr_type",
    "lod_ref",
    "quant_stan_type",
    "stan_ref",
    "inhibition_method",
    "num_no_target_control",
    "sample_collect_date",
    "sample_collect_time",
    "flow_rate",
    "collection_water_temp",
    "sample_id",
    "lab_id",
    "test_result_date",
    "pcr_target_units",
    "pcr_target_avg_conc",
    "lod_sewage",
    "ntc_amplify",
    "rec_eff_percent",
    "inhibition_detect",
    "inhibition_adjust",
    "major_lab_method",
    "major_lab_method_desc",
];

/// One output row, keyed by NWSS field
pub type NwssRecord = IndexMap<&'static str, String>;

/// Mapping file describing how a lab's results table becomes NWSS rows
#[derive(Debug, Clone, Deserialize)]
pub struct NwssMappings {
    pub rec_eff_spike_conc: Scalar,
    pub inhibition_detect: Scalar,
    pub inhibition_adjust: Scalar,
    pub lab_id: Scalar,
    pub lod_sewage: Scalar,
    pub major_lab_method: Scalar,
    pub major_lab_method_desc: Scalar,
    pub ntc_amplify: Scalar,
    pub pasteurized: Scalar,
    pub pcr_target_units: Scalar,
    pub column_mappings: ColumnMappings,
    pub sites: IndexMap<String, SiteInfo>,
    pub targets: IndexMap<String, TargetInfo>,
}

/// Results-table column names for each value we read
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMappings {
    pub sample_id: String,
    pub site: String,
    pub collection_water_temp: String,
    pub flow_rate: String,
    pub sample_collect_date: String,
    pub test_result_date: String,
    pub rec_eff_percent: String,
    /// Target key to the column holding its concentration
    pub targets: IndexMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteInfo {
    pub reporting_jurisdiction: Scalar,
    pub site_id: Scalar,
    pub county_names: Scalar,
    pub other_jurisdiction: Scalar,
    pub zipcode: Scalar,
    pub population_served: Scalar,
    pub sample_location: Scalar,
    pub sample_location_specify: Scalar,
    pub institution_type: Scalar,
    pub epaid: Scalar,
    pub wwtp_name: Scalar,
    pub wwtp_jurisdiction: Scalar,
    pub capacity_mgd: Scalar,
    pub sample_type: Scalar,
    pub sample_matrix: Scalar,
    pub pretreatment: Scalar,
    pub concentration_method: Scalar,
    pub extraction_method: Scalar,
    pub rec_eff_target_name: Scalar,
    pub rec_eff_spike_matrix: Scalar,
}

impl SiteInfo {
    fn fields(&self) -> [(&'static str, &Scalar); 20] {
        [
            ("reporting_jurisdiction", &self.reporting_jurisdiction),
            ("site_id", &self.site_id),
            ("county_names", &self.county_names),
            ("other_jurisdiction", &self.other_jurisdiction),
            ("zipcode", &self.zipcode),
            ("population_served", &self.population_served),
            ("sample_location", &self.sample_location),
            ("sample_location_specify", &self.sample_location_specify),
            ("institution_type", &self.institution_type),
            ("epaid", &self.epaid),
            ("wwtp_name", &self.wwtp_name),
            ("wwtp_jurisdiction", &self.wwtp_jurisdiction),
            ("capacity_mgd", &self.capacity_mgd),
            ("sample_type", &self.sample_type),
            ("sample_matrix", &self.sample_matrix),
            ("pretreatment", &self.pretreatment),
            ("concentration_method", &self.concentration_method),
            ("extraction_method", &self.extraction_method),
            ("rec_eff_target_name", &self.rec_eff_target_name),
            ("rec_eff_spike_matrix", &self.rec_eff_spike_matrix),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetInfo {
    pub pcr_target: Scalar,
    pub pcr_gene_target: Scalar,
    pub pcr_gene_target_ref: Scalar,
    pub pcr_type: Scalar,
    pub lod_ref: Scalar,
    pub quant_stan_type: Scalar,
    pub stan_ref: Scalar,
    pub inhibition_method: Scalar,
}

impl TargetInfo {
    fn fields(&self) -> [(&'static str, &Scalar); 8] {
        [
            ("pcr_target", &self.pcr_target),
            ("pcr_gene_target", &self.pcr_gene_target),
            ("pcr_gene_target_ref", &self.pcr_gene_target_ref),
            ("pcr_type", &self.pcr_type),
            ("lod_ref", &self.lod_ref),
            ("quant_stan_type", &self.quant_stan_type),
            ("stan_ref", &self.stan_ref),
            ("inhibition_method", &self.inhibition_method),
        ]
    }
}

impl NwssMappings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_yaml(path)
    }

    fn constant_fields(&self) -> [(&'static str, &Scalar); 10] {
        [
            ("rec_eff_spike_conc", &self.rec_eff_spike_conc),
            ("inhibition_detect", &self.inhibition_detect),
            ("inhibition_adjust", &self.inhibition_adjust),
            ("lab_id", &self.lab_id),
            ("lod_sewage", &self.lod_sewage),
            ("major_lab_method", &self.major_lab_method),
            ("major_lab_method_desc", &self.major_lab_method_desc),
            ("ntc_amplify", &self.ntc_amplify),
            ("pasteurized", &self.pasteurized),
            ("pcr_target_units", &self.pcr_target_units),
        ]
    }
}

fn cell<'a>(row: &'a TableRow, column: &str) -> Result<&'a str> {
    row.get(column).map(String::as_str).ok_or_else(|| {
        SteamboatError::InvalidInput(format!("Results are missing the mapped column '{}'", column))
    })
}

fn fahrenheit_to_celsius(value: f64) -> f64 {
    (value - 32.0) * 5.0 / 9.0
}

/// Turn one results row into NWSS records, one per reported target
///
/// Rows for unknown sites produce no records.
pub fn process_row(row: &TableRow, mappings: &NwssMappings) -> Result<Vec<NwssRecord>> {
    let columns = &mappings.column_mappings;
    let sample_id = cell(row, &columns.sample_id)?;

    let mut shared = NwssRecord::new();
    shared.insert("sample_id", sample_id.to_string());
    for (field, value) in mappings.constant_fields() {
        shared.insert(field, value.to_string());
    }

    let temp = cell(row, &columns.collection_water_temp)?;
    let celsius = match temp.parse::<f64>() {
        Ok(fahrenheit) if is_unsigned_decimal(temp) => format!("{:.2}", fahrenheit_to_celsius(fahrenheit)),
        _ => {
            warn!(
                "Collection water temperature ({}) for sample {} is not a number, skipping conversion and leaving empty",
                temp, sample_id
            );
            String::new()
        }
    };
    shared.insert("collection_water_temp", celsius);

    let flow = cell(row, &columns.flow_rate)?;
    let flow_rate = match flow.parse::<f64>() {
        Ok(rate) if is_unsigned_decimal(flow) => format_float(rate),
        _ => {
            warn!(
                "Flow rate ({}) for sample {} is not a number, leaving empty",
                flow, sample_id
            );
            String::new()
        }
    };
    shared.insert("flow_rate", flow_rate);

    let site_key = cell(row, &columns.site)?.to_lowercase().replace(' ', "_");
    let Some(site) = mappings.sites.get(&site_key) else {
        warn!(
            "Site '{}' not found in mappings, skipping sample {}",
            site_key, sample_id
        );
        return Ok(Vec::new());
    };
    for (field, value) in site.fields() {
        shared.insert(field, value.to_string());
    }

    shared.insert(
        "rec_eff_percent",
        cell(row, &columns.rec_eff_percent)?.replace('%', ""),
    );

    let mut records = Vec::new();
    for (target, column) in &columns.targets {
        let Some(value) = row.get(column) else {
            warn!(
                "Target {} not found in row for sample {}, skipping",
                target, sample_id
            );
            continue;
        };
        if value.is_empty() {
            warn!(
                "Value for '{}' in sample {} is empty, skipping",
                target, sample_id
            );
            continue;
        }
        let Some(info) = mappings.targets.get(target) else {
            warn!("Target {} not found in mappings, skipping", target);
            continue;
        };

        let collected = cell(row, &columns.sample_collect_date)?;
        let mut collected_parts = collected.split_whitespace();

        let mut record = shared.clone();
        record.insert("pcr_target_avg_conc", value.clone());
        for (field, value) in info.fields() {
            record.insert(field, value.to_string());
        }
        record.insert(
            "sample_collect_date",
            collected_parts.next().unwrap_or_default().to_string(),
        );
        record.insert(
            "sample_collect_time",
            collected_parts.next().unwrap_or_default().to_string(),
        );
        record.insert(
            "test_result_date",
            cell(row, &columns.test_result_date)?.to_string(),
        );
        records.push(record);
    }

    Ok(records)
}

/// Parse a results table into NWSS records
pub fn parse_results<P: AsRef<Path>>(input: P, mappings: &NwssMappings) -> Result<Vec<NwssRecord>> {
    let input = input.as_ref();
    debug!("Parsing results from {}", input.display());

    let mut results = Vec::new();
    for row in read_table(input, detect_delimiter(input), true)? {
        results.extend(process_row(&row, mappings)?);
    }
    Ok(results)
}

/// Write records as the NWSS upload CSV
pub fn write_results<W: Write>(writer: W, records: &[NwssRecord]) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);

    csv.write_record(NWSS_FIELDS)?;
    for record in records {
        csv.write_record(
            NWSS_FIELDS
                .iter()
                .map(|field| record.get(field).map_or("", String::as_str)),
        )?;
    }
    csv.flush()?;
    Ok(())
}
