use crate::Result;
use indexmap::IndexMap;
use std::path::Path;
use tracing::debug;

/// One row of a delimited table, keyed by column name in file order
pub type TableRow = IndexMap<String, String>;

/// Pick a delimiter from the file extension: comma for `.csv`, tab otherwise
pub fn detect_delimiter<P: AsRef<Path>>(path: P) -> u8 {
    match path.as_ref().extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => b',',
        _ => b'\t',
    }
}

/// Parse a delimited file
///
/// Without a header the columns are keyed by their index (`"0"`, `"1"`, ...).
/// Short rows are padded with empty strings and cells past the header are
/// dropped.
pub fn read_table<P: AsRef<Path>>(path: P, delimiter: u8, has_header: bool) -> Result<Vec<TableRow>> {
    let path = path.as_ref();
    debug!(
        "Reading table from {} with delimiter {:?}",
        path.display(),
        delimiter as char
    );

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_header)
        .flexible(true)
        .from_path(path)?;

    let headers: Option<Vec<String>> = if has_header {
        Some(reader.headers()?.iter().map(str::to_string).collect())
    } else {
        None
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: TableRow = match &headers {
            Some(headers) => headers
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), record.get(i).unwrap_or("").to_string()))
                .collect(),
            None => record
                .iter()
                .enumerate()
                .map(|(i, value)| (i.to_string(), value.to_string()))
                .collect(),
        };
        rows.push(row);
    }

    Ok(rows)
}

/// Write rows to a delimited file, taking the header from the first row
pub fn write_table<P: AsRef<Path>>(path: P, rows: &[TableRow], delimiter: u8) -> Result<()> {
    let path = path.as_ref();
    debug!(
        "Writing table to {} with delimiter {:?}",
        path.display(),
        delimiter as char
    );

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(path)?;

    let Some(first) = rows.first() else {
        writer.flush()?;
        return Ok(());
    };

    writer.write_record(first.keys())?;
    if first.values().next().map_or(true, |v| v.is_empty()) {
        debug!("No values found, only writing the column headers");
    } else {
        for row in rows {
            writer.write_record(first.keys().map(|k| row.get(k).map_or("", String::as_str)))?;
        }
    }
    writer.flush()?;
    Ok(())
}
