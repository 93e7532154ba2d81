//! CSV output.

use crate::error::CsvError;
use crm_core::Record;
use csv::Writer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Default buffer size for CSV writing.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Field names across `records` in first-seen order.
pub fn union_headers<'a, I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut headers: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !headers.iter().any(|h| h == key) {
                headers.push(key.to_string());
            }
        }
    }
    headers
}

/// Write `records` to `path`, creating parent directories.
///
/// The header is the union of all field names; missing fields and nulls are
/// written as empty cells. Returns the number of rows written.
pub fn write_records<P: AsRef<Path>>(
    path: P,
    records: &[Record],
    delimiter: u8,
) -> Result<usize, CsvError> {
    let path = path.as_ref();
    let headers = union_headers(records);
    let rows = write_file(path, &headers, records, delimiter)?;
    info!("Wrote {rows} records to {}", path.display());
    Ok(rows)
}

pub(crate) fn write_file(
    path: &Path,
    headers: &[String],
    records: &[Record],
    delimiter: u8,
) -> Result<usize, CsvError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    write_to(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file), headers, records, delimiter)
}

fn write_to<W: Write>(
    out: W,
    headers: &[String],
    records: &[Record],
    delimiter: u8,
) -> Result<usize, CsvError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(out);

    if !headers.is_empty() {
        writer.write_record(headers)?;
    }
    for record in records {
        writer.write_record(row(headers, record))?;
    }

    flush(writer)?;
    Ok(records.len())
}

fn row(headers: &[String], record: &Record) -> Vec<String> {
    headers
        .iter()
        .map(|h| record.get(h).map(|v| v.to_text()).unwrap_or_default())
        .collect()
}

fn flush<W: Write>(mut writer: Writer<W>) -> Result<(), CsvError> {
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| CsvError::Io(std::io::Error::other(e.to_string())))?;
    Ok(())
}
