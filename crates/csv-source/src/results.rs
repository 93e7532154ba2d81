//! Upload result files.
//!
//! Every upload produces two files under the results directory:
//!
//! - `upload_success_<timestamp>.csv`: record fields, `Result` = `Success`, `AssignedId`
//! - `upload_errors_<timestamp>.csv`: record fields, `Result` = `Error`, `Error`
//!
//! Both are written even when empty so a run always leaves a trace.
//!
//! An input column that shares a name with an outcome column (`Result`,
//! `AssignedId`, `Error`) is kept under [`INPUT_COLUMN_PREFIX`] + its name.

use crate::error::CsvError;
use crate::writer::{union_headers, write_file};
use chrono::NaiveDateTime;
use crm_bulk::{Failure, Success};
use crm_core::{FieldValue, Record};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Timestamp format used in result file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const SUCCESS_COLUMNS: [&str; 2] = ["Result", "AssignedId"];
const ERROR_COLUMNS: [&str; 2] = ["Result", "Error"];
const OUTCOME_COLUMNS: [&str; 3] = ["Result", "AssignedId", "Error"];

/// Prefix given to input columns named like an outcome column.
pub const INPUT_COLUMN_PREFIX: &str = "Input_";

/// Paths of the files written by [`write_upload_results`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFiles {
    pub success_path: PathBuf,
    pub error_path: PathBuf,
}

/// Write the success and error files for one upload into `dir`.
pub fn write_upload_results<P: AsRef<Path>>(
    dir: P,
    successes: &[Success],
    failures: &[Failure],
    delimiter: u8,
    timestamp: NaiveDateTime,
) -> Result<ResultFiles, CsvError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let stamp = timestamp.format(TIMESTAMP_FORMAT);

    let clashing: BTreeSet<&str> = successes
        .iter()
        .map(|s| &s.record)
        .chain(failures.iter().map(|f| &f.record))
        .flat_map(|record| record.keys())
        .filter(|name| OUTCOME_COLUMNS.contains(name))
        .collect();
    if !clashing.is_empty() {
        warn!(
            "Input columns {} clash with result columns; written as {}<name>",
            clashing.into_iter().collect::<Vec<_>>().join(", "),
            INPUT_COLUMN_PREFIX
        );
    }

    let success_rows: Vec<Record> = successes
        .iter()
        .map(|s| {
            let mut row = input_fields(&s.record);
            row.insert("Result", "Success");
            row.insert("AssignedId", s.assigned_id.clone());
            row
        })
        .collect();
    let success_path = dir.join(format!("upload_success_{stamp}.csv"));
    write_file(
        &success_path,
        &headers_for(&success_rows, &SUCCESS_COLUMNS),
        &success_rows,
        delimiter,
    )?;

    let error_rows: Vec<Record> = failures
        .iter()
        .map(|f| {
            let mut row = input_fields(&f.record);
            row.insert("Result", "Error");
            row.insert("Error", f.error_message.as_str());
            row
        })
        .collect();
    let error_path = dir.join(format!("upload_errors_{stamp}.csv"));
    write_file(
        &error_path,
        &headers_for(&error_rows, &ERROR_COLUMNS),
        &error_rows,
        delimiter,
    )?;

    info!(
        "Results saved to {} ({} rows) and {} ({} rows)",
        success_path.display(),
        success_rows.len(),
        error_path.display(),
        error_rows.len()
    );

    Ok(ResultFiles {
        success_path,
        error_path,
    })
}

/// Copy of `record` with outcome-named columns moved under the input prefix.
fn input_fields(record: &Record) -> Record {
    record
        .iter()
        .map(|(name, value)| {
            let name = if OUTCOME_COLUMNS.contains(&name) {
                format!("{INPUT_COLUMN_PREFIX}{name}")
            } else {
                name.to_string()
            };
            (name, FieldValue::clone(value))
        })
        .collect()
}

fn headers_for(rows: &[Record], result_columns: &[&str]) -> Vec<String> {
    if rows.is_empty() {
        result_columns.iter().map(|c| c.to_string()).collect()
    } else {
        union_headers(rows)
    }
}
