//! Error types for CSV input and output.

use thiserror::Error;

/// Errors that can occur while reading or writing CSV files.
#[derive(Error, Debug)]
pub enum CsvError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The configured input encoding is not recognised.
    #[error("Unknown CSV encoding: '{0}'")]
    UnknownEncoding(String),

    /// The file has no header row and no column names were supplied.
    #[error("CSV input has no header row and no column names were provided")]
    MissingHeaders,

    /// A data row does not match the header width.
    #[error("Column count mismatch in CSV row {row}: expected {expected} columns ({columns}), but found {found} columns")]
    ColumnCount {
        /// 1-based data row number
        row: usize,
        expected: usize,
        found: usize,
        columns: String,
    },
}
