//! CSV input and output for crm-sync
//!
//! Reads upload input into [`crm_core::Record`]s, writes query exports and
//! writes the per-upload success and error result files.

mod error;
mod reader;
mod results;
mod writer;

pub use error::CsvError;
pub use reader::{
    is_known_encoding, read_records, read_records_from, CsvOptions, DEFAULT_ENCODING,
};
pub use results::{write_upload_results, ResultFiles, INPUT_COLUMN_PREFIX, TIMESTAMP_FORMAT};
pub use writer::{union_headers, write_records, DEFAULT_BUFFER_SIZE};
