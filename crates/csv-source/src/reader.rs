//! CSV input.

use crate::error::CsvError;
use crm_core::{FieldValue, Record};
use encoding_rs::Encoding;
use encoding_rs_io::DecodeReaderBytesBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Encoding assumed for input files unless configured otherwise.
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Whether `label` names an encoding the reader can decode.
pub fn is_known_encoding(label: &str) -> bool {
    Encoding::for_label(label.trim().as_bytes()).is_some()
}

/// Options for reading a CSV file into records.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Whether the first row is a header row (default: true)
    pub has_headers: bool,

    /// CSV delimiter character (default: ',')
    pub delimiter: u8,

    /// Column names to use instead of the header row.
    /// Required when `has_headers` is false; the width must match every row.
    pub column_names: Option<Vec<String>>,

    /// Input encoding label (default: `utf-8`); decoded to UTF-8 before parsing
    pub encoding: String,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_headers: true,
            delimiter: b',',
            column_names: None,
            encoding: DEFAULT_ENCODING.to_string(),
        }
    }
}

impl CsvOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }
}

/// Read every row of the file at `path` as a [`Record`].
///
/// Field order follows the column order and every value is text.
pub fn read_records<P: AsRef<Path>>(path: P, options: &CsvOptions) -> Result<Vec<Record>, CsvError> {
    let path = path.as_ref();
    info!("Reading CSV file: {}", path.display());

    let file = File::open(path)?;
    let records = read_records_from(file, options)?;

    info!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Same as [`read_records`] for any reader.
pub fn read_records_from<R: Read>(reader: R, options: &CsvOptions) -> Result<Vec<Record>, CsvError> {
    let encoding = Encoding::for_label(options.encoding.trim().as_bytes())
        .ok_or_else(|| CsvError::UnknownEncoding(options.encoding.clone()))?;
    debug!("Decoding CSV input as {}", encoding.name());
    let decoded = DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .build(reader);

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(options.has_headers)
        .delimiter(options.delimiter)
        .flexible(true)
        .from_reader(decoded);

    let headers: Vec<String> = match (&options.column_names, options.has_headers) {
        (Some(column_names), _) => column_names.clone(),
        (None, true) => csv_reader.headers()?.iter().map(str::to_string).collect(),
        (None, false) => return Err(CsvError::MissingHeaders),
    };
    debug!("CSV columns: {}", headers.join(", "));

    let mut records = Vec::new();
    for (index, row) in csv_reader.records().enumerate() {
        let row = row?;
        if row.len() != headers.len() {
            return Err(CsvError::ColumnCount {
                row: index + 1,
                expected: headers.len(),
                found: row.len(),
                columns: headers.join(", "),
            });
        }

        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(name, value)| (name.as_str(), FieldValue::Text(value.to_string())))
            .collect();
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = CsvOptions::default();
        assert!(options.has_headers);
        assert_eq!(options.delimiter, b',');
        assert!(options.column_names.is_none());
        assert_eq!(options.encoding, "utf-8");
    }

    #[test]
    fn test_read_windows_1252_input() {
        let data: &[u8] = b"Name,City\nCaf\xe9 Noir,M\xfcnchen\n";
        let options = CsvOptions::default().with_encoding("windows-1252");
        let records = read_records_from(data, &options).unwrap();

        assert_eq!(records[0].get("Name").unwrap().to_text(), "Caf\u{e9} Noir");
        assert_eq!(records[0].get("City").unwrap().to_text(), "M\u{fc}nchen");
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let data = "\u{feff}Name\nAcme\n";
        let records = read_records_from(data.as_bytes(), &CsvOptions::default()).unwrap();
        assert_eq!(records[0].keys().collect::<Vec<_>>(), vec!["Name"]);
    }

    #[test]
    fn test_unknown_encoding() {
        let options = CsvOptions::default().with_encoding("klingon");
        let err = read_records_from("Name\n".as_bytes(), &options).unwrap_err();
        assert!(matches!(err, CsvError::UnknownEncoding(_)));
        assert!(!is_known_encoding("klingon"));
        assert!(is_known_encoding("latin1"));
    }

    #[test]
    fn test_read_with_headers() {
        let data = "Name,Phone,Employees\nAcme,555-0100,25\nGlobex,,7\n";
        let records = read_records_from(data.as_bytes(), &CsvOptions::default()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].keys().collect::<Vec<_>>(),
            vec!["Name", "Phone", "Employees"]
        );
        assert_eq!(records[0].get("Employees"), Some(&FieldValue::Text("25".into())));
        assert_eq!(records[1].get("Phone"), Some(&FieldValue::Text(String::new())));
    }

    #[test]
    fn test_read_quoted_values_and_delimiter() {
        let data = "Name;Description\n\"Acme; Inc\";\"said \"\"hi\"\"\"\n";
        let options = CsvOptions::default().with_delimiter(b';');
        let records = read_records_from(data.as_bytes(), &options).unwrap();

        assert_eq!(records[0].get("Name").unwrap().to_text(), "Acme; Inc");
        assert_eq!(records[0].get("Description").unwrap().to_text(), "said \"hi\"");
    }

    #[test]
    fn test_read_with_column_names() {
        let data = "Acme,25\nGlobex,7\n";
        let options = CsvOptions {
            has_headers: false,
            column_names: Some(vec!["Name".into(), "Employees".into()]),
            ..Default::default()
        };
        let records = read_records_from(data.as_bytes(), &options).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("Name").unwrap().to_text(), "Globex");
    }

    #[test]
    fn test_missing_headers() {
        let options = CsvOptions {
            has_headers: false,
            ..Default::default()
        };
        let err = read_records_from("a,b\n".as_bytes(), &options).unwrap_err();
        assert!(matches!(err, CsvError::MissingHeaders));
    }

    #[test]
    fn test_column_count_mismatch_names_row() {
        let data = "Name,Phone\nAcme,1\nGlobex\n";
        let err = read_records_from(data.as_bytes(), &CsvOptions::default()).unwrap_err();

        match err {
            CsvError::ColumnCount {
                row,
                expected,
                found,
                ..
            } => {
                assert_eq!(row, 2);
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_header_only_file() {
        let records = read_records_from("Name,Phone\n".as_bytes(), &CsvOptions::default()).unwrap();
        assert!(records.is_empty());
    }
}
