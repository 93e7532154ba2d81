//! File-level tests for reading input and writing exports.

use crm_core::FieldValue;
use crm_sync_csv::{read_records, write_records, CsvError, CsvOptions};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_read_file_from_disk() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Name,Industry,AnnualRevenue").unwrap();
    writeln!(file, "Acme,Manufacturing,1000000").unwrap();
    writeln!(file, "\"Globex, Corp\",Energy,").unwrap();
    file.flush().unwrap();

    let records = read_records(file.path(), &CsvOptions::default()).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[1].get("Name").unwrap().to_text(), "Globex, Corp");
    assert_eq!(
        records[0].get("AnnualRevenue"),
        Some(&FieldValue::Text("1000000".to_string()))
    );
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_records(dir.path().join("missing.csv"), &CsvOptions::default()).unwrap_err();
    assert!(matches!(err, CsvError::Io(_)));
}

#[test]
fn test_export_then_reimport() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exports").join("contacts.csv");

    let mut first = crm_core::Record::new();
    first.insert("Id", "003A");
    first.insert("Account.Name", "Acme");
    first.insert("IsActive", true);
    let mut second = crm_core::Record::new();
    second.insert("Id", "003B");
    second.insert("Email", "b@example.com");

    let written = write_records(&path, &[first, second], b',').unwrap();
    assert_eq!(written, 2);

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        contents,
        "Id,Account.Name,IsActive,Email\n003A,Acme,true,\n003B,,,b@example.com\n"
    );

    let records = read_records(&path, &CsvOptions::default()).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].get("Email").unwrap().to_text(), "b@example.com");
    assert_eq!(records[1].get("Account.Name").unwrap().to_text(), "");
}
