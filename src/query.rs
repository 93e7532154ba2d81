//! The `query` command: SOQL results to a CSV file.

use anyhow::{Context, Result};
use crm_client::RestClient;
use crm_core::Record;
use crm_sync_csv::write_records;
use std::path::Path;
use tracing::{info, warn};

/// Run `soql` and write the records to `output`.
///
/// Returns the number of rows written. Nothing is written when the query
/// matches no records.
pub async fn run_query(client: &RestClient, soql: &str, output: &Path, delimiter: u8) -> Result<usize> {
    let records = client
        .query_all(soql)
        .await
        .context("Failed to execute query")?;
    export_records(&records, output, delimiter)
}

/// Write query results to `output`, creating parent directories.
pub fn export_records(records: &[Record], output: &Path, delimiter: u8) -> Result<usize> {
    if records.is_empty() {
        warn!("Query returned no records; {} not written", output.display());
        return Ok(0);
    }

    let written = write_records(output, records, delimiter)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Successfully wrote {written} records to {}", output.display());
    Ok(written)
}
