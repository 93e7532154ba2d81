//! SOQL query execution.

use crate::rest::{describe_error_body, RestClient};
use anyhow::{Context, Result};
use crm_core::{FieldValue, Record};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryPage {
    #[serde(default)]
    total_size: Option<u64>,
    done: bool,
    #[serde(default)]
    next_records_url: Option<String>,
    records: Vec<Value>,
}

impl RestClient {
    /// Run `soql` and return every matching record, following pagination.
    pub async fn query_all(&self, soql: &str) -> Result<Vec<Record>> {
        let url = self.data_url("/query");
        info!("Executing query: {soql}");

        let mut page = self
            .fetch_page(self.get(&url).query(&[("q", soql)]), &url)
            .await?;
        if let Some(total) = page.total_size {
            debug!("Query matched {total} records");
        }

        let mut records: Vec<Record> = Vec::new();
        loop {
            records.extend(page.records.into_iter().map(flatten_record));

            match (page.done, page.next_records_url) {
                (false, Some(next)) => {
                    let next_url = self.instance_url(&next);
                    debug!("Fetching next page: {next_url}");
                    page = self.fetch_page(self.get(&next_url), &next_url).await?;
                }
                _ => break,
            }
        }

        info!("Retrieved {} records", records.len());
        Ok(records)
    }

    async fn fetch_page(&self, request: reqwest::RequestBuilder, url: &str) -> Result<QueryPage> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Query request failed: {url}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read query response from: {url}"))?;

        if !status.is_success() {
            anyhow::bail!("Query failed ({status}): {}", describe_error_body(&body));
        }

        serde_json::from_str(&body).context("Failed to parse query response")
    }
}

/// Convert one query result into a flat [`Record`].
///
/// The `attributes` metadata is dropped and nested relationship objects
/// become dotted field names (`Account.Name`). Arrays and child
/// sub-query results are kept as JSON text.
pub fn flatten_record(value: Value) -> Record {
    let mut record = Record::new();
    match value {
        Value::Object(fields) => flatten_into(&mut record, "", fields),
        other => {
            record.insert("value", FieldValue::from_json(other));
        }
    }
    record
}

fn flatten_into(record: &mut Record, prefix: &str, fields: Map<String, Value>) {
    for (name, value) in fields {
        if name == "attributes" {
            continue;
        }
        let key = format!("{prefix}{name}");
        match value {
            Value::Object(nested) if !is_subquery(&nested) => {
                flatten_into(record, &format!("{key}."), nested);
            }
            other => {
                record.insert(key, FieldValue::from_json(other));
            }
        }
    }
}

fn is_subquery(object: &Map<String, Value>) -> bool {
    object.contains_key("records") && object.contains_key("totalSize")
}
