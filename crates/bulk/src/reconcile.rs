//! Reconciliation of per-record responses against the batch that produced them.
//!
//! Responses are paired with records by position. Each response is read
//! leniently since its exact shape belongs to the remote API:
//!
//! ```json
//! [
//!   { "id": "001...", "success": true,  "errors": [] },
//!   { "id": null,     "success": false, "errors": [{ "statusCode": "REQUIRED_FIELD_MISSING", "message": "..." }] }
//! ]
//! ```

use crate::config::MismatchPolicy;
use crate::dispatch::RawResponse;
use crm_core::Record;
use serde_json::Value;
use tracing::warn;

/// Message recorded for batch records that received no response.
pub const UNMATCHED_RECORD_MESSAGE: &str = "no response returned for record";

/// A record accepted by the remote store.
#[derive(Debug, Clone, PartialEq)]
pub struct Success {
    pub record: Record,
    /// Identifier reported by the store (created, updated or deleted id)
    pub assigned_id: Option<String>,
}

/// A record rejected by the remote store.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub record: Record,
    /// All error messages of the response joined with `"; "`
    pub error_message: String,
}

/// Outcome for one record of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultEntry {
    Success(Success),
    Failure(Failure),
}

/// Successes and failures of one batch, each in batch order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    pub successes: Vec<Success>,
    pub failures: Vec<Failure>,
    /// Batch records beyond the end of the response list
    pub unmatched: usize,
}

/// Classify a single response for `record`.
///
/// A response is a success only when its `success` flag is `true`.
pub fn classify(record: &Record, response: &RawResponse) -> ResultEntry {
    if response.get("success").and_then(Value::as_bool) == Some(true) {
        ResultEntry::Success(Success {
            record: record.clone(),
            assigned_id: response.get("id").and_then(id_text),
        })
    } else {
        ResultEntry::Failure(Failure {
            record: record.clone(),
            error_message: error_message(response),
        })
    }
}

/// Pair `batch[i]` with `responses[i]` and sort the outcomes.
///
/// A count mismatch is logged and never fails. Only the overlapping prefix
/// is classified; trailing records are dropped or failed per `policy`.
pub fn reconcile(batch: &[Record], responses: &[RawResponse], policy: MismatchPolicy) -> Reconciled {
    let mut reconciled = Reconciled::default();

    if responses.len() != batch.len() {
        warn!(
            "Response count ({}) does not match request count ({}); reconciling the first {} records ({} policy)",
            responses.len(),
            batch.len(),
            responses.len().min(batch.len()),
            policy
        );
    }

    for (record, response) in batch.iter().zip(responses) {
        match classify(record, response) {
            ResultEntry::Success(success) => reconciled.successes.push(success),
            ResultEntry::Failure(failure) => reconciled.failures.push(failure),
        }
    }

    let unmatched = batch.get(responses.len()..).unwrap_or_default();
    reconciled.unmatched = unmatched.len();
    if policy == MismatchPolicy::FailUnmatched {
        reconciled
            .failures
            .extend(unmatched.iter().map(|record| Failure {
                record: record.clone(),
                error_message: UNMATCHED_RECORD_MESSAGE.to_string(),
            }));
    }

    reconciled
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn error_message(response: &Value) -> String {
    match response.get("errors") {
        Some(Value::Array(errors)) => errors
            .iter()
            .filter_map(|error| match error {
                Value::String(s) => Some(s.clone()),
                Value::Object(_) => error
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ => response
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}
