//! Batch orchestration: chunk, build, dispatch and reconcile every batch.

use crate::chunk::chunk;
use crate::config::BulkConfig;
use crate::dispatch::CollectionDispatcher;
use crate::payload::{build_payload, Payload};
use crate::reconcile::{reconcile, Failure, Success};
use crm_core::{is_api_name, BulkError, Operation, Record};
use tracing::{debug, info, warn};

/// What to do with a record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkRequest {
    /// Target object type (e.g. `Account`)
    pub object_name: String,

    pub operation: Operation,

    /// Required for upsert, ignored otherwise
    pub external_id_field: Option<String>,

    /// Overrides [`BulkConfig::batch_size`] when set
    pub batch_size: Option<usize>,
}

impl BulkRequest {
    pub fn new(object_name: impl Into<String>, operation: Operation) -> Self {
        Self {
            object_name: object_name.into(),
            operation,
            external_id_field: None,
            batch_size: None,
        }
    }

    pub fn with_external_id_field(mut self, field: impl Into<String>) -> Self {
        self.external_id_field = Some(field.into());
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }
}

/// Accumulated outcome of a run, in batch-then-position order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrchestrationResult {
    pub successes: Vec<Success>,
    pub failures: Vec<Failure>,
    pub batches_dispatched: usize,
}

impl OrchestrationResult {
    /// Number of records with a known outcome.
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }
}

/// A run aborted by a build or dispatch error.
///
/// `completed` holds the results of the batches that finished before batch
/// `batch`; nothing from the failing batch or later ones is included. No
/// rollback of completed batches is attempted.
#[derive(Debug, thiserror::Error)]
#[error("{}", abort_message(.batch))]
pub struct OrchestrationError {
    /// 1-based number of the failing batch (0 when rejected before chunking)
    pub batch: usize,

    pub completed: OrchestrationResult,

    #[source]
    pub source: BulkError,
}

fn abort_message(batch: &usize) -> String {
    if *batch == 0 {
        "Bulk request rejected before dispatch".to_string()
    } else {
        format!("Bulk operation aborted at batch {batch}")
    }
}

impl OrchestrationError {
    fn preflight(source: BulkError) -> Self {
        Self {
            batch: 0,
            completed: OrchestrationResult::default(),
            source,
        }
    }
}

/// Drives chunking, payload construction, dispatch and reconciliation.
///
/// Batches are processed strictly one at a time, in order.
pub struct BulkOrchestrator<D> {
    dispatcher: D,
    config: BulkConfig,
}

impl<D: CollectionDispatcher> BulkOrchestrator<D> {
    pub fn new(dispatcher: D, config: BulkConfig) -> Self {
        Self { dispatcher, config }
    }

    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Reject `request` without touching records or the network.
    ///
    /// Returns the effective batch size. [`Self::run`] and [`Self::plan`]
    /// perform the same checks.
    pub fn validate(&self, request: &BulkRequest) -> Result<usize, OrchestrationError> {
        self.preflight(request).map_err(OrchestrationError::preflight)
    }

    /// Run `request` over every record.
    ///
    /// Per-record rejections are collected as failures and never abort the
    /// run. A build or dispatch error aborts immediately.
    pub async fn run(
        &self,
        records: &[Record],
        request: &BulkRequest,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        let batch_size = self
            .preflight(request)
            .map_err(OrchestrationError::preflight)?;
        let batches = chunk(records, batch_size).map_err(OrchestrationError::preflight)?;
        let total_batches = batches.len();

        info!(
            "Starting {} of {} records into {} ({} batches of up to {})",
            request.operation,
            records.len(),
            request.object_name,
            total_batches,
            batch_size
        );

        let mut result = OrchestrationResult::default();

        for (index, batch) in batches.into_iter().enumerate() {
            let number = index + 1;
            info!(
                "Processing batch {number}/{total_batches} with {} records (operation = {})",
                batch.len(),
                request.operation
            );

            let outcome = self.process_batch(batch, request).await;
            let reconciled = match outcome {
                Ok(reconciled) => reconciled,
                Err(source) => {
                    warn!("Batch {number}/{total_batches} aborted the run: {source}");
                    return Err(OrchestrationError {
                        batch: number,
                        completed: result,
                        source,
                    });
                }
            };

            debug!(
                "Batch {number}: {} succeeded, {} failed, {} unmatched",
                reconciled.successes.len(),
                reconciled.failures.len(),
                reconciled.unmatched
            );

            result.successes.extend(reconciled.successes);
            result.failures.extend(reconciled.failures);
            result.batches_dispatched += 1;
        }

        info!(
            "Completed {}: {} succeeded, {} failed",
            request.operation,
            result.successes.len(),
            result.failures.len()
        );

        Ok(result)
    }

    /// Build every payload without dispatching anything.
    pub fn plan(
        &self,
        records: &[Record],
        request: &BulkRequest,
    ) -> Result<Vec<Payload>, OrchestrationError> {
        let batch_size = self
            .preflight(request)
            .map_err(OrchestrationError::preflight)?;
        chunk(records, batch_size)
            .map_err(OrchestrationError::preflight)?
            .into_iter()
            .enumerate()
            .map(|(index, batch)| {
                self.build(batch, request)
                    .map_err(|source| OrchestrationError {
                        batch: index + 1,
                        completed: OrchestrationResult::default(),
                        source,
                    })
            })
            .collect()
    }

    async fn process_batch(
        &self,
        batch: &[Record],
        request: &BulkRequest,
    ) -> Result<crate::reconcile::Reconciled, BulkError> {
        let payload = self.build(batch, request)?;
        let responses = self
            .dispatcher
            .dispatch(&payload, request.operation)
            .await?;
        Ok(reconcile(batch, &responses, self.config.mismatch_policy))
    }

    fn build(&self, batch: &[Record], request: &BulkRequest) -> Result<Payload, BulkError> {
        build_payload(
            batch,
            &request.object_name,
            request.operation,
            request.external_id_field.as_deref(),
        )
    }

    /// Checks that need no records and no network. Returns the batch size.
    fn preflight(&self, request: &BulkRequest) -> Result<usize, BulkError> {
        if request.object_name.trim().is_empty() {
            return Err(BulkError::invalid_argument("Object name must not be empty"));
        }
        if !is_api_name(&request.object_name) {
            return Err(BulkError::invalid_argument(format!(
                "Invalid object name '{}': only letters, digits and '_' are allowed",
                request.object_name
            )));
        }

        let batch_size = request.batch_size.unwrap_or(self.config.batch_size);
        if batch_size == 0 {
            return Err(BulkError::invalid_argument(
                "Batch size must be a positive integer",
            ));
        }
        if batch_size > self.config.max_batch_size {
            return Err(BulkError::invalid_argument(format!(
                "Batch size {batch_size} exceeds the maximum of {} records per call",
                self.config.max_batch_size
            )));
        }

        if request.operation == Operation::Upsert
            && !request
                .external_id_field
                .as_deref()
                .is_some_and(|f| !f.trim().is_empty())
        {
            return Err(BulkError::configuration(
                "An external ID field must be specified for upsert",
            ));
        }
        if let Some(field) = request
            .external_id_field
            .as_deref()
            .filter(|_| request.operation == Operation::Upsert)
        {
            if !is_api_name(field) {
                return Err(BulkError::configuration(format!(
                    "Invalid external ID field '{field}': only letters, digits and '_' are allowed"
                )));
            }
        }

        Ok(batch_size)
    }
}
