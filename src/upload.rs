//! The `upload` command: CSV file to bulk operation to result files.

use crate::config::AppConfig;
use crate::mapping::{mapping_for_records, AcceptAll, PresetAnswers, TerminalAnswers};
use crate::CrmOpts;
use anyhow::{Context, Result};
use crm_bulk::{
    BulkOrchestrator, BulkRequest, CollectionDispatcher, OrchestrationResult, Payload,
    RawResponse,
};
use crm_client::RestClient;
use crm_core::{BulkError, Operation, Record};
use crm_sync_csv::{read_records, write_upload_results, ResultFiles};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Where field mapping answers come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingMode {
    /// Prompt on the terminal for every field
    Interactive,
    /// Read `source: target` pairs from a YAML file
    File(PathBuf),
    /// Upload every column under its own name
    AcceptAll,
}

/// Inputs of one upload run.
#[derive(Debug, Clone)]
pub struct UploadArgs {
    pub csv_file: PathBuf,
    pub object_name: String,
    pub operation: Operation,
    pub external_id_field: Option<String>,
    pub batch_size: Option<usize>,
    pub mapping: MappingMode,
    /// Overrides `csv.results_directory`
    pub results_dir: Option<PathBuf>,
    pub dry_run: bool,
}

impl UploadArgs {
    pub fn request(&self) -> BulkRequest {
        BulkRequest {
            object_name: self.object_name.clone(),
            operation: self.operation,
            external_id_field: self.external_id_field.clone(),
            batch_size: self.batch_size,
        }
    }
}

/// Counts reported at the end of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub successes: usize,
    pub failures: usize,
    pub batches: usize,
    /// `None` for dry runs
    pub result_files: Option<ResultFiles>,
}

/// Run the `upload` command end to end.
pub async fn run_upload(config: &AppConfig, opts: &CrmOpts, args: &UploadArgs) -> Result<UploadSummary> {
    let bulk_config = config.bulk_config()?;
    let client_config = config.client_config()?;
    let csv_options = config.csv_options()?;
    let delimiter = csv_options.delimiter;
    let request = args.request();

    // Request-level checks run before any prompt or login
    let planner = BulkOrchestrator::new(Offline, bulk_config.clone());
    planner.validate(&request)?;
    let credentials = if args.dry_run {
        None
    } else {
        Some(opts.credentials(&config.api.login_url)?)
    };

    let records = read_records(&args.csv_file, &csv_options)
        .with_context(|| format!("Failed to read CSV file {}", args.csv_file.display()))?;
    info!("Read {} records from {}", records.len(), args.csv_file.display());

    let records = map_fields(&records, &args.mapping)?;

    let Some(credentials) = credentials else {
        return dry_run(&planner, &records, &request);
    };

    let client = RestClient::connect(&credentials, client_config).await?;
    let orchestrator = BulkOrchestrator::new(client, bulk_config);

    let results_dir = args
        .results_dir
        .clone()
        .unwrap_or_else(|| config.csv.results_directory.clone());

    upload_records(&orchestrator, &records, &request, &results_dir, delimiter).await
}

/// Apply the configured field mapping to `records`.
pub fn map_fields(records: &[Record], mode: &MappingMode) -> Result<Vec<Record>> {
    let mapping = match mode {
        MappingMode::Interactive => {
            info!("Starting interactive field mapping...");
            mapping_for_records(records, &mut TerminalAnswers::stdio())?
        }
        MappingMode::File(path) => {
            let mut answers = PresetAnswers::from_file(path)?;
            mapping_for_records(records, &mut answers)?
        }
        MappingMode::AcceptAll => mapping_for_records(records, &mut AcceptAll)?,
    };

    if mapping.is_empty() && !records.is_empty() {
        warn!("No fields mapped; records will be sent without data fields");
    }
    Ok(mapping.apply(records))
}

/// Run `request` through `orchestrator` and write the result files.
///
/// When the run aborts, results of the batches that completed are still
/// written before the error is returned.
pub async fn upload_records<D: CollectionDispatcher>(
    orchestrator: &BulkOrchestrator<D>,
    records: &[Record],
    request: &BulkRequest,
    results_dir: &Path,
    delimiter: u8,
) -> Result<UploadSummary> {
    let timestamp = chrono::Local::now().naive_local();

    match orchestrator.run(records, request).await {
        Ok(result) => {
            info!("Operation '{}' completed.", request.operation);
            info!("  Successful records: {}", result.successes.len());
            info!("  Failed records:     {}", result.failures.len());

            let files = write_upload_results(
                results_dir,
                &result.successes,
                &result.failures,
                delimiter,
                timestamp,
            )
            .context("Failed to write upload results")?;

            Ok(summary(&result, Some(files)))
        }
        Err(err) => {
            error!("{err}");
            let completed = &err.completed;
            if completed.batches_dispatched > 0 {
                warn!(
                    "Writing results for {} completed batches ({} records)",
                    completed.batches_dispatched,
                    completed.total()
                );
                write_upload_results(
                    results_dir,
                    &completed.successes,
                    &completed.failures,
                    delimiter,
                    timestamp,
                )
                .context("Failed to write partial upload results")?;
            }
            Err(err.into())
        }
    }
}

/// Build every payload without sending anything.
pub fn dry_run<D: CollectionDispatcher>(
    orchestrator: &BulkOrchestrator<D>,
    records: &[Record],
    request: &BulkRequest,
) -> Result<UploadSummary> {
    let payloads = orchestrator.plan(records, request)?;

    warn!(
        "Dry run: {} of {} records into {} would be sent in {} batches",
        request.operation,
        records.len(),
        request.object_name,
        payloads.len()
    );
    for (index, payload) in payloads.iter().enumerate() {
        debug!(
            "Batch {}: {} records{}",
            index + 1,
            payload.len(),
            preview(payload)
        );
    }

    Ok(UploadSummary {
        successes: 0,
        failures: 0,
        batches: payloads.len(),
        result_files: None,
    })
}

fn preview(payload: &Payload) -> String {
    payload
        .records
        .first()
        .and_then(|first| serde_json::to_string(first).ok())
        .map(|json| format!(", first: {json}"))
        .unwrap_or_default()
}

fn summary(result: &OrchestrationResult, result_files: Option<ResultFiles>) -> UploadSummary {
    UploadSummary {
        successes: result.successes.len(),
        failures: result.failures.len(),
        batches: result.batches_dispatched,
        result_files,
    }
}

/// Dispatcher for dry runs; planning never dispatches.
struct Offline;

#[async_trait::async_trait]
impl CollectionDispatcher for Offline {
    async fn dispatch(
        &self,
        _payload: &Payload,
        _operation: Operation,
    ) -> Result<Vec<RawResponse>, BulkError> {
        Err(BulkError::configuration("Dispatch is disabled during a dry run"))
    }
}
