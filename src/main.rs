//! Command-line interface for crm-sync
//!
//! # Usage Examples
//!
//! ## Upload
//! ```bash
//! # Insert with interactive field mapping
//! crm-sync upload data/accounts.csv Account
//!
//! # Update records by Id, columns already named after CRM fields
//! crm-sync upload data/accounts.csv Account --operation update --no-mapping
//!
//! # Upsert by external id in batches of 100
//! crm-sync upload data/accounts.csv Account \
//!   --operation upsert --external-id-field External_Id__c \
//!   --batch-size 100 --mapping-file mapping.yaml
//!
//! # Build the payloads without sending them
//! crm-sync upload data/accounts.csv Account --no-mapping --dry-run
//! ```
//!
//! ## Query
//! ```bash
//! crm-sync query "SELECT Id, Name FROM Account" exports/accounts.csv
//! ```
//!
//! ## Authentication
//! Either an existing session (`SALESFORCE_INSTANCE_URL` +
//! `SALESFORCE_ACCESS_TOKEN`) or the password flow (`SALESFORCE_USERNAME`,
//! `SALESFORCE_PASSWORD`, `SALESFORCE_SECURITY_TOKEN`, `SALESFORCE_CLIENT_ID`,
//! `SALESFORCE_CLIENT_SECRET`). A `.env` file in the working directory is
//! loaded first.

use anyhow::Context;
use clap::{Parser, Subcommand};
use crm_client::RestClient;
use crm_core::Operation;
use crm_sync::config::AppConfig;
use crm_sync::upload::{run_upload, MappingMode, UploadArgs};
use crm_sync::{logging, query, CrmOpts};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "crm-sync")]
#[command(about = "Bulk CSV uploads and SOQL exports for Salesforce")]
#[command(long_about = None)]
struct Cli {
    /// Path to the YAML config file (default: config/config.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a CSV file with insert, update, delete or upsert
    Upload {
        /// CSV file to upload
        csv_file: PathBuf,

        /// Target object type (e.g. Account, Contact)
        object_name: String,

        /// Operation to perform: insert, update, delete or upsert
        #[arg(long, default_value = "insert")]
        operation: Operation,

        /// External ID field (required for upsert)
        #[arg(long)]
        external_id_field: Option<String>,

        /// Records per API call (default from config, at most 200)
        #[arg(long)]
        batch_size: Option<usize>,

        /// YAML file of `csv_column: CrmField` pairs instead of prompting
        #[arg(long, value_name = "PATH", conflicts_with = "no_mapping")]
        mapping_file: Option<PathBuf>,

        /// Upload every column under its own name
        #[arg(long)]
        no_mapping: bool,

        /// Directory for result files (default from config)
        #[arg(long, value_name = "DIR")]
        results_dir: Option<PathBuf>,

        /// Build the payloads without sending anything
        #[arg(long)]
        dry_run: bool,

        /// Connection options
        #[command(flatten)]
        crm: CrmOpts,
    },

    /// Run a SOQL query and export the results to CSV
    Query {
        /// SOQL query string
        soql: String,

        /// Output CSV file
        output_file: PathBuf,

        /// Connection options
        #[command(flatten)]
        crm: CrmOpts,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("Failed to load .env file");
        }
    }

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    logging::init(&config.logging)?;

    match cli.command {
        Commands::Upload {
            csv_file,
            object_name,
            operation,
            external_id_field,
            batch_size,
            mapping_file,
            no_mapping,
            results_dir,
            dry_run,
            crm,
        } => {
            let mapping = match (mapping_file, no_mapping) {
                (Some(path), _) => MappingMode::File(path),
                (None, true) => MappingMode::AcceptAll,
                (None, false) => MappingMode::Interactive,
            };
            let args = UploadArgs {
                csv_file,
                object_name,
                operation,
                external_id_field,
                batch_size,
                mapping,
                results_dir,
                dry_run,
            };

            let summary = run_upload(&config, &crm, &args).await?;
            if let Some(files) = summary.result_files {
                tracing::info!(
                    "Upload finished: {} succeeded, {} failed in {} batches. Results: {}, {}",
                    summary.successes,
                    summary.failures,
                    summary.batches,
                    files.success_path.display(),
                    files.error_path.display()
                );
            }
        }
        Commands::Query {
            soql,
            output_file,
            crm,
        } => {
            let credentials = crm.credentials(&config.api.login_url)?;
            let client = RestClient::connect(&credentials, config.client_config()?).await?;
            query::run_query(&client, &soql, &output_file, config.delimiter()?).await?;
        }
    }

    Ok(())
}
