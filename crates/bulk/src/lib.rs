//! Batched bulk-operation engine.
//!
//! This crate splits a record set into API-sized batches, builds the wire
//! payload for each batch, hands it to a [`CollectionDispatcher`] and
//! reconciles the per-record responses back to the input records.
//!
//! ```text
//! records ──chunk──▶ batches ──build_payload──▶ Payload ──dispatch──▶ responses
//!                        │                                               │
//!                        └──────────────────reconcile◀───────────────────┘
//!                                               │
//!                                   successes / failures
//! ```
//!
//! The dispatcher is a trait so the orchestrator stays independent of the
//! transport; `crm-client` provides the REST implementation.

mod chunk;
mod config;
mod dispatch;
mod orchestrator;
mod payload;
mod reconcile;

pub use chunk::chunk;
pub use config::{BulkConfig, MismatchPolicy, MAX_COLLECTION_SIZE};
pub use dispatch::{CollectionDispatcher, RawResponse};
pub use orchestrator::{BulkOrchestrator, BulkRequest, OrchestrationError, OrchestrationResult};
pub use payload::{build_payload, Attributes, Payload, WireRecord};
pub use reconcile::{
    classify, reconcile, Failure, Reconciled, ResultEntry, Success, UNMATCHED_RECORD_MESSAGE,
};

// Re-export core types for convenience
pub use crm_core::{BulkError, FieldValue, Operation, Record};
