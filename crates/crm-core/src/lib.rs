//! Core types for the crm-sync tools.
//!
//! This crate provides the foundational types shared by every other crate
//! in the workspace:
//!
//! - [`Record`] - An insertion-ordered row of named scalar fields
//! - [`FieldValue`] - A single scalar value inside a record
//! - [`Operation`] - The write operation applied to a set of records
//! - [`BulkError`] - Errors raised before or while a batch is sent
//!
//! # Architecture
//!
//! ```text
//! crm-core (this crate)
//!    │
//!    ├─── crm-bulk       (chunking, payloads, reconciliation, orchestration)
//!    ├─── crm-client     (REST dispatcher, auth, SOQL queries)
//!    └─── crm-sync-csv   (CSV input and result files)
//! ```
//!
//! # Example
//!
//! ```rust
//! use crm_core::{Operation, Record};
//!
//! let mut record = Record::new();
//! record.insert("Id", "001000000000001");
//! record.insert("Name", "Acme");
//!
//! assert!(Operation::Update.required_field(None).is_some());
//! assert!(record.contains(Operation::ID_FIELD));
//! ```

pub mod error;
pub mod operation;
pub mod record;

pub use error::BulkError;
pub use operation::{is_api_name, Operation};
pub use record::{FieldValue, Record};
