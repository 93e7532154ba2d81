//! REST client for the CRM record store.
//!
//! This crate provides the network side of crm-sync:
//!
//! - **Authentication**: reuse an access token or log in with the OAuth 2.0
//!   username-password flow
//! - **Collections dispatch**: [`RestClient`] implements
//!   [`crm_bulk::CollectionDispatcher`] over the sObject Collections
//!   endpoint, one HTTP call per batch
//! - **Queries**: SOQL execution with pagination, flattened into records
//!
//! # Example
//!
//! ```ignore
//! use crm_bulk::{BulkConfig, BulkOrchestrator, BulkRequest, Operation};
//! use crm_client::{ClientConfig, Credentials, RestClient, Session};
//!
//! let credentials = Credentials::AccessToken(Session::new(instance_url, token));
//! let client = RestClient::connect(&credentials, ClientConfig::default()).await?;
//!
//! let orchestrator = BulkOrchestrator::new(client, BulkConfig::default());
//! let result = orchestrator
//!     .run(&records, &BulkRequest::new("Account", Operation::Insert))
//!     .await?;
//! ```

mod auth;
mod query;
mod rest;

pub use auth::{login, Credentials, PasswordCredentials, Session, DEFAULT_LOGIN_URL};
pub use query::flatten_record;
pub use rest::{
    parse_collection_response, route_for, ClientConfig, RestClient, Route, DEFAULT_API_VERSION,
    DEFAULT_TIMEOUT,
};
