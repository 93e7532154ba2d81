//! CollectionDispatcher trait definition.
//!
//! This trait abstracts over the transport that delivers one payload to the
//! remote collection endpoint, so the orchestrator can be driven by the
//! REST client in production and by in-memory stubs in tests.

use crate::payload::Payload;
use crm_core::{BulkError, Operation};

/// Raw per-record response object as returned by the remote endpoint.
///
/// The shape is owned by the remote API; the reconciler reads it leniently.
pub type RawResponse = serde_json::Value;

/// Trait for sending one batch payload to the remote store.
///
/// # Usage Pattern
///
/// The orchestrator is generic over the dispatcher, so calls are statically
/// dispatched:
///
/// ```ignore
/// let orchestrator = BulkOrchestrator::new(rest_client, BulkConfig::default());
/// let result = orchestrator.run(&records, &request).await?;
/// ```
#[async_trait::async_trait]
pub trait CollectionDispatcher: Send + Sync {
    /// Send one payload and return the per-record responses.
    ///
    /// The response list should be position-aligned with `payload.records`,
    /// but its length is not enforced here. Any network or API-level
    /// failure is returned as [`BulkError::Transport`].
    async fn dispatch(
        &self,
        payload: &Payload,
        operation: Operation,
    ) -> Result<Vec<RawResponse>, BulkError>;
}

#[async_trait::async_trait]
impl<D: CollectionDispatcher + ?Sized> CollectionDispatcher for &D {
    async fn dispatch(
        &self,
        payload: &Payload,
        operation: Operation,
    ) -> Result<Vec<RawResponse>, BulkError> {
        (**self).dispatch(payload, operation).await
    }
}

#[async_trait::async_trait]
impl<D: CollectionDispatcher + ?Sized> CollectionDispatcher for std::sync::Arc<D> {
    async fn dispatch(
        &self,
        payload: &Payload,
        operation: Operation,
    ) -> Result<Vec<RawResponse>, BulkError> {
        (**self).dispatch(payload, operation).await
    }
}
