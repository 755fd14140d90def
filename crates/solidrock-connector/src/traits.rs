//! Remote source trait
//!
//! Capability the sync engine needs from the remote API.

use async_trait::async_trait;

use crate::error::ConnectorResult;
use crate::record::RemoteRecordDetail;
use crate::types::{Collection, RemoteRecordSummary};

/// Read-only access to the remote collections.
///
/// Implementations must be cheap to share across tasks; the engine holds
/// them behind an `Arc`.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// List every live record of a collection.
    ///
    /// An empty list is a valid answer and is treated by callers as
    /// "no usable data" rather than "everything was deleted".
    async fn list_all(&self, collection: Collection) -> ConnectorResult<Vec<RemoteRecordSummary>>;

    /// Fetch the full document of one record.
    ///
    /// Returns `Ok(None)` when the remote answers without the record.
    async fn fetch_one(
        &self,
        collection: Collection,
        id: &str,
    ) -> ConnectorResult<Option<RemoteRecordDetail>>;

    /// Display name used in log lines.
    fn display_name(&self) -> &str {
        "remote"
    }
}
