// src/persist.rs
use async_trait::async_trait;
use object_store::{path::Path, ObjectStore, PutPayload};
use std::sync::Arc;

use crate::error::{SlaError, SlaResult};
use crate::record::{latest_result_path, EvaluationResult, PartitionKey};

#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Idempotent upsert: rewriting the same key with a newer result is fine.
    async fn write(&self, key: &PartitionKey, result: &EvaluationResult) -> SlaResult<()>;

    /// Most recent result persisted for `source`, `None` if it was never written.
    async fn read_latest(&self, source: &str) -> SlaResult<Option<EvaluationResult>>;
}

/// Writes pretty JSON under the hourly partition and refreshes
/// `metrics/<source>/latest.json` for read-side consumers.
pub struct ObjectStoreSink {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreSink {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    async fn put_json(&self, path: &str, body: &[u8]) -> SlaResult<()> {
        self.store
            .put(&Path::from(path), PutPayload::from(body.to_vec()))
            .await
            .map(|_| ())
            .map_err(|e| SlaError::PersistenceFailure {
                key: path.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl ResultSink for ObjectStoreSink {
    async fn write(&self, key: &PartitionKey, result: &EvaluationResult) -> SlaResult<()> {
        let body =
            serde_json::to_vec_pretty(result).map_err(|e| SlaError::PersistenceFailure {
                key: key.to_string(),
                reason: format!("serialize: {e}"),
            })?;
        self.put_json(&key.object_path(), &body).await?;
        self.put_json(&key.latest_path(), &body).await
    }

    async fn read_latest(&self, source: &str) -> SlaResult<Option<EvaluationResult>> {
        let path = latest_result_path(source);
        let read_err = |reason: String| SlaError::PersistenceFailure {
            key: path.clone(),
            reason,
        };
        let bytes = match self.store.get(&Path::from(path.as_str())).await {
            Ok(got) => got.bytes().await.map_err(|e| read_err(e.to_string()))?,
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(read_err(e.to_string())),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| read_err(format!("decode: {e}")))
    }
}
