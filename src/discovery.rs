// src/discovery.rs
use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::{path::Path, ObjectMeta, ObjectStore};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{SlaError, SlaResult};
use crate::record::ObservedDelivery;

/// Finds the newest delivered object under a namespace.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Both fields absent when the namespace is empty.
    async fn find_latest(&self, prefix: &str) -> SlaResult<ObservedDelivery>;
}

/// Discovery over any `object_store` backend (local directory or S3 bucket).
/// The listing stream pages through the backend transparently.
pub struct ObjectStoreDiscovery {
    store: Arc<dyn ObjectStore>,
    timeout: Duration,
}

impl ObjectStoreDiscovery {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    async fn scan(&self, prefix: &str) -> Result<Option<ObjectMeta>, object_store::Error> {
        let path = Path::from(prefix);
        let mut listing = self.store.list(Some(&path));
        let mut latest: Option<ObjectMeta> = None;
        while let Some(meta) = listing.try_next().await? {
            let newer = latest
                .as_ref()
                .map_or(true, |cur| meta.last_modified > cur.last_modified);
            if newer {
                latest = Some(meta);
            }
        }
        Ok(latest)
    }
}

#[async_trait]
impl Discovery for ObjectStoreDiscovery {
    async fn find_latest(&self, prefix: &str) -> SlaResult<ObservedDelivery> {
        match tokio::time::timeout(self.timeout, self.scan(prefix)).await {
            Ok(Ok(Some(meta))) => Ok(ObservedDelivery::at(
                meta.last_modified,
                meta.location.to_string(),
            )),
            Ok(Ok(None)) => Ok(ObservedDelivery::none()),
            Ok(Err(e)) => Err(SlaError::discovery(prefix, e)),
            Err(_) => Err(SlaError::discovery(
                prefix,
                format!("listing timed out after {}s", self.timeout.as_secs()),
            )),
        }
    }
}
