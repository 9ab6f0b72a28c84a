// tests/common/mod.rs
//
// In-memory collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use feed_sla_monitor::discovery::Discovery;
use feed_sla_monitor::notify::AlertSink;
use feed_sla_monitor::persist::ResultSink;
use feed_sla_monitor::record::PartitionKey;
use feed_sla_monitor::{EvaluationResult, ObservedDelivery, SlaError, SlaResult};

/// Canned discovery answers keyed by prefix. Unknown prefixes are empty.
#[derive(Default)]
pub struct FixedDiscovery {
    answers: HashMap<String, SlaResult<ObservedDelivery>>,
}

impl FixedDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, prefix: &str, observed: ObservedDelivery) -> Self {
        self.answers.insert(prefix.to_string(), Ok(observed));
        self
    }

    pub fn failing(mut self, prefix: &str, reason: &str) -> Self {
        self.answers
            .insert(prefix.to_string(), Err(SlaError::discovery(prefix, reason)));
        self
    }
}

#[async_trait]
impl Discovery for FixedDiscovery {
    async fn find_latest(&self, prefix: &str) -> SlaResult<ObservedDelivery> {
        self.answers
            .get(prefix)
            .cloned()
            .unwrap_or_else(|| Ok(ObservedDelivery::none()))
    }
}

/// Keeps writes in memory; sources listed in `failing` are rejected.
#[derive(Default)]
pub struct MemorySink {
    pub writes: Mutex<Vec<(String, EvaluationResult)>>,
    failing: HashSet<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(sources: &[&str]) -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            failing: sources.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn written_keys(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn write(&self, key: &PartitionKey, result: &EvaluationResult) -> SlaResult<()> {
        if self.failing.contains(key.source()) {
            return Err(SlaError::PersistenceFailure {
                key: key.to_string(),
                reason: "sink rejected write".into(),
            });
        }
        self.writes
            .lock()
            .unwrap()
            .push((key.to_string(), result.clone()));
        Ok(())
    }

    async fn read_latest(&self, source: &str) -> SlaResult<Option<EvaluationResult>> {
        Ok(self
            .writes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(_, r)| r.source == source)
            .map(|(_, r)| r.clone()))
    }
}

/// Records every publish call.
#[derive(Default)]
pub struct RecordingAlerts {
    pub calls: Mutex<Vec<Vec<EvaluationResult>>>,
}

impl RecordingAlerts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AlertSink for RecordingAlerts {
    async fn publish(&self, critical: &[EvaluationResult]) -> SlaResult<()> {
        self.calls.lock().unwrap().push(critical.to_vec());
        Ok(())
    }
}
