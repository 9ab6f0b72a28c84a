// src/error.rs
//! Error kinds surfaced by the SLA engine and its collaborators.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SlaError {
    /// Discovery errored or timed out for one namespace.
    #[error("discovery unavailable for '{prefix}': {reason}")]
    DiscoveryUnavailable { prefix: String, reason: String },

    /// A run's check time is earlier than the previously recorded run.
    #[error("clock skew: check time {current} is earlier than previous run at {previous}")]
    ClockSkew {
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    /// Cadence rules or runtime settings violate their invariants. Fatal at startup.
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("failed to persist '{key}': {reason}")]
    PersistenceFailure { key: String, reason: String },

    #[error("alert dispatch failed: {0}")]
    AlertFailure(String),
}

impl SlaError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigurationInvalid(msg.into())
    }

    pub fn discovery(prefix: &str, reason: impl std::fmt::Display) -> Self {
        Self::DiscoveryUnavailable {
            prefix: prefix.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type SlaResult<T> = Result<T, SlaError>;
