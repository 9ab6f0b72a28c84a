// src/config/app.rs
use chrono_tz::Tz;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::ObjectStore;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{SlaError, SlaResult};

pub const DEFAULT_TIMEZONE: &str = "America/New_York";
pub const DEFAULT_RAW_DIR: &str = "data/raw";
pub const DEFAULT_RESULTS_DIR: &str = "data/results";
pub const DEFAULT_DISCOVERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 300;

pub const ENV_TIMEZONE: &str = "SLA_TIMEZONE";
pub const ENV_RAW_BUCKET: &str = "SLA_RAW_BUCKET";
pub const ENV_RAW_DIR: &str = "SLA_RAW_DIR";
pub const ENV_RESULTS_BUCKET: &str = "SLA_RESULTS_BUCKET";
pub const ENV_RESULTS_DIR: &str = "SLA_RESULTS_DIR";
pub const ENV_DISCOVERY_TIMEOUT_SECS: &str = "SLA_DISCOVERY_TIMEOUT_SECS";
pub const ENV_CHECK_INTERVAL_SECS: &str = "SLA_CHECK_INTERVAL_SECS";

/// Where objects live: a local directory or an S3 bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Local(PathBuf),
    S3 { bucket: String },
}

impl StoreConfig {
    fn from_env(bucket_var: &str, dir_var: &str, default_dir: &str) -> Self {
        match non_empty_env(bucket_var) {
            Some(bucket) => StoreConfig::S3 { bucket },
            None => StoreConfig::Local(PathBuf::from(
                non_empty_env(dir_var).unwrap_or_else(|| default_dir.to_string()),
            )),
        }
    }

    /// S3 credentials/region come from the standard `AWS_*` variables.
    pub fn build(&self) -> SlaResult<Arc<dyn ObjectStore>> {
        match self {
            StoreConfig::Local(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| {
                    SlaError::config(format!("creating {}: {e}", dir.display()))
                })?;
                let store = LocalFileSystem::new_with_prefix(dir).map_err(|e| {
                    SlaError::config(format!("local store at {}: {e}", dir.display()))
                })?;
                tracing::info!(target: "sla", "store: local directory {}", dir.display());
                Ok(Arc::new(store))
            }
            StoreConfig::S3 { bucket } => {
                let store = AmazonS3Builder::from_env()
                    .with_bucket_name(bucket)
                    .build()
                    .map_err(|e| SlaError::config(format!("s3 bucket {bucket}: {e}")))?;
                tracing::info!(target: "sla", "store: s3://{bucket}");
                Ok(Arc::new(store))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub timezone: Tz,
    pub raw_store: StoreConfig,
    pub results_store: StoreConfig,
    pub discovery_timeout_secs: u64,
    /// 0 disables the built-in scheduler.
    pub check_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> SlaResult<Self> {
        let tz_name = non_empty_env(ENV_TIMEZONE).unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = tz_name
            .parse()
            .map_err(|e| SlaError::config(format!("{ENV_TIMEZONE}='{tz_name}': {e}")))?;

        Ok(Self {
            timezone,
            raw_store: StoreConfig::from_env(ENV_RAW_BUCKET, ENV_RAW_DIR, DEFAULT_RAW_DIR),
            results_store: StoreConfig::from_env(
                ENV_RESULTS_BUCKET,
                ENV_RESULTS_DIR,
                DEFAULT_RESULTS_DIR,
            ),
            discovery_timeout_secs: parse_positive_u64_env(
                ENV_DISCOVERY_TIMEOUT_SECS,
                DEFAULT_DISCOVERY_TIMEOUT_SECS,
            )?,
            check_interval_secs: parse_u64_env(
                ENV_CHECK_INTERVAL_SECS,
                DEFAULT_CHECK_INTERVAL_SECS,
            )?,
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_u64_env(name: &str, default: u64) -> SlaResult<u64> {
    match non_empty_env(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| SlaError::config(format!("{name}='{raw}' is not a whole number"))),
    }
}

fn parse_positive_u64_env(name: &str, default: u64) -> SlaResult<u64> {
    match parse_u64_env(name, default)? {
        0 => Err(SlaError::config(format!("{name} must be at least 1"))),
        n => Ok(n),
    }
}
