// src/config/mod.rs
// Runtime settings (env) and the cadence rules file loader.

pub mod app;

pub use crate::sla::rules::{load_rules_default, load_rules_from};
pub use app::{AppConfig, StoreConfig};
