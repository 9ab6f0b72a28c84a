// src/sla/mod.rs
// SLA core: rule registry, deadline resolver, status/score evaluator.

pub mod evaluator;
pub mod resolver;
pub mod rules;

pub use evaluator::{evaluate, Assessment};
pub use resolver::resolve_expected_time;
pub use rules::{Cadence, CadenceKind, CadenceRule, RegisteredSource, RuleRegistry};
