// src/sla/rules.rs
//! # Cadence Rule Registry
//!
//! Static mapping from a feed (source) name to its delivery cadence, SLA
//! thresholds and the storage prefix its objects land under.
//!
//! - Loads from TOML or JSON (`[sources.<name>]` tables).
//! - Every rule is validated on load; a broken file is fatal, never defaulted.
//! - Falls back to `RuleRegistry::default_seed()` only when no file exists.
//! - Iteration order is lexicographic by source name.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{SlaError, SlaResult};

pub const DEFAULT_RULES_PATH: &str = "config/sla_rules.toml";
pub const ENV_RULES_PATH: &str = "SLA_RULES_PATH";

const MINUTES_PER_WEEK: i64 = 7 * 24 * 60;

/// Local wall-clock time at which a delivery is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorTime {
    hour: u32,
    minute: u32,
}

impl AnchorTime {
    pub fn new(hour: u32, minute: u32) -> SlaResult<Self> {
        if hour > 23 {
            return Err(SlaError::config(format!("anchor_hour {hour} outside 0..=23")));
        }
        if minute > 59 {
            return Err(SlaError::config(format!(
                "anchor_minute {minute} outside 0..=59"
            )));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub(crate) fn as_naive_time(&self) -> NaiveTime {
        // validated in `new`
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CadenceKind {
    Hourly,
    Daily,
    Weekly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// An object for each hour should land within this many minutes past the hour.
    Hourly { expected_within_minutes: u32 },
    Daily { anchor: AnchorTime },
    Weekly { weekday: Weekday, anchor: AnchorTime },
}

impl Cadence {
    pub fn kind(&self) -> CadenceKind {
        match self {
            Cadence::Hourly { .. } => CadenceKind::Hourly,
            Cadence::Daily { .. } => CadenceKind::Daily,
            Cadence::Weekly { .. } => CadenceKind::Weekly,
        }
    }

    /// Age (minutes) past which raw age replaces deadline-relative delay.
    /// Only low-frequency cadences carry a guard.
    pub fn staleness_guard_minutes(&self) -> Option<i64> {
        match self {
            Cadence::Weekly { .. } => Some(MINUTES_PER_WEEK),
            Cadence::Hourly { .. } | Cadence::Daily { .. } => None,
        }
    }
}

/// Immutable SLA rule for one feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CadenceRule {
    cadence: Cadence,
    late_threshold_minutes: u32,
    critical_threshold_minutes: u32,
    required: bool,
}

impl CadenceRule {
    pub fn new(
        cadence: Cadence,
        late_threshold_minutes: u32,
        critical_threshold_minutes: u32,
        required: bool,
    ) -> SlaResult<Self> {
        if late_threshold_minutes >= critical_threshold_minutes {
            return Err(SlaError::config(format!(
                "late threshold ({late_threshold_minutes}) must be below critical threshold ({critical_threshold_minutes})"
            )));
        }
        if let Cadence::Hourly {
            expected_within_minutes,
        } = cadence
        {
            if expected_within_minutes > 59 {
                return Err(SlaError::config(format!(
                    "expected_within_minutes {expected_within_minutes} outside 0..=59"
                )));
            }
        }
        Ok(Self {
            cadence,
            late_threshold_minutes,
            critical_threshold_minutes,
            required,
        })
    }

    pub fn hourly(
        expected_within_minutes: u32,
        late: u32,
        critical: u32,
        required: bool,
    ) -> SlaResult<Self> {
        Self::new(
            Cadence::Hourly {
                expected_within_minutes,
            },
            late,
            critical,
            required,
        )
    }

    pub fn daily(hour: u32, minute: u32, late: u32, critical: u32, required: bool) -> SlaResult<Self> {
        let anchor = AnchorTime::new(hour, minute)?;
        Self::new(Cadence::Daily { anchor }, late, critical, required)
    }

    /// `weekday` is 0=Monday … 6=Sunday.
    pub fn weekly(
        weekday: u8,
        hour: u32,
        minute: u32,
        late: u32,
        critical: u32,
        required: bool,
    ) -> SlaResult<Self> {
        let weekday = weekday_from_index(weekday)?;
        let anchor = AnchorTime::new(hour, minute)?;
        Self::new(Cadence::Weekly { weekday, anchor }, late, critical, required)
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn late_threshold_minutes(&self) -> u32 {
        self.late_threshold_minutes
    }

    pub fn critical_threshold_minutes(&self) -> u32 {
        self.critical_threshold_minutes
    }

    pub fn required(&self) -> bool {
        self.required
    }
}

fn weekday_from_index(idx: u8) -> SlaResult<Weekday> {
    Ok(match idx {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        6 => Weekday::Sun,
        other => {
            return Err(SlaError::config(format!(
                "anchor_weekday {other} outside 0..=6"
            )))
        }
    })
}

/// A registered feed: rule plus the discovery namespace it is watched under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredSource {
    pub name: String,
    pub prefix: String,
    pub rule: CadenceRule,
}

/// Immutable source → rule table, built once per process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRegistry {
    sources: BTreeMap<String, RegisteredSource>,
}

impl RuleRegistry {
    pub fn new(sources: impl IntoIterator<Item = RegisteredSource>) -> SlaResult<Self> {
        let mut map = BTreeMap::new();
        for src in sources {
            let name = src.name.trim().to_string();
            if name.is_empty() {
                return Err(SlaError::config("source name must not be empty"));
            }
            if map.contains_key(&name) {
                return Err(SlaError::config(format!("duplicate source '{name}'")));
            }
            map.insert(name.clone(), RegisteredSource { name, ..src });
        }
        if map.is_empty() {
            return Err(SlaError::config("no sources defined"));
        }
        Ok(Self { sources: map })
    }

    /// Sources in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredSource> {
        self.sources.values()
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredSource> {
        self.sources.get(name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Built-in feeds: orders (daily), payments (hourly), products (weekly, optional).
    pub fn default_seed() -> Self {
        let seed = [
            ("orders", CadenceRule::daily(9, 0, 60, 240, true)),
            ("payments", CadenceRule::hourly(15, 30, 120, true)),
            ("products", CadenceRule::weekly(0, 10, 0, 360, 1440, false)),
        ];
        let sources = seed
            .into_iter()
            .filter_map(|(name, rule)| {
                rule.ok().map(|rule| RegisteredSource {
                    name: name.to_string(),
                    prefix: default_prefix(name),
                    rule,
                })
            })
            .map(|s| (s.name.clone(), s))
            .collect();
        Self { sources }
    }
}

pub fn default_prefix(source: &str) -> String {
    format!("staging/{source}/")
}

/* ----------------------------
File schema (TOML / JSON)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
struct RulesFile {
    sources: BTreeMap<String, RuleDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct RuleDef {
    cadence: CadenceKind,
    #[serde(default)]
    expected_within_minutes: Option<i64>,
    #[serde(default)]
    anchor_weekday: Option<i64>,
    #[serde(default)]
    anchor_hour: Option<i64>,
    #[serde(default)]
    anchor_minute: Option<i64>,
    late_threshold_minutes: i64,
    critical_threshold_minutes: i64,
    #[serde(default = "default_required")]
    required: bool,
    #[serde(default)]
    prefix: Option<String>,
}

fn default_required() -> bool {
    true
}

fn non_negative(name: &str, field: &str, v: i64) -> SlaResult<u32> {
    u32::try_from(v).map_err(|_| {
        SlaError::config(format!("source '{name}': {field} must be non-negative, got {v}"))
    })
}

fn required_field(name: &str, field: &str, v: Option<i64>) -> SlaResult<u32> {
    match v {
        Some(v) => non_negative(name, field, v),
        None => Err(SlaError::config(format!(
            "source '{name}': missing {field}"
        ))),
    }
}

impl RuleDef {
    fn into_source(self, name: &str) -> SlaResult<RegisteredSource> {
        let late = non_negative(name, "late_threshold_minutes", self.late_threshold_minutes)?;
        let critical = non_negative(
            name,
            "critical_threshold_minutes",
            self.critical_threshold_minutes,
        )?;
        let minute = match self.anchor_minute {
            Some(m) => non_negative(name, "anchor_minute", m)?,
            None => 0,
        };

        let rule = match self.cadence {
            CadenceKind::Hourly => {
                let within =
                    required_field(name, "expected_within_minutes", self.expected_within_minutes)?;
                CadenceRule::hourly(within, late, critical, self.required)
            }
            CadenceKind::Daily => {
                let hour = required_field(name, "anchor_hour", self.anchor_hour)?;
                CadenceRule::daily(hour, minute, late, critical, self.required)
            }
            CadenceKind::Weekly => {
                let weekday = required_field(name, "anchor_weekday", self.anchor_weekday)?;
                let weekday = u8::try_from(weekday).map_err(|_| {
                    SlaError::config(format!("anchor_weekday {weekday} outside 0..=6"))
                })?;
                let hour = required_field(name, "anchor_hour", self.anchor_hour)?;
                CadenceRule::weekly(weekday, hour, minute, late, critical, self.required)
            }
        }
        .map_err(|e| match e {
            SlaError::ConfigurationInvalid(msg) => {
                SlaError::config(format!("source '{name}': {msg}"))
            }
            other => other,
        })?;

        let prefix = self
            .prefix
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| default_prefix(name));

        Ok(RegisteredSource {
            name: name.to_string(),
            prefix,
            rule,
        })
    }
}

/// Load rules from an explicit path. Supports TOML or JSON formats.
pub fn load_rules_from(path: &Path) -> SlaResult<RuleRegistry> {
    let content = fs::read_to_string(path)
        .map_err(|e| SlaError::config(format!("reading rules from {}: {e}", path.display())))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_rules(&content, ext.as_str())
}

/// Load rules using env var + fallbacks:
/// 1) $SLA_RULES_PATH (must exist)
/// 2) config/sla_rules.toml
/// 3) built-in seed
pub fn load_rules_default() -> SlaResult<RuleRegistry> {
    if let Ok(p) = std::env::var(ENV_RULES_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(SlaError::config(format!(
                "{ENV_RULES_PATH} points to non-existent path {}",
                pb.display()
            )));
        }
        return load_rules_from(&pb);
    }
    let toml_p = PathBuf::from(DEFAULT_RULES_PATH);
    if toml_p.exists() {
        return load_rules_from(&toml_p);
    }
    tracing::info!(target: "sla", "no rules file found, using built-in registry");
    Ok(RuleRegistry::default_seed())
}

fn parse_rules(s: &str, hint_ext: &str) -> SlaResult<RuleRegistry> {
    let file: RulesFile = if hint_ext == "json" {
        serde_json::from_str(s).map_err(|e| SlaError::config(format!("rules json: {e}")))?
    } else {
        toml::from_str(s).map_err(|e| SlaError::config(format!("rules toml: {e}")))?
    };

    let sources = file
        .sources
        .into_iter()
        .map(|(name, def)| def.into_source(&name))
        .collect::<SlaResult<Vec<_>>>()?;
    RuleRegistry::new(sources)
}
