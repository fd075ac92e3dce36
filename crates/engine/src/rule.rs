//! Rule descriptor and the pluggable {detect, format} capability.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use sentinel_core::{Context, EventKind};

use crate::grouping::{EventGroup, GroupingStrategy};

/// Alert severity, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Immutable metadata bundle binding detection logic to an event-type filter
/// and a grouping strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDescriptor {
    pub rule_id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    /// Variant tags the rule cares about; everything else is filtered out
    /// before grouping.
    pub event_kinds: Vec<EventKind>,
    pub grouping: GroupingStrategy,
}

/// Raw detection result for one group: nothing, one finding, or many.
#[derive(Debug, Clone)]
pub enum Detection {
    Nothing,
    One(Finding),
    Many(Vec<Finding>),
}

impl Detection {
    /// Flatten into a sequence of findings.
    pub fn into_findings(self) -> Vec<Finding> {
        match self {
            Detection::Nothing => Vec::new(),
            Detection::One(f) => vec![f],
            Detection::Many(fs) => fs,
        }
    }
}

/// One detected pattern, before alert formatting.
///
/// `primary_event_id` must reference an event present in the group the
/// finding came from; the engine drops findings that violate this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub primary_event_id: String,
    /// Rule-specific extra data, passed through to `format_alert`.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Finding {
    pub fn new(primary_event_id: impl Into<String>) -> Self {
        Self {
            primary_event_id: primary_event_id.into(),
            data: Map::new(),
        }
    }

    /// Attach a data field, builder-style.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(Value::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// Human-facing alert text produced by a rule's format step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertText {
    pub title: String,
    pub details: String,
}

/// A detection rule: immutable descriptor plus the detect/format pair.
///
/// Both calls are pure functions of `(group, context)` with no shared mutable
/// state, so the engine is free to evaluate rules in parallel. Failures
/// (errors or panics) are isolated at the rule-and-group boundary and
/// surface in the batch diagnostics.
pub trait Rule: Send + Sync {
    fn descriptor(&self) -> &RuleDescriptor;

    /// Inspect one group and report zero or more findings.
    fn detect(&self, group: &EventGroup<'_>, ctx: &Context) -> anyhow::Result<Detection>;

    /// Render one finding into alert title and details.
    fn format_alert(
        &self,
        group: &EventGroup<'_>,
        finding: &Finding,
        ctx: &Context,
    ) -> anyhow::Result<AlertText>;
}
