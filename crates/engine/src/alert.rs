//! Output records: alerts and the operator diagnostics side-channel.

use serde::{Deserialize, Serialize};

use crate::rule::Severity;

/// The final, user-facing record describing one detected suspicious pattern.
///
/// Carries back-references (event ids) to the triggering events, never the
/// events themselves. Immutable once emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub rule_id: String,
    pub title: String,
    pub severity: Severity,
    pub details: String,
    pub primary_event_id: String,
    /// Ids of every event in the group the finding came from, in group order.
    pub event_ids: Vec<String>,
    pub group_key: String,
}

/// Category of an isolated rule failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// detect returned an error or panicked.
    DetectFailed,
    /// format_alert returned an error or panicked.
    FormatFailed,
    /// A finding referenced an event id not present in its group.
    ContractViolation,
    /// The rule exceeded its time budget; remaining groups were skipped.
    Timeout,
}

/// One recorded failure, scoped to a rule and group. Never fatal to the
/// batch; sibling groups and other rules proceed unaffected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule_id: String,
    pub group_key: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Everything one batch evaluation produced: the alerts that succeeded and
/// the failures that were isolated along the way.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub alerts: Vec<Alert>,
    pub diagnostics: Vec<Diagnostic>,
}
