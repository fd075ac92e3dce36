//! Batch execution: filter, partition, detect, and format under failure
//! isolation.
//!
//! `evaluate_batch` is the sole entry point external callers use. It never
//! fails for isolated rule errors: every failure is caught at the
//! rule-and-group boundary, recorded in the diagnostics side-channel, and
//! evaluation of sibling groups and other rules proceeds.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use sentinel_core::{Context, TrajectoryEvent};

use crate::alert::{Alert, BatchOutcome, Diagnostic, DiagnosticKind};
use crate::rule::Rule;

/// Engine knobs. Defaults: parallel rule evaluation, no time budget.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Wall-clock budget for one rule's whole evaluation, checked at group
    /// boundaries. Exceeding it skips the rule's remaining groups and is
    /// recorded as a [`DiagnosticKind::Timeout`] diagnostic.
    pub rule_time_budget: Option<Duration>,
    /// Evaluate rules on the rayon pool. Output ordering is identical either
    /// way: rule-declaration order, then discovery order within a rule.
    pub parallel: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            rule_time_budget: None,
            parallel: true,
        }
    }
}

/// Evaluate every rule over the batch and aggregate alerts plus diagnostics.
///
/// Each rule evaluates into its own local buffers; the ordered collect below
/// is the only merge point, so no shared alert list exists on the hot path.
pub fn evaluate_batch(
    rules: &[Arc<dyn Rule>],
    events: &[TrajectoryEvent],
    ctx: &Context,
    options: &EngineOptions,
) -> BatchOutcome {
    let started = Instant::now();

    let per_rule: Vec<(Vec<Alert>, Vec<Diagnostic>)> = if options.parallel {
        rules
            .par_iter()
            .map(|rule| evaluate_rule(rule.as_ref(), events, ctx, options))
            .collect()
    } else {
        rules
            .iter()
            .map(|rule| evaluate_rule(rule.as_ref(), events, ctx, options))
            .collect()
    };

    let mut outcome = BatchOutcome::default();
    for (alerts, diagnostics) in per_rule {
        outcome.alerts.extend(alerts);
        outcome.diagnostics.extend(diagnostics);
    }

    info!(
        rules = rules.len(),
        events = events.len(),
        alerts = outcome.alerts.len(),
        diagnostics = outcome.diagnostics.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "batch evaluated"
    );
    outcome
}

/// Run one rule over the batch: filter by declared kinds, partition, then
/// detect/format per group.
fn evaluate_rule(
    rule: &dyn Rule,
    events: &[TrajectoryEvent],
    ctx: &Context,
    options: &EngineOptions,
) -> (Vec<Alert>, Vec<Diagnostic>) {
    let desc = rule.descriptor();
    let mut alerts = Vec::new();
    let mut diagnostics = Vec::new();

    let filtered: Vec<&TrajectoryEvent> = events
        .iter()
        .filter(|e| desc.event_kinds.contains(&e.kind()))
        .collect();
    if filtered.is_empty() {
        debug!(rule_id = %desc.rule_id, "no matching events");
        return (alerts, diagnostics);
    }

    let groups = desc.grouping.partition(&filtered);
    let started = Instant::now();
    // Alerts already emitted for this rule, by primary event id. Overlapping
    // sliding-window groups re-discover the same finding; first one wins.
    let mut emitted: HashSet<String> = HashSet::new();

    for (index, group) in groups.iter().enumerate() {
        if let Some(budget) = options.rule_time_budget {
            if started.elapsed() > budget {
                let skipped = groups.len() - index;
                warn!(
                    rule_id = %desc.rule_id,
                    group_key = %group.key,
                    skipped,
                    "rule exceeded time budget"
                );
                diagnostics.push(Diagnostic {
                    rule_id: desc.rule_id.clone(),
                    group_key: group.key.clone(),
                    kind: DiagnosticKind::Timeout,
                    message: format!(
                        "time budget {:?} exceeded, {} group(s) skipped",
                        budget, skipped
                    ),
                });
                break;
            }
        }

        let detection = match catch_unwind(AssertUnwindSafe(|| rule.detect(group, ctx))) {
            Ok(Ok(detection)) => detection,
            Ok(Err(err)) => {
                warn!(rule_id = %desc.rule_id, group_key = %group.key, error = %err, "detect failed");
                diagnostics.push(Diagnostic {
                    rule_id: desc.rule_id.clone(),
                    group_key: group.key.clone(),
                    kind: DiagnosticKind::DetectFailed,
                    message: format!("{err:#}"),
                });
                continue;
            }
            Err(payload) => {
                let message = panic_message(payload);
                warn!(rule_id = %desc.rule_id, group_key = %group.key, %message, "detect panicked");
                diagnostics.push(Diagnostic {
                    rule_id: desc.rule_id.clone(),
                    group_key: group.key.clone(),
                    kind: DiagnosticKind::DetectFailed,
                    message,
                });
                continue;
            }
        };

        for finding in detection.into_findings() {
            if !group.contains_event(&finding.primary_event_id) {
                diagnostics.push(Diagnostic {
                    rule_id: desc.rule_id.clone(),
                    group_key: group.key.clone(),
                    kind: DiagnosticKind::ContractViolation,
                    message: format!(
                        "finding references event {} not present in group",
                        finding.primary_event_id
                    ),
                });
                continue;
            }
            if emitted.contains(&finding.primary_event_id) {
                continue;
            }

            match catch_unwind(AssertUnwindSafe(|| rule.format_alert(group, &finding, ctx))) {
                Ok(Ok(text)) => {
                    emitted.insert(finding.primary_event_id.clone());
                    alerts.push(Alert {
                        rule_id: desc.rule_id.clone(),
                        title: text.title,
                        severity: desc.severity,
                        details: text.details,
                        primary_event_id: finding.primary_event_id,
                        event_ids: group.event_ids(),
                        group_key: group.key.clone(),
                    });
                }
                Ok(Err(err)) => {
                    warn!(rule_id = %desc.rule_id, group_key = %group.key, error = %err, "format failed");
                    diagnostics.push(Diagnostic {
                        rule_id: desc.rule_id.clone(),
                        group_key: group.key.clone(),
                        kind: DiagnosticKind::FormatFailed,
                        message: format!("{err:#}"),
                    });
                }
                Err(payload) => {
                    let message = panic_message(payload);
                    warn!(rule_id = %desc.rule_id, group_key = %group.key, %message, "format panicked");
                    diagnostics.push(Diagnostic {
                        rule_id: desc.rule_id.clone(),
                        group_key: group.key.clone(),
                        kind: DiagnosticKind::FormatFailed,
                        message,
                    });
                }
            }
        }
    }

    debug!(
        rule_id = %desc.rule_id,
        groups = groups.len(),
        alerts = alerts.len(),
        "rule evaluated"
    );
    (alerts, diagnostics)
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
