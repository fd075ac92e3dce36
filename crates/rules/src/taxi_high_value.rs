//! Flags unusually expensive taxi rides.

use anyhow::Result;
use serde_json::json;

use sentinel_core::{Context, EventDetails, EventKind};
use sentinel_engine::{
    AlertText, Detection, EventGroup, Finding, GroupingStrategy, Rule, RuleDescriptor, Severity,
};

/// Context key for the amount threshold, in yuan.
pub const THRESHOLD_KEY: &str = "taxi_high_value_threshold";
pub const DEFAULT_THRESHOLD: f64 = 50.0;

pub struct TaxiHighValue {
    descriptor: RuleDescriptor,
}

impl TaxiHighValue {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor {
                rule_id: "FD-TAXI-HIGH-VALUE".into(),
                title: "High-Value Taxi Rides".into(),
                description: "Detects unusually expensive taxi rides that may indicate fraud"
                    .into(),
                severity: Severity::Medium,
                event_kinds: vec![EventKind::Taxi],
                grouping: GroupingStrategy::Individual,
            },
        }
    }
}

impl Rule for TaxiHighValue {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn detect(&self, group: &EventGroup<'_>, ctx: &Context) -> Result<Detection> {
        // Individual grouping: exactly one event per group.
        if group.events.len() != 1 {
            return Ok(Detection::Nothing);
        }
        let event = group.events[0];
        let EventDetails::Taxi { is_self_paid, .. } = &event.details else {
            return Ok(Detection::Nothing);
        };
        if *is_self_paid {
            return Ok(Detection::Nothing);
        }

        let threshold = ctx.threshold(THRESHOLD_KEY, DEFAULT_THRESHOLD);
        if event.amount > threshold {
            let finding = Finding::new(event.event_id.clone())
                .with("amount", json!(event.amount))
                .with("threshold", json!(threshold))
                .with("excess_amount", json!(event.amount - threshold));
            return Ok(Detection::One(finding));
        }
        Ok(Detection::Nothing)
    }

    fn format_alert(
        &self,
        group: &EventGroup<'_>,
        finding: &Finding,
        _ctx: &Context,
    ) -> Result<AlertText> {
        let event = group.events[0];
        let (from_str, to_str) = match &event.details {
            EventDetails::Taxi {
                from_location,
                to_location,
                ..
            } => (from_location.to_string(), to_location.to_string()),
            _ => ("Unknown".into(), "Unknown".into()),
        };

        let time = event
            .time_window
            .exact_start_time()
            .unwrap_or(event.time_window.earliest_start);
        let threshold = finding.get_f64("threshold").unwrap_or(DEFAULT_THRESHOLD);
        let excess = finding.get_f64("excess_amount").unwrap_or(0.0);

        Ok(AlertText {
            title: format!("High-Value Taxi Ride: {} yuan", event.amount),
            details: format!(
                "User {} ({}) took an expensive taxi ride on {} from {} to {} \
                 costing {} yuan. This exceeds the threshold of {} yuan by {:.2} yuan.",
                event.user_name,
                event.user_id,
                time.format("%Y-%m-%d %H:%M"),
                from_str,
                to_str,
                event.amount,
                threshold,
                excess,
            ),
        })
    }
}
