//! Flags consecutive events of one user in different cities with less time
//! between them than any realistic ground travel would need.

use std::collections::HashMap;

use anyhow::Result;
use serde_json::json;
use tracing::debug;

use sentinel_core::{Context, EventKind, TrajectoryEvent};
use sentinel_engine::{
    geo, temporal, AlertText, Detection, EventGroup, Finding, GroupingStrategy, Rule,
    RuleDescriptor, Severity, TimeUnit,
};

/// Assumed ground travel speed between cities, km/h.
const GROUND_SPEED_KMH: f64 = 100.0;

pub struct ImpossibleTravelSequence {
    descriptor: RuleDescriptor,
}

impl ImpossibleTravelSequence {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor {
                rule_id: "FD-TRAVEL-IMPOSSIBLE-SEQUENCE".into(),
                title: "Physically Impossible Travel Sequence".into(),
                description: "Detects when a user submits expenses in different cities with \
                              insufficient time to travel between them"
                    .into(),
                severity: Severity::High,
                event_kinds: vec![
                    EventKind::Taxi,
                    EventKind::Hotel,
                    EventKind::Flight,
                    EventKind::Railway,
                    EventKind::Fuel,
                    EventKind::DailyCheckIn,
                ],
                grouping: GroupingStrategy::sliding(3),
            },
        }
    }
}

/// Whether a transport event of the same user explains moving from `e1`'s
/// city to `e2`'s city between the two events.
fn has_transport_explanation(
    transports: &[&TrajectoryEvent],
    e1: &TrajectoryEvent,
    e2: &TrajectoryEvent,
) -> bool {
    transports.iter().any(|t| {
        let Some((from, to)) = t.route() else {
            return false;
        };
        t.time_window.earliest_start >= e1.time_window.earliest_start
            && t.time_window.latest_end <= e2.time_window.latest_start
            && geo::is_same_city(from, &e1.location)
            && geo::is_same_city(to, &e2.location)
    })
}

impl Rule for ImpossibleTravelSequence {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn detect(&self, group: &EventGroup<'_>, _ctx: &Context) -> Result<Detection> {
        if group.events.len() < 2 {
            return Ok(Detection::Nothing);
        }

        let mut by_user: HashMap<&str, Vec<&TrajectoryEvent>> = HashMap::new();
        for &event in &group.events {
            by_user.entry(event.user_id.as_str()).or_default().push(event);
        }
        let mut user_ids: Vec<&str> = by_user.keys().copied().collect();
        user_ids.sort_unstable();

        let mut findings = Vec::new();

        for user_id in user_ids {
            let user_events = &by_user[user_id];
            if user_events.len() < 2 {
                continue;
            }

            let mut sorted: Vec<&TrajectoryEvent> = user_events.clone();
            sorted.sort_by_key(|e| e.time_window.earliest_start);

            let transports: Vec<&TrajectoryEvent> = sorted
                .iter()
                .copied()
                .filter(|e| e.route().is_some())
                .collect();

            for pair in sorted.windows(2) {
                let (e1, e2) = (pair[0], pair[1]);
                if geo::is_same_city(&e1.location, &e2.location) {
                    continue;
                }
                // Unresolvable distance: cannot conclude, do not flag.
                let Some(distance_km) = geo::distance(&e1.location, &e2.location) else {
                    debug!(
                        city1 = %e1.location.city,
                        city2 = %e2.location.city,
                        "distance unresolvable, skipping pair"
                    );
                    continue;
                };
                let Some(min_travel_hours) =
                    geo::travel_time(&e1.location, &e2.location, GROUND_SPEED_KMH)
                else {
                    continue;
                };

                let gap_hours = temporal::time_difference(
                    e1.time_window.latest_end,
                    e2.time_window.earliest_start,
                    TimeUnit::Hours,
                );
                if gap_hours >= min_travel_hours {
                    continue;
                }
                if has_transport_explanation(&transports, e1, e2) {
                    continue;
                }

                findings.push(
                    Finding::new(e2.event_id.clone())
                        .with("user_id", json!(user_id))
                        .with("user_name", json!(e2.user_name))
                        .with("first_event_id", json!(e1.event_id))
                        .with("first_event_city", json!(e1.location.city))
                        .with(
                            "first_event_time",
                            json!(e1.time_window.latest_end.to_rfc3339()),
                        )
                        .with("second_event_id", json!(e2.event_id))
                        .with("second_event_city", json!(e2.location.city))
                        .with(
                            "second_event_time",
                            json!(e2.time_window.earliest_start.to_rfc3339()),
                        )
                        .with("time_between_events_hours", json!(gap_hours))
                        .with("min_travel_time_hours", json!(min_travel_hours))
                        .with("distance_km", json!(distance_km)),
                );
            }
        }

        if findings.is_empty() {
            Ok(Detection::Nothing)
        } else {
            Ok(Detection::Many(findings))
        }
    }

    fn format_alert(
        &self,
        group: &EventGroup<'_>,
        finding: &Finding,
        _ctx: &Context,
    ) -> Result<AlertText> {
        let first_id = finding.get_str("first_event_id").unwrap_or_default();
        let second_id = finding.get_str("second_event_id").unwrap_or_default();
        let first = group.events.iter().find(|e| e.event_id == first_id);
        let second = group.events.iter().find(|e| e.event_id == second_id);
        let (Some(first), Some(second)) = (first, second) else {
            return Ok(AlertText {
                title: "Impossible Travel Sequence Detected".into(),
                details: "Error retrieving event details.".into(),
            });
        };

        let gap_hours = finding.get_f64("time_between_events_hours").unwrap_or(0.0);
        let gap_str = if gap_hours < 1.0 {
            format!("{:.0} minutes", gap_hours * 60.0)
        } else {
            format!("{:.1} hours", gap_hours)
        };

        let first_city = finding.get_str("first_event_city").unwrap_or("?");
        let second_city = finding.get_str("second_event_city").unwrap_or("?");

        Ok(AlertText {
            title: format!(
                "Impossible Travel: {} to {} in {}",
                first_city, second_city, gap_str
            ),
            details: format!(
                "User {} ({}) has submitted expenses that indicate physically impossible \
                 travel.\n\nFirst event in {} ended at {}.\nSecond event in {} started at \
                 {}.\n\nTime between events: {}\nMinimum travel time needed: {:.1} hours\n\
                 Distance between cities: {:.1} km\n\nNo transportation expense was found \
                 that would explain this travel between cities.",
                finding.get_str("user_name").unwrap_or("Unknown"),
                finding.get_str("user_id").unwrap_or("Unknown"),
                first_city,
                first.time_window.latest_end.format("%Y-%m-%d %H:%M"),
                second_city,
                second.time_window.earliest_start.format("%Y-%m-%d %H:%M"),
                gap_str,
                finding.get_f64("min_travel_time_hours").unwrap_or(0.0),
                finding.get_f64("distance_km").unwrap_or(0.0),
            ),
        })
    }
}
