//! Flags taxi rides in different cities with no flight or railway record
//! explaining how the user moved between them.

use std::collections::HashMap;

use anyhow::Result;
use serde_json::json;

use sentinel_core::{Context, EventDetails, EventKind, Location, TrajectoryEvent};
use sentinel_engine::{
    AlertText, Detection, EventGroup, Finding, GroupingStrategy, Rule, RuleDescriptor, Severity,
};

pub struct TaxiMulticityWithoutTransport {
    descriptor: RuleDescriptor,
}

impl TaxiMulticityWithoutTransport {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor {
                rule_id: "FD-TAXI-MULTICITY-NO-INTERCITY-TRANSPORT".into(),
                title: "Multi-City Taxi Use Without Intercity Transport".into(),
                description: "Detects when a user takes taxi rides in different cities without \
                              any intercity transportation record (flights or trains) to \
                              explain how they moved between cities"
                    .into(),
                severity: Severity::Medium,
                event_kinds: vec![EventKind::Taxi, EventKind::Flight, EventKind::Railway],
                grouping: GroupingStrategy::Daily,
            },
        }
    }
}

/// The city a taxi ride starts in.
fn taxi_origin(event: &TrajectoryEvent) -> Option<&Location> {
    match &event.details {
        EventDetails::Taxi { from_location, .. } => Some(from_location),
        _ => None,
    }
}

/// Whether some intercity transport event connects `from_city` to `to_city`
/// inside the transition window.
fn has_explaining_transport(
    transports: &[&TrajectoryEvent],
    from_city: &str,
    to_city: &str,
    from_time: chrono::DateTime<chrono::FixedOffset>,
    to_time: chrono::DateTime<chrono::FixedOffset>,
) -> bool {
    transports.iter().any(|t| {
        let Some((from, to)) = t.route() else {
            return false;
        };
        from.city == from_city
            && to.city == to_city
            && t.time_window.earliest_start < to_time
            && t.time_window.latest_end > from_time
    })
}

impl Rule for TaxiMulticityWithoutTransport {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn detect(&self, group: &EventGroup<'_>, _ctx: &Context) -> Result<Detection> {
        // Daily groups mix users; scope everything per user first.
        let mut by_user: HashMap<&str, (Vec<&TrajectoryEvent>, Vec<&TrajectoryEvent>)> =
            HashMap::new();
        for &event in &group.events {
            let entry = by_user.entry(event.user_id.as_str()).or_default();
            match event.kind() {
                EventKind::Taxi => entry.0.push(event),
                EventKind::Flight | EventKind::Railway => entry.1.push(event),
                _ => {}
            }
        }
        let mut user_ids: Vec<&str> = by_user.keys().copied().collect();
        user_ids.sort_unstable();

        let mut findings = Vec::new();

        for user_id in user_ids {
            let (taxis, transports) = &by_user[user_id];
            if taxis.len() < 2 {
                continue;
            }

            let mut sorted: Vec<&TrajectoryEvent> = taxis.clone();
            sorted.sort_by_key(|e| e.time_window.earliest_start);

            // Walk the chronological ride sequence and record each change of
            // origin city as a transition to explain.
            let mut suspicious_transitions = Vec::new();
            let mut cities: Vec<&str> = Vec::new();
            let Some(first_origin) = taxi_origin(sorted[0]) else {
                continue;
            };
            let mut current_city = first_origin.city.as_str();
            cities.push(current_city);

            for pair in sorted.windows(2) {
                let (prev, next) = (pair[0], pair[1]);
                let Some(next_origin) = taxi_origin(next) else {
                    continue;
                };
                let next_city = next_origin.city.as_str();
                if !cities.contains(&next_city) {
                    cities.push(next_city);
                }
                if next_city == current_city {
                    continue;
                }

                let from_time = prev.time_window.latest_end;
                let to_time = next.time_window.earliest_start;
                if !has_explaining_transport(transports, current_city, next_city, from_time, to_time)
                {
                    suspicious_transitions.push(json!({
                        "from_city": current_city,
                        "to_city": next_city,
                        "from_time": from_time.to_rfc3339(),
                        "to_time": to_time.to_rfc3339(),
                        "from_event_id": prev.event_id,
                        "to_event_id": next.event_id,
                        "gap_hours": (to_time - from_time).num_seconds() as f64 / 3_600.0,
                    }));
                }
                current_city = next_city;
            }

            if !suspicious_transitions.is_empty() {
                // Primary is the later-starting ride of the sequence.
                let last = sorted[sorted.len() - 1];
                findings.push(
                    Finding::new(last.event_id.clone())
                        .with("user_id", json!(user_id))
                        .with("user_name", json!(last.user_name))
                        .with("department", json!(last.department))
                        .with("suspicious_transitions", json!(suspicious_transitions))
                        .with("taxi_events_count", json!(sorted.len()))
                        .with("cities_visited", json!(cities)),
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
        _group: &EventGroup<'_>,
        finding: &Finding,
        _ctx: &Context,
    ) -> Result<AlertText> {
        let user_name = finding.get_str("user_name").unwrap_or("Unknown");
        let user_id = finding.get_str("user_id").unwrap_or("Unknown");
        let department = finding.get_str("department").unwrap_or("Unknown");

        let cities = finding
            .data
            .get("cities_visited")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        let mut transition_lines = Vec::new();
        if let Some(transitions) = finding
            .data
            .get("suspicious_transitions")
            .and_then(|v| v.as_array())
        {
            for t in transitions {
                let get_str = |k: &str| t.get(k).and_then(|v| v.as_str()).unwrap_or("?");
                let gap = t.get("gap_hours").and_then(|v| v.as_f64()).unwrap_or(0.0);
                transition_lines.push(format!(
                    "- {} → {} ({:.1} hours between taxi rides)",
                    get_str("from_city"),
                    get_str("to_city"),
                    gap,
                ));
            }
        }

        Ok(AlertText {
            title: format!("Multi-City Taxi Use Without Intercity Transport: {}", cities),
            details: format!(
                "User {} ({}) from {} took taxi rides in multiple cities without any \
                 recorded intercity transportation (flights or trains) that would explain \
                 how they moved between these cities.\n\nSuspicious city transitions:\n{}\n\n\
                 This may indicate missing transportation records, taxi expenses claimed \
                 by someone else while traveling, or multiple people using the same \
                 employee ID for expenses.",
                user_name,
                user_id,
                department,
                transition_lines.join("\n"),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{flight, taxi};

    fn group<'a>(events: Vec<&'a TrajectoryEvent>) -> EventGroup<'a> {
        EventGroup {
            key: "2024-01-01".into(),
            events,
        }
    }

    #[test]
    fn unexplained_city_change_is_flagged() {
        let a = taxi(
            "T1",
            "U1",
            30.0,
            "北京市",
            "北京市",
            "2024-01-01T09:00:00+08:00",
            "2024-01-01T09:30:00+08:00",
        );
        let b = taxi(
            "T2",
            "U1",
            35.0,
            "上海市",
            "上海市",
            "2024-01-01T15:00:00+08:00",
            "2024-01-01T15:30:00+08:00",
        );

        let rule = TaxiMulticityWithoutTransport::new();
        let Detection::Many(findings) =
            rule.detect(&group(vec![&a, &b]), &Context::new()).unwrap()
        else {
            panic!("expected findings");
        };
        assert_eq!(findings.len(), 1);
        // Primary is the later-starting ride.
        assert_eq!(findings[0].primary_event_id, "T2");

        let transitions = findings[0]
            .data
            .get("suspicious_transitions")
            .and_then(|v| v.as_array())
            .unwrap();
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0]["from_city"], "北京市");
        assert_eq!(transitions[0]["to_city"], "上海市");
    }

    #[test]
    fn bridging_flight_explains_the_change() {
        let a = taxi(
            "T1",
            "U1",
            30.0,
            "北京市",
            "北京市",
            "2024-01-01T09:00:00+08:00",
            "2024-01-01T09:30:00+08:00",
        );
        let f = flight(
            "F1",
            "U1",
            "北京市",
            "上海市",
            "2024-01-01T11:00:00+08:00",
            "2024-01-01T13:00:00+08:00",
        );
        let b = taxi(
            "T2",
            "U1",
            35.0,
            "上海市",
            "上海市",
            "2024-01-01T15:00:00+08:00",
            "2024-01-01T15:30:00+08:00",
        );

        let rule = TaxiMulticityWithoutTransport::new();
        assert!(matches!(
            rule.detect(&group(vec![&a, &f, &b]), &Context::new())
                .unwrap(),
            Detection::Nothing
        ));
    }

    #[test]
    fn single_city_rides_are_clean() {
        let a = taxi(
            "T1",
            "U1",
            30.0,
            "北京市",
            "北京市",
            "2024-01-01T09:00:00+08:00",
            "2024-01-01T09:30:00+08:00",
        );
        let b = taxi(
            "T2",
            "U1",
            35.0,
            "北京市",
            "北京市",
            "2024-01-01T15:00:00+08:00",
            "2024-01-01T15:30:00+08:00",
        );

        let rule = TaxiMulticityWithoutTransport::new();
        assert!(matches!(
            rule.detect(&group(vec![&a, &b]), &Context::new()).unwrap(),
            Detection::Nothing
        ));
    }

    #[test]
    fn another_users_flight_does_not_explain() {
        let a = taxi(
            "T1",
            "U1",
            30.0,
            "北京市",
            "北京市",
            "2024-01-01T09:00:00+08:00",
            "2024-01-01T09:30:00+08:00",
        );
        let f = flight(
            "F1",
            "U2",
            "北京市",
            "上海市",
            "2024-01-01T11:00:00+08:00",
            "2024-01-01T13:00:00+08:00",
        );
        let b = taxi(
            "T2",
            "U1",
            35.0,
            "上海市",
            "上海市",
            "2024-01-01T15:00:00+08:00",
            "2024-01-01T15:30:00+08:00",
        );

        let rule = TaxiMulticityWithoutTransport::new();
        let detection = rule
            .detect(&group(vec![&a, &f, &b]), &Context::new())
            .unwrap();
        assert!(matches!(detection, Detection::Many(_)));
    }
}
