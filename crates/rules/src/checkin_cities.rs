//! Flags users who check in at multiple distant cities on the same day with
//! too little time between them for any realistic travel.

use std::collections::HashMap;

use anyhow::Result;
use serde_json::json;

use sentinel_core::{Context, EventKind, TrajectoryEvent};
use sentinel_engine::{
    geo, temporal, AlertText, Detection, EventGroup, Finding, GroupingStrategy, Rule,
    RuleDescriptor, Severity, TimeUnit,
};

/// Conservative high-speed transport estimate, in km/h. Intentionally high
/// to minimize false positives.
pub const SPEED_KEY: &str = "max_travel_speed_kmh";
pub const DEFAULT_SPEED_KMH: f64 = 200.0;

/// Fixed travel overhead added on top of the distance-derived time, hours.
pub const OVERHEAD_KEY: &str = "min_travel_hours";
pub const DEFAULT_OVERHEAD_HOURS: f64 = 1.0;

/// Minimum distance between cities before a pair is worth flagging, km.
pub const DISTANCE_KEY: &str = "min_suspicious_distance";
pub const DEFAULT_MIN_DISTANCE_KM: f64 = 150.0;

pub struct SameDayMultiCityCheckins {
    descriptor: RuleDescriptor,
}

impl SameDayMultiCityCheckins {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor {
                rule_id: "FD-CHECKIN-DIFFERENT-CITIES-SAME-DAY".into(),
                title: "Same-Day Multi-City Check-Ins".into(),
                description: "Detects when a user checks in at multiple cities on the same day \
                              where the physical distance between them would make it impossible \
                              to travel between them under normal transportation conditions"
                    .into(),
                severity: Severity::Medium,
                event_kinds: vec![EventKind::DailyCheckIn],
                grouping: GroupingStrategy::Daily,
            },
        }
    }
}

/// Travel gap between two check-ins under uncertain times, in hours.
/// Tries the forward ordering first; when that alone looks plausible, the
/// reverse ordering must hold up too before the pair is cleared.
fn available_gap_hours(a: &TrajectoryEvent, b: &TrajectoryEvent, required: f64) -> f64 {
    let forward = temporal::time_difference(
        a.time_window.latest_end,
        b.time_window.earliest_start,
        TimeUnit::Hours,
    )
    .abs();
    if forward < required {
        return forward;
    }
    temporal::time_difference(
        b.time_window.latest_end,
        a.time_window.earliest_start,
        TimeUnit::Hours,
    )
    .abs()
}

impl Rule for SameDayMultiCityCheckins {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn detect(&self, group: &EventGroup<'_>, ctx: &Context) -> Result<Detection> {
        if group.events.len() < 2 {
            return Ok(Detection::Nothing);
        }

        let speed = ctx.threshold(SPEED_KEY, DEFAULT_SPEED_KMH);
        let overhead = ctx.threshold(OVERHEAD_KEY, DEFAULT_OVERHEAD_HOURS);
        let min_distance = ctx.threshold(DISTANCE_KEY, DEFAULT_MIN_DISTANCE_KM);

        // Daily groups mix users; the per-user scoping happens here.
        let mut by_user: HashMap<&str, Vec<&TrajectoryEvent>> = HashMap::new();
        for &event in &group.events {
            by_user.entry(event.user_id.as_str()).or_default().push(event);
        }
        let mut user_ids: Vec<&str> = by_user.keys().copied().collect();
        user_ids.sort_unstable();

        let mut findings = Vec::new();

        for user_id in user_ids {
            let checkins = &by_user[user_id];
            if checkins.len() < 2 {
                continue;
            }

            let mut suspicious_pairs = Vec::new();
            for i in 0..checkins.len() {
                for j in (i + 1)..checkins.len() {
                    let (e1, e2) = (checkins[i], checkins[j]);
                    if geo::is_same_city(&e1.location, &e2.location) {
                        continue;
                    }
                    // Unknown distance: cannot conclude, do not flag.
                    let Some(distance) = geo::distance(&e1.location, &e2.location) else {
                        continue;
                    };
                    if distance < min_distance {
                        continue;
                    }

                    let required = distance / speed + overhead;
                    let available = available_gap_hours(e1, e2, required);
                    if available < required {
                        suspicious_pairs.push(json!({
                            "event1_id": e1.event_id,
                            "event2_id": e2.event_id,
                            "city1": e1.location.city,
                            "city2": e2.location.city,
                            "distance_km": distance,
                            "available_hours": available,
                            "required_hours": required,
                        }));
                    }
                }
            }

            if !suspicious_pairs.is_empty() {
                let reference = checkins[0];
                let cities: Vec<&str> = {
                    let mut seen = Vec::new();
                    for e in checkins.iter() {
                        if !seen.contains(&e.location.city.as_str()) {
                            seen.push(e.location.city.as_str());
                        }
                    }
                    seen
                };
                findings.push(
                    Finding::new(reference.event_id.clone())
                        .with("user_id", json!(reference.user_id))
                        .with("user_name", json!(reference.user_name))
                        .with("department", json!(reference.department))
                        .with("date", json!(group.key))
                        .with("suspicious_pairs", json!(suspicious_pairs))
                        .with("distinct_cities", json!(cities))
                        .with("checkin_count", json!(checkins.len())),
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
        let date = finding.get_str("date").unwrap_or("Unknown date");

        let cities = finding
            .data
            .get("distinct_cities")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        let mut details = format!(
            "User {} ({}) from {} checked in at multiple cities on {} under \
             circumstances that appear physically impossible.\n\nSuspicious city pairs:\n",
            user_name, user_id, department, date
        );
        if let Some(pairs) = finding.data.get("suspicious_pairs").and_then(|v| v.as_array()) {
            for (idx, pair) in pairs.iter().enumerate() {
                let get_str = |k: &str| pair.get(k).and_then(|v| v.as_str()).unwrap_or("?");
                let get_num = |k: &str| pair.get(k).and_then(|v| v.as_f64()).unwrap_or(0.0);
                details.push_str(&format!(
                    "{}. {} → {}\n   Distance: {:.1} km\n   Available time: {:.1} hours\n   Required travel time: {:.1} hours\n",
                    idx + 1,
                    get_str("city1"),
                    get_str("city2"),
                    get_num("distance_km"),
                    get_num("available_hours"),
                    get_num("required_hours"),
                ));
            }
        }
        details.push_str(
            "\nThis may indicate check-ins made on the user's behalf, incorrect location \
             data, or missing transportation records between these cities.",
        );

        Ok(AlertText {
            title: format!("Same-Day Multi-City Check-Ins: {}", cities),
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::checkin;

    fn group<'a>(events: Vec<&'a TrajectoryEvent>) -> EventGroup<'a> {
        EventGroup {
            key: "2024-01-01".into(),
            events,
        }
    }

    #[test]
    fn distant_same_day_checkins_are_flagged() {
        // Beijing at 09:00-09:30, Guangzhou at 10:00-10:30: under two hours
        // of slack for ~1900 km.
        let a = checkin(
            "C1",
            "U1",
            "北京市",
            "2024-01-01T09:00:00+08:00",
            "2024-01-01T09:30:00+08:00",
        );
        let b = checkin(
            "C2",
            "U1",
            "广州市",
            "2024-01-01T10:00:00+08:00",
            "2024-01-01T10:30:00+08:00",
        );

        let rule = SameDayMultiCityCheckins::new();
        let detection = rule.detect(&group(vec![&a, &b]), &Context::new()).unwrap();
        let Detection::Many(findings) = detection else {
            panic!("expected findings");
        };
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].primary_event_id, "C1");

        let pairs = findings[0]
            .data
            .get("suspicious_pairs")
            .and_then(|v| v.as_array())
            .unwrap();
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0]["distance_km"].as_f64().unwrap() > 1500.0);
    }

    #[test]
    fn nearby_cities_are_not_suspicious() {
        // Guangzhou ↔ Foshan is ~20 km, well under the distance floor.
        let a = checkin(
            "C1",
            "U1",
            "广州市",
            "2024-01-01T09:00:00+08:00",
            "2024-01-01T09:30:00+08:00",
        );
        let b = checkin(
            "C2",
            "U1",
            "佛山市",
            "2024-01-01T10:00:00+08:00",
            "2024-01-01T10:30:00+08:00",
        );

        let rule = SameDayMultiCityCheckins::new();
        assert!(matches!(
            rule.detect(&group(vec![&a, &b]), &Context::new()).unwrap(),
            Detection::Nothing
        ));
    }

    #[test]
    fn different_users_are_scoped_separately() {
        let a = checkin(
            "C1",
            "U1",
            "北京市",
            "2024-01-01T09:00:00+08:00",
            "2024-01-01T09:30:00+08:00",
        );
        let b = checkin(
            "C2",
            "U2",
            "广州市",
            "2024-01-01T10:00:00+08:00",
            "2024-01-01T10:30:00+08:00",
        );

        let rule = SameDayMultiCityCheckins::new();
        assert!(matches!(
            rule.detect(&group(vec![&a, &b]), &Context::new()).unwrap(),
            Detection::Nothing
        ));
    }

    #[test]
    fn generous_gap_is_plausible() {
        // Morning Beijing, late evening Guangzhou: ~11 hours of slack covers
        // 1900 km at 200 km/h plus overhead.
        let a = checkin(
            "C1",
            "U1",
            "北京市",
            "2024-01-01T08:00:00+08:00",
            "2024-01-01T08:30:00+08:00",
        );
        let b = checkin(
            "C2",
            "U1",
            "广州市",
            "2024-01-01T21:00:00+08:00",
            "2024-01-01T21:30:00+08:00",
        );

        let rule = SameDayMultiCityCheckins::new();
        assert!(matches!(
            rule.detect(&group(vec![&a, &b]), &Context::new()).unwrap(),
            Detection::Nothing
        ));
    }

    #[test]
    fn unknown_city_cannot_conclude() {
        let a = checkin(
            "C1",
            "U1",
            "不存在市",
            "2024-01-01T09:00:00+08:00",
            "2024-01-01T09:30:00+08:00",
        );
        let b = checkin(
            "C2",
            "U1",
            "广州市",
            "2024-01-01T09:40:00+08:00",
            "2024-01-01T10:10:00+08:00",
        );

        let rule = SameDayMultiCityCheckins::new();
        assert!(matches!(
            rule.detect(&group(vec![&a, &b]), &Context::new()).unwrap(),
            Detection::Nothing
        ));
    }
}
