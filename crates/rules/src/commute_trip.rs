//! Flags taxi rides used for home/work commuting on workdays, which company
//! policy disallows. Late-night rides (after 22:30) are permitted.

use anyhow::Result;
use serde_json::json;

use sentinel_core::{Context, EventDetails, EventKind};
use sentinel_engine::{
    geo, temporal, AlertText, Detection, EventGroup, Finding, GroupingStrategy, Rule,
    RuleDescriptor, Severity,
};

/// Rides starting at or after this wall-clock hour are policy-exempt.
const LATE_NIGHT_CUTOFF: f64 = 22.5;

/// Morning and evening commute bands, in fractional hours.
const MORNING: (f64, f64) = (7.0, 10.0);
const EVENING: (f64, f64) = (17.0, 19.5);

/// Proximity radius for matching a ride endpoint to home/work, in km.
const ENDPOINT_RADIUS_KM: f64 = 1.0;

pub struct CommuteTrip {
    descriptor: RuleDescriptor,
}

impl CommuteTrip {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor {
                rule_id: "FD-POLICY-COMMUTE-TRIP".into(),
                title: "Workday Commute Taxi Usage".into(),
                description: "Detects when employees use taxis for regular commuting between \
                              home and workplace during workdays, which violates company \
                              policy. Late night commutes (after 10:30 PM) are allowed."
                    .into(),
                severity: Severity::Medium,
                event_kinds: vec![EventKind::Taxi],
                grouping: GroupingStrategy::Individual,
            },
        }
    }
}

impl Rule for CommuteTrip {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn detect(&self, group: &EventGroup<'_>, ctx: &Context) -> Result<Detection> {
        if group.events.len() != 1 {
            return Ok(Detection::Nothing);
        }
        let event = group.events[0];
        let EventDetails::Taxi {
            from_location,
            to_location,
            is_self_paid,
        } = &event.details
        else {
            return Ok(Detection::Nothing);
        };
        if *is_self_paid {
            return Ok(Detection::Nothing);
        }

        // Both anchor locations must be known for this user.
        let (Some(home), Some(work)) = (
            ctx.home_location(&event.user_id),
            ctx.work_location(&event.user_id),
        ) else {
            return Ok(Detection::Nothing);
        };

        let start = event.time_window.earliest_start;
        if temporal::is_weekend(start) {
            return Ok(Detection::Nothing);
        }
        if temporal::is_within_time_range(start, LATE_NIGHT_CUTOFF, 24.0) {
            return Ok(Detection::Nothing);
        }

        let is_morning = temporal::is_within_time_range(start, MORNING.0, MORNING.1);
        let is_evening = temporal::is_within_time_range(start, EVENING.0, EVENING.1);
        if !is_morning && !is_evening {
            return Ok(Detection::Nothing);
        }

        let home_to_work = geo::is_within_distance(from_location, home, ENDPOINT_RADIUS_KM)
            && geo::is_within_distance(to_location, work, ENDPOINT_RADIUS_KM);
        let work_to_home = geo::is_within_distance(from_location, work, ENDPOINT_RADIUS_KM)
            && geo::is_within_distance(to_location, home, ENDPOINT_RADIUS_KM);
        if !home_to_work && !work_to_home {
            return Ok(Detection::Nothing);
        }

        let finding = Finding::new(event.event_id.clone())
            .with(
                "commute_type",
                json!(if home_to_work { "home-to-work" } else { "work-to-home" }),
            )
            .with(
                "commute_period",
                json!(if is_morning { "morning" } else { "evening" }),
            )
            .with("amount", json!(event.amount))
            .with("from_location", json!(from_location.to_string()))
            .with("to_location", json!(to_location.to_string()))
            .with("home_city", json!(home.city))
            .with("work_city", json!(work.city));
        Ok(Detection::One(finding))
    }

    fn format_alert(
        &self,
        group: &EventGroup<'_>,
        finding: &Finding,
        _ctx: &Context,
    ) -> Result<AlertText> {
        let event = group.events[0];
        let commute_type = finding.get_str("commute_type").unwrap_or("unknown");
        let period = finding.get_str("commute_period").unwrap_or("unknown");
        let from = finding.get_str("from_location").unwrap_or("Unknown");
        let to = finding.get_str("to_location").unwrap_or("Unknown");

        Ok(AlertText {
            title: format!(
                "Commute Taxi on Workday: {} ({} yuan)",
                commute_type, event.amount
            ),
            details: format!(
                "User {} ({}) took a {} taxi ride on {} from {} to {} costing {} yuan. \
                 This is a {} commute, and company policy does not cover taxi commuting \
                 on workdays before 22:30.",
                event.user_name,
                event.user_id,
                period,
                event.time_window.earliest_start.format("%Y-%m-%d %H:%M"),
                from,
                to,
                event.amount,
                commute_type,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{city, taxi};

    fn ctx() -> Context {
        Context::new()
            .with_home_location("U1", city("佛山市"))
            .with_work_location("U1", city("广州市"))
    }

    fn group(event: &sentinel_core::TrajectoryEvent) -> EventGroup<'_> {
        EventGroup {
            key: event.event_id.clone(),
            events: vec![event],
        }
    }

    // 2024-01-03 is a Wednesday.

    #[test]
    fn morning_commute_is_flagged() {
        let event = taxi(
            "T1",
            "U1",
            28.0,
            "佛山市",
            "广州市",
            "2024-01-03T08:30:00+08:00",
            "2024-01-03T09:10:00+08:00",
        );
        let rule = CommuteTrip::new();
        let Detection::One(finding) = rule.detect(&group(&event), &ctx()).unwrap() else {
            panic!("expected finding");
        };
        assert_eq!(finding.get_str("commute_type"), Some("home-to-work"));
        assert_eq!(finding.get_str("commute_period"), Some("morning"));
    }

    #[test]
    fn evening_reverse_direction_is_flagged() {
        let event = taxi(
            "T1",
            "U1",
            28.0,
            "广州市",
            "佛山市",
            "2024-01-03T18:00:00+08:00",
            "2024-01-03T18:40:00+08:00",
        );
        let rule = CommuteTrip::new();
        let Detection::One(finding) = rule.detect(&group(&event), &ctx()).unwrap() else {
            panic!("expected finding");
        };
        assert_eq!(finding.get_str("commute_type"), Some("work-to-home"));
        assert_eq!(finding.get_str("commute_period"), Some("evening"));
    }

    #[test]
    fn weekend_and_late_night_are_exempt() {
        let rule = CommuteTrip::new();

        // 2024-01-06 is a Saturday.
        let weekend = taxi(
            "T1",
            "U1",
            28.0,
            "佛山市",
            "广州市",
            "2024-01-06T08:30:00+08:00",
            "2024-01-06T09:10:00+08:00",
        );
        assert!(matches!(
            rule.detect(&group(&weekend), &ctx()).unwrap(),
            Detection::Nothing
        ));

        let late = taxi(
            "T2",
            "U1",
            28.0,
            "广州市",
            "佛山市",
            "2024-01-03T22:45:00+08:00",
            "2024-01-03T23:20:00+08:00",
        );
        assert!(matches!(
            rule.detect(&group(&late), &ctx()).unwrap(),
            Detection::Nothing
        ));
    }

    #[test]
    fn unknown_home_or_work_cannot_conclude() {
        let event = taxi(
            "T1",
            "U9",
            28.0,
            "佛山市",
            "广州市",
            "2024-01-03T08:30:00+08:00",
            "2024-01-03T09:10:00+08:00",
        );
        let rule = CommuteTrip::new();
        assert!(matches!(
            rule.detect(&group(&event), &Context::new()).unwrap(),
            Detection::Nothing
        ));
    }

    #[test]
    fn midday_ride_is_not_a_commute() {
        let event = taxi(
            "T1",
            "U1",
            28.0,
            "佛山市",
            "广州市",
            "2024-01-03T13:00:00+08:00",
            "2024-01-03T13:40:00+08:00",
        );
        let rule = CommuteTrip::new();
        assert!(matches!(
            rule.detect(&group(&event), &ctx()).unwrap(),
            Detection::Nothing
        ));
    }
}
