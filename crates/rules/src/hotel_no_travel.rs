//! Flags hotel stays outside a user's work city with no flight or railway
//! arrival that would justify being there.

use anyhow::Result;
use serde_json::json;

use sentinel_core::{Context, EventDetails, EventKind, TrajectoryEvent};
use sentinel_engine::{
    geo, temporal, AlertText, Detection, EventGroup, Finding, GroupingStrategy, Rule,
    RuleDescriptor, Severity, TimeUnit,
};

/// Minimum stay length before a remote hotel stay is worth flagging, nights.
pub const MIN_STAY_KEY: &str = "min_suspicious_stay_nights";
pub const DEFAULT_MIN_STAY_NIGHTS: f64 = 1.0;

/// A justifying arrival must end no more than this long before check-in.
const MAX_ARRIVAL_GAP_HOURS: f64 = 24.0;

pub struct HotelWithoutTravel {
    descriptor: RuleDescriptor,
}

impl HotelWithoutTravel {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor {
                rule_id: "FD-HOTEL-NO-TRAVEL".into(),
                title: "Hotel Stay Without Travel Justification".into(),
                description: "Detects when a user claims hotel expenses in a city different \
                              from their work location without corresponding travel events \
                              to justify the stay"
                    .into(),
                severity: Severity::High,
                event_kinds: vec![EventKind::Hotel, EventKind::Flight, EventKind::Railway],
                grouping: GroupingStrategy::sliding(3),
            },
        }
    }
}

/// Whether a travel event of the same user arrives in `city` within the
/// allowed gap before (or any time after) the hotel check-in.
fn justifies_stay(travel: &TrajectoryEvent, hotel: &TrajectoryEvent, city: &str) -> bool {
    if travel.user_id != hotel.user_id {
        return false;
    }
    let Some((_, to)) = travel.route() else {
        return false;
    };
    if to.city != city {
        return false;
    }
    let gap_hours = temporal::time_difference(
        travel.time_window.latest_end,
        hotel.time_window.earliest_start,
        TimeUnit::Hours,
    );
    gap_hours <= MAX_ARRIVAL_GAP_HOURS
}

impl Rule for HotelWithoutTravel {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn detect(&self, group: &EventGroup<'_>, ctx: &Context) -> Result<Detection> {
        let hotels: Vec<&TrajectoryEvent> = group
            .events
            .iter()
            .copied()
            .filter(|e| e.kind() == EventKind::Hotel)
            .collect();
        if hotels.is_empty() {
            return Ok(Detection::Nothing);
        }
        let travels: Vec<&TrajectoryEvent> = group
            .events
            .iter()
            .copied()
            .filter(|e| matches!(e.kind(), EventKind::Flight | EventKind::Railway))
            .collect();

        let min_stay = ctx.threshold(MIN_STAY_KEY, DEFAULT_MIN_STAY_NIGHTS);
        let mut findings = Vec::new();

        for hotel in hotels {
            let hotel_city = hotel.location.city.as_str();

            // Unknown work location: cannot conclude.
            let Some(work) = ctx.work_location(&hotel.user_id) else {
                continue;
            };
            if geo::is_same_city(&hotel.location, work) {
                continue;
            }

            let stay_nights = temporal::time_difference(
                hotel.time_window.earliest_start,
                hotel.time_window.latest_end,
                TimeUnit::Days,
            );
            if stay_nights < min_stay {
                continue;
            }

            let justified = travels.iter().any(|t| justifies_stay(t, hotel, hotel_city));
            if justified {
                continue;
            }

            let (hotel_name, room_type) = match &hotel.details {
                EventDetails::Hotel {
                    hotel_name,
                    room_type,
                } => (hotel_name.as_str(), room_type.as_str()),
                _ => ("Unknown", "Unknown"),
            };

            findings.push(
                Finding::new(hotel.event_id.clone())
                    .with("user_id", json!(hotel.user_id))
                    .with("user_name", json!(hotel.user_name))
                    .with("department", json!(hotel.department))
                    .with("hotel_name", json!(hotel_name))
                    .with("room_type", json!(room_type))
                    .with("hotel_city", json!(hotel_city))
                    .with("work_city", json!(work.city))
                    .with("stay_duration", json!(stay_nights))
                    .with("amount", json!(hotel.amount))
                    .with(
                        "check_in",
                        json!(hotel.time_window.earliest_start.format("%Y-%m-%d").to_string()),
                    )
                    .with(
                        "check_out",
                        json!(hotel.time_window.latest_end.format("%Y-%m-%d").to_string()),
                    ),
            );
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
        let hotel_city = finding.get_str("hotel_city").unwrap_or("Unknown");
        let work_city = finding.get_str("work_city").unwrap_or("Unknown");
        let stay = finding.get_f64("stay_duration").unwrap_or(0.0);
        let amount = finding.get_f64("amount").unwrap_or(0.0);

        Ok(AlertText {
            title: format!(
                "Hotel Stay Without Travel Justification: {} ({:.2} yuan)",
                hotel_city, amount
            ),
            details: format!(
                "User {} ({}) from {} claimed expenses for a {:.1}-night hotel stay at {} \
                 in {} from {} to {} costing {:.2} yuan.\n\nThis stay is potentially \
                 suspicious because:\n- The hotel is in {}, which is different from the \
                 user's work city of {}\n- No corresponding travel (flight or train) was \
                 found to justify travel to {}\n\nRoom type: {}",
                finding.get_str("user_name").unwrap_or("Unknown"),
                finding.get_str("user_id").unwrap_or("Unknown"),
                finding.get_str("department").unwrap_or("Unknown"),
                stay,
                finding.get_str("hotel_name").unwrap_or("Unknown"),
                hotel_city,
                finding.get_str("check_in").unwrap_or("Unknown"),
                finding.get_str("check_out").unwrap_or("Unknown"),
                amount,
                hotel_city,
                work_city,
                hotel_city,
                finding.get_str("room_type").unwrap_or("Unknown"),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{city, flight, hotel};

    fn ctx() -> Context {
        Context::new().with_work_location("U1", city("北京市"))
    }

    fn group<'a>(events: Vec<&'a TrajectoryEvent>) -> EventGroup<'a> {
        EventGroup {
            key: events[0].event_id.clone(),
            events,
        }
    }

    #[test]
    fn remote_stay_without_arrival_is_flagged() {
        // Two-night stay in Hangzhou, work city Beijing, no travel events.
        let h = hotel(
            "H1",
            "U1",
            "杭州市",
            960.0,
            "2024-01-10T14:00:00+08:00",
            "2024-01-12T14:00:00+08:00",
        );

        let rule = HotelWithoutTravel::new();
        let Detection::Many(findings) = rule.detect(&group(vec![&h]), &ctx()).unwrap() else {
            panic!("expected findings");
        };
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].primary_event_id, "H1");
        assert_eq!(findings[0].get_str("hotel_city"), Some("杭州市"));
        assert_eq!(findings[0].get_str("work_city"), Some("北京市"));
        assert_eq!(findings[0].get_f64("stay_duration"), Some(2.0));
    }

    #[test]
    fn arrival_within_a_day_justifies_the_stay() {
        let f = flight(
            "F1",
            "U1",
            "北京市",
            "杭州市",
            "2024-01-10T08:00:00+08:00",
            "2024-01-10T10:30:00+08:00",
        );
        let h = hotel(
            "H1",
            "U1",
            "杭州市",
            960.0,
            "2024-01-10T14:00:00+08:00",
            "2024-01-12T14:00:00+08:00",
        );

        let rule = HotelWithoutTravel::new();
        assert!(matches!(
            rule.detect(&group(vec![&f, &h]), &ctx()).unwrap(),
            Detection::Nothing
        ));
    }

    #[test]
    fn stale_arrival_does_not_justify() {
        // Flight landed four days before check-in.
        let f = flight(
            "F1",
            "U1",
            "北京市",
            "杭州市",
            "2024-01-06T08:00:00+08:00",
            "2024-01-06T10:30:00+08:00",
        );
        let h = hotel(
            "H1",
            "U1",
            "杭州市",
            960.0,
            "2024-01-10T14:00:00+08:00",
            "2024-01-12T14:00:00+08:00",
        );

        let rule = HotelWithoutTravel::new();
        assert!(matches!(
            rule.detect(&group(vec![&f, &h]), &ctx()).unwrap(),
            Detection::Many(_)
        ));
    }

    #[test]
    fn work_city_stay_is_clean() {
        let h = hotel(
            "H1",
            "U1",
            "北京市",
            960.0,
            "2024-01-10T14:00:00+08:00",
            "2024-01-12T14:00:00+08:00",
        );

        let rule = HotelWithoutTravel::new();
        assert!(matches!(
            rule.detect(&group(vec![&h]), &ctx()).unwrap(),
            Detection::Nothing
        ));
    }

    #[test]
    fn short_stay_is_ignored() {
        // Half-day stay falls under the default one-night floor.
        let h = hotel(
            "H1",
            "U1",
            "杭州市",
            480.0,
            "2024-01-10T14:00:00+08:00",
            "2024-01-10T20:00:00+08:00",
        );

        let rule = HotelWithoutTravel::new();
        assert!(matches!(
            rule.detect(&group(vec![&h]), &ctx()).unwrap(),
            Detection::Nothing
        ));
    }

    #[test]
    fn unknown_work_location_cannot_conclude() {
        let h = hotel(
            "H1",
            "U9",
            "杭州市",
            960.0,
            "2024-01-10T14:00:00+08:00",
            "2024-01-12T14:00:00+08:00",
        );

        let rule = HotelWithoutTravel::new();
        assert!(matches!(
            rule.detect(&group(vec![&h]), &Context::new()).unwrap(),
            Detection::Nothing
        ));
    }
}
