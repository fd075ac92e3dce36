//! Built-in fraud detection rules.
//!
//! Each module implements one rule against the engine's {detect, format}
//! contract. [`builtin_rules`] returns the full table in declaration order,
//! which is also the alert ordering the engine preserves.

pub mod checkin_cities;
pub mod commute_trip;
pub mod hotel_no_travel;
pub mod impossible_sequence;
pub mod taxi_high_value;
pub mod taxi_multicity;

#[cfg(test)]
mod testutil;

use std::sync::Arc;

use sentinel_engine::Rule;

pub use checkin_cities::SameDayMultiCityCheckins;
pub use commute_trip::CommuteTrip;
pub use hotel_no_travel::HotelWithoutTravel;
pub use impossible_sequence::ImpossibleTravelSequence;
pub use taxi_high_value::TaxiHighValue;
pub use taxi_multicity::TaxiMulticityWithoutTransport;

/// The ordered rule table: every built-in rule, ready for `evaluate_batch`.
pub fn builtin_rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(TaxiHighValue::new()),
        Arc::new(CommuteTrip::new()),
        Arc::new(SameDayMultiCityCheckins::new()),
        Arc::new(TaxiMulticityWithoutTransport::new()),
        Arc::new(ImpossibleTravelSequence::new()),
        Arc::new(HotelWithoutTravel::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn rule_ids_are_unique() {
        let rules = builtin_rules();
        let ids: HashSet<String> = rules
            .iter()
            .map(|r| r.descriptor().rule_id.clone())
            .collect();
        assert_eq!(ids.len(), rules.len());
    }
}
