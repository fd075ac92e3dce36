use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::location::Location;

/// Default working-hours bounds, in fractional wall-clock hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: f64,
    pub end: f64,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: 9.0,
            end: 18.0,
        }
    }
}

/// Read-only configuration snapshot passed to every detect/format call.
///
/// Lifetime is one evaluation batch; the external collaborator builds it and
/// the engine never mutates it. Lookups that miss return `None` or the
/// caller's documented default; a missing key is never an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Context {
    /// City → default office location in that city.
    #[serde(default)]
    pub office_locations: HashMap<String, Location>,
    /// User id → the user's normal work location.
    #[serde(default)]
    pub work_locations: HashMap<String, Location>,
    /// User id → the user's home location.
    #[serde(default)]
    pub home_locations: HashMap<String, Location>,
    #[serde(default)]
    pub working_hours: WorkingHours,
    /// Rule-specific numeric thresholds, consumed via get-with-default.
    #[serde(default)]
    thresholds: HashMap<String, f64>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_office_location(mut self, city: impl Into<String>, location: Location) -> Self {
        self.office_locations.insert(city.into(), location);
        self
    }

    pub fn with_work_location(mut self, user_id: impl Into<String>, location: Location) -> Self {
        self.work_locations.insert(user_id.into(), location);
        self
    }

    pub fn with_home_location(mut self, user_id: impl Into<String>, location: Location) -> Self {
        self.home_locations.insert(user_id.into(), location);
        self
    }

    pub fn with_working_hours(mut self, start: f64, end: f64) -> Self {
        self.working_hours = WorkingHours { start, end };
        self
    }

    pub fn with_threshold(mut self, key: impl Into<String>, value: f64) -> Self {
        self.thresholds.insert(key.into(), value);
        self
    }

    /// Look up a rule-specific threshold, falling back to the rule's
    /// documented default when the key is absent.
    pub fn threshold(&self, key: &str, default: f64) -> f64 {
        self.thresholds.get(key).copied().unwrap_or(default)
    }

    pub fn work_location(&self, user_id: &str) -> Option<&Location> {
        self.work_locations.get(user_id)
    }

    pub fn home_location(&self, user_id: &str) -> Option<&Location> {
        self.home_locations.get(user_id)
    }

    pub fn office_location(&self, city: &str) -> Option<&Location> {
        self.office_locations.get(city)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_falls_back_to_default() {
        let ctx = Context::new().with_threshold("taxi_high_value_threshold", 80.0);
        assert_eq!(ctx.threshold("taxi_high_value_threshold", 50.0), 80.0);
        assert_eq!(ctx.threshold("missing_key", 50.0), 50.0);
    }

    #[test]
    fn location_lookups_miss_as_none() {
        let work = Location::new("北京市").unwrap();
        let ctx = Context::new().with_work_location("U1", work.clone());

        assert_eq!(ctx.work_location("U1"), Some(&work));
        assert_eq!(ctx.work_location("U2"), None);
        assert_eq!(ctx.home_location("U1"), None);
    }

    #[test]
    fn default_working_hours() {
        let ctx = Context::new();
        assert_eq!(ctx.working_hours.start, 9.0);
        assert_eq!(ctx.working_hours.end, 18.0);
    }
}
