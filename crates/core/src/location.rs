use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A place an expense event happened: a city plus an optional finer-grained
/// address within it.
///
/// Two locations are in the same city iff their `city` strings are equal
/// under exact match; city names carry the municipality suffix (e.g.
/// `北京市`), so no normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    #[serde(default)]
    pub specific_location: Option<String>,
}

impl Location {
    /// Build a city-level location. Fails when the city is empty or
    /// whitespace-only.
    pub fn new(city: impl Into<String>) -> Result<Self, CoreError> {
        let city = city.into();
        if city.trim().is_empty() {
            return Err(CoreError::EmptyCity);
        }
        Ok(Self {
            city,
            specific_location: None,
        })
    }

    /// Build a location with a specific address within the city.
    pub fn with_address(
        city: impl Into<String>,
        specific_location: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let mut loc = Self::new(city)?;
        loc.specific_location = Some(specific_location.into());
        Ok(loc)
    }

    /// The specific address appended to the city, when one is known.
    pub fn full_address(&self) -> Option<String> {
        self.specific_location
            .as_ref()
            .map(|s| format!("{}{}", self.city, s))
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.specific_location {
            Some(s) => write!(f, "{}{}", self.city, s),
            None => write!(f, "{}", self.city),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_city_rejected() {
        assert!(Location::new("").is_err());
        assert!(Location::new("   ").is_err());
    }

    #[test]
    fn full_address_requires_specific_location() {
        let bare = Location::new("北京市").unwrap();
        assert_eq!(bare.full_address(), None);

        let addressed = Location::with_address("北京市", "朝阳区建国路88号").unwrap();
        assert_eq!(
            addressed.full_address().as_deref(),
            Some("北京市朝阳区建国路88号")
        );
    }

    #[test]
    fn same_city_is_exact_match() {
        let a = Location::new("北京市").unwrap();
        let b = Location::with_address("北京市", "海淀区").unwrap();
        let c = Location::new("北京").unwrap();
        assert_eq!(a.city, b.city);
        assert_ne!(a.city, c.city);
    }
}
