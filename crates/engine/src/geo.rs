//! Spatial helpers: city coordinate resolution, great-circle distance, and
//! travel-time estimates.
//!
//! Distance is resolved at city granularity from a built-in gazetteer.
//! An unresolvable city yields `None` ("unknown"), never zero; callers must
//! treat unknown distance as "cannot conclude".

use std::collections::HashMap;
use std::sync::OnceLock;

use sentinel_core::Location;

/// Mean earth radius in kilometers; haversine over this is accurate to well
/// under a kilometer at city scale.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default assumed travel speed for travel-time estimates, in km/h.
pub const DEFAULT_TRAVEL_SPEED_KMH: f64 = 120.0;

/// Approximate coordinates for major municipalities, keyed by the full city
/// name including the municipality suffix.
const CITY_COORDINATES: &[(&str, f64, f64)] = &[
    ("北京市", 39.9042, 116.4074),
    ("上海市", 31.2304, 121.4737),
    ("广州市", 23.1291, 113.2644),
    ("深圳市", 22.5431, 114.0579),
    ("天津市", 39.3434, 117.3616),
    ("重庆市", 29.5630, 106.5516),
    ("杭州市", 30.2741, 120.1551),
    ("南京市", 32.0603, 118.7969),
    ("苏州市", 31.2989, 120.5853),
    ("无锡市", 31.4912, 120.3119),
    ("宁波市", 29.8683, 121.5440),
    ("成都市", 30.5728, 104.0668),
    ("武汉市", 30.5928, 114.3055),
    ("西安市", 34.3416, 108.9398),
    ("长沙市", 28.2282, 112.9388),
    ("郑州市", 34.7466, 113.6254),
    ("青岛市", 36.0671, 120.3826),
    ("济南市", 36.6512, 117.1201),
    ("大连市", 38.9140, 121.6147),
    ("沈阳市", 41.8057, 123.4315),
    ("哈尔滨市", 45.8038, 126.5349),
    ("石家庄市", 38.0428, 114.5149),
    ("厦门市", 24.4798, 118.0894),
    ("福州市", 26.0745, 119.2965),
    ("昆明市", 24.8801, 102.8329),
    ("贵阳市", 26.6470, 106.6302),
    ("南宁市", 22.8170, 108.3665),
    ("合肥市", 31.8206, 117.2272),
    ("东莞市", 23.0207, 113.7518),
    ("佛山市", 23.0218, 113.1219),
];

fn gazetteer() -> &'static HashMap<&'static str, (f64, f64)> {
    static GAZETTEER: OnceLock<HashMap<&'static str, (f64, f64)>> = OnceLock::new();
    GAZETTEER.get_or_init(|| {
        CITY_COORDINATES
            .iter()
            .map(|&(city, lat, lon)| (city, (lat, lon)))
            .collect()
    })
}

/// Resolve a city name to `(latitude, longitude)`. Exact-match lookup.
pub fn coordinates_of(city: &str) -> Option<(f64, f64)> {
    gazetteer().get(city).copied()
}

fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Great-circle distance in kilometers between two locations' cities.
/// `None` when either city is not in the gazetteer.
pub fn distance(a: &Location, b: &Location) -> Option<f64> {
    let ca = coordinates_of(&a.city)?;
    let cb = coordinates_of(&b.city)?;
    Some(haversine_km(ca, cb))
}

/// Whether two locations are within `max_km` of each other. False when the
/// distance is unknown.
pub fn is_within_distance(a: &Location, b: &Location, max_km: f64) -> bool {
    matches!(distance(a, b), Some(d) if d <= max_km)
}

/// Estimated hours to travel between two locations at `speed_kmh`.
/// Unknown distance propagates as `None`.
pub fn travel_time(a: &Location, b: &Location, speed_kmh: f64) -> Option<f64> {
    distance(a, b).map(|d| d / speed_kmh)
}

/// Exact string equality of city fields, municipality suffix included.
pub fn is_same_city(a: &Location, b: &Location) -> bool {
    a.city == b.city
}
