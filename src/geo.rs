use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to `other` in kilometres.
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        haversine_km(self, other)
    }
}

/// Great-circle distance between two points, approximating Earth as a sphere.
pub fn haversine_km(a: &Coordinates, b: &Coordinates) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let s1 = (dlat / 2.0).sin();
    let s2 = (dlng / 2.0).sin();
    let h = s1 * s1 + lat1.cos() * lat2.cos() * s2 * s2;
    // Rounding can push h a hair above 1 for antipodal points.
    2.0 * EARTH_RADIUS_KM * h.min(1.0).sqrt().asin()
}

/// Round to two decimal places, the precision distances are reported at.
pub fn round_km(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        let p = Coordinates::new(48.8566, 2.3522);
        assert_eq!(haversine_km(&p, &p), 0.0);
    }

    #[test]
    fn test_paris_london() {
        let paris = Coordinates::new(48.8566, 2.3522);
        let london = Coordinates::new(51.5074, -0.1278);
        let d = paris.distance_km(&london);
        assert!((d - 343.5).abs() < 1.0, "got {d}");
    }

    #[test]
    fn test_symmetric() {
        let a = Coordinates::new(35.6762, 139.6503);
        let b = Coordinates::new(34.6937, 135.5023);
        assert!((haversine_km(&a, &b) - haversine_km(&b, &a)).abs() < 1e-9);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let a = Coordinates::new(0.0, 0.0);
        let b = Coordinates::new(1.0, 0.0);
        assert!((haversine_km(&a, &b) - 111.19).abs() < 0.01);
    }

    #[test]
    fn test_round_km() {
        assert_eq!(round_km(10.004), 10.0);
        assert_eq!(round_km(3.456), 3.46);
    }
}
