//! Anycast routing simulator
//!
//! Core library for modelling a geographically distributed server network as a
//! weighted graph and comparing shortest-path routing strategies over it.

pub mod config;
pub mod coordinates;
pub mod graph;
pub mod harness;
pub mod latency;
pub mod metrics;
pub mod pathfinding;
pub mod scalability;
pub mod telemetry;

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A WGS-84 geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    /// Latitude in degrees, positive north
    pub latitude: f64,
    /// Longitude in degrees, positive east
    pub longitude: f64,
}

impl GeoCoordinate {
    /// Create a new coordinate.
    /// Returns None if latitude is outside [-90, 90], longitude outside
    /// [-180, 180], or either value is not finite.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
        })
    }

    /// Great-circle distance in kilometres (haversine).
    ///
    /// Symmetric and obeys the triangle inequality, so it can back an
    /// admissible A* heuristic.
    pub fn distance_km(&self, other: &Self) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        // Clamp guards against a > 1 from rounding on antipodal points
        let c = 2.0 * a.sqrt().min(1.0).asin();
        EARTH_RADIUS_KM * c
    }
}

impl std::fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beijing() -> GeoCoordinate {
        GeoCoordinate::new(39.908657170664284, 116.40744366071854).unwrap()
    }

    fn seoul() -> GeoCoordinate {
        GeoCoordinate::new(37.570588255250925, 126.97830876553707).unwrap()
    }

    #[test]
    fn test_coordinate_creation() {
        assert!(GeoCoordinate::new(0.0, 0.0).is_some());
        assert!(GeoCoordinate::new(90.0, 180.0).is_some());
        assert!(GeoCoordinate::new(90.1, 0.0).is_none());
        assert!(GeoCoordinate::new(0.0, -180.5).is_none());
        assert!(GeoCoordinate::new(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn test_distance_self_is_zero() {
        let p = beijing();
        assert!(p.distance_km(&p) < 1e-9);
    }

    #[test]
    fn test_distance_symmetry() {
        let d1 = beijing().distance_km(&seoul());
        let d2 = seoul().distance_km(&beijing());
        assert!((d1 - d2).abs() < 1e-9);
    }

    #[test]
    fn test_distance_known_value() {
        // Beijing to Seoul is roughly 955 km along the great circle
        let d = beijing().distance_km(&seoul());
        assert!((d - 955.0).abs() < 15.0, "unexpected distance {}", d);
    }

    #[test]
    fn test_quarter_meridian() {
        let equator = GeoCoordinate::new(0.0, 0.0).unwrap();
        let pole = GeoCoordinate::new(90.0, 0.0).unwrap();
        let expected = EARTH_RADIUS_KM * std::f64::consts::FRAC_PI_2;
        assert!((equator.distance_km(&pole) - expected).abs() < 1e-6);
    }
}
