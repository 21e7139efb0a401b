use derive_more::Display;
use serde::Serialize;

use crate::ShippingError;

pub mod estimator;
pub mod geocoding;
pub mod pricing;
pub mod routing;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A point on the map, kept in the `[longitude, latitude]` order every
/// provider we talk to uses.
#[derive(Debug, Display, Clone, Copy, PartialEq, Serialize)]
#[display(fmt = "[{}, {}]", longitude, latitude)]
#[serde(into = "[f64; 2]")]
pub struct GeoPoint {
    longitude: f64,
    latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, ShippingError> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(ShippingError::InvalidInput(
                "coordinates must be finite numbers".to_string(),
            ));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ShippingError::InvalidInput(format!(
                "longitude {longitude} out of range"
            )));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ShippingError::InvalidInput(format!(
                "latitude {latitude} out of range"
            )));
        }
        Ok(GeoPoint {
            longitude,
            latitude,
        })
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Great-circle distance in meters.
    pub fn haversine_distance(&self, other: &GeoPoint) -> f64 {
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.latitude.to_radians().cos()
                * other.latitude.to_radians().cos()
                * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_METERS * c
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(point: GeoPoint) -> Self {
        [point.longitude, point.latitude]
    }
}

impl TryFrom<[f64; 2]> for GeoPoint {
    type Error = ShippingError;

    fn try_from([longitude, latitude]: [f64; 2]) -> Result<Self, Self::Error> {
        GeoPoint::new(longitude, latitude)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShippingRequest {
    Destination(String),
    Coordinates(GeoPoint),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelMode {
    Driving,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(GeoPoint::new(-180.5, 0.0).is_err());
        assert!(GeoPoint::new(0.0, 90.01).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_err());
        assert!(GeoPoint::new(180.0, -90.0).is_ok());
    }

    #[test]
    fn haversine_matches_known_distance() {
        // One degree of latitude along a meridian.
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(0.0, 1.0).unwrap();
        let d = a.haversine_distance(&b);
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");
        assert_eq!(a.haversine_distance(&a), 0.0);
    }

    #[test]
    fn serializes_as_lon_lat_pair() {
        let point = GeoPoint::new(-64.34992, -33.13067).unwrap();
        let json = serde_json::to_value(point).unwrap();
        assert_eq!(json, serde_json::json!([-64.34992, -33.13067]));
        assert_eq!(point.to_string(), "[-64.34992, -33.13067]");
    }
}
