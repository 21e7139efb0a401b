use super::GeoPoint;

use crate::UpstreamError;

use async_trait::async_trait;
use log::*;
use serde::Deserialize;

#[async_trait]
pub trait GeocodingService: Send + Sync {
    /// Candidates for `text` ordered by relevance, biased toward `bias` and
    /// limited to `radius_meters` around it. No match is an empty vector.
    async fn resolve(
        &self,
        text: &str,
        bias: GeoPoint,
        radius_meters: f64,
    ) -> Result<Vec<GeoPoint>, UpstreamError>;
}

pub struct OpenRouteServiceGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

impl OpenRouteServiceGeocoder {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        OpenRouteServiceGeocoder {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl GeocodingService for OpenRouteServiceGeocoder {
    async fn resolve(
        &self,
        text: &str,
        bias: GeoPoint,
        radius_meters: f64,
    ) -> Result<Vec<GeoPoint>, UpstreamError> {
        let lon = bias.longitude().to_string();
        let lat = bias.latitude().to_string();
        // Pelias takes the boundary circle radius in kilometers.
        let radius_km = (radius_meters / 1000.0).to_string();

        let response = self
            .client
            .get(format!("{}/geocode/search", self.base_url))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("text", text),
                ("focus.point.lon", lon.as_str()),
                ("focus.point.lat", lat.as_str()),
                ("boundary.circle.lon", lon.as_str()),
                ("boundary.circle.lat", lat.as_str()),
                ("boundary.circle.radius", radius_km.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Geocoding provider answered with status {}.", status);
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let collection: FeatureCollection = response.json().await?;
        let candidates: Vec<GeoPoint> = collection
            .features
            .into_iter()
            .filter_map(|feature| match feature.geometry.coordinates.as_slice() {
                [lon, lat, ..] => GeoPoint::new(*lon, *lat).ok(),
                _ => None,
            })
            .collect();
        trace!(
            "Received {} candidates from geocoding provider.",
            candidates.len()
        );
        Ok(candidates)
    }
}
