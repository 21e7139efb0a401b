use super::{GeoPoint, TravelMode};

use crate::UpstreamError;

use async_trait::async_trait;
use log::*;
use reqwest::StatusCode;
use serde::Deserialize;

#[async_trait]
pub trait RoutingService: Send + Sync {
    /// Road distance in meters from `from` to `to`, or `None` when the
    /// provider finds no route.
    async fn route(
        &self,
        from: GeoPoint,
        to: GeoPoint,
        mode: TravelMode,
    ) -> Result<Option<f64>, UpstreamError>;
}

pub struct OsrmRouter {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    distance: f64,
}

impl OsrmRouter {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        OsrmRouter {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RoutingService for OsrmRouter {
    async fn route(
        &self,
        from: GeoPoint,
        to: GeoPoint,
        mode: TravelMode,
    ) -> Result<Option<f64>, UpstreamError> {
        let url = format!(
            "{}/route/v1/{}/{},{};{},{}",
            self.base_url,
            mode.as_str(),
            from.longitude(),
            from.latitude(),
            to.longitude(),
            to.latitude()
        );
        let response = self
            .client
            .get(url)
            .query(&[("overview", "false")])
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        // Any well-formed answer other than "Ok" ("NoRoute", "NoSegment", ...) is
        // definitive, unless the provider itself is failing or throttling us.
        let parsed = serde_json::from_slice::<RouteResponse>(&body);
        let route = match parsed {
            Ok(route) if route.code == "Ok" && status.is_success() => route,
            Ok(route)
                if route.code == "Ok"
                    || status.is_server_error()
                    || status == StatusCode::TOO_MANY_REQUESTS =>
            {
                warn!(
                    "Routing provider answered with status {} and code {}.",
                    status, route.code
                );
                return Err(UpstreamError::Status(status.as_u16()));
            }
            Ok(route) => {
                debug!(
                    "Routing provider found no route to {} ({}).",
                    to, route.code
                );
                return Ok(None);
            }
            Err(_) if !status.is_success() => {
                warn!("Routing provider answered with status {}.", status);
                return Err(UpstreamError::Status(status.as_u16()));
            }
            Err(err) => return Err(UpstreamError::Decode(err.to_string())),
        };

        match route.routes.first() {
            None => {
                debug!("Routing provider returned no routes to {}.", to);
                Ok(None)
            }
            Some(Route { distance }) if distance.is_finite() && *distance >= 0.0 => {
                trace!("Routed distance to {} is {} m.", to, distance);
                Ok(Some(*distance))
            }
            Some(Route { distance }) => Err(UpstreamError::Decode(format!(
                "invalid route distance {distance}"
            ))),
        }
    }
}
