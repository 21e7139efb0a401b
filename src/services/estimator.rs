//! Turns a destination into a shipping price.
//!
//! The destination is resolved to coordinates (geocoding free text when
//! needed), routed by road from the store's origin, bucketed into
//! 100 m blocks and looked up in the [`PriceTable`].

use std::{future::Future, sync::Arc, time::Duration};

use log::*;
use serde::Serialize;

use super::{
    geocoding::GeocodingService,
    pricing::{blocks_for_distance, PriceTable},
    routing::RoutingService,
    GeoPoint, ShippingRequest, TravelMode,
};
use crate::{ShippingError, UpstreamError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuote {
    pub distance_meters: f64,
    #[serde(rename = "blocks")]
    pub block_count: u64,
    pub shipping_cost: u64,
    #[serde(rename = "destinationCoords")]
    pub destination_coordinates: GeoPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Estimate {
    Quoted(ShippingQuote),
    /// The order total cleared the free-shipping threshold, so only the
    /// destination was resolved.
    FreeShipping { destination: GeoPoint },
}

/// Bounded retry for transport failures. Definitive answers from a
/// provider are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            retries: 0,
            backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    async fn run<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T, UpstreamError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Err(err) if attempt < self.retries => {
                    let delay = self.backoff * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    warn!(
                        "{} failed ({}), retry {}/{} in {:?}.",
                        what, err, attempt, self.retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}

pub struct ShippingEstimator {
    geocoder: Arc<dyn GeocodingService>,
    router: Arc<dyn RoutingService>,
    origin: GeoPoint,
    search_radius_meters: f64,
    price_table: PriceTable,
    free_shipping_threshold: Option<f64>,
    retry: RetryPolicy,
}

impl ShippingEstimator {
    pub fn new(
        geocoder: Arc<dyn GeocodingService>,
        router: Arc<dyn RoutingService>,
        origin: GeoPoint,
        price_table: PriceTable,
    ) -> Self {
        ShippingEstimator {
            geocoder,
            router,
            origin,
            search_radius_meters: 30_000.0,
            price_table,
            free_shipping_threshold: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_search_radius(mut self, radius_meters: f64) -> Self {
        self.search_radius_meters = radius_meters;
        self
    }

    pub fn with_free_shipping_threshold(mut self, threshold: Option<f64>) -> Self {
        self.free_shipping_threshold = threshold;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    pub async fn estimate(&self, request: &ShippingRequest) -> Result<ShippingQuote, ShippingError> {
        let destination = self.resolve_destination(request).await?;
        self.quote(destination).await
    }

    /// Like [`estimate`](Self::estimate), but skips routing and pricing when
    /// `order_total` reaches the configured free-shipping threshold.
    pub async fn estimate_order(
        &self,
        request: &ShippingRequest,
        order_total: Option<f64>,
    ) -> Result<Estimate, ShippingError> {
        let destination = self.resolve_destination(request).await?;
        match (self.free_shipping_threshold, order_total) {
            (Some(threshold), Some(total)) if total >= threshold => {
                info!(
                    "Order total {} clears free shipping threshold {}.",
                    total, threshold
                );
                Ok(Estimate::FreeShipping { destination })
            }
            _ => self.quote(destination).await.map(Estimate::Quoted),
        }
    }

    async fn resolve_destination(&self, request: &ShippingRequest) -> Result<GeoPoint, ShippingError> {
        let text = match request {
            ShippingRequest::Coordinates(point) => return Ok(*point),
            ShippingRequest::Destination(text) => text.trim(),
        };
        if text.is_empty() {
            return Err(ShippingError::InvalidInput(
                "destination must not be empty".to_string(),
            ));
        }

        let candidates = self
            .retry
            .run("Geocoding", || {
                self.geocoder
                    .resolve(text, self.origin, self.search_radius_meters)
            })
            .await?;
        let destination = candidates
            .first()
            .copied()
            .ok_or(ShippingError::GeocodingFailed)?;
        debug!("Destination {:?} resolved to {}.", text, destination);
        Ok(destination)
    }

    async fn quote(&self, destination: GeoPoint) -> Result<ShippingQuote, ShippingError> {
        let distance_meters = self
            .retry
            .run("Routing", || {
                self.router
                    .route(self.origin, destination, TravelMode::Driving)
            })
            .await?
            .ok_or(ShippingError::RoutingFailed)?;

        let straight_line = self.origin.haversine_distance(&destination);
        debug!(
            "Routed distance {} m, straight-line distance {} m.",
            distance_meters, straight_line
        );

        let block_count = blocks_for_distance(distance_meters);
        let shipping_cost = self.price_table.price_for(block_count);
        info!(
            "Quoted {} for {} blocks ({} m) to {}.",
            shipping_cost, block_count, distance_meters, destination
        );

        Ok(ShippingQuote {
            distance_meters,
            block_count,
            shipping_cost,
            destination_coordinates: destination,
        })
    }
}
