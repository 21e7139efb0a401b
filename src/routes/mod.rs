use std::{sync::Arc, time::Duration};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::CONTENT_TYPE, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::*;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::{
    services::{
        estimator::{Estimate, ShippingEstimator},
        GeoPoint, ShippingRequest,
    },
    ShippingError,
};

/// Body of `POST /api/calculateShipping`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingPayload {
    destination: Option<String>,
    /// `[longitude, latitude]`, e.g. from a draggable map pin. Anything else
    /// is ignored in favor of `destination`.
    coords: Option<Value>,
    order_total: Option<f64>,
}

impl TryFrom<ShippingPayload> for ShippingRequest {
    type Error = ShippingError;

    fn try_from(payload: ShippingPayload) -> Result<Self, Self::Error> {
        let sent_coords = payload.coords.is_some();
        let coords = payload.coords.as_ref().and_then(coordinate_pair);
        match (coords, payload.destination) {
            (Some(coords), _) => Ok(ShippingRequest::Coordinates(GeoPoint::try_from(coords)?)),
            (None, Some(text)) if !text.trim().is_empty() => Ok(ShippingRequest::Destination(text)),
            (None, Some(_)) => Err(ShippingError::InvalidInput(
                "'destination' must not be empty".to_string(),
            )),
            (None, None) if sent_coords => Err(ShippingError::InvalidInput(
                "'coords' must be [longitude, latitude]".to_string(),
            )),
            (None, None) => Err(ShippingError::InvalidInput(
                "send either 'destination' or 'coords'".to_string(),
            )),
        }
    }
}

fn coordinate_pair(value: &Value) -> Option<[f64; 2]> {
    match value.as_array()?.as_slice() {
        [lon, lat] => Some([lon.as_f64()?, lat.as_f64()?]),
        _ => None,
    }
}

/// Maps estimator failures onto HTTP. Provider details stay in the logs.
#[derive(Debug)]
pub struct ApiError(ShippingError);

impl From<ShippingError> for ApiError {
    fn from(err: ShippingError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ShippingError::InvalidInput(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            ShippingError::GeocodingFailed => (
                StatusCode::BAD_REQUEST,
                "Destination address not found, please check it".to_string(),
            ),
            ShippingError::RoutingFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not calculate a route to the destination, try again shortly".to_string(),
            ),
            ShippingError::UpstreamUnavailable(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Shipping cost service unavailable, try again shortly".to_string(),
            ),
        };
        if status.is_server_error() {
            error!("Shipping estimate failed: {}", self.0);
        } else {
            warn!("Rejected shipping request: {}", self.0);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn router(estimator: Arc<ShippingEstimator>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/calculateShipping", post(calculate_shipping))
        .route("/health", get(health))
        .layer(cors)
        .with_state(estimator)
}

async fn calculate_shipping(
    State(estimator): State<Arc<ShippingEstimator>>,
    payload: Result<Json<ShippingPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        ShippingError::InvalidInput(format!("malformed request body: {}", rejection.body_text()))
    })?;
    trace!("Received shipping request {:?}.", payload);

    let order_total = payload.order_total;
    let request = ShippingRequest::try_from(payload)?;

    let body = match estimator.estimate_order(&request, order_total).await? {
        Estimate::Quoted(quote) => json!(quote),
        Estimate::FreeShipping { destination } => json!({
            "destinationCoords": destination,
            "shippingCost": null,
        }),
    };
    Ok(Json(body))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
