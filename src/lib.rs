pub mod config;
pub mod routes;
pub mod services;

use thiserror::Error;

pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

/// Failures a caller of the estimator can tell apart.
#[derive(Error, Debug)]
pub enum ShippingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("No geocoding result for the destination address")]
    GeocodingFailed,
    #[error("No route between origin and destination")]
    RoutingFailed,
    #[error("Upstream provider unavailable: {0}")]
    UpstreamUnavailable(#[from] UpstreamError),
}

/// Transport or protocol failure talking to an external provider.
///
/// A provider answering "no match" is not one of these; adapters return an
/// empty result for that.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            UpstreamError::Status(status.as_u16())
        } else {
            UpstreamError::Transport(err.without_url().to_string())
        }
    }
}
