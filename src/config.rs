use std::{fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use log::*;
use thiserror::Error;

use crate::services::{estimator::RetryPolicy, pricing::PriceTable, GeoPoint};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_ORS_BASE_URL: &str = "https://api.openrouteservice.org";
const DEFAULT_OSRM_BASE_URL: &str = "https://router.project-osrm.org";
// Calle Lamadrid 1311, Río Cuarto.
const DEFAULT_ORIGIN: (f64, f64) = (-64.34992, -33.13067);
const DEFAULT_SEARCH_RADIUS_METERS: f64 = 30_000.0;
const DEFAULT_FREE_SHIPPING_THRESHOLD: f64 = 15_000.0;
const DEFAULT_TIMEOUT_SECS: u64 = 8;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 200;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(String),
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
    #[error("Invalid price table: {0}")]
    PriceTable(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub ors_api_key: String,
    pub ors_base_url: String,
    pub osrm_base_url: String,
    pub origin: GeoPoint,
    pub search_radius_meters: f64,
    pub price_table: PriceTable,
    pub free_shipping_threshold: Option<f64>,
    pub upstream_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Config {
    /// Reads `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ors_api_key = lookup("ORS_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing("ORS_API_KEY".to_string()))?;

        let origin_lon = parse_or(&lookup, "ORIGIN_LON", DEFAULT_ORIGIN.0)?;
        let origin_lat = parse_or(&lookup, "ORIGIN_LAT", DEFAULT_ORIGIN.1)?;
        let origin = GeoPoint::new(origin_lon, origin_lat).map_err(|e| ConfigError::Invalid {
            key: "ORIGIN_LON/ORIGIN_LAT".to_string(),
            value: format!("{origin_lon},{origin_lat}"),
            reason: e.to_string(),
        })?;

        let search_radius_meters =
            parse_or(&lookup, "GEOCODE_RADIUS_METERS", DEFAULT_SEARCH_RADIUS_METERS)?;
        if !(search_radius_meters.is_finite() && search_radius_meters > 0.0) {
            return Err(ConfigError::Invalid {
                key: "GEOCODE_RADIUS_METERS".to_string(),
                value: search_radius_meters.to_string(),
                reason: "must be a positive number".to_string(),
            });
        }

        let timeout_secs: u64 = parse_or(&lookup, "UPSTREAM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "UPSTREAM_TIMEOUT_SECS".to_string(),
                value: timeout_secs.to_string(),
                reason: "must be a positive number".to_string(),
            });
        }

        let price_table = match lookup("PRICE_TABLE_PATH") {
            Some(path) => {
                info!("Loading price table from {path}");
                PriceTable::load(&PathBuf::from(path))?
            }
            None => PriceTable::default(),
        };

        let free_shipping_threshold = match lookup("FREE_SHIPPING_THRESHOLD") {
            Some(value) if value.trim().eq_ignore_ascii_case("off") => None,
            Some(value) => Some(parse_value("FREE_SHIPPING_THRESHOLD", &value)?),
            None => Some(DEFAULT_FREE_SHIPPING_THRESHOLD),
        };

        Ok(Config {
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            ors_api_key,
            ors_base_url: lookup("ORS_BASE_URL").unwrap_or_else(|| DEFAULT_ORS_BASE_URL.to_string()),
            osrm_base_url: lookup("OSRM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OSRM_BASE_URL.to_string()),
            origin,
            search_radius_meters,
            price_table,
            free_shipping_threshold,
            upstream_timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy {
                retries: parse_or(&lookup, "UPSTREAM_RETRIES", 0)?,
                backoff: Duration::from_millis(parse_or(
                    &lookup,
                    "UPSTREAM_RETRY_BACKOFF_MS",
                    DEFAULT_RETRY_BACKOFF_MS,
                )?),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => parse_value(key, &value),
        None => {
            debug!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_api_key_is_set() {
        let config = Config::from_lookup(lookup_from(&[("ORS_API_KEY", "secret")])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.origin, GeoPoint::new(-64.34992, -33.13067).unwrap());
        assert_eq!(config.search_radius_meters, 30_000.0);
        assert_eq!(config.price_table, PriceTable::default());
        assert_eq!(config.free_shipping_threshold, Some(15_000.0));
        assert_eq!(config.upstream_timeout, Duration::from_secs(8));
        assert_eq!(config.retry.retries, 0);
    }

    #[test]
    fn api_key_is_required() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(key) if key == "ORS_API_KEY"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("ORS_API_KEY", "secret"),
            ("PORT", "8081"),
            ("ORIGIN_LON", "-58.38"),
            ("ORIGIN_LAT", "-34.60"),
            ("FREE_SHIPPING_THRESHOLD", "off"),
            ("UPSTREAM_RETRIES", "2"),
            ("UPSTREAM_RETRY_BACKOFF_MS", "50"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.origin.longitude(), -58.38);
        assert_eq!(config.free_shipping_threshold, None);
        assert_eq!(config.retry.retries, 2);
        assert_eq!(config.retry.backoff, Duration::from_millis(50));
    }

    #[test]
    fn rejects_bad_values() {
        let bad_port =
            Config::from_lookup(lookup_from(&[("ORS_API_KEY", "k"), ("PORT", "http")]));
        assert!(matches!(bad_port, Err(ConfigError::Invalid { .. })));

        let bad_origin =
            Config::from_lookup(lookup_from(&[("ORS_API_KEY", "k"), ("ORIGIN_LAT", "123")]));
        assert!(matches!(bad_origin, Err(ConfigError::Invalid { .. })));

        let bad_table = Config::from_lookup(lookup_from(&[
            ("ORS_API_KEY", "k"),
            ("PRICE_TABLE_PATH", "/nonexistent/prices.json"),
        ]));
        assert!(matches!(bad_table, Err(ConfigError::PriceTable(_))));

        let zero_timeout = Config::from_lookup(lookup_from(&[
            ("ORS_API_KEY", "k"),
            ("UPSTREAM_TIMEOUT_SECS", "0"),
        ]));
        assert!(matches!(
            zero_timeout,
            Err(ConfigError::Invalid { key, .. }) if key == "UPSTREAM_TIMEOUT_SECS"
        ));
    }
}
