#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use fruver_shipping::{
    services::{
        estimator::ShippingEstimator, geocoding::GeocodingService, pricing::PriceTable,
        routing::RoutingService, GeoPoint, TravelMode,
    },
    UpstreamError,
};

pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

pub fn origin() -> GeoPoint {
    GeoPoint::new(-64.34992, -33.13067).expect("valid origin")
}

pub fn point(lon: f64, lat: f64) -> GeoPoint {
    GeoPoint::new(lon, lat).expect("valid point")
}

pub fn calls(log: &CallLog, name: &str) -> usize {
    log.lock().unwrap().iter().filter(|c| **c == name).count()
}

pub struct FakeGeocoder {
    candidates: Vec<GeoPoint>,
    failures: AtomicUsize,
    log: CallLog,
    pub queries: Mutex<Vec<(String, GeoPoint, f64)>>,
}

impl FakeGeocoder {
    pub fn new(candidates: Vec<GeoPoint>, log: &CallLog) -> Self {
        FakeGeocoder {
            candidates,
            failures: AtomicUsize::new(0),
            log: log.clone(),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Times out `failures` times before answering.
    pub fn flaky(candidates: Vec<GeoPoint>, failures: usize, log: &CallLog) -> Self {
        let geocoder = FakeGeocoder::new(candidates, log);
        geocoder.failures.store(failures, Ordering::SeqCst);
        geocoder
    }
}

#[async_trait]
impl GeocodingService for FakeGeocoder {
    async fn resolve(
        &self,
        text: &str,
        bias: GeoPoint,
        radius_meters: f64,
    ) -> Result<Vec<GeoPoint>, UpstreamError> {
        self.log.lock().unwrap().push("geocode");
        self.queries
            .lock()
            .unwrap()
            .push((text.to_string(), bias, radius_meters));
        if self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err(UpstreamError::Timeout);
        }
        Ok(self.candidates.clone())
    }
}

pub struct FakeRouter {
    distance: Option<f64>,
    failures: AtomicUsize,
    log: CallLog,
}

impl FakeRouter {
    pub fn new(distance: Option<f64>, log: &CallLog) -> Self {
        FakeRouter {
            distance,
            failures: AtomicUsize::new(0),
            log: log.clone(),
        }
    }

    pub fn flaky(distance: Option<f64>, failures: usize, log: &CallLog) -> Self {
        let router = FakeRouter::new(distance, log);
        router.failures.store(failures, Ordering::SeqCst);
        router
    }
}

#[async_trait]
impl RoutingService for FakeRouter {
    async fn route(
        &self,
        from: GeoPoint,
        _to: GeoPoint,
        mode: TravelMode,
    ) -> Result<Option<f64>, UpstreamError> {
        assert_eq!(from, origin());
        assert_eq!(mode, TravelMode::Driving);
        self.log.lock().unwrap().push("route");
        if self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err(UpstreamError::Transport("connection reset".to_string()));
        }
        Ok(self.distance)
    }
}

pub fn estimator(geocoder: &Arc<FakeGeocoder>, router: &Arc<FakeRouter>) -> ShippingEstimator {
    ShippingEstimator::new(
        geocoder.clone(),
        router.clone(),
        origin(),
        PriceTable::default(),
    )
}
