//! Shared fakes for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Barrier;

use safepath::coordinate::Coordinate;
use safepath::provider::{GeocodeCandidate, NearbyPlace, ProviderError, RawRoute, RouteMode, RouteProvider};
use safepath::scoring::SafetyModel;

pub const START: Coordinate = Coordinate::new(40.7589, -73.9851);
pub const END: Coordinate = Coordinate::new(40.7614, -73.9776);

/// How the mock answers one route mode.
pub enum Reply {
    Route(RawRoute),
    Fail(fn() -> ProviderError),
    /// Never resolves.
    Hang,
}

pub fn raw_route(length: f64, time: f64) -> RawRoute {
    RawRoute {
        points: vec![START, Coordinate::new(40.7600, -73.9810), END],
        length_in_meters: length,
        travel_time_in_seconds: time,
    }
}

pub fn unavailable() -> ProviderError {
    ProviderError::Status { status: 503 }
}

/// Scripted [`RouteProvider`] that counts its calls.
pub struct MockProvider {
    fastest: Reply,
    shortest: Reply,
    places: HashMap<String, Vec<GeocodeCandidate>>,
    /// When set, every route call waits here before answering.
    rendezvous: Option<Barrier>,
    pub route_calls: AtomicUsize,
    pub geocode_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(fastest: Reply, shortest: Reply) -> Self {
        Self {
            fastest,
            shortest,
            places: HashMap::new(),
            rendezvous: None,
            route_calls: AtomicUsize::new(0),
            geocode_calls: AtomicUsize::new(0),
        }
    }

    /// Both modes succeed with the reference scenario's routes.
    pub fn scenario() -> Self {
        Self::new(Reply::Route(raw_route(900.0, 600.0)), Reply::Route(raw_route(950.0, 620.0)))
    }

    pub fn failing() -> Self {
        Self::new(Reply::Fail(unavailable), Reply::Fail(unavailable))
    }

    /// Route calls only complete once both are in flight at the same time.
    pub fn with_rendezvous(mut self) -> Self {
        self.rendezvous = Some(Barrier::new(2));
        self
    }

    pub fn with_place(mut self, query: &str, address: &str, coordinate: Coordinate) -> Self {
        self.places.entry(query.to_string()).or_default().push(GeocodeCandidate {
            id: format!("id-{address}"),
            address: address.to_string(),
            country: Some("United States".to_string()),
            municipality: Some("New York".to_string()),
            coordinate,
            relevance: 1.0,
        });
        self
    }

    pub fn route_calls(&self) -> usize {
        self.route_calls.load(Ordering::SeqCst)
    }

    pub fn geocode_calls(&self) -> usize {
        self.geocode_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RouteProvider for MockProvider {
    async fn route(&self, _start: Coordinate, _end: Coordinate, mode: RouteMode) -> Result<RawRoute, ProviderError> {
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }

        let reply = match mode {
            RouteMode::Fastest => &self.fastest,
            RouteMode::Shortest => &self.shortest,
        };
        match reply {
            Reply::Route(route) => Ok(route.clone()),
            Reply::Fail(make) => Err(make()),
            Reply::Hang => std::future::pending().await,
        }
    }

    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeCandidate>, ProviderError> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.places.get(query).cloned().unwrap_or_default())
    }

    async fn nearby(&self, _center: Coordinate, _category: &str, _radius_m: u32) -> Result<Vec<NearbyPlace>, ProviderError> {
        Err(unavailable())
    }
}

/// Every point scores the same.
pub struct UniformModel(pub f64);

impl SafetyModel for UniformModel {
    fn point_score(&self, _point: Coordinate) -> f64 {
        self.0
    }
}

pub fn uniform(score: f64) -> Arc<dyn SafetyModel> {
    Arc::new(UniformModel(score))
}
