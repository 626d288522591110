//! The process-wide service object.
//!
//! [`SafetyService`] owns everything that lives for the whole run (grid,
//! report log, tracker, route session) and is handed to the HTTP layer
//! behind an `Arc`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;

use crate::composer::{RouteComposer, RoutePolicy};
use crate::config::Config;
use crate::coordinate::Coordinate;
use crate::error::{HeatmapError, Result};
use crate::location::{AlertSink, LocationTracker, LogAlertSink, PanicAlert};
use crate::provider::{GeocodeCandidate, NearbyPlace, RouteProvider, TomTomProvider};
use crate::reports::{ReportKind, ReportLog, SafetyReport, Severity};
use crate::route::{RoutePair, RouteRole};
use crate::safety::{Bounds, HeatmapPoint, MAX_HEATMAP_STEPS, SafetyGrid, SafetyLevel};
use crate::session::RouteSession;

/// Shortest query worth sending to the geocoder.
pub const MIN_GEOCODE_QUERY_CHARS: usize = 2;

/// Point safety as shown to a user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointSafety {
    pub score: f64,
    pub level: SafetyLevel,
    pub message: &'static str,
}

impl PointSafety {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        let level = SafetyLevel::from_score(score);
        Self {
            score,
            level,
            message: level.message(),
        }
    }
}

pub struct SafetyService {
    grid: Arc<SafetyGrid>,
    reports: ReportLog,
    location: LocationTracker,
    provider: Arc<dyn RouteProvider>,
    composer: RouteComposer,
    session: Mutex<RouteSession>,
    alerts: Arc<dyn AlertSink>,
    emergency_contacts: Vec<String>,
}

impl SafetyService {
    /// A service with an empty report log, no emergency contacts, and
    /// alerts written to the log.
    #[must_use]
    pub fn new(grid: SafetyGrid, provider: Arc<dyn RouteProvider>, policy: RoutePolicy) -> Self {
        let grid = Arc::new(grid);
        let composer = RouteComposer::new(Arc::clone(&provider), grid.clone(), policy);
        Self {
            grid,
            reports: ReportLog::new(),
            location: LocationTracker::new(),
            provider,
            composer,
            session: Mutex::new(RouteSession::new()),
            alerts: Arc::new(LogAlertSink),
            emergency_contacts: Vec::new(),
        }
    }

    /// Builds the service the server runs with: seed grid, seeded reports,
    /// and the TomTom adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if the seed file cannot be loaded or the provider
    /// client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let grid = match &config.seed.path {
            Some(path) => SafetyGrid::load(path)?,
            None => {
                log::info!("No safety seed configured, using mock grid (seed {})", config.seed.random_seed);
                SafetyGrid::mock_seed(config.seed.random_seed)
            }
        };

        let provider = TomTomProvider::new(
            &config.provider.base_url,
            config.provider.api_key.clone(),
            config.provider_timeout(),
        )?;
        if !provider.is_configured() {
            log::warn!("TOMTOM_API_KEY not set; every route will be synthetic");
        }

        Ok(Self::new(grid, Arc::new(provider), config.route_policy())
            .with_reports(ReportLog::seeded(Utc::now()))
            .with_emergency_contacts(config.emergency_contacts.clone()))
    }

    #[must_use]
    pub fn with_reports(mut self, reports: ReportLog) -> Self {
        self.reports = reports;
        self
    }

    #[must_use]
    pub fn with_alert_sink(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    #[must_use]
    pub fn with_emergency_contacts(mut self, contacts: Vec<String>) -> Self {
        self.emergency_contacts = contacts;
        self
    }

    #[must_use]
    pub fn grid(&self) -> &SafetyGrid {
        &self.grid
    }

    #[must_use]
    pub const fn reports(&self) -> &ReportLog {
        &self.reports
    }

    #[must_use]
    pub const fn location(&self) -> &LocationTracker {
        &self.location
    }

    #[must_use]
    pub const fn composer(&self) -> &RouteComposer {
        &self.composer
    }

    #[must_use]
    pub fn emergency_contacts(&self) -> &[String] {
        &self.emergency_contacts
    }

    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidCoordinate`] for out-of-range input.
    pub fn score_point(&self, point: Coordinate) -> Result<PointSafety> {
        let point = point.validate()?;
        Ok(PointSafety::from_score(self.grid.score(point.lat, point.lng)))
    }

    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidHeatmap`] for malformed bounds or more
    /// than [`MAX_HEATMAP_STEPS`] steps.
    pub fn heatmap(&self, bounds: &Bounds, steps: usize) -> Result<Vec<HeatmapPoint>> {
        let bounds = bounds.validate()?;
        if steps > MAX_HEATMAP_STEPS {
            return Err(HeatmapError::TooManySteps {
                steps,
                max: MAX_HEATMAP_STEPS,
            }
            .into());
        }
        Ok(self.grid.heatmap(&bounds, steps))
    }

    /// Validates both endpoints, composes a route pair and stores it as the
    /// session's current pair unless a newer request started meanwhile.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidCoordinate`] before any provider call
    /// when either endpoint is out of range. Provider failures never surface.
    pub async fn compose_routes(&self, start: Coordinate, end: Coordinate) -> Result<RoutePair> {
        let start = start.validate()?;
        let end = end.validate()?;

        let ticket = self.session().begin();
        let pair = self.composer.compose(start, end).await;
        self.session().complete(ticket, pair.clone());

        Ok(pair)
    }

    #[must_use]
    pub fn current_routes(&self) -> Option<RoutePair> {
        self.session().current().cloned()
    }

    pub fn select_route(&self, role: RouteRole) {
        self.session().select(role);
    }

    #[must_use]
    pub fn selected_route(&self) -> RouteRole {
        self.session().selected()
    }

    pub fn clear_routes(&self) {
        self.session().clear();
    }

    /// Place suggestions for `query`, most relevant first.
    ///
    /// Short queries return nothing without touching the network, and
    /// provider failures degrade to an empty list.
    pub async fn geocode(&self, query: &str) -> Vec<GeocodeCandidate> {
        let query = query.trim();
        if query.chars().count() < MIN_GEOCODE_QUERY_CHARS {
            return Vec::new();
        }

        match self.try_geocode(query).await {
            Ok(candidates) => candidates,
            Err(e) => {
                log::warn!("Geocoding {query:?} failed: {e}");
                Vec::new()
            }
        }
    }

    async fn try_geocode(&self, query: &str) -> Result<Vec<GeocodeCandidate>> {
        Ok(self.provider.geocode(query).await?)
    }

    /// Geocodes both addresses concurrently and composes a route between
    /// the best match for each. `Ok(None)` when either finds nothing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidCoordinate`] if a geocoder hands back
    /// an out-of-range position.
    pub async fn search_route(&self, from: &str, to: &str) -> Result<Option<RoutePair>> {
        let (from_hits, to_hits) = tokio::join!(self.geocode(from), self.geocode(to));

        let (Some(origin), Some(destination)) = (from_hits.first(), to_hits.first()) else {
            log::info!("No route search match for {from:?} -> {to:?}");
            return Ok(None);
        };

        log::debug!("Route search resolved to {} -> {}", origin.address, destination.address);
        self.compose_routes(origin.coordinate, destination.coordinate).await.map(Some)
    }

    /// Points of interest around `center`; provider failures give an empty list.
    pub async fn nearby(&self, center: Coordinate, category: &str, radius_m: u32) -> Vec<NearbyPlace> {
        if let Err(e) = center.validate() {
            log::warn!("Nearby search rejected: {e}");
            return Vec::new();
        }

        self.provider.nearby(center, category, radius_m).await.unwrap_or_else(|e| {
            log::warn!("Nearby search for {category:?} failed: {e}");
            Vec::new()
        })
    }

    /// Report sink: always succeeds.
    pub fn add_report(
        &self,
        kind: ReportKind,
        location: Coordinate,
        description: impl Into<String>,
        severity: Severity,
    ) -> SafetyReport {
        self.reports.add_report(kind, location, description, severity)
    }

    /// Files a report at the caller's current position.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LocationUnavailable`] and records nothing when
    /// no position is known.
    pub fn submit_report(
        &self,
        kind: ReportKind,
        description: impl Into<String>,
        severity: Severity,
    ) -> Result<SafetyReport> {
        let location = self.location.require_current()?;
        Ok(self.reports.add_report(kind, location, description, severity))
    }

    /// Sends an emergency alert with the caller's current position.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LocationUnavailable`] when no position is known.
    pub fn trigger_panic(&self) -> Result<PanicAlert> {
        let location = self.location.require_current()?;
        let alert = PanicAlert::new(self.emergency_contacts.clone(), location);
        self.alerts.deliver(&alert);
        Ok(alert)
    }

    fn session(&self) -> MutexGuard<'_, RouteSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::scoring::NEUTRAL_SCORE;

    fn offline_service() -> SafetyService {
        // no key: every provider call fails with NotConfigured
        let provider = TomTomProvider::new("http://127.0.0.1:9", None, None).unwrap();
        SafetyService::new(SafetyGrid::default(), Arc::new(provider), RoutePolicy::default())
    }

    #[test]
    fn point_safety_levels() {
        let service = offline_service();
        let safety = service.score_point(Coordinate::new(10.0, 10.0)).unwrap();
        assert!((safety.score - NEUTRAL_SCORE).abs() < f64::EPSILON);
        assert_eq!(safety.level, SafetyLevel::Moderate);
        assert_eq!(safety.message, "Moderate safety conditions");

        assert!(matches!(
            service.score_point(Coordinate::new(0.0, 200.0)),
            Err(Error::InvalidCoordinate(_))
        ));
    }

    #[tokio::test]
    async fn unconfigured_provider_falls_back_and_is_stored() {
        let service = offline_service();
        let pair = service
            .compose_routes(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.01))
            .await
            .unwrap();

        assert_eq!(pair.source, crate::route::RouteSource::Synthetic);
        assert!(service.current_routes().is_some());

        service.clear_routes();
        assert!(service.current_routes().is_none());
    }

    #[tokio::test]
    async fn geocode_failure_is_empty() {
        let service = offline_service();
        assert!(service.geocode("Times Square").await.is_empty());
        assert!(service.search_route("Times Square", "Central Park").await.unwrap().is_none());
        assert!(service.nearby(Coordinate::new(1.0, 1.0), "7315", 1000).await.is_empty());
    }

    #[test]
    fn panic_uses_configured_contacts() {
        let service = offline_service().with_emergency_contacts(vec!["+100".to_string()]);
        assert!(matches!(service.trigger_panic(), Err(Error::LocationUnavailable(_))));

        service.location().start_tracking();
        service.location().update(Coordinate::new(1.5, 2.5)).unwrap();
        let alert = service.trigger_panic().unwrap();
        assert_eq!(alert.contacts, vec!["+100"]);
        assert_eq!(alert.location, Coordinate::new(1.5, 2.5));
    }
}
