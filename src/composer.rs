use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::provider::{ProviderError, RawRoute, RouteMode, RouteProvider};
use crate::route::{RoutePair, RouteRole, RouteSource, ScoredRoute};
use crate::scoring::{self, SafetyModel};
use crate::synthetic::SyntheticRouteGenerator;

/// Heuristic adjustments applied to the safe-role route.
///
/// These are tunable placeholders, not derived figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutePolicy {
    /// Flat score bonus for the safe role; the result is clamped to `[0, 100]`.
    pub safety_bonus: f64,
    /// Seconds added to the safe role's duration for a more cautious pace.
    pub duration_penalty_secs: f64,
    /// Deadline per provider call; `None` leaves it to the transport.
    /// Configured alongside the provider, not in the policy table.
    #[serde(skip)]
    pub provider_timeout: Option<Duration>,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            safety_bonus: 15.0,
            duration_penalty_secs: 300.0,
            provider_timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// Builds the safe/fast route pair for a start/end query.
///
/// Holds no mutable state; concurrent `compose` calls are independent.
#[derive(Clone)]
pub struct RouteComposer {
    provider: Arc<dyn RouteProvider>,
    model: Arc<dyn SafetyModel>,
    policy: RoutePolicy,
}

impl RouteComposer {
    #[must_use]
    pub fn new(provider: Arc<dyn RouteProvider>, model: Arc<dyn SafetyModel>, policy: RoutePolicy) -> Self {
        Self {
            provider,
            model,
            policy,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    /// Requests the fastest and shortest routes concurrently and scores them.
    ///
    /// Never fails: if either provider call errors, both roles come from
    /// [`SyntheticRouteGenerator`] and the first error is kept as the
    /// pair's `fallback_cause`. A pair is never half provider, half synthetic.
    pub async fn compose(&self, start: Coordinate, end: Coordinate) -> RoutePair {
        log::debug!("Requesting fastest and shortest routes {start} -> {end}");

        // both futures are polled together; the first error drops the twin
        let fastest = self.fetch(start, end, RouteRole::Fast.provider_mode());
        let shortest = self.fetch(start, end, RouteRole::Safe.provider_mode());

        let pair = match tokio::try_join!(fastest, shortest) {
            Ok((fast, safe)) => self.score_provider_routes(fast, safe),
            Err(cause) => {
                log::warn!("Routing provider unavailable, using synthetic routes: {cause}");
                synthetic_pair(start, end, cause)
            }
        };

        log::debug!(
            "Composed {} routes: safe {:.1} ({}), fast {:.1} ({})",
            pair.source,
            pair.safe.safety_score,
            pair.safe.duration,
            pair.fast.safety_score,
            pair.fast.duration,
        );

        pair
    }

    async fn fetch(&self, start: Coordinate, end: Coordinate, mode: RouteMode) -> Result<RawRoute, ProviderError> {
        let call = self.provider.route(start, end, mode);
        match self.policy.provider_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ProviderError::Timeout(limit))?,
            None => call.await,
        }
    }

    fn score_provider_routes(&self, fast: RawRoute, safe: RawRoute) -> RoutePair {
        let fast_score = scoring::score_route(self.model.as_ref(), &fast.points);
        let fast_distance = fast.length_in_meters;
        let fast_duration = fast.travel_time_in_seconds;

        let safe_score = scoring::clamp_score(scoring::score_route(self.model.as_ref(), &safe.points) + self.policy.safety_bonus);
        let safe_distance = safe.length_in_meters;
        let safe_duration = safe.travel_time_in_seconds + self.policy.duration_penalty_secs;

        RoutePair {
            safe: ScoredRoute::new(RouteRole::Safe, RouteSource::Provider, safe, safe_score, safe_distance, safe_duration),
            fast: ScoredRoute::new(RouteRole::Fast, RouteSource::Provider, fast, fast_score, fast_distance, fast_duration),
            source: RouteSource::Provider,
            fallback_cause: None,
        }
    }
}

fn synthetic_pair(start: Coordinate, end: Coordinate, cause: ProviderError) -> RoutePair {
    let (safe, fast) = SyntheticRouteGenerator::pair(start, end);
    RoutePair {
        safe,
        fast,
        source: RouteSource::Synthetic,
        fallback_cause: Some(Arc::new(cause)),
    }
}
