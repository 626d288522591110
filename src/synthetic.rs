//! Locally fabricated routes for when the provider cannot be reached.
//!
//! The output exists so a caller always has something to draw. Scores,
//! distances, and durations here are illustrative placeholders derived from
//! straight-line distance, not routing results: tests should assert the
//! fixed constants below, never real-world plausibility.
//!
//! Durations are rendered like provider routes, through
//! [`crate::route::format_duration`]: `"N min"` below an hour and `"Hh Mm"`
//! from 60 minutes on, so a long fallback walk reads `"1h 25m"`.

use crate::coordinate::Coordinate;
use crate::provider::RawRoute;
use crate::route::{RouteRole, RouteSource, ScoredRoute};

pub const FAST_SCORE: f64 = 65.0;
pub const SAFE_SCORE: f64 = 85.0;

/// Walking pace, meters per minute.
pub const FAST_PACE_M_PER_MIN: f64 = 80.0;
pub const SAFE_PACE_M_PER_MIN: f64 = 70.0;

pub const SAFE_DISTANCE_FACTOR: f64 = 1.2;

/// Degrees added to both components of the midpoint to draw a visible detour.
pub const SAFE_DETOUR_OFFSET_DEG: f64 = 0.001;

#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticRouteGenerator;

impl SyntheticRouteGenerator {
    /// Fabricates one route of `role` from the straight-line distance.
    #[must_use]
    pub fn generate(start: Coordinate, end: Coordinate, distance_meters: f64, role: RouteRole) -> ScoredRoute {
        let (points, distance, pace, score) = match role {
            RouteRole::Fast => (vec![start, end], distance_meters, FAST_PACE_M_PER_MIN, FAST_SCORE),
            RouteRole::Safe => {
                let detour = start.midpoint(&end).offset(SAFE_DETOUR_OFFSET_DEG);
                (
                    vec![start, detour, end],
                    distance_meters * SAFE_DISTANCE_FACTOR,
                    SAFE_PACE_M_PER_MIN,
                    SAFE_SCORE,
                )
            }
        };

        let duration_seconds = (distance / pace).round() * 60.0;

        let raw = RawRoute {
            points,
            length_in_meters: distance,
            travel_time_in_seconds: duration_seconds,
        };

        ScoredRoute::new(role, RouteSource::Synthetic, raw, score, distance, duration_seconds)
    }

    /// Both roles for a start/end pair, as `(safe, fast)`.
    #[must_use]
    pub fn pair(start: Coordinate, end: Coordinate) -> (ScoredRoute, ScoredRoute) {
        let distance = start.haversine_distance(&end);
        (
            Self::generate(start, end, distance, RouteRole::Safe),
            Self::generate(start, end, distance, RouteRole::Fast),
        )
    }
}
