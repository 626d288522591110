use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};
use strum::{AsRefStr, Display, EnumString};

use crate::coordinate::Coordinate;
use crate::provider::{ProviderError, RawRoute, RouteMode};

/// Which of the two candidate routes a [`ScoredRoute`] plays.
///
/// Roles are labels, not guarantees: nothing checks that the `Safe` route
/// actually outscores the `Fast` one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RouteRole {
    Safe,
    Fast,
}

impl RouteRole {
    pub const ALL: [Self; 2] = [Self::Safe, Self::Fast];

    /// Provider optimisation requested for this role; `shortest` stands in
    /// for "safer" on the assumption that it avoids arterial roads.
    #[must_use]
    pub const fn provider_mode(self) -> RouteMode {
        match self {
            Self::Safe => RouteMode::Shortest,
            Self::Fast => RouteMode::Fastest,
        }
    }

    /// Descriptive tags shown next to the route. Fixed per role and source,
    /// not derived from data.
    #[must_use]
    pub const fn factors(self, source: RouteSource) -> &'static [&'static str] {
        match (self, source) {
            (Self::Safe, _) => &["Well-lit streets", "Police proximity", "Low crime areas", "CCTV coverage"],
            (Self::Fast, RouteSource::Provider) => &["Direct path", "Minimal walking time", "Main roads"],
            (Self::Fast, RouteSource::Synthetic) => &["Direct path", "Minimal walking time"],
        }
    }
}

/// Where a route's geometry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RouteSource {
    Provider,
    /// Fabricated locally; numbers are illustrative placeholders.
    Synthetic,
}

/// A route annotated for display.
///
/// `raw` keeps the geometry and timing as received (or fabricated) for
/// polyline rendering; `distance_meters`/`duration_seconds` carry any role
/// adjustments.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredRoute {
    pub role: RouteRole,
    pub source: RouteSource,
    pub raw: RawRoute,
    pub safety_score: f64,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub distance: String,
    pub duration: String,
    pub factors: Vec<String>,
}

impl ScoredRoute {
    #[must_use]
    pub fn new(
        role: RouteRole,
        source: RouteSource,
        raw: RawRoute,
        safety_score: f64,
        distance_meters: f64,
        duration_seconds: f64,
    ) -> Self {
        Self {
            role,
            source,
            raw,
            safety_score,
            distance_meters,
            duration_seconds,
            distance: format_distance(distance_meters),
            duration: format_duration(duration_seconds),
            factors: role.factors(source).iter().map(ToString::to_string).collect(),
        }
    }

    #[must_use]
    pub fn coordinates(&self) -> &[Coordinate] {
        &self.raw.points
    }
}

/// The safe/fast bundle produced for one start/end query.
///
/// Both routes always share a source. When the provider failed,
/// `fallback_cause` holds the error that triggered the synthetic fallback.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePair {
    pub safe: ScoredRoute,
    pub fast: ScoredRoute,
    pub source: RouteSource,
    #[serde(serialize_with = "serialize_cause", skip_serializing_if = "Option::is_none")]
    pub fallback_cause: Option<Arc<ProviderError>>,
}

impl RoutePair {
    #[must_use]
    pub const fn get(&self, role: RouteRole) -> &ScoredRoute {
        match role {
            RouteRole::Safe => &self.safe,
            RouteRole::Fast => &self.fast,
        }
    }
}

fn serialize_cause<S: Serializer>(cause: &Option<Arc<ProviderError>>, serializer: S) -> Result<S::Ok, S::Error> {
    match cause {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Kilometers with one decimal, rounding half away from zero on the
/// hundred-meter digit (`950` → `"1.0 km"`).
#[must_use]
pub fn format_distance(meters: f64) -> String {
    let tenths = (meters / 100.0).round();
    format!("{:.1} km", tenths / 10.0)
}

/// Whole minutes below an hour (`"15 min"`), hours and minutes above (`"1h 5m"`).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_duration(seconds: f64) -> String {
    let minutes = (seconds / 60.0).round().max(0.0) as u64;
    if minutes < 60 {
        return format!("{minutes} min");
    }
    format!("{}h {}m", minutes / 60, minutes % 60)
}
