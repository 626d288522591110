//! External routing / geocoding provider seam.
//!
//! [`RouteProvider`] is the only place the engine talks to the network.
//! Every failure, whatever its cause, is a [`ProviderError`]: callers treat
//! all variants as "provider unavailable" and keep the variant only to
//! explain why a fallback happened. Adapters never retry.

pub mod tomtom;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::coordinate::Coordinate;

pub use tomtom::TomTomProvider;

/// Upper bound on geocoding suggestions handed to callers.
pub const GEOCODE_LIMIT: usize = 5;

/// Default search radius for nearby-place lookups, in meters.
pub const DEFAULT_NEARBY_RADIUS_M: u32 = 1000;

/// Provider-side route optimisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RouteMode {
    Fastest,
    Shortest,
}

/// Route geometry and timing exactly as the provider returned them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRoute {
    pub points: Vec<Coordinate>,
    pub length_in_meters: f64,
    pub travel_time_in_seconds: f64,
}

/// A geocoding match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeCandidate {
    pub id: String,
    pub address: String,
    pub country: Option<String>,
    pub municipality: Option<String>,
    pub coordinate: Coordinate,
    pub relevance: f64,
}

/// A point of interest near a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyPlace {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub coordinate: Coordinate,
    pub distance_meters: f64,
}

/// Why a provider call produced nothing usable.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No API key (or similar prerequisite) is configured.
    #[error("provider not configured: {0}")]
    NotConfigured(&'static str),

    /// Connection, TLS, or body transfer failure.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response.
    #[error("provider returned status {status}")]
    Status { status: u16 },

    /// Body did not match the expected schema.
    #[error("malformed provider payload: {message}")]
    Malformed { message: String },

    /// Well-formed response with nothing in it.
    #[error("provider returned no {what}")]
    Empty { what: &'static str },

    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// One route between two points.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] for any transport, status, or payload failure,
    /// including a response with no routes.
    async fn route(&self, start: Coordinate, end: Coordinate, mode: RouteMode) -> Result<RawRoute, ProviderError>;

    /// Candidates for a free-text place query, most relevant first.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] for any transport, status, or payload failure.
    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeCandidate>, ProviderError>;

    /// Places of a category around `center`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] for any transport, status, or payload failure.
    async fn nearby(&self, center: Coordinate, category: &str, radius_m: u32) -> Result<Vec<NearbyPlace>, ProviderError>;
}
