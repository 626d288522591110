use std::path::PathBuf;

use thiserror::Error;

use crate::provider::ProviderError;

/// Convenient result alias for the routing engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level engine error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The routing or geocoding provider could not produce a usable answer.
    ///
    /// Route composition never surfaces this; it is recovered through the
    /// synthetic fallback.
    #[error("routing provider unavailable: {0}")]
    ProviderUnavailable(#[from] ProviderError),

    #[error(transparent)]
    InvalidCoordinate(#[from] CoordinateError),

    #[error(transparent)]
    LocationUnavailable(#[from] LocationError),

    #[error(transparent)]
    InvalidHeatmap(#[from] HeatmapError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Seed(#[from] SeedError),
}

/// Raised when a latitude/longitude pair falls outside the WGS84 ranges.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinateError {
    #[error("invalid coordinate ({lat}, {lng}): expected lat in [-90, 90] and lng in [-180, 180]")]
    InvalidCoordinate { lat: f64, lng: f64 },
}

/// Rejected heatmap requests.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum HeatmapError {
    #[error("invalid heatmap bounds: south={south} west={west} north={north} east={east}")]
    InvalidBounds { south: f64, west: f64, north: f64, east: f64 },

    #[error("heatmap steps {steps} exceeds the maximum of {max}")]
    TooManySteps { steps: usize, max: usize },
}

/// Raised by flows that need the caller's current position when none is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location not available; enable location services")]
    LocationUnavailable,
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("invalid provider base url {url}: {message}")]
    InvalidProviderUrl { url: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Safety seed loading failures.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read safety seed {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse safety seed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid grid cell key {key:?}")]
    InvalidKey { key: String },

    #[error("cell {key}: {field} = {value} is outside [0, 100]")]
    OutOfRange {
        key: String,
        field: &'static str,
        value: f64,
    },
}
