use geo::Point;
use geo::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::CoordinateError;

/// Sphere radius used for all great-circle distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Mean radius `geo`'s haversine is computed on.
const GEO_MEAN_EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A WGS84 position. Serialized as `[lat, lng]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// Builds a coordinate without range checks.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds a coordinate, rejecting anything outside `[-90,90]×[-180,180]`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::InvalidCoordinate`] for out-of-range or
    /// non-finite components.
    pub fn checked(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        Self::new(lat, lng).validate()
    }

    /// # Errors
    ///
    /// Returns [`CoordinateError::InvalidCoordinate`] for out-of-range or
    /// non-finite components.
    pub fn validate(self) -> Result<Self, CoordinateError> {
        // NaN fails both range checks
        if (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng) {
            Ok(self)
        } else {
            Err(CoordinateError::InvalidCoordinate {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }

    /// Great-circle distance in meters on a sphere of [`EARTH_RADIUS_M`].
    #[must_use]
    pub fn haversine_distance(&self, other: &Self) -> f64 {
        // haversine is linear in the radius
        self.to_point().haversine_distance(&other.to_point()) * (EARTH_RADIUS_M / GEO_MEAN_EARTH_RADIUS_M)
    }

    /// Component-wise average of two positions.
    #[must_use]
    pub fn midpoint(&self, other: &Self) -> Self {
        Self::new((self.lat + other.lat) / 2.0, (self.lng + other.lng) / 2.0)
    }

    /// Shifts both components by `degrees`.
    #[must_use]
    pub fn offset(&self, degrees: f64) -> Self {
        Self::new(self.lat + degrees, self.lng + degrees)
    }

    fn to_point(self) -> Point {
        // geo points are (x = lon, y = lat)
        Point::new(self.lng, self.lat)
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self::new(lat, lng)
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(c: Coordinate) -> Self {
        [c.lat, c.lng]
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}
