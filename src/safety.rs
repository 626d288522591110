use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use itertools::iproduct;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::error::{HeatmapError, SeedError};
use crate::scoring::{self, MAX_SCORE, NEUTRAL_SCORE, SafetyModel};

/// Cells per degree: keys are coordinates rounded to 3 decimal places
/// (roughly 111 m at the equator).
pub const GRID_CELLS_PER_DEGREE: f64 = 1000.0;

/// Lattice steps per axis used by the heatmap when the caller does not pick one.
pub const DEFAULT_HEATMAP_STEPS: usize = 20;

/// Largest lattice the heatmap will sample per axis.
pub const MAX_HEATMAP_STEPS: usize = 100;

/// Heatmap points at or below this danger intensity are dropped.
pub const HEATMAP_MIN_INTENSITY: f64 = 0.3;

/// Raw safety inputs for one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyMetrics {
    /// 0-100, higher is worse.
    pub crime_rate: f64,
    /// 0-100, higher is better.
    pub lighting_quality: f64,
    /// 0-100, higher is closer.
    pub police_proximity: f64,
    #[serde(alias = "crowdReports")]
    pub crowd_report_count: u32,
}

impl SafetyMetrics {
    fn check_ranges(&self, key: &str) -> Result<(), SeedError> {
        let fields = [
            ("crimeRate", self.crime_rate),
            ("lightingQuality", self.lighting_quality),
            ("policeProximity", self.police_proximity),
        ];
        for (field, value) in fields {
            if !(0.0..=MAX_SCORE).contains(&value) {
                return Err(SeedError::OutOfRange {
                    key: key.to_string(),
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// A grid cell's metrics plus the score derived from them when the cell was written.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyCell {
    #[serde(flatten)]
    pub metrics: SafetyMetrics,
    pub overall_score: f64,
}

impl SafetyCell {
    #[must_use]
    pub fn new(metrics: SafetyMetrics) -> Self {
        Self {
            overall_score: scoring::score_metrics(&metrics),
            metrics,
        }
    }
}

/// Grid cell identifier: latitude and longitude in thousandths of a degree.
///
/// Renders as `"{lat:.3}_{lng:.3}"`, the format used by seed files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    lat: i32,
    lng: i32,
}

impl CellKey {
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_coordinate(lat: f64, lng: f64) -> Self {
        // `as` saturates; NaN lands on 0
        Self {
            lat: (lat * GRID_CELLS_PER_DEGREE).round() as i32,
            lng: (lng * GRID_CELLS_PER_DEGREE).round() as i32,
        }
    }

    #[must_use]
    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            f64::from(self.lat) / GRID_CELLS_PER_DEGREE,
            f64::from(self.lng) / GRID_CELLS_PER_DEGREE,
        )
    }
}

impl std::fmt::Display for CellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = self.center();
        write!(f, "{:.3}_{:.3}", c.lat, c.lng)
    }
}

impl FromStr for CellKey {
    type Err = SeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SeedError::InvalidKey { key: s.to_string() };

        let (lat, lng) = s.split_once('_').ok_or_else(invalid)?;
        let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;
        let c = Coordinate::checked(lat, lng).map_err(|_| invalid())?;

        Ok(Self::from_coordinate(c.lat, c.lng))
    }
}

/// Coarse reading of a safety score for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Good,
    Moderate,
    Caution,
}

impl SafetyLevel {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            Self::Good
        } else if score >= 50.0 {
            Self::Moderate
        } else {
            Self::Caution
        }
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Good => "Good safety in this area",
            Self::Moderate => "Moderate safety conditions",
            Self::Caution => "Exercise caution in this area",
        }
    }
}

/// Axis-aligned lat/lng box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Accepts finite, in-range boxes with `south <= north` and `west <= east`.
    ///
    /// # Errors
    ///
    /// Returns [`HeatmapError::InvalidBounds`] otherwise.
    pub fn validate(self) -> Result<Self, HeatmapError> {
        let lat_ok = |v: f64| (-90.0..=90.0).contains(&v);
        let lng_ok = |v: f64| (-180.0..=180.0).contains(&v);

        // NaN fails the range checks
        let in_range = lat_ok(self.south) && lat_ok(self.north) && lng_ok(self.west) && lng_ok(self.east);
        if in_range && self.south <= self.north && self.west <= self.east {
            Ok(self)
        } else {
            Err(HeatmapError::InvalidBounds {
                south: self.south,
                west: self.west,
                north: self.north,
                east: self.east,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatBand {
    High,
    Elevated,
    Low,
}

impl HeatBand {
    #[must_use]
    pub fn from_intensity(intensity: f64) -> Self {
        if intensity > 0.7 {
            Self::High
        } else if intensity > 0.5 {
            Self::Elevated
        } else {
            Self::Low
        }
    }
}

/// One sampled danger point: intensity is `(100 - score) / 100`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatmapPoint {
    pub point: Coordinate,
    pub intensity: f64,
    pub band: HeatBand,
}

/// Discretized map from grid cell to safety metrics.
///
/// Built once at startup and read-only afterwards, so it can be shared
/// behind an `Arc` and queried from concurrent route scorers.
#[derive(Debug, Clone, Default)]
pub struct SafetyGrid {
    cells: HashMap<CellKey, SafetyCell>,
}

impl SafetyGrid {
    /// Deterministic stand-in for real safety data: a 10×10 lattice of cells
    /// 0.01° apart over midtown Manhattan with uniformly random metrics.
    #[must_use]
    pub fn mock_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        iproduct!(0..10_i32, 0..10_i32)
            .map(|(i, j)| {
                let lat = 40.70 + f64::from(i) * 0.01;
                let lng = -74.00 + f64::from(j) * 0.01;
                let metrics = SafetyMetrics {
                    crime_rate: rng.r#gen::<f64>() * 100.0,
                    lighting_quality: rng.r#gen::<f64>() * 100.0,
                    police_proximity: rng.r#gen::<f64>() * 100.0,
                    crowd_report_count: rng.gen_range(0..20),
                };
                (CellKey::from_coordinate(lat, lng), SafetyCell::new(metrics))
            })
            .collect()
    }

    /// Parses a seed document: a JSON object keyed by `"{lat}_{lng}"` whose
    /// values carry `crimeRate`, `lightingQuality`, `policeProximity` and
    /// `crowdReports`. Any `overallScore` in the document is ignored and
    /// recomputed.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError`] for malformed JSON, unparsable keys, or metrics
    /// outside `[0, 100]`.
    pub fn from_json_str(json: &str) -> Result<Self, SeedError> {
        let raw: HashMap<String, SafetyMetrics> = serde_json::from_str(json)?;

        let mut cells = HashMap::with_capacity(raw.len());
        for (key, metrics) in raw {
            metrics.check_ranges(&key)?;
            cells.insert(key.parse()?, SafetyCell::new(metrics));
        }

        Ok(Self { cells })
    }

    /// # Errors
    ///
    /// Returns [`SeedError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let json = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let grid = Self::from_json_str(&json)?;
        log::info!("Loaded {} safety cells from {}", grid.len(), path.display());
        Ok(grid)
    }

    #[must_use]
    pub fn cell(&self, key: &CellKey) -> Option<&SafetyCell> {
        self.cells.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Safety score of the cell containing `(lat, lng)`.
    ///
    /// Unscored cells return the neutral 50 so unknown areas neither block
    /// routing nor look dangerous.
    #[must_use]
    pub fn score(&self, lat: f64, lng: f64) -> f64 {
        self.cells
            .get(&CellKey::from_coordinate(lat, lng))
            .map_or(NEUTRAL_SCORE, |cell| scoring::clamp_score(cell.overall_score))
    }

    /// Samples a `(steps + 1)²` lattice across `bounds`, edges included, and
    /// keeps the points whose danger intensity exceeds [`HEATMAP_MIN_INTENSITY`].
    ///
    /// `steps` is capped at [`MAX_HEATMAP_STEPS`].
    #[must_use]
    pub fn heatmap(&self, bounds: &Bounds, steps: usize) -> Vec<HeatmapPoint> {
        let steps = steps.min(MAX_HEATMAP_STEPS);
        if steps == 0 {
            return Vec::new();
        }

        let lat_step = (bounds.north - bounds.south) / steps as f64;
        let lng_step = (bounds.east - bounds.west) / steps as f64;

        iproduct!(0..=steps, 0..=steps)
            .filter_map(|(i, j)| {
                let point = Coordinate::new(
                    bounds.south + lat_step * i as f64,
                    bounds.west + lng_step * j as f64,
                );
                let intensity = ((MAX_SCORE - self.score(point.lat, point.lng)) / MAX_SCORE).max(0.0);

                (intensity > HEATMAP_MIN_INTENSITY).then(|| HeatmapPoint {
                    point,
                    intensity,
                    band: HeatBand::from_intensity(intensity),
                })
            })
            .collect()
    }
}

impl FromIterator<(CellKey, SafetyCell)> for SafetyGrid {
    fn from_iter<I: IntoIterator<Item = (CellKey, SafetyCell)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

impl SafetyModel for SafetyGrid {
    fn point_score(&self, point: Coordinate) -> f64 {
        self.score(point.lat, point.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(crime: f64, lighting: f64, police: f64, crowd: u32) -> SafetyMetrics {
        SafetyMetrics {
            crime_rate: crime,
            lighting_quality: lighting,
            police_proximity: police,
            crowd_report_count: crowd,
        }
    }

    fn grid_with(lat: f64, lng: f64, m: SafetyMetrics) -> SafetyGrid {
        std::iter::once((CellKey::from_coordinate(lat, lng), SafetyCell::new(m))).collect()
    }

    #[test]
    fn unknown_cell_is_neutral() {
        let grid = SafetyGrid::default();
        assert!((grid.score(12.0, 34.0) - 50.0).abs() < f64::EPSILON);
        assert!((grid.score(f64::NAN, f64::NAN) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn nearby_points_share_a_cell() {
        let grid = grid_with(40.759, -73.985, metrics(20.0, 80.0, 60.0, 4));
        assert!((grid.score(40.7589, -73.9851) - 76.0).abs() < 1e-9);
        assert!((grid.score(40.7594, -73.9846) - 76.0).abs() < 1e-9);
        assert!((grid.score(40.7600, -73.9851) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn overall_score_is_cached_on_write() {
        let cell = SafetyCell::new(metrics(0.0, 100.0, 100.0, 0));
        assert!((cell.overall_score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn cell_key_round_trips_through_seed_format() {
        let key = CellKey::from_coordinate(40.7589, -73.9851);
        assert_eq!(key.to_string(), "40.759_-73.985");
        assert_eq!("40.759_-73.985".parse::<CellKey>().unwrap(), key);
        assert!("40.759".parse::<CellKey>().is_err());
        assert!("abc_def".parse::<CellKey>().is_err());
        assert!("95.0_0.0".parse::<CellKey>().is_err());
    }

    #[test]
    fn mock_seed_is_deterministic() {
        let a = SafetyGrid::mock_seed(42);
        let b = SafetyGrid::mock_seed(42);
        assert_eq!(a.len(), 100);

        let key = CellKey::from_coordinate(40.75, -73.95);
        assert_eq!(a.cell(&key), b.cell(&key));
        assert!(a.cell(&key).is_some());

        for lat in [40.70, 40.74, 40.79] {
            for lng in [-74.00, -73.96, -73.91] {
                let s = a.score(lat, lng);
                assert!((0.0..=100.0).contains(&s));
            }
        }
    }

    #[test]
    fn scores_stay_in_range_for_any_input() {
        let grid = SafetyGrid::mock_seed(42);
        let mut rng = StdRng::seed_from_u64(7);
        let specials = [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, f64::MAX, f64::MIN, -0.0];

        let mut seeded = 0;
        for i in 0..5_000 {
            let (lat, lng) = match i % 3 {
                // around the seeded blocks
                0 => (rng.gen_range(40.69..40.80), rng.gen_range(-74.01..-73.90)),
                1 => (rng.gen_range(-1_000.0..1_000.0), rng.gen_range(-1_000.0..1_000.0)),
                _ => (
                    specials[rng.gen_range(0..specials.len())],
                    rng.gen_range(-200.0..200.0),
                ),
            };

            let score = grid.score(lat, lng);
            assert!((0.0..=100.0).contains(&score), "({lat}, {lng}) scored {score}");
            if grid.cell(&CellKey::from_coordinate(lat, lng)).is_none() {
                assert_eq!(score.to_bits(), NEUTRAL_SCORE.to_bits(), "({lat}, {lng})");
            } else {
                seeded += 1;
            }
        }
        assert!(seeded > 0);
    }

    #[test]
    fn seed_json_loads_and_validates() {
        let grid = SafetyGrid::from_json_str(
            r#"{
                "40.759_-73.985": {"crimeRate": 20, "lightingQuality": 80, "policeProximity": 60, "crowdReports": 4, "overallScore": 12},
                "40.761_-73.978": {"crimeRate": 0, "lightingQuality": 100, "policeProximity": 100, "crowdReportCount": 0}
            }"#,
        )
        .unwrap();
        assert_eq!(grid.len(), 2);
        assert!((grid.score(40.759, -73.985) - 76.0).abs() < 1e-9);
        assert!((grid.score(40.761, -73.978) - 100.0).abs() < 1e-9);

        let err = SafetyGrid::from_json_str(
            r#"{"1.0_1.0": {"crimeRate": 120, "lightingQuality": 0, "policeProximity": 0, "crowdReports": 0}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SeedError::OutOfRange { field: "crimeRate", .. }));

        assert!(matches!(
            SafetyGrid::from_json_str(r#"{"nope": {"crimeRate": 1, "lightingQuality": 1, "policeProximity": 1, "crowdReports": 1}}"#),
            Err(SeedError::InvalidKey { .. })
        ));
    }

    #[test]
    fn safety_levels() {
        assert_eq!(SafetyLevel::from_score(70.0), SafetyLevel::Good);
        assert_eq!(SafetyLevel::from_score(69.9), SafetyLevel::Moderate);
        assert_eq!(SafetyLevel::from_score(50.0), SafetyLevel::Moderate);
        assert_eq!(SafetyLevel::from_score(49.9), SafetyLevel::Caution);
        assert_eq!(SafetyLevel::Caution.message(), "Exercise caution in this area");
    }

    #[test]
    fn heatmap_keeps_only_dangerous_samples() {
        // score = 0 at this cell, intensity 1.0
        let grid = grid_with(10.0, 10.0, metrics(100.0, 0.0, 0.0, 20));
        let bounds = Bounds {
            south: 9.999,
            west: 9.999,
            north: 10.001,
            east: 10.001,
        };

        // neutral cells sit at intensity 0.5, above the cut-off
        let points = grid.heatmap(&bounds, 2);
        assert_eq!(points.len(), 9);
        let high: Vec<_> = points.iter().filter(|p| p.band == HeatBand::High).collect();
        assert_eq!(high.len(), 1);
        assert!((high[0].intensity - 1.0).abs() < 1e-9);

        let unscored = SafetyGrid::default().heatmap(&bounds, 2);
        assert_eq!(unscored.len(), 9);
        assert!(unscored.iter().all(|p| p.band == HeatBand::Low));

        let safe = grid_with(0.0, 0.0, metrics(0.0, 100.0, 100.0, 0));
        let tight = Bounds {
            south: 0.0,
            west: 0.0,
            north: 0.0,
            east: 0.0,
        };
        assert!(safe.heatmap(&tight, 1).is_empty());

        assert!(grid.heatmap(&bounds, 0).is_empty());
    }

    #[test]
    fn heatmap_lattice_is_capped() {
        let bounds = Bounds {
            south: 10.0,
            west: 10.0,
            north: 10.5,
            east: 10.5,
        };
        let side = MAX_HEATMAP_STEPS + 1;
        assert_eq!(SafetyGrid::default().heatmap(&bounds, 1_000_000).len(), side * side);
    }

    #[test]
    fn bounds_validation() {
        let ok = Bounds {
            south: 40.7,
            west: -74.0,
            north: 40.8,
            east: -73.9,
        };
        assert_eq!(ok.validate(), Ok(ok));

        let point = Bounds {
            north: 40.7,
            east: -74.0,
            ..ok
        };
        assert!(point.validate().is_ok());

        let rejected = [
            Bounds { south: 40.8, north: 40.7, ..ok },
            Bounds { west: -73.9, east: -74.0, ..ok },
            Bounds { south: f64::NAN, ..ok },
            Bounds { east: f64::INFINITY, ..ok },
            Bounds { north: 91.0, ..ok },
            Bounds { west: -181.0, ..ok },
        ];
        for bounds in rejected {
            assert!(matches!(bounds.validate(), Err(HeatmapError::InvalidBounds { .. })), "{bounds:?}");
        }
    }
}
