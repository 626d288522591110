//! Safety score arithmetic.
//!
//! Turns raw cell metrics into a single 0-100 score and aggregates point
//! scores along a route. Scores are relative to the 0-100 design scale;
//! they are not calibrated probabilities.

use crate::coordinate::Coordinate;
use crate::safety::SafetyMetrics;

pub const CRIME_WEIGHT: f64 = 0.30;
pub const LIGHTING_WEIGHT: f64 = 0.25;
pub const POLICE_WEIGHT: f64 = 0.20;
pub const CROWD_REPORT_WEIGHT: f64 = 0.25;

/// Points deducted from the crowd component per user report.
pub const CROWD_REPORT_PENALTY: f64 = 5.0;

/// Score for unknown areas and empty routes.
pub const NEUTRAL_SCORE: f64 = 50.0;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// Anything that can rate a single position on the 0-100 safety scale.
///
/// Implementations must be read-only so route scorers can share them
/// across concurrent requests.
pub trait SafetyModel: Send + Sync {
    fn point_score(&self, point: Coordinate) -> f64;
}

/// Weighted combination of cell metrics, clamped to `[0, 100]`.
#[must_use]
pub fn score_metrics(metrics: &SafetyMetrics) -> f64 {
    let crowd = (MAX_SCORE - f64::from(metrics.crowd_report_count) * CROWD_REPORT_PENALTY).max(0.0);

    let score = (MAX_SCORE - metrics.crime_rate) * CRIME_WEIGHT
        + metrics.lighting_quality * LIGHTING_WEIGHT
        + metrics.police_proximity * POLICE_WEIGHT
        + crowd * CROWD_REPORT_WEIGHT;

    clamp_score(score)
}

/// Arithmetic mean of the per-point scores along a route.
///
/// Order-independent and unweighted by segment length. An empty route
/// scores [`NEUTRAL_SCORE`].
#[must_use]
pub fn score_route<M: SafetyModel + ?Sized>(model: &M, points: &[Coordinate]) -> f64 {
    if points.is_empty() {
        return NEUTRAL_SCORE;
    }

    let total: f64 = points.iter().map(|p| model.point_score(*p)).sum();
    total / points.len() as f64
}

#[must_use]
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return NEUTRAL_SCORE;
    }
    score.clamp(MIN_SCORE, MAX_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Deterministic stand-in for a grid: score depends only on the position.
    struct StripedModel;

    impl SafetyModel for StripedModel {
        fn point_score(&self, point: Coordinate) -> f64 {
            ((point.lat * 1000.0).abs() + (point.lng * 7.0).abs()) % 100.0
        }
    }

    struct ConstantModel(f64);

    impl SafetyModel for ConstantModel {
        fn point_score(&self, _point: Coordinate) -> f64 {
            self.0
        }
    }

    #[test]
    fn weights_sum_to_one() {
        let sum = CRIME_WEIGHT + LIGHTING_WEIGHT + POLICE_WEIGHT + CROWD_REPORT_WEIGHT;
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn metrics_formula() {
        let metrics = SafetyMetrics {
            crime_rate: 20.0,
            lighting_quality: 80.0,
            police_proximity: 60.0,
            crowd_report_count: 4,
        };
        // 80*0.30 + 80*0.25 + 60*0.20 + 80*0.25
        assert!((score_metrics(&metrics) - 76.0).abs() < 1e-9);
    }

    #[test]
    fn crowd_component_floors_at_zero() {
        let metrics = SafetyMetrics {
            crime_rate: 100.0,
            lighting_quality: 0.0,
            police_proximity: 0.0,
            crowd_report_count: 1_000,
        };
        assert!(score_metrics(&metrics).abs() < f64::EPSILON);
    }

    #[test]
    fn best_case_metrics_hit_one_hundred() {
        let metrics = SafetyMetrics {
            crime_rate: 0.0,
            lighting_quality: 100.0,
            police_proximity: 100.0,
            crowd_report_count: 0,
        };
        assert!((score_metrics(&metrics) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_route_is_neutral() {
        assert!((score_route(&StripedModel, &[]) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn uniform_model_yields_uniform_score() {
        let points = vec![Coordinate::new(1.0, 2.0), Coordinate::new(3.0, 4.0)];
        assert!((score_route(&ConstantModel(60.0), &points) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn route_score_is_mean_of_point_scores() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let len = rng.gen_range(1..50);
            let points: Vec<Coordinate> = (0..len)
                .map(|_| Coordinate::new(rng.gen_range(-90.0..=90.0), rng.gen_range(-180.0..=180.0)))
                .collect();

            let expected: f64 = points.iter().map(|p| StripedModel.point_score(*p)).sum::<f64>()
                / points.len() as f64;
            let actual = score_route(&StripedModel, &points);
            assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");

            let mut reversed = points.clone();
            reversed.reverse();
            assert!((score_route(&StripedModel, &reversed) - actual).abs() < 1e-9);
        }
    }

    #[test]
    fn clamp_handles_nan_and_bounds() {
        assert!((clamp_score(f64::NAN) - NEUTRAL_SCORE).abs() < f64::EPSILON);
        assert!((clamp_score(-3.0)).abs() < f64::EPSILON);
        assert!((clamp_score(140.0) - 100.0).abs() < f64::EPSILON);
    }
}
