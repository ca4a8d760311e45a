//! Corroboration from nearby reports, blended with the plausibility score.

use crate::geo_metrics::within_radius;
use crate::types::{Coordinate, HazardReport};

pub const CONSENSUS_RADIUS_METERS: f64 = 50.0;
pub const DEFAULT_ALPHA: f64 = 0.7;

const BOOST_PER_REPORT: f64 = 0.1;
const MAX_BOOST: f64 = 0.3;
const CONSENSUS_BASELINE: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct ConsensusScorer {
    radius_m: f64,
    alpha: f64,
}

impl Default for ConsensusScorer {
    fn default() -> Self {
        Self::new(CONSENSUS_RADIUS_METERS)
    }
}

impl ConsensusScorer {
    pub fn new(radius_m: f64) -> Self {
        Self {
            radius_m,
            alpha: DEFAULT_ALPHA,
        }
    }

    /// Weight given to the plausibility score, in [0, 1].
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Reports within the radius of `location`, skipping `exclude_id`.
    pub fn count_nearby(
        &self,
        location: Coordinate,
        candidates: &[HazardReport],
        exclude_id: Option<u64>,
    ) -> usize {
        candidates
            .iter()
            .filter(|r| exclude_id != Some(r.id))
            .filter(|r| within_radius(location, r.location, self.radius_m))
            .count()
    }

    pub fn combined_score(&self, plausibility_score: f64, nearby_count: usize) -> f64 {
        combined_score(plausibility_score, nearby_count, self.alpha)
    }
}

/// `alpha * plausibility + (1 - alpha) * (0.5 + boost)`, where the boost grows
/// by 0.1 per nearby report and saturates at 0.3.
pub fn combined_score(plausibility_score: f64, nearby_count: usize, alpha: f64) -> f64 {
    let boost = (nearby_count as f64 * BOOST_PER_REPORT).min(MAX_BOOST);
    alpha * plausibility_score + (1.0 - alpha) * (CONSENSUS_BASELINE + boost)
}
