use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::forest::{FEATURE_COUNT, ForestParams, RandomForest, Sample};
use crate::dataset::TrainingSource;
use crate::types::{RiskExample, clamp_unit};

/// Risk served for every segment while no model is available.
pub const FALLBACK_RISK: f64 = 0.3;

/// Aggregate hazard features of one road segment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SegmentFeatures {
    pub nearby_hazard_count: f64,
    pub avg_severity: f64,
}

impl SegmentFeatures {
    pub fn new(nearby_hazard_count: f64, avg_severity: f64) -> Self {
        Self {
            nearby_hazard_count,
            avg_severity,
        }
    }

    fn as_array(&self) -> [f64; FEATURE_COUNT] {
        [self.nearby_hazard_count, self.avg_severity]
    }
}

/// Fitted regressor snapshot.
#[derive(Debug, Clone)]
pub struct RiskModel {
    forest: RandomForest,
    examples: usize,
}

impl RiskModel {
    /// Examples with non-finite values are skipped; `None` if nothing is left.
    pub fn train(examples: &[RiskExample], params: &ForestParams) -> Option<Self> {
        let samples: Vec<Sample> = examples
            .iter()
            .map(|e| Sample {
                features: [e.nearby_hazard_count, e.avg_severity],
                target: e.risk_score,
            })
            .filter(|s| s.target.is_finite() && s.features.iter().all(|f| f.is_finite()))
            .collect();

        if samples.len() < examples.len() {
            warn!(
                skipped = examples.len() - samples.len(),
                "Dropped risk examples with non-finite values"
            );
        }

        let forest = RandomForest::fit(&samples, params)?;
        Some(Self {
            forest,
            examples: samples.len(),
        })
    }

    pub fn examples(&self) -> usize {
        self.examples
    }

    pub fn predict(&self, features: &SegmentFeatures) -> f64 {
        clamp_unit(self.forest.predict(&features.as_array()))
    }
}

/// Segment risk predictor with lazy training from its [`TrainingSource`].
pub struct SegmentRiskPredictor {
    model: Option<Arc<RiskModel>>,
    source: Option<Arc<dyn TrainingSource>>,
    source_attempted: bool,
    params: ForestParams,
}

impl Default for SegmentRiskPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentRiskPredictor {
    pub fn new() -> Self {
        Self {
            model: None,
            source: None,
            source_attempted: false,
            params: ForestParams::default(),
        }
    }

    pub fn with_source(source: Arc<dyn TrainingSource>) -> Self {
        Self {
            source: Some(source),
            ..Self::new()
        }
    }

    pub fn with_params(mut self, params: ForestParams) -> Self {
        self.params = params;
        self
    }

    /// Replace the model. Returns whether a model was produced.
    pub fn train(&mut self, examples: &[RiskExample]) -> bool {
        self.model = RiskModel::train(examples, &self.params).map(Arc::new);
        match &self.model {
            Some(model) => debug!(
                examples = model.examples,
                trees = model.forest.n_trees(),
                "Segment risk model trained"
            ),
            None => info!(
                fallback = FALLBACK_RISK,
                "No segment risk training data; serving fallback risk"
            ),
        }
        self.model.is_some()
    }

    pub fn train_from_source(&mut self) -> bool {
        self.source_attempted = true;
        let Some(source) = self.source.clone() else {
            return false;
        };
        match source.risk_examples() {
            Ok(examples) => self.train(&examples),
            Err(err) => {
                warn!(error = %err, "Segment risk training data unavailable");
                false
            }
        }
    }

    pub fn ensure_trained(&mut self) {
        if self.model.is_none() && !self.source_attempted {
            self.train_from_source();
        }
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<Arc<RiskModel>> {
        self.model.clone()
    }

    pub fn predict(&mut self, features: &SegmentFeatures) -> f64 {
        self.ensure_trained();
        self.score(features)
    }

    /// Predict with the current model, without training.
    pub fn score(&self, features: &SegmentFeatures) -> f64 {
        self.model
            .as_ref()
            .map_or(FALLBACK_RISK, |model| model.predict(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{JsonTrainingFile, StaticTrainingSet};

    fn example(id: u64, count: f64, severity: f64, risk: f64) -> RiskExample {
        RiskExample {
            segment_id: Some(id),
            nearby_hazard_count: count,
            avg_severity: severity,
            risk_score: risk,
        }
    }

    fn training_data() -> Vec<RiskExample> {
        vec![
            example(1, 0.0, 0.0, 0.1),
            example(2, 1.0, 0.3, 0.3),
            example(3, 2.0, 0.5, 0.5),
            example(4, 3.0, 0.7, 0.7),
            example(5, 5.0, 0.9, 0.9),
        ]
    }

    #[test]
    fn untrained_predictor_serves_fallback() {
        let mut predictor = SegmentRiskPredictor::new();
        assert_eq!(predictor.predict(&SegmentFeatures::new(2.0, 0.5)), FALLBACK_RISK);
        assert!(!predictor.train(&[]));
        assert_eq!(predictor.predict(&SegmentFeatures::new(100.0, 1.0)), FALLBACK_RISK);
    }

    #[test]
    fn missing_training_file_serves_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(JsonTrainingFile::new(dir.path().join("none.json")));
        let mut predictor = SegmentRiskPredictor::with_source(source);
        assert_eq!(predictor.predict(&SegmentFeatures::default()), FALLBACK_RISK);
        assert!(!predictor.is_trained());
    }

    #[test]
    fn trained_predictor_separates_low_and_high() {
        let mut predictor = SegmentRiskPredictor::new();
        assert!(predictor.train(&training_data()));
        let low = predictor.predict(&SegmentFeatures::new(0.0, 0.0));
        let high = predictor.predict(&SegmentFeatures::new(5.0, 0.9));
        assert!(low < 0.5, "low = {low}");
        assert!(high > 0.5, "high = {high}");
    }

    #[test]
    fn predictions_are_clamped() {
        let mut predictor = SegmentRiskPredictor::new();
        predictor.train(&[example(1, 0.0, 0.0, -0.4), example(2, 9.0, 1.0, 3.0)]);
        for features in [
            SegmentFeatures::new(0.0, 0.0),
            SegmentFeatures::new(100.0, 1.0),
            SegmentFeatures::new(-5.0, -1.0),
        ] {
            let risk = predictor.predict(&features);
            assert!((0.0..=1.0).contains(&risk), "got {risk}");
        }
    }

    #[test]
    fn lazily_trains_from_source() {
        let source = Arc::new(StaticTrainingSet {
            bayes: Vec::new(),
            risk: training_data(),
        });
        let mut predictor = SegmentRiskPredictor::with_source(source);
        assert!(!predictor.is_trained());
        let risk = predictor.predict(&SegmentFeatures::new(5.0, 0.9));
        assert!(predictor.is_trained());
        assert!(risk > 0.5);
    }

    #[test]
    fn non_finite_examples_are_skipped() {
        let model = RiskModel::train(
            &[example(1, f64::NAN, 0.0, 0.5), example(2, 1.0, 0.2, 0.2)],
            &ForestParams::default(),
        )
        .unwrap();
        assert_eq!(model.examples(), 1);
        assert!((model.predict(&SegmentFeatures::new(1.0, 0.2)) - 0.2).abs() < 1e-12);
    }
}
