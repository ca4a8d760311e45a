//! Glue between the scoring components and the records they score.

use parking_lot::Mutex;
use tracing::info;

use crate::error::DataError;
use crate::risk::{HazardMap, SegmentRiskPredictor};
use crate::types::{Coordinate, HazardReport, ReportStatus, RoadSegment, clamp_unit};
use crate::validation::{ConsensusScorer, ReportFeatures, ReportValidator};

#[derive(Debug, Clone)]
pub struct ReportSubmission {
    pub id: u64,
    pub hazard_type: String,
    pub location: Coordinate,
    pub description: String,
}

/// Scores incoming hazard reports: plausibility first, then consensus with
/// the reports already on file.
///
/// The validator sits behind a lock so a shared pipeline never trains and
/// scores at the same time.
pub struct ReportPipeline {
    validator: Mutex<ReportValidator>,
    consensus: ConsensusScorer,
}

impl ReportPipeline {
    pub fn new(validator: ReportValidator, consensus: ConsensusScorer) -> Self {
        Self {
            validator: Mutex::new(validator),
            consensus,
        }
    }

    /// Retrain the validator from its source, e.g. after new verified reports.
    pub fn retrain(&self) -> bool {
        self.validator.lock().train_from_source()
    }

    pub fn submit(
        &self,
        submission: ReportSubmission,
        existing: &[HazardReport],
    ) -> Result<HazardReport, DataError> {
        let hazard_type = submission.hazard_type.trim();
        if hazard_type.is_empty() {
            return Err(DataError::InvalidRecord("hazard_type is required".into()));
        }
        let location = Coordinate::new(submission.location.lat, submission.location.lng)?;

        let plausibility = self
            .validator
            .lock()
            .validate_report(&ReportFeatures::new(hazard_type, &submission.description));
        let nearby = self
            .consensus
            .count_nearby(location, existing, Some(submission.id));
        let validated = clamp_unit(self.consensus.combined_score(plausibility, nearby));

        info!(
            report = submission.id,
            hazard_type,
            plausibility,
            nearby,
            validated,
            "Hazard report scored"
        );

        Ok(HazardReport {
            id: submission.id,
            hazard_type: hazard_type.to_string(),
            location,
            description: submission.description,
            status: ReportStatus::Pending,
            plausibility_score: Some(plausibility),
            validated_score: Some(validated),
        })
    }
}

/// Recompute every segment's risk from the hazards around it. Returns the
/// number of segments updated.
pub fn refresh_segment_risk(
    segments: &mut [RoadSegment],
    hazards: &HazardMap,
    predictor: &mut SegmentRiskPredictor,
) -> usize {
    predictor.ensure_trained();
    for segment in segments.iter_mut() {
        let features = hazards.segment_features(segment);
        segment.set_risk(predictor.score(&features));
    }
    info!(
        segments = segments.len(),
        trained = predictor.is_trained(),
        "Segment risk scores refreshed"
    );
    segments.len()
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use super::*;
    use crate::dataset::JsonTrainingFile;
    use crate::risk::{FALLBACK_RISK, ForestParams};
    use crate::types::{BaselineHazard, BayesExample, RiskExample};

    fn submission(id: u64, hazard_type: &str, lat: f64, lng: f64) -> ReportSubmission {
        ReportSubmission {
            id,
            hazard_type: hazard_type.into(),
            location: Coordinate { lat, lng },
            description: "Water knee-deep near the market".into(),
        }
    }

    #[test]
    fn rejects_missing_hazard_type() {
        let pipeline = ReportPipeline::new(ReportValidator::new(), ConsensusScorer::default());
        let err = pipeline.submit(submission(1, "  ", 14.6, 120.98), &[]).unwrap_err();
        assert!(matches!(err, DataError::InvalidRecord(_)));
    }

    #[test]
    fn rejects_invalid_location() {
        let pipeline = ReportPipeline::new(ReportValidator::new(), ConsensusScorer::default());
        assert!(pipeline.submit(submission(1, "flood", 120.0, 14.6), &[]).is_err());
    }

    #[test]
    fn untrained_pipeline_scores_neutral_plausibility() {
        let pipeline = ReportPipeline::new(ReportValidator::new(), ConsensusScorer::default());
        let report = pipeline.submit(submission(1, "flood", 14.6, 120.98), &[]).unwrap();
        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(report.plausibility_score, Some(0.5));
        assert!((report.validated_score.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn consensus_excludes_own_id() {
        let pipeline = ReportPipeline::new(ReportValidator::new(), ConsensusScorer::default());
        let first = pipeline.submit(submission(1, "flood", 14.6, 120.98), &[]).unwrap();
        let resubmitted = pipeline
            .submit(submission(1, "flood", 14.6, 120.98), std::slice::from_ref(&first))
            .unwrap();
        assert_eq!(first.validated_score, resubmitted.validated_score);
    }

    #[test]
    fn trained_validator_drives_plausibility() {
        let mut validator = ReportValidator::new();
        validator.train(&[
            BayesExample { hazard_type: "flood".into(), description_length: 40, is_valid: true },
            BayesExample { hazard_type: "spam".into(), description_length: 2, is_valid: false },
        ]);
        let pipeline = ReportPipeline::new(validator, ConsensusScorer::default());
        let report = pipeline.submit(submission(1, "flood", 14.6, 120.98), &[]).unwrap();
        assert!(report.plausibility_score.unwrap() > 0.5);
    }

    #[test]
    fn retrain_picks_up_new_training_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training.json");
        let labeled = |flood_valid: bool| {
            format!(
                r#"{{"naive_bayes_training": [
                    {{"hazard_type": "flood", "description_length": 40, "valid": {flood_valid}}},
                    {{"hazard_type": "fire", "description_length": 40, "valid": {}}}
                ]}}"#,
                !flood_valid
            )
        };
        fs::write(&path, labeled(false)).unwrap();

        let validator = ReportValidator::with_source(Arc::new(JsonTrainingFile::new(path.clone())));
        let pipeline = ReportPipeline::new(validator, ConsensusScorer::default());
        let before = pipeline.submit(submission(1, "flood", 14.6, 120.98), &[]).unwrap();
        assert!((before.plausibility_score.unwrap() - 0.25).abs() < 1e-12);

        fs::write(&path, labeled(true)).unwrap();
        // Already trained, so nothing changes until an explicit retrain.
        let stale = pipeline.submit(submission(1, "flood", 14.6, 120.98), &[]).unwrap();
        assert_eq!(stale.plausibility_score, before.plausibility_score);

        assert!(pipeline.retrain());
        let after = pipeline.submit(submission(1, "flood", 14.6, 120.98), &[]).unwrap();
        assert!((after.plausibility_score.unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn refresh_without_model_uses_fallback() {
        let mut segments = vec![
            RoadSegment::new(
                1,
                Coordinate { lat: 14.5995, lng: 120.9842 },
                Coordinate { lat: 14.6000, lng: 120.9842 },
                55.6,
                0.0,
            )
            .unwrap(),
        ];
        let mut predictor = SegmentRiskPredictor::new();
        let updated = refresh_segment_risk(&mut segments, &HazardMap::new(&[]), &mut predictor);
        assert_eq!(updated, 1);
        assert_eq!(segments[0].risk_score, FALLBACK_RISK);
    }

    #[test]
    fn refresh_raises_risk_near_hazards() {
        let a = Coordinate { lat: 14.5995, lng: 120.9842 };
        let b = Coordinate { lat: 14.6000, lng: 120.9842 };
        let far_a = Coordinate { lat: 14.7995, lng: 121.1842 };
        let far_b = Coordinate { lat: 14.8000, lng: 121.1842 };
        let mut segments = vec![
            RoadSegment::new(1, a, b, 55.6, 0.0).unwrap(),
            RoadSegment::new(2, far_a, far_b, 55.6, 0.0).unwrap(),
        ];
        let hazards = HazardMap::new(&[
            BaselineHazard { hazard_type: "flood".into(), location: a, severity: 0.9 },
            BaselineHazard { hazard_type: "flood".into(), location: b, severity: 0.9 },
            BaselineHazard { hazard_type: "landslide".into(), location: b, severity: 0.9 },
        ]);
        let mut predictor = SegmentRiskPredictor::new().with_params(ForestParams {
            bootstrap: false,
            ..ForestParams::default()
        });
        predictor.train(&[
            RiskExample { segment_id: None, nearby_hazard_count: 0.0, avg_severity: 0.0, risk_score: 0.05 },
            RiskExample { segment_id: None, nearby_hazard_count: 3.0, avg_severity: 0.9, risk_score: 0.9 },
        ]);
        refresh_segment_risk(&mut segments, &hazards, &mut predictor);
        assert!(segments[0].risk_score > segments[1].risk_score);
        assert!((segments[1].risk_score - 0.05).abs() < 1e-12);
    }
}
