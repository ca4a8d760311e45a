use evac_router::pipeline::{ReportPipeline, ReportSubmission};
use evac_router::types::{BayesExample, ReportStatus};
use evac_router::validation::{ConsensusScorer, ReportValidator};
use evac_router::{Coordinate, HazardReport};

fn example(hazard_type: &str, description_length: usize, is_valid: bool) -> BayesExample {
    BayesExample {
        hazard_type: hazard_type.into(),
        description_length,
        is_valid,
    }
}

fn training() -> Vec<BayesExample> {
    vec![
        example("flood", 45, true),
        example("flood", 80, true),
        example("flood", 5, false),
        example("fire", 30, true),
        example("fire", 10, false),
        example("other", 3, false),
    ]
}

fn submission(id: u64, lat: f64, lng: f64) -> ReportSubmission {
    ReportSubmission {
        id,
        hazard_type: "flood".into(),
        location: Coordinate { lat, lng },
        description: "Knee-deep water across the whole street".into(),
    }
}

#[test]
fn corroborated_reports_outscore_an_isolated_one() {
    let mut validator = ReportValidator::new();
    assert!(validator.train(&training()));
    let pipeline = ReportPipeline::new(validator, ConsensusScorer::default());

    // Two reports about 11 m apart, one about 1.1 km away.
    let first = pipeline.submit(submission(1, 14.6000, 120.9840), &[]).unwrap();
    let second = pipeline
        .submit(submission(2, 14.6001, 120.9840), std::slice::from_ref(&first))
        .unwrap();
    let on_file: Vec<HazardReport> = vec![first, second.clone()];
    let isolated = pipeline.submit(submission(3, 14.6100, 120.9840), &on_file).unwrap();
    let first = pipeline.submit(submission(1, 14.6000, 120.9840), &on_file).unwrap();

    let isolated_score = isolated.validated_score.unwrap();
    assert!(first.validated_score.unwrap() > isolated_score);
    assert!(second.validated_score.unwrap() > isolated_score);
    // Same text, so plausibility alone does not separate them.
    assert_eq!(first.plausibility_score, isolated.plausibility_score);
    assert_eq!(isolated.status, ReportStatus::Pending);
}
