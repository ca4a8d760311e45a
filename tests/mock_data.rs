//! End-to-end runs over the sample data shipped in `mock_data/`.

use std::path::PathBuf;
use std::sync::Arc;

use evac_router::dataset::{self, JsonTrainingFile};
use evac_router::pipeline::refresh_segment_risk;
use evac_router::risk::{HazardMap, SegmentRiskPredictor};
use evac_router::validation::{ReportFeatures, ReportValidator};
use evac_router::{Config, RouteEngine};

fn config() -> Config {
    Config {
        data_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("mock_data"),
        ..Config::default()
    }
}

#[test]
fn routes_across_the_sample_grid() {
    let config = config();
    let segments = dataset::load_segments(&config.road_network_path()).unwrap();
    let centers = dataset::load_evacuation_centers(&config.centers_path()).unwrap();
    assert_eq!(segments.len(), 40);
    assert_eq!(centers.len(), 2);

    let start = centers[1].location;
    let plan = RouteEngine::new(config.risk_multiplier)
        .unwrap()
        .plan_evacuation(&segments, start, &centers, centers[0].id, config.route_count)
        .unwrap();

    assert_eq!(plan.routes.len(), config.route_count);
    let best = &plan.routes[0];
    assert_eq!(best.path_keys.first(), Some(&start.key()));
    assert_eq!(best.path_keys.last(), Some(&centers[0].location.key()));
    // Eight grid edges separate opposite corners.
    assert_eq!(best.path_keys.len(), 9);
}

#[test]
fn sample_training_data_trains_both_models() {
    let config = config();
    let source = Arc::new(JsonTrainingFile::new(config.training_path()));

    let mut validator = ReportValidator::with_source(source.clone());
    let p = validator.validate_report(&ReportFeatures::new("flood", "Water up to the knees on Lacson Ave"));
    assert!(validator.is_trained());
    assert!((0.0..=1.0).contains(&p));

    let hazards = dataset::load_baseline_hazards(&config.hazards_path()).unwrap();
    let map = HazardMap::new(&hazards);
    assert_eq!(map.hazard_count(), hazards.len());

    let mut segments = dataset::load_segments(&config.road_network_path()).unwrap();
    let mut predictor = SegmentRiskPredictor::with_source(source);
    let updated = refresh_segment_risk(&mut segments, &map, &mut predictor);
    assert_eq!(updated, segments.len());
    assert!(predictor.is_trained());
    assert!(segments.iter().all(|s| (0.0..=1.0).contains(&s.risk_score)));
}
