pub mod forest;
pub mod hazard_map;
pub mod predictor;

pub use forest::ForestParams;
pub use hazard_map::HazardMap;
pub use predictor::{FALLBACK_RISK, RiskModel, SegmentFeatures, SegmentRiskPredictor};
