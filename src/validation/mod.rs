pub mod consensus;
pub mod naive_bayes;

pub use consensus::{CONSENSUS_RADIUS_METERS, ConsensusScorer, DEFAULT_ALPHA};
pub use naive_bayes::{BayesModel, NEUTRAL_PROBABILITY, ReportFeatures, ReportValidator};
