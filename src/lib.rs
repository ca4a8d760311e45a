//! Risk-aware evacuation routing and hazard report validation.
//!
//! - [`routing`]: risk-weighted shortest paths to evacuation centers.
//! - [`validation`]: Naive Bayes plausibility plus nearby-report consensus.
//! - [`risk`]: per-segment risk regression from aggregated hazard features.

pub mod config;
pub mod dataset;
pub mod error;
pub mod geo_metrics;
pub mod graph;
pub mod network;
pub mod pipeline;
pub mod risk;
pub mod routing;
pub mod types;
pub mod validation;

pub use config::Config;
pub use error::{DataError, RouteError};
pub use routing::{RiskLevel, RouteCandidate, RouteEngine};
pub use types::{Coordinate, HazardReport, NodeKey, RoadSegment};
