use std::path::PathBuf;

use thiserror::Error;

use crate::types::NodeKey;

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("road network is empty")]
    EmptyNetwork,

    #[error("no path between {start} and {destination}")]
    NoPath { start: NodeKey, destination: NodeKey },

    #[error("node {0} is not part of the road network")]
    UnknownNode(NodeKey),

    #[error("evacuation center {0} not found")]
    UnknownDestination(u64),

    #[error("risk multiplier must be finite and non-negative, got {0}")]
    InvalidRiskMultiplier(f64),
}

#[derive(Error, Debug)]
pub enum DataError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("OSM parse error: {0}")]
    Osm(#[from] osmpbf::Error),

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}
