//! Road network import from OpenStreetMap PBF extracts.

use std::collections::HashMap;
use std::path::Path;

use itertools::Itertools;
use osmpbf::{Element, ElementReader};
use tracing::info;

use crate::error::DataError;
use crate::geo_metrics::haversine_meters;
use crate::types::{Coordinate, RoadSegment};

/// Whether a way with these tags can carry evacuees on foot or by vehicle.
pub fn is_evacuation_way(tags: &HashMap<&str, &str>) -> bool {
    let highway = tags.get("highway").copied().unwrap_or("");
    let access = tags.get("access").copied().unwrap_or("");

    if matches!(access, "no" | "private") {
        return false;
    }

    matches!(
        highway,
        "motorway"
            | "trunk"
            | "primary"
            | "secondary"
            | "tertiary"
            | "unclassified"
            | "residential"
            | "service"
            | "living_street"
            | "pedestrian"
            | "footway"
            | "path"
            | "steps"
            | "track"
            | "motorway_link"
            | "trunk_link"
            | "primary_link"
            | "secondary_link"
            | "tertiary_link"
    )
}

/// One segment per consecutive node pair of every evacuation way, measured
/// with Haversine. Risk starts at zero until the predictor scores it.
pub fn segments_from_pbf(path: &Path) -> Result<Vec<RoadSegment>, DataError> {
    info!(path = %path.display(), "Parsing OSM PBF");

    // Pass 1: node positions
    let mut positions: HashMap<i64, Coordinate> = HashMap::new();
    ElementReader::from_path(path)?.for_each(|element| match element {
        Element::Node(node) => {
            positions.insert(node.id(), Coordinate { lat: node.lat(), lng: node.lon() });
        }
        Element::DenseNode(node) => {
            positions.insert(node.id(), Coordinate { lat: node.lat(), lng: node.lon() });
        }
        _ => {}
    })?;
    info!(nodes = positions.len(), "Loaded OSM nodes");

    // Pass 2: ways
    let mut segments = Vec::new();
    ElementReader::from_path(path)?.for_each(|element| {
        let Element::Way(way) = element else {
            return;
        };
        let tags: HashMap<&str, &str> = way.tags().collect();
        if !is_evacuation_way(&tags) {
            return;
        }
        for (a, b) in way.refs().tuple_windows() {
            let (Some(&start), Some(&end)) = (positions.get(&a), positions.get(&b)) else {
                continue;
            };
            segments.push(RoadSegment {
                id: segments.len() as u64 + 1,
                start,
                end,
                base_distance: haversine_meters(start, end),
                risk_score: 0.0,
            });
        }
    })?;

    info!(segments = segments.len(), "Road network imported");
    Ok(segments)
}
