use std::collections::{HashMap, HashSet};

use h3o::{CellIndex, LatLng, Resolution};
use tracing::warn;

use super::predictor::SegmentFeatures;
use crate::types::{BaselineHazard, Coordinate, RoadSegment};

/// Roughly 0.1 km² cells.
pub const HAZARD_RESOLUTION: Resolution = Resolution::Nine;
/// Rings of neighbor cells searched around each segment endpoint.
pub const NEIGHBOR_RING: u32 = 1;

/// Baseline hazard severities bucketed by H3 cell.
pub struct HazardMap {
    cells: HashMap<CellIndex, Vec<f64>>,
    resolution: Resolution,
    ring: u32,
}

impl HazardMap {
    pub fn new(hazards: &[BaselineHazard]) -> Self {
        Self::with_resolution(hazards, HAZARD_RESOLUTION, NEIGHBOR_RING)
    }

    pub fn with_resolution(hazards: &[BaselineHazard], resolution: Resolution, ring: u32) -> Self {
        let mut cells: HashMap<CellIndex, Vec<f64>> = HashMap::new();
        for hazard in hazards {
            let Some(cell) = to_cell(hazard.location, resolution) else {
                warn!(hazard_type = %hazard.hazard_type, "Skipping hazard with invalid location");
                continue;
            };
            cells.entry(cell).or_default().push(hazard.severity);
        }
        Self {
            cells,
            resolution,
            ring,
        }
    }

    pub fn hazard_count(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    /// Hazards in the cell disks around both endpoints; a cell shared by the
    /// two disks counts once.
    pub fn segment_features(&self, segment: &RoadSegment) -> SegmentFeatures {
        let mut around: HashSet<CellIndex> = HashSet::new();
        for endpoint in [segment.start, segment.end] {
            if let Some(cell) = to_cell(endpoint, self.resolution) {
                around.extend(cell.grid_disk::<Vec<_>>(self.ring));
            }
        }

        let severities: Vec<f64> = around
            .iter()
            .filter_map(|cell| self.cells.get(cell))
            .flatten()
            .copied()
            .collect();

        if severities.is_empty() {
            return SegmentFeatures::default();
        }
        let count = severities.len() as f64;
        SegmentFeatures::new(count, severities.iter().sum::<f64>() / count)
    }
}

fn to_cell(coord: Coordinate, resolution: Resolution) -> Option<CellIndex> {
    LatLng::new(coord.lat, coord.lng)
        .ok()
        .map(|ll| ll.to_cell(resolution))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hazard(lat: f64, lng: f64, severity: f64) -> BaselineHazard {
        BaselineHazard {
            hazard_type: "flood".into(),
            location: Coordinate { lat, lng },
            severity,
        }
    }

    fn segment() -> RoadSegment {
        RoadSegment::new(
            1,
            Coordinate { lat: 14.5995, lng: 120.9842 },
            Coordinate { lat: 14.6000, lng: 120.9842 },
            55.6,
            0.0,
        )
        .unwrap()
    }

    #[test]
    fn no_hazards_no_features() {
        let map = HazardMap::new(&[]);
        assert_eq!(map.segment_features(&segment()), SegmentFeatures::default());
    }

    #[test]
    fn hazards_at_endpoints_are_counted_once() {
        let map = HazardMap::new(&[hazard(14.5995, 120.9842, 0.8), hazard(14.6000, 120.9842, 0.4)]);
        assert_eq!(map.hazard_count(), 2);
        let features = map.segment_features(&segment());
        assert_eq!(features.nearby_hazard_count, 2.0);
        assert!((features.avg_severity - 0.6).abs() < 1e-12);
    }

    #[test]
    fn distant_hazards_are_ignored() {
        let map = HazardMap::new(&[hazard(15.5995, 121.9842, 1.0)]);
        assert_eq!(map.segment_features(&segment()).nearby_hazard_count, 0.0);
    }
}
