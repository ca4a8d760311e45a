use std::fmt;

use geo::Point;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::DataError;

/// Decimal places kept in a node key (~0.1 m).
pub const COORD_KEY_DECIMALS: i32 = 6;
const KEY_SCALE: f64 = 1_000_000.0;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Result<Self, DataError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(DataError::InvalidRecord(format!(
                "non-finite coordinate ({lat}, {lng})"
            )));
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(DataError::InvalidRecord(format!(
                "coordinate out of range ({lat}, {lng})"
            )));
        }
        Ok(Self { lat, lng })
    }

    pub fn key(&self) -> NodeKey {
        NodeKey {
            lat_micro: (self.lat * KEY_SCALE).round() as i64,
            lng_micro: (self.lng * KEY_SCALE).round() as i64,
        }
    }

    /// geo uses (x, y) = (lon, lat).
    pub fn point(&self) -> Point<f64> {
        Point::new(self.lng, self.lat)
    }
}

/// Graph node identity: a coordinate rounded to [`COORD_KEY_DECIMALS`] places.
///
/// Stored as integer micro-degrees so equality and ordering are exact. The
/// derived ordering is lexicographic on (lat, lng) and doubles as the routing
/// tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    lat_micro: i64,
    lng_micro: i64,
}

impl NodeKey {
    pub fn lat(&self) -> f64 {
        self.lat_micro as f64 / KEY_SCALE
    }

    pub fn lng(&self) -> f64 {
        self.lng_micro as f64 / KEY_SCALE
    }

    pub fn to_coordinate(&self) -> Coordinate {
        Coordinate {
            lat: self.lat(),
            lng: self.lng(),
        }
    }

    /// `[lat, lng]`, the shape routes are reported in.
    pub fn to_pair(&self) -> [f64; 2] {
        [self.lat(), self.lng()]
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat(), self.lng())
    }
}

impl Serialize for NodeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Edge of the road network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadSegment {
    pub id: u64,
    pub start: Coordinate,
    pub end: Coordinate,
    /// Length in meters.
    pub base_distance: f64,
    /// Predicted hazard risk in [0, 1].
    pub risk_score: f64,
}

impl RoadSegment {
    pub fn new(
        id: u64,
        start: Coordinate,
        end: Coordinate,
        base_distance: f64,
        risk_score: f64,
    ) -> Result<Self, DataError> {
        if !base_distance.is_finite() || base_distance < 0.0 {
            return Err(DataError::InvalidRecord(format!(
                "segment {id}: base_distance must be a non-negative number, got {base_distance}"
            )));
        }
        Ok(Self {
            id,
            start,
            end,
            base_distance,
            risk_score: clamp_unit(risk_score),
        })
    }

    pub fn set_risk(&mut self, risk_score: f64) {
        self.risk_score = clamp_unit(risk_score);
    }
}

/// Clamp into [0, 1]. NaN maps to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Moderation {
    Approve,
    Reject,
}

/// Crowdsourced hazard report with its validation scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardReport {
    pub id: u64,
    pub hazard_type: String,
    pub location: Coordinate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(default)]
    pub plausibility_score: Option<f64>,
    #[serde(default)]
    pub validated_score: Option<f64>,
}

impl HazardReport {
    pub fn moderate(&mut self, action: Moderation) {
        self.status = match action {
            Moderation::Approve => ReportStatus::Approved,
            Moderation::Reject => ReportStatus::Rejected,
        };
    }
}

/// Official hazard record used to derive per-segment risk features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineHazard {
    pub hazard_type: String,
    pub location: Coordinate,
    #[serde(default)]
    pub severity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvacuationCenter {
    pub id: u64,
    pub name: String,
    pub location: Coordinate,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
}

/// Labeled example for the report plausibility classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BayesExample {
    #[serde(default = "unknown_hazard")]
    pub hazard_type: String,
    #[serde(default)]
    pub description_length: usize,
    #[serde(rename = "valid", default)]
    pub is_valid: bool,
}

fn unknown_hazard() -> String {
    "unknown".to_string()
}

/// Labeled example for the segment risk regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskExample {
    #[serde(default)]
    pub segment_id: Option<u64>,
    #[serde(default)]
    pub nearby_hazard_count: f64,
    #[serde(default)]
    pub avg_severity: f64,
    #[serde(default)]
    pub risk_score: f64,
}
