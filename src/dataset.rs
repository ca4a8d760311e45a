//! JSON-backed data sources: training sets, road network, baseline hazards,
//! evacuation centers and previously submitted reports.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::DataError;
use crate::types::{
    BaselineHazard, BayesExample, Coordinate, EvacuationCenter, HazardReport, RiskExample,
    RoadSegment,
};

pub const TRAINING_FILE: &str = "mock_training_data.json";
pub const ROAD_NETWORK_FILE: &str = "mock_road_network.json";
pub const HAZARDS_FILE: &str = "mock_hazards.json";
pub const CENTERS_FILE: &str = "evacuation_centers.json";
pub const REPORTS_FILE: &str = "hazard_reports.json";

/// Where the classifier and regressor pull examples from when they train
/// themselves.
pub trait TrainingSource: Send + Sync {
    fn bayes_examples(&self) -> Result<Vec<BayesExample>, DataError>;
    fn risk_examples(&self) -> Result<Vec<RiskExample>, DataError>;
}

#[derive(Debug, Default, Deserialize)]
struct TrainingFile {
    #[serde(default)]
    naive_bayes_training: Vec<BayesExample>,
    #[serde(default)]
    road_risk_training: Vec<RiskExample>,
}

/// Training file with `naive_bayes_training` and `road_risk_training` arrays.
/// A missing file reads as an empty training set.
#[derive(Debug, Clone)]
pub struct JsonTrainingFile {
    path: PathBuf,
}

impl JsonTrainingFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<TrainingFile, DataError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Training file not found");
            return Ok(TrainingFile::default());
        }
        read_json(&self.path)
    }
}

impl TrainingSource for JsonTrainingFile {
    fn bayes_examples(&self) -> Result<Vec<BayesExample>, DataError> {
        Ok(self.load()?.naive_bayes_training)
    }

    fn risk_examples(&self) -> Result<Vec<RiskExample>, DataError> {
        Ok(self.load()?.road_risk_training)
    }
}

/// In-memory examples, for callers that already hold their training data.
#[derive(Debug, Clone, Default)]
pub struct StaticTrainingSet {
    pub bayes: Vec<BayesExample>,
    pub risk: Vec<RiskExample>,
}

impl TrainingSource for StaticTrainingSet {
    fn bayes_examples(&self) -> Result<Vec<BayesExample>, DataError> {
        Ok(self.bayes.clone())
    }

    fn risk_examples(&self) -> Result<Vec<RiskExample>, DataError> {
        Ok(self.risk.clone())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SegmentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    start_lat: f64,
    start_lng: f64,
    end_lat: f64,
    end_lng: f64,
    #[serde(default)]
    base_distance: f64,
    #[serde(default, alias = "predicted_risk_score")]
    risk_score: f64,
}

impl From<&RoadSegment> for SegmentRecord {
    fn from(seg: &RoadSegment) -> Self {
        Self {
            id: Some(seg.id),
            start_lat: seg.start.lat,
            start_lng: seg.start.lng,
            end_lat: seg.end.lat,
            end_lng: seg.end.lng,
            base_distance: seg.base_distance,
            risk_score: seg.risk_score,
        }
    }
}

/// Road network document, the format [`load_segments`] reads.
#[derive(Debug, Serialize, Deserialize)]
pub struct RoadNetworkFile {
    #[serde(default)]
    segments: Vec<SegmentRecord>,
}

impl RoadNetworkFile {
    pub fn from_segments(segments: &[RoadSegment]) -> Self {
        Self {
            segments: segments.iter().map(SegmentRecord::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HazardRecord {
    hazard_type: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    severity: f64,
}

#[derive(Debug, Deserialize)]
struct HazardsFile {
    #[serde(default)]
    baseline_hazards: Vec<HazardRecord>,
}

#[derive(Debug, Deserialize)]
struct CenterRecord {
    id: u64,
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    address: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct CentersFile {
    #[serde(default)]
    evacuation_centers: Vec<CenterRecord>,
}

/// Road segments; records without an id are numbered from 1 in file order.
pub fn load_segments(path: &Path) -> Result<Vec<RoadSegment>, DataError> {
    let file: RoadNetworkFile = read_json(path)?;
    let segments = file
        .segments
        .into_iter()
        .enumerate()
        .map(|(i, r)| -> Result<RoadSegment, DataError> {
            RoadSegment::new(
                r.id.unwrap_or(i as u64 + 1),
                Coordinate::new(r.start_lat, r.start_lng)?,
                Coordinate::new(r.end_lat, r.end_lng)?,
                r.base_distance,
                r.risk_score,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    info!(path = %path.display(), count = segments.len(), "Loaded road segments");
    Ok(segments)
}

pub fn save_segments(path: &Path, segments: &[RoadSegment]) -> Result<(), DataError> {
    let json = serde_json::to_vec_pretty(&RoadNetworkFile::from_segments(segments)).map_err(
        |source| DataError::Json {
            path: path.to_path_buf(),
            source,
        },
    )?;
    fs::write(path, json).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), count = segments.len(), "Saved road segments");
    Ok(())
}

pub fn load_baseline_hazards(path: &Path) -> Result<Vec<BaselineHazard>, DataError> {
    let file: HazardsFile = read_json(path)?;
    let hazards = file
        .baseline_hazards
        .into_iter()
        .map(|r| -> Result<BaselineHazard, DataError> {
            Ok(BaselineHazard {
                hazard_type: r.hazard_type,
                location: Coordinate::new(r.latitude, r.longitude)?,
                severity: r.severity,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    info!(path = %path.display(), count = hazards.len(), "Loaded baseline hazards");
    Ok(hazards)
}

pub fn load_evacuation_centers(path: &Path) -> Result<Vec<EvacuationCenter>, DataError> {
    let file: CentersFile = read_json(path)?;
    file.evacuation_centers
        .into_iter()
        .map(|r| -> Result<EvacuationCenter, DataError> {
            Ok(EvacuationCenter {
                id: r.id,
                name: r.name,
                location: Coordinate::new(r.latitude, r.longitude)?,
                address: r.address,
                description: r.description,
            })
        })
        .collect()
}

/// Previously submitted reports; an absent file means none yet.
pub fn load_reports(path: &Path) -> Result<Vec<HazardReport>, DataError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    read_json(path)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    let data = fs::read(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&data).map_err(|source| DataError::Json {
        path: path.to_path_buf(),
        source,
    })
}
