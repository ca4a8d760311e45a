use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, ensure};

use crate::dataset::{CENTERS_FILE, HAZARDS_FILE, REPORTS_FILE, ROAD_NETWORK_FILE, TRAINING_FILE};
use crate::routing::{DEFAULT_RISK_MULTIPLIER, DEFAULT_ROUTE_COUNT};
use crate::validation::{CONSENSUS_RADIUS_METERS, DEFAULT_ALPHA};

pub const DEFAULT_DATA_DIR: &str = "./mock_data";
pub const OSM_NETWORK_FILE: &str = "road_network.osm.pbf";

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub risk_multiplier: f64,
    pub route_count: usize,
    pub consensus_radius_m: f64,
    pub consensus_alpha: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            risk_multiplier: DEFAULT_RISK_MULTIPLIER,
            route_count: DEFAULT_ROUTE_COUNT,
            consensus_radius_m: CONSENSUS_RADIUS_METERS,
            consensus_alpha: DEFAULT_ALPHA,
        }
    }
}

impl Config {
    /// Unset variables take their defaults; set but unparseable ones are errors.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            data_dir: lookup("EVAC_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            risk_multiplier: parsed_var(&lookup, "EVAC_RISK_MULTIPLIER", defaults.risk_multiplier)?,
            route_count: parsed_var(&lookup, "EVAC_ROUTE_COUNT", defaults.route_count)?,
            consensus_radius_m: parsed_var(
                &lookup,
                "EVAC_CONSENSUS_RADIUS_M",
                defaults.consensus_radius_m,
            )?,
            consensus_alpha: parsed_var(&lookup, "EVAC_CONSENSUS_ALPHA", defaults.consensus_alpha)?,
        };
        ensure!(
            config.risk_multiplier.is_finite() && config.risk_multiplier >= 0.0,
            "EVAC_RISK_MULTIPLIER must be finite and non-negative, got {}",
            config.risk_multiplier
        );
        Ok(config)
    }

    pub fn training_path(&self) -> PathBuf {
        self.data_dir.join(TRAINING_FILE)
    }

    pub fn road_network_path(&self) -> PathBuf {
        self.data_dir.join(ROAD_NETWORK_FILE)
    }

    pub fn osm_network_path(&self) -> PathBuf {
        self.data_dir.join(OSM_NETWORK_FILE)
    }

    pub fn hazards_path(&self) -> PathBuf {
        self.data_dir.join(HAZARDS_FILE)
    }

    pub fn centers_path(&self) -> PathBuf {
        self.data_dir.join(CENTERS_FILE)
    }

    pub fn reports_path(&self) -> PathBuf {
        self.data_dir.join(REPORTS_FILE)
    }
}

fn parsed_var<T>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number, got {raw:?}")),
        None => Ok(default),
    }
}
