use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use evac_router::Config;
use evac_router::dataset::{self, JsonTrainingFile, RoadNetworkFile, TrainingSource};
use evac_router::network::segments_from_pbf;
use evac_router::pipeline::{ReportPipeline, ReportSubmission, refresh_segment_risk};
use evac_router::risk::{HazardMap, SegmentRiskPredictor};
use evac_router::routing::RouteEngine;
use evac_router::types::{Coordinate, RoadSegment};
use evac_router::validation::{ConsensusScorer, ReportValidator};

#[derive(Parser)]
#[command(name = "evac-router", about = "Risk-aware evacuation routing")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Safest routes from a position to an evacuation center
    Route {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        /// Evacuation center id
        #[arg(long)]
        center: u64,
        /// Number of routes (defaults to EVAC_ROUTE_COUNT)
        #[arg(long)]
        k: Option<usize>,
    },
    /// Score a new hazard report against the reports on file
    Report {
        #[arg(long)]
        hazard_type: String,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        #[arg(long, default_value = "")]
        description: String,
        /// Report id; defaults to one past the highest id on file
        #[arg(long)]
        id: Option<u64>,
    },
    /// Recompute segment risk scores from baseline hazards
    ScoreSegments {
        /// Write the scored network here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("evac_router=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing::info!(data_dir = %config.data_dir.display(), "Configuration loaded");

    let training: Arc<dyn TrainingSource> = Arc::new(JsonTrainingFile::new(config.training_path()));

    match cli.command {
        Command::Route { lat, lng, center, k } => {
            let start = Coordinate::new(lat, lng)?;
            let segments = load_network(&config)?;
            let centers = dataset::load_evacuation_centers(&config.centers_path())?;
            let engine = RouteEngine::new(config.risk_multiplier)?;
            let plan = engine
                .plan_evacuation(&segments, start, &centers, center, k.unwrap_or(config.route_count))?;
            if let Some(log) = plan.route_log() {
                tracing::info!(
                    center = log.evacuation_center_id,
                    risk = log.selected_route_risk,
                    "Route selected"
                );
            }
            print_json(&plan)?;
        }
        Command::Report {
            hazard_type,
            lat,
            lng,
            description,
            id,
        } => {
            let existing = dataset::load_reports(&config.reports_path())?;
            let id = id.unwrap_or_else(|| existing.iter().map(|r| r.id).max().unwrap_or(0) + 1);
            let pipeline = ReportPipeline::new(
                ReportValidator::with_source(training),
                ConsensusScorer::new(config.consensus_radius_m).with_alpha(config.consensus_alpha),
            );
            let report = pipeline.submit(
                ReportSubmission {
                    id,
                    hazard_type,
                    location: Coordinate { lat, lng },
                    description,
                },
                &existing,
            )?;
            print_json(&report)?;
        }
        Command::ScoreSegments { output } => {
            let mut segments = load_network(&config)?;
            let hazards_path = config.hazards_path();
            let hazards = if hazards_path.exists() {
                dataset::load_baseline_hazards(&hazards_path)?
            } else {
                Vec::new()
            };
            let mut predictor = SegmentRiskPredictor::with_source(training);
            refresh_segment_risk(&mut segments, &HazardMap::new(&hazards), &mut predictor);

            match output {
                Some(path) => dataset::save_segments(&path, &segments)?,
                None => print_json(&RoadNetworkFile::from_segments(&segments))?,
            }
        }
    }

    Ok(())
}

/// An OSM extract in the data directory takes precedence over the JSON network.
fn load_network(config: &Config) -> Result<Vec<RoadSegment>> {
    let osm = config.osm_network_path();
    if osm.exists() {
        return segments_from_pbf(&osm)
            .with_context(|| format!("importing road network from {}", osm.display()));
    }
    let json = config.road_network_path();
    dataset::load_segments(&json)
        .with_context(|| format!("loading road network from {}", json.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
