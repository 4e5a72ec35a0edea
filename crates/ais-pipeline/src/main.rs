//! Command-line angle estimation.
//!
//! Reads `{basepath}/initial_img`, writes `{basepath}/output_frames_seg` and
//! prints the three angles and the curvature class to stdout.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ais_media::ModelVariant;
use ais_pipeline::{Pipeline, PipelineConfig, PipelineOutcome};

/// Estimate spinal curvature angles from back photographs.
#[derive(Parser)]
#[command(name = "ais")]
#[command(about = "Segment back photographs, regress curvature angles and classify the pattern")]
struct Args {
    /// Base directory containing initial_img/
    #[arg(short, long, env = "AIS_BASEPATH")]
    basepath: PathBuf,

    /// Angles at or below this value count as straight
    #[arg(short, long, value_parser = parse_threshold)]
    threshold: Option<f64>,

    /// Regression model variant (desktop or mobile)
    #[arg(long)]
    variant: Option<ModelVariant>,

    /// Segmentation worker threads
    #[arg(short, long)]
    workers: Option<usize>,

    /// Path to the background matte model
    #[arg(long)]
    segmentation_model: Option<PathBuf>,

    /// Path to the angle regression model
    #[arg(long)]
    regression_model: Option<PathBuf>,

    /// Reuse output_frames_seg/ from an earlier run
    #[arg(long)]
    skip_segmentation: bool,
}

fn parse_threshold(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err("threshold must be a finite number".to_string())
    }
}

impl Args {
    fn apply(self, config: &mut PipelineConfig) {
        config.basepath = self.basepath;
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(variant) = self.variant {
            config.set_variant(variant);
        }
        if let Some(workers) = self.workers {
            config.segment_workers = workers.max(1);
        }
        if self.segmentation_model.is_some() {
            config.models.segmentation_model = self.segmentation_model;
        }
        if self.regression_model.is_some() {
            config.models.regression_model = self.regression_model;
        }
        config.skip_segmentation = self.skip_segmentation;
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("ais=info".parse().unwrap())
        .add_directive("ort=warn".parse().unwrap());

    // stdout carries the results
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

fn print_outcome(outcome: &PipelineOutcome) {
    let angles = outcome.angles;
    println!("Angle 1: {}", angles.proximal_thoracic);
    println!("Angle 2: {}", angles.main_thoracic);
    println!("Angle 3: {}", angles.lumbar);
    println!("{}", outcome.classification.summary());
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();

    let mut config = match PipelineConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    args.apply(&mut config);
    info!(
        basepath = %config.basepath.display(),
        variant = %config.variant(),
        threshold = config.threshold,
        workers = config.segment_workers,
        "Starting ais"
    );

    let basepath = config.basepath.clone();
    let pipeline = match Pipeline::load(config) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to load models: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match pipeline.run(&basepath) {
        Ok(outcome) => {
            print_outcome(&outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Pipeline failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
