//! Command-line interface: run the pipeline, serve the dashboard, or
//! predict from a saved artifact.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::PipelineConfig;
use crate::inference::Predictor;
use crate::persist::ModelArtifact;
use crate::pipeline::Pipeline;
use crate::server::{self, ServeOptions};

#[derive(Parser)]
#[command(name = "floodcast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Flood probability prediction pipeline")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full training pipeline and write artifacts
    Run {
        /// Configuration file (JSON); missing file uses built-in defaults
        #[arg(short, long, default_value = "floodcast.json")]
        config: PathBuf,

        /// Override the dataset path from the config
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Run the pipeline, then serve the dashboard until ctrl+c
    Serve {
        /// Configuration file (JSON); missing file uses built-in defaults
        #[arg(short, long, default_value = "floodcast.json")]
        config: PathBuf,

        /// Override the bind host from the config
        #[arg(long)]
        host: Option<String>,

        /// Override the bind port from the config
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Predict a single row from a saved model artifact
    Predict {
        /// Persisted model artifact (JSON)
        #[arg(short, long)]
        artifact: PathBuf,

        /// Input row as a flat JSON object of raw feature values
        #[arg(short, long)]
        input: PathBuf,
    },
}

pub fn cmd_run(config_path: &Path, data: Option<&Path>) -> anyhow::Result<()> {
    let mut config = PipelineConfig::load(config_path)?;
    if let Some(data_path) = data {
        config.data_path = data_path.to_path_buf();
    }

    let run = Pipeline::new(config).run()?;

    println!("Best model: {} (score {:.4})", run.best_name, run.best_score);
    println!("Model saved to {}", run.model_path.display());
    for path in &run.artifacts {
        println!("Artifact: {}", path.display());
    }
    if let Some(prediction) = run.sample_prediction {
        println!("Sample prediction: {prediction:.4}");
    }
    Ok(())
}

pub async fn cmd_serve(
    config_path: &Path,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let config = PipelineConfig::load(config_path)?;
    let options = ServeOptions {
        host: host.unwrap_or_else(|| config.host.clone()),
        port: port.unwrap_or(config.port),
        artifact_dir: config.output_dir.clone(),
        monitor_interval_secs: config.monitor_interval_secs,
    };

    let run = Pipeline::new(config).run()?;
    info!(best = %run.best_name, "Training finished, starting server");

    server::run_server(run, options).await
}

pub fn cmd_predict(artifact_path: &Path, input_path: &Path) -> anyhow::Result<()> {
    let artifact = ModelArtifact::load(artifact_path)?;
    let predictor = Predictor::from_artifact(&artifact);

    let content = std::fs::read_to_string(input_path)?;
    let row: BTreeMap<String, f64> = serde_json::from_str(&content)?;

    let prediction = predictor.predict(&row)?;
    println!("{prediction:.6}");
    Ok(())
}
