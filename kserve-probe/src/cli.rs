//! Command-line options and input selection.

use std::path::PathBuf;

use clap::Parser;
use kserve_common::FeatureMatrix;

use crate::config::Config;
use crate::error::{Error, Result};

#[derive(Debug, Parser)]
#[command(author, version, about = "Readiness, metadata and inference checks against a KServe v2 endpoint", long_about = None)]
pub struct Cli {
    /// Base URL of the inference service
    #[arg(short, long)]
    pub url: Option<String>,

    /// Model name
    #[arg(short, long)]
    pub model_name: Option<String>,

    /// Model version
    #[arg(short = 'v', long)]
    pub model_version: Option<String>,

    /// Named samples to send (see the [samples] config section)
    #[arg(short, long, num_args = 1..)]
    pub samples: Vec<String>,

    /// Custom data as a JSON matrix: [[5.1,3.5,1.4,0.2]]
    #[arg(long, value_name = "JSON")]
    pub custom_data: Option<String>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Inference timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Apply command-line overrides on top of loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.server.base_url = url.clone();
        }
        if let Some(name) = &self.model_name {
            config.model.name = name.clone();
        }
        if let Some(version) = &self.model_version {
            config.model.version = version.clone();
        }
        if let Some(timeout) = self.timeout {
            config.server.infer_timeout_secs = timeout;
        }
    }

    /// Resolve the feature matrix and sample labels to send.
    ///
    /// Custom data wins over named samples; with neither, the configured
    /// default samples are used.
    pub fn inputs(&self, config: &Config) -> Result<(FeatureMatrix, Vec<String>)> {
        if let Some(json) = &self.custom_data {
            let matrix = FeatureMatrix::from_json(json)
                .map_err(|e| Error::InvalidInput(e.to_string()))?;
            let labels = (0..matrix.row_count()).map(|i| format!("custom_{}", i)).collect();
            return Ok((matrix, labels));
        }

        let names = if self.samples.is_empty() {
            config.default_sample_names()
        } else {
            self.samples.clone()
        };

        let rows = names
            .iter()
            .map(|name| {
                config.samples.get(name).cloned().ok_or_else(|| {
                    let known: Vec<&str> = config.samples.keys().map(String::as_str).collect();
                    Error::InvalidInput(format!(
                        "unknown sample '{}' (available: {})",
                        name,
                        known.join(", ")
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((FeatureMatrix::new(rows), names))
    }
}
