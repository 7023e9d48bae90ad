//! KServe Probe - runs readiness, metadata and inference checks against a v2 endpoint.

use std::process::ExitCode;

use clap::Parser;
use kserve_probe::cli::Cli;
use kserve_probe::{report, Config, HttpTransport, Pipeline, PipelineSettings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const RULE: &str = "==================================================";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::from(2);
        }
    };
    cli.apply(&mut config);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = match config.validate().and_then(|_| PipelineSettings::from_config(&config)) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::from(2);
        }
    };

    let (matrix, labels) = match cli.inputs(&config) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    println!("KSERVE INFERENCE PROBE");
    println!("{}", RULE);
    println!("URL: {}", config.server.base_url);
    println!("Model: {} v{}", settings.model_name, settings.model_version);
    println!("Samples: {}", labels.len());
    println!();

    let transport = HttpTransport::with_timeouts(
        &config.server.base_url,
        config.server.probe_timeout(),
        config.server.infer_timeout(),
    );
    let pipeline = Pipeline::new(transport, settings);

    match pipeline.run(&matrix, &labels).await {
        Ok(run) => {
            let settings = pipeline.settings();
            print!(
                "{}",
                report::render_report(&settings.model_name, &settings.model_version, &run)
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(stage = %e.stage, "Probe failed: {}", e.error);
            let settings = pipeline.settings();
            eprintln!(
                "{}",
                report::render_failure(&settings.model_name, &settings.model_version, &e)
            );
            ExitCode::FAILURE
        }
    }
}
