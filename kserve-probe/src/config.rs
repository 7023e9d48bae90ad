//! Configuration for the probe.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use kserve_common::{ClassCatalog, Datatype, PREDICTIONS_OUTPUT, PROBABILITIES_OUTPUT};
use serde::Deserialize;

/// Main configuration structure for the probe.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    /// Named feature rows selectable with `--samples`.
    #[serde(default = "default_samples")]
    pub samples: BTreeMap<String, Vec<f64>>,
    /// Samples sent when neither `--samples` nor `--custom-data` is given.
    /// Unset means every configured sample, in name order.
    #[serde(default)]
    pub default_samples: Option<Vec<String>>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Timeout for the readiness and metadata probes.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    /// Timeout for the inference call.
    #[serde(default = "default_infer_timeout")]
    pub infer_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            probe_timeout_secs: default_probe_timeout(),
            infer_timeout_secs: default_infer_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn infer_timeout(&self) -> Duration {
        Duration::from_secs(self.infer_timeout_secs)
    }
}

/// The served model and the tensors exchanged with it.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default = "default_model_version")]
    pub version: String,
    #[serde(default = "default_input_name")]
    pub input_name: String,
    #[serde(default = "default_datatype")]
    pub datatype: Datatype,
    #[serde(default = "default_outputs")]
    pub outputs: Vec<String>,
    /// Class names in the order the model indexes them.
    #[serde(default = "default_classes")]
    pub classes: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            version: default_model_version(),
            input_name: default_input_name(),
            datatype: default_datatype(),
            outputs: default_outputs(),
            classes: default_classes(),
        }
    }
}

impl ModelConfig {
    pub fn catalog(&self) -> Result<ClassCatalog, ConfigError> {
        ClassCatalog::new(self.classes.iter().cloned())
            .map_err(|e| ConfigError::Message(e.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            model: ModelConfig::default(),
            samples: default_samples(),
            default_samples: None,
            logging: LoggingConfig::default(),
        }
    }
}

// Default values
fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_probe_timeout() -> u64 {
    10
}
fn default_infer_timeout() -> u64 {
    30
}
fn default_model_name() -> String {
    "iris_classifier".to_string()
}
fn default_model_version() -> String {
    "1".to_string()
}
fn default_input_name() -> String {
    "input_features".to_string()
}
fn default_datatype() -> Datatype {
    Datatype::Fp32
}
fn default_outputs() -> Vec<String> {
    vec![PREDICTIONS_OUTPUT.to_string(), PROBABILITIES_OUTPUT.to_string()]
}
fn default_classes() -> Vec<String> {
    vec![
        "setosa".to_string(),
        "versicolor".to_string(),
        "virginica".to_string(),
    ]
}
fn default_samples() -> BTreeMap<String, Vec<f64>> {
    BTreeMap::from([
        ("setosa".to_string(), vec![5.1, 3.5, 1.4, 0.2]),
        ("versicolor".to_string(), vec![6.2, 2.9, 4.3, 1.3]),
        ("virginica".to_string(), vec![6.3, 3.3, 6.0, 2.5]),
    ])
}
fn default_log_level() -> String {
    "info".to_string()
}

fn environment() -> Environment {
    Environment::with_prefix("PROBE")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("model.classes")
        .with_list_parse_key("model.outputs")
        .with_list_parse_key("default_samples")
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (PROBE__SECTION__KEY format)
    /// 2. `path`, or probe.toml in the working directory if present
    /// 3. Built-in defaults
    ///
    /// List settings take comma-separated values from the environment, e.g.
    /// `PROBE__MODEL__CLASSES=red,white`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, environment())
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("probe").required(false),
        };

        let config: Config = ConfigLoader::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Names of the samples sent by default.
    pub fn default_sample_names(&self) -> Vec<String> {
        match &self.default_samples {
            Some(names) => names.clone(),
            None => self.samples.keys().cloned().collect(),
        }
    }

    /// Reject settings the probe cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.probe_timeout_secs == 0 || self.server.infer_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "server timeouts must be at least one second".to_string(),
            ));
        }
        if self.model.outputs.is_empty() {
            return Err(ConfigError::Message(
                "model.outputs must name at least one output".to_string(),
            ));
        }
        self.model.catalog()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://localhost:8080");
        assert_eq!(config.server.probe_timeout(), Duration::from_secs(10));
        assert_eq!(config.server.infer_timeout(), Duration::from_secs(30));
        assert_eq!(config.model.name, "iris_classifier");
        assert_eq!(config.model.version, "1");
        assert_eq!(config.model.input_name, "input_features");
        assert_eq!(config.model.datatype, Datatype::Fp32);
        assert_eq!(config.model.outputs, vec!["predictions", "probabilities"]);
        assert_eq!(config.model.catalog().unwrap().len(), 3);
        assert_eq!(config.samples["versicolor"], vec![6.2, 2.9, 4.3, 1.3]);
        assert_eq!(config.default_sample_names(), vec!["setosa", "versicolor", "virginica"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
base_url = "http://triton:8000"
infer_timeout_secs = 5

[model]
name = "wine"
classes = ["red", "white"]

[samples]
dry = [1.0, 2.0]
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.server.base_url, "http://triton:8000");
        assert_eq!(config.server.infer_timeout_secs, 5);
        assert_eq!(config.server.probe_timeout_secs, 10);
        assert_eq!(config.model.name, "wine");
        assert_eq!(config.model.input_name, "input_features");
        assert_eq!(config.model.classes, vec!["red", "white"]);
        assert_eq!(config.samples.len(), 1);
        assert_eq!(config.samples["dry"], vec![1.0, 2.0]);
        assert_eq!(config.default_sample_names(), vec!["dry"]);
    }

    #[test]
    fn test_environment_overrides_lists() {
        let vars = config::Map::from([
            ("PROBE__MODEL__CLASSES".to_string(), "red,white".to_string()),
            ("PROBE__MODEL__OUTPUTS".to_string(), "predictions".to_string()),
            ("PROBE__DEFAULT_SAMPLES".to_string(), "virginica,setosa".to_string()),
            ("PROBE__SERVER__INFER_TIMEOUT_SECS".to_string(), "7".to_string()),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.toml");
        std::fs::write(&path, "[model]\nname = \"wine\"\n").unwrap();

        let config = Config::load_with(Some(&path), environment().source(Some(vars))).unwrap();
        assert_eq!(config.model.name, "wine");
        assert_eq!(config.model.classes, vec!["red", "white"]);
        assert_eq!(config.model.outputs, vec!["predictions"]);
        assert_eq!(config.default_sample_names(), vec!["virginica", "setosa"]);
        assert_eq!(config.server.infer_timeout_secs, 7);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout_and_empty_catalog() {
        let mut config = Config::default();
        config.server.infer_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.classes.clear();
        assert!(config.validate().is_err());
    }
}
