//! The probe pipeline: readiness, metadata, build, infer, decode, present.
//!
//! Stages run strictly in order and the first failure ends the run; later
//! stages are never attempted.

use std::time::{Duration, Instant};

use config::ConfigError;
use kserve_common::{
    build_with_datatype, decode, endpoints, present, ClassCatalog, Datatype, FeatureMatrix,
    ModelMetadata, PredictionResult,
};

use crate::config::Config;
use crate::error::Error;
use crate::transport::ServingEndpoint;

/// Pipeline stage, used to report where a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Readiness,
    Metadata,
    Build,
    Infer,
    Decode,
    Present,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Readiness => write!(f, "readiness"),
            Stage::Metadata => write!(f, "metadata"),
            Stage::Build => write!(f, "build"),
            Stage::Infer => write!(f, "infer"),
            Stage::Decode => write!(f, "decode"),
            Stage::Present => write!(f, "present"),
        }
    }
}

/// A failed run: the stage that failed and why.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {error}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub error: Error,
    /// Set when the run got past the metadata stage.
    pub metadata: Option<ModelMetadata>,
}

impl StageError {
    fn at(stage: Stage) -> impl FnOnce(Error) -> StageError {
        move |error| StageError {
            stage,
            error,
            metadata: None,
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub metadata: ModelMetadata,
    pub results: Vec<PredictionResult>,
    /// Round-trip time of the inference call.
    pub inference_time: Duration,
}

/// What the pipeline sends and how it reads the answer.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub model_name: String,
    pub model_version: String,
    pub input_name: String,
    pub datatype: Datatype,
    pub outputs: Vec<String>,
    pub catalog: ClassCatalog,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            model_name: config.model.name.clone(),
            model_version: config.model.version.clone(),
            input_name: config.model.input_name.clone(),
            datatype: config.model.datatype,
            outputs: config.model.outputs.clone(),
            catalog: config.model.catalog()?,
        })
    }
}

/// Runs the probe stages against one serving endpoint.
pub struct Pipeline<E> {
    endpoint: E,
    settings: PipelineSettings,
}

impl<E: ServingEndpoint> Pipeline<E> {
    pub fn new(endpoint: E, settings: PipelineSettings) -> Self {
        Self { endpoint, settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run every stage for `matrix`, labelling row `i` with `sample_labels[i]`.
    pub async fn run(
        &self,
        matrix: &FeatureMatrix,
        sample_labels: &[String],
    ) -> Result<RunReport, StageError> {
        let settings = &self.settings;

        if !self.endpoint.check_ready().await {
            return Err(StageError {
                stage: Stage::Readiness,
                error: Error::NotReady {
                    url: endpoints::ready_url(self.endpoint.base_url()),
                },
                metadata: None,
            });
        }
        tracing::info!("Server ready at {}", self.endpoint.base_url());

        let metadata = self
            .endpoint
            .fetch_model_metadata(&settings.model_name, &settings.model_version)
            .await
            .map_err(StageError::at(Stage::Metadata))?;
        tracing::info!(
            "Model {} v{} available (platform: {})",
            settings.model_name,
            settings.model_version,
            metadata.platform
        );

        match self.exchange(&metadata, matrix, sample_labels).await {
            Ok((results, inference_time)) => Ok(RunReport {
                metadata,
                results,
                inference_time,
            }),
            Err(mut err) => {
                err.metadata = Some(metadata);
                Err(err)
            }
        }
    }

    /// Build, infer, decode and present against already fetched metadata.
    async fn exchange(
        &self,
        metadata: &ModelMetadata,
        matrix: &FeatureMatrix,
        sample_labels: &[String],
    ) -> Result<(Vec<PredictionResult>, Duration), StageError> {
        let settings = &self.settings;

        let request = self
            .build_request(metadata, matrix, sample_labels)
            .map_err(StageError::at(Stage::Build))?;

        tracing::info!("Sending inference request with {} sample(s)", matrix.row_count());
        let started = Instant::now();
        let raw = self
            .endpoint
            .infer(&settings.model_name, &settings.model_version, &request)
            .await
            .map_err(StageError::at(Stage::Infer))?;
        let inference_time = started.elapsed();

        let response = decode(&raw, &settings.outputs)
            .map_err(Error::from)
            .map_err(StageError::at(Stage::Decode))?;

        let results = present(&response, &settings.catalog, sample_labels)
            .map_err(Error::from)
            .map_err(StageError::at(Stage::Present))?;

        tracing::info!(
            "Inference completed in {} ms",
            inference_time.as_millis()
        );

        Ok((results, inference_time))
    }

    fn build_request(
        &self,
        metadata: &ModelMetadata,
        matrix: &FeatureMatrix,
        sample_labels: &[String],
    ) -> Result<kserve_common::InferenceRequest, Error> {
        let settings = &self.settings;

        if sample_labels.len() != matrix.row_count() {
            return Err(Error::InvalidInput(format!(
                "{} sample labels for {} rows",
                sample_labels.len(),
                matrix.row_count()
            )));
        }

        if let (Some(declared), Some(actual)) = (
            metadata.input_width(&settings.input_name),
            matrix.feature_count(),
        ) {
            if declared != actual {
                return Err(kserve_common::Error::Encoding(format!(
                    "model input {} expects {} features, got {}",
                    settings.input_name, declared, actual
                ))
                .into());
            }
        }

        Ok(build_with_datatype(
            matrix,
            &settings.input_name,
            settings.datatype,
            &settings.outputs,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use async_trait::async_trait;
    use kserve_common::InferenceRequest;
    use std::sync::Mutex;

    /// In-memory endpoint that records which exchanges were attempted.
    struct FakeEndpoint {
        ready: bool,
        metadata: Result<ModelMetadata, u16>,
        infer: Result<String, TransportError>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeEndpoint {
        fn healthy(body: &str) -> Self {
            Self {
                ready: true,
                metadata: Ok(iris_metadata()),
                infer: Ok(body.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl<'a> ServingEndpoint for &'a FakeEndpoint {
        fn base_url(&self) -> &str {
            "http://fake"
        }

        async fn check_ready(&self) -> bool {
            self.calls.lock().unwrap().push("ready");
            self.ready
        }

        async fn fetch_model_metadata(&self, model_name: &str, model_version: &str) -> crate::error::Result<ModelMetadata> {
            self.calls.lock().unwrap().push("metadata");
            self.metadata.clone().map_err(|status| Error::ModelNotFound {
                model: model_name.to_string(),
                version: model_version.to_string(),
                status,
            })
        }

        async fn infer(&self, _: &str, _: &str, _: &InferenceRequest) -> crate::error::Result<Vec<u8>> {
            self.calls.lock().unwrap().push("infer");
            self.infer
                .clone()
                .map(String::into_bytes)
                .map_err(Error::from)
        }
    }

    fn iris_metadata() -> ModelMetadata {
        ModelMetadata::from_slice(
            br#"{"platform": "onnxruntime_onnx",
                 "inputs": [{"name": "input_features", "datatype": "FP32", "shape": [-1, 4]}],
                 "outputs": []}"#,
        )
        .unwrap()
    }

    fn pipeline(endpoint: &FakeEndpoint) -> Pipeline<&FakeEndpoint> {
        Pipeline::new(endpoint, PipelineSettings::from_config(&Config::default()).unwrap())
    }

    fn one_setosa() -> (FeatureMatrix, Vec<String>) {
        (
            FeatureMatrix::new(vec![vec![5.1, 3.5, 1.4, 0.2]]),
            vec!["setosa".to_string()],
        )
    }

    const SETOSA_RESPONSE: &str = r#"{"outputs":[
        {"name":"predictions","shape":[1],"datatype":"INT64","data":[0]},
        {"name":"probabilities","shape":[1,3],"datatype":"FP32","data":[0.9,0.05,0.05]}
    ]}"#;

    #[tokio::test]
    async fn test_run_success() {
        let endpoint = FakeEndpoint::healthy(SETOSA_RESPONSE);
        let (matrix, labels) = one_setosa();

        let report = pipeline(&endpoint).run(&matrix, &labels).await.unwrap();

        assert_eq!(endpoint.calls(), vec!["ready", "metadata", "infer"]);
        assert_eq!(report.metadata.platform, "onnxruntime_onnx");
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].predicted_class_name, "setosa");
        assert_eq!(report.results[0].class_probabilities.len(), 3);
    }

    #[tokio::test]
    async fn test_not_ready_halts_before_metadata() {
        let mut endpoint = FakeEndpoint::healthy(SETOSA_RESPONSE);
        endpoint.ready = false;
        let (matrix, labels) = one_setosa();

        let err = pipeline(&endpoint).run(&matrix, &labels).await.unwrap_err();

        assert_eq!(err.stage, Stage::Readiness);
        assert!(matches!(err.error, Error::NotReady { .. }));
        assert!(err.metadata.is_none());
        assert_eq!(endpoint.calls(), vec!["ready"]);
    }

    #[tokio::test]
    async fn test_unknown_model_halts_before_infer() {
        let mut endpoint = FakeEndpoint::healthy(SETOSA_RESPONSE);
        endpoint.metadata = Err(404);
        let (matrix, labels) = one_setosa();

        let err = pipeline(&endpoint).run(&matrix, &labels).await.unwrap_err();

        assert_eq!(err.stage, Stage::Metadata);
        assert!(matches!(err.error, Error::ModelNotFound { status: 404, .. }));
        assert!(err.metadata.is_none());
        assert_eq!(endpoint.calls(), vec!["ready", "metadata"]);
    }

    #[tokio::test]
    async fn test_server_error_is_reported_verbatim() {
        let mut endpoint = FakeEndpoint::healthy(SETOSA_RESPONSE);
        endpoint.infer = Err(TransportError::Status {
            status: 500,
            body: "internal error".to_string(),
        });
        let (matrix, labels) = one_setosa();

        let err = pipeline(&endpoint).run(&matrix, &labels).await.unwrap_err();

        assert_eq!(err.stage, Stage::Infer);
        assert_eq!(
            err.metadata.as_ref().map(|m| m.platform.as_str()),
            Some("onnxruntime_onnx")
        );
        match err.error {
            Error::Transport(TransportError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "internal error");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_feature_width_must_match_metadata() {
        let endpoint = FakeEndpoint::healthy(SETOSA_RESPONSE);
        let matrix = FeatureMatrix::new(vec![vec![5.1, 3.5, 1.4]]);

        let err = pipeline(&endpoint)
            .run(&matrix, &["short".to_string()])
            .await
            .unwrap_err();

        assert_eq!(err.stage, Stage::Build);
        assert!(matches!(err.error, Error::Protocol(kserve_common::Error::Encoding(_))));
        assert_eq!(endpoint.calls(), vec!["ready", "metadata"]);
    }

    #[tokio::test]
    async fn test_label_count_must_match_rows() {
        let endpoint = FakeEndpoint::healthy(SETOSA_RESPONSE);
        let (matrix, _) = one_setosa();

        let err = pipeline(&endpoint).run(&matrix, &[]).await.unwrap_err();
        assert_eq!(err.stage, Stage::Build);
        assert!(matches!(err.error, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_missing_output_fails_decode() {
        let endpoint = FakeEndpoint::healthy(
            r#"{"outputs":[{"name":"predictions","shape":[1],"datatype":"INT64","data":[0]}]}"#,
        );
        let (matrix, labels) = one_setosa();

        let err = pipeline(&endpoint).run(&matrix, &labels).await.unwrap_err();

        assert_eq!(err.stage, Stage::Decode);
        assert!(matches!(
            err.error,
            Error::Protocol(kserve_common::Error::MissingOutput { ref name }) if name == "probabilities"
        ));
        assert!(err.metadata.is_some());
    }

    #[test]
    fn test_stage_error_display() {
        let err = StageError {
            stage: Stage::Infer,
            error: TransportError::Status {
                status: 500,
                body: "internal error".to_string(),
            }
            .into(),
            metadata: None,
        };
        assert_eq!(
            err.to_string(),
            "infer stage failed: Transport error: HTTP 500: internal error"
        );
    }
}
