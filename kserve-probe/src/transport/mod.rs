//! Transport abstraction over a v2 serving endpoint.
//!
//! This module defines the `ServingEndpoint` trait covering the three
//! exchanges the probe performs, so the pipeline can run against the HTTP
//! implementation or a test double.

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use kserve_common::{InferenceRequest, ModelMetadata};

use crate::error::Result;

/// The three exchanges with a serving endpoint. Each is a single attempt
/// bounded by a timeout; implementations never retry.
#[async_trait]
pub trait ServingEndpoint: Send + Sync {
    /// Base URL the endpoint talks to, for diagnostics.
    fn base_url(&self) -> &str;

    /// Whether the server reports ready. Failures of any kind yield `false`.
    async fn check_ready(&self) -> bool;

    /// Fetch the version-scoped metadata of a model.
    async fn fetch_model_metadata(&self, model_name: &str, model_version: &str) -> Result<ModelMetadata>;

    /// Send an inference request and return the raw response body.
    async fn infer(
        &self,
        model_name: &str,
        model_version: &str,
        request: &InferenceRequest,
    ) -> Result<Vec<u8>>;
}
