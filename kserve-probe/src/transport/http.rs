//! HTTP transport for the v2 REST protocol.

use std::time::Duration;

use async_trait::async_trait;
use kserve_common::{endpoints, InferenceRequest, ModelMetadata};
use reqwest::{Client, StatusCode};

use super::ServingEndpoint;
use crate::error::{Error, Result, TransportError};

/// HTTP client for a KServe / Triton server.
pub struct HttpTransport {
    http_client: Client,
    base_url: String,
    probe_timeout: Duration,
    infer_timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeouts(base_url, Duration::from_secs(10), Duration::from_secs(30))
    }

    pub fn with_timeouts(base_url: &str, probe_timeout: Duration, infer_timeout: Duration) -> Self {
        Self {
            http_client: Client::new(),
            base_url: endpoints::normalize_base(base_url),
            probe_timeout,
            infer_timeout,
        }
    }
}

#[async_trait]
impl ServingEndpoint for HttpTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check_ready(&self) -> bool {
        let url = endpoints::ready_url(&self.base_url);
        tracing::debug!("Checking readiness: {}", url);

        match self
            .http_client
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) if response.status() == StatusCode::OK => true,
            Ok(response) => {
                tracing::warn!("Server not ready (status: {})", response.status());
                false
            }
            Err(e) => {
                tracing::warn!("Unable to reach server at {}: {}", url, e);
                false
            }
        }
    }

    async fn fetch_model_metadata(&self, model_name: &str, model_version: &str) -> Result<ModelMetadata> {
        let url = endpoints::model_url(&self.base_url, model_name, model_version);
        tracing::debug!("Fetching model metadata: {}", url);

        let response = self
            .http_client
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        if response.status() != StatusCode::OK {
            return Err(Error::ModelNotFound {
                model: model_name.to_string(),
                version: model_version.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.bytes().await.map_err(TransportError::from_reqwest)?;
        Ok(ModelMetadata::from_slice(&body)?)
    }

    async fn infer(
        &self,
        model_name: &str,
        model_version: &str,
        request: &InferenceRequest,
    ) -> Result<Vec<u8>> {
        let url = endpoints::infer_url(&self.base_url, model_name, model_version);
        tracing::debug!("Sending inference request to {}", url);

        let response = self
            .http_client
            .post(&url)
            .timeout(self.infer_timeout)
            .json(request)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let body = response.bytes().await.map_err(TransportError::from_reqwest)?;
        tracing::debug!("Received {} byte inference response", body.len());
        Ok(body.to_vec())
    }
}
