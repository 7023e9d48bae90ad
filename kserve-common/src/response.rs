//! Decoding and validation of inference responses.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::tensor::TensorDescriptor;

/// Decoded inference response. Outputs keep the order the server sent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InferenceResponse {
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    pub outputs: Vec<TensorDescriptor>,
}

impl InferenceResponse {
    /// Find an output by exact, case-sensitive name.
    pub fn output(&self, name: &str) -> Option<&TensorDescriptor> {
        self.outputs.iter().find(|tensor| tensor.name() == name)
    }
}

/// Parse `raw` and check that every name in `expected_outputs` is present
/// with a shape consistent with its data.
///
/// Matching is by name only; the server may return outputs in any order.
pub fn decode<S: AsRef<str>>(raw: &[u8], expected_outputs: &[S]) -> Result<InferenceResponse> {
    let response: InferenceResponse = serde_json::from_slice(raw)
        .map_err(|e| Error::MalformedResponse(e.to_string()))?;

    for name in expected_outputs {
        let name = name.as_ref();
        let tensor = response.output(name).ok_or_else(|| Error::MissingOutput {
            name: name.to_string(),
        })?;
        tensor.check_shape()?;
    }

    tracing::debug!(
        "Decoded inference response with {} outputs",
        response.outputs.len()
    );

    Ok(response)
}
