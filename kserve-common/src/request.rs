//! Inference request envelope.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tensor::{encode, Datatype, FeatureMatrix, TensorDescriptor};

/// An output the client asks the server to return. Only the name is sent;
/// the server supplies shape and datatype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedOutput {
    pub name: String,
}

/// Body of `POST /v2/models/{name}/versions/{version}/infer`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub inputs: Vec<TensorDescriptor>,
    pub outputs: Vec<RequestedOutput>,
}

impl InferenceRequest {
    /// Tag the request with an id the server echoes back.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Names of the requested outputs, in request order.
    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|o| o.name.as_str()).collect()
    }
}

/// Build an FP32 inference request for `matrix`.
pub fn build<S: AsRef<str>>(
    matrix: &FeatureMatrix,
    input_name: &str,
    requested_outputs: &[S],
) -> Result<InferenceRequest> {
    build_with_datatype(matrix, input_name, Datatype::Fp32, requested_outputs)
}

/// Build an inference request with an explicit input datatype.
pub fn build_with_datatype<S: AsRef<str>>(
    matrix: &FeatureMatrix,
    input_name: &str,
    datatype: Datatype,
    requested_outputs: &[S],
) -> Result<InferenceRequest> {
    let input = encode(matrix, input_name, datatype)?;

    Ok(InferenceRequest {
        id: None,
        inputs: vec![input],
        outputs: requested_outputs
            .iter()
            .map(|name| RequestedOutput {
                name: name.as_ref().to_string(),
            })
            .collect(),
    })
}
