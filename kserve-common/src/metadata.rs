//! Model metadata returned by `GET /v2/models/{name}/versions/{version}`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Declared input or output of a served model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorMetadata {
    pub name: String,
    /// Datatype name as the server reports it (e.g. "FP32").
    pub datatype: String,
    /// Dimensions; `-1` marks a variable-sized dimension.
    #[serde(default)]
    pub shape: Vec<i64>,
}

/// Model metadata. Only `platform`, `inputs` and `outputs` are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub versions: Vec<String>,
    pub platform: String,
    pub inputs: Vec<TensorMetadata>,
    pub outputs: Vec<TensorMetadata>,
}

impl ModelMetadata {
    /// Parse a metadata response body.
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw)
            .map_err(|e| Error::MalformedResponse(format!("model metadata: {}", e)))
    }

    pub fn input(&self, name: &str) -> Option<&TensorMetadata> {
        self.inputs.iter().find(|input| input.name == name)
    }

    /// Feature width the model declares for input `name`, if its last
    /// dimension is fixed.
    pub fn input_width(&self, name: &str) -> Option<usize> {
        self.input(name)
            .and_then(|input| input.shape.last())
            .and_then(|&dim| usize::try_from(dim).ok())
    }
}
