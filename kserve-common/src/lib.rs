//! KServe Common Types
//!
//! Network-free pieces of the KServe / Triton v2 inference protocol: tensor
//! encoding, request envelopes, response decoding and result presentation.

pub mod catalog;
pub mod endpoints;
pub mod error;
pub mod metadata;
pub mod presenter;
pub mod request;
pub mod response;
pub mod tensor;

pub use catalog::ClassCatalog;
pub use error::{Error, Result};
pub use metadata::{ModelMetadata, TensorMetadata};
pub use presenter::{present, ClassProbability, PredictionResult};
pub use request::{build, build_with_datatype, InferenceRequest, RequestedOutput};
pub use response::{decode, InferenceResponse};
pub use tensor::{decode_slice, encode, Datatype, FeatureMatrix, TensorDescriptor};

/// Output tensor carrying one predicted class index per sample.
pub const PREDICTIONS_OUTPUT: &str = "predictions";

/// Output tensor carrying a `[N, classes]` probability matrix.
pub const PROBABILITIES_OUTPUT: &str = "probabilities";
