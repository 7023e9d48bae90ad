//! Error types for local protocol operations.

/// Failures raised while encoding requests or decoding and presenting
/// responses. None of these involve the network.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Missing output tensor: {name}")]
    MissingOutput { name: String },

    #[error("Shape mismatch for output {name}: shape holds {expected} elements, data has {actual}")]
    ShapeMismatch {
        name: String,
        expected: u64,
        actual: usize,
    },

    #[error("Invalid class index {value} for sample {sample} (catalog has {class_count} classes)")]
    InvalidClassIndex {
        sample: usize,
        value: f64,
        class_count: usize,
    },

    #[error("Invalid probability {value} for class {class_name} of sample {sample}")]
    InvalidProbability {
        sample: usize,
        class_name: String,
        value: f64,
    },

    #[error("Index out of range: {0}")]
    IndexOutOfRange(String),

    #[error("Invalid class catalog: {0}")]
    InvalidCatalog(String),
}

pub type Result<T> = std::result::Result<T, Error>;
