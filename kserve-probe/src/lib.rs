//! KServe Probe
//!
//! Checks a running KServe / Triton v2 endpoint end to end: readiness,
//! model metadata, one inference call, and decoding of its outputs into
//! per-sample predictions.

pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result, TransportError};
pub use pipeline::{Pipeline, PipelineSettings, RunReport, Stage, StageError};
pub use transport::{HttpTransport, ServingEndpoint};
