//! Error types for tetrajet reconstruction
//!
//! Only configuration problems and broken caller contracts end up here.
//! Events that fail selection or need a forced neutrino solution are
//! reported through result flags instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Unknown b-tag working point: {0}")]
    InvalidWorkingPoint(String),

    #[error("Invalid configuration parameter: {0}")]
    InvalidParameter(String),

    #[error("Malformed classifier model: {0}")]
    MalformedModel(String),

    #[error("Feature vector length mismatch: expected {expected}, got {got}")]
    FeatureMismatch { expected: usize, got: usize },

    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error("Candle error: {0}")]
    CandleError(#[from] candle_core::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
