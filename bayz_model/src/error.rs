// Error type shared by every fallible operation in the model crate.

use thiserror::Error;

/// Errors raised while fitting, loading, or sampling from a type model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A component id outside the fitted range was requested.
    #[error("component id {id} out of range (model has {count} components)")]
    OutOfRange { id: usize, count: usize },

    /// The model has no mixture yet; call `fit` or `load` first.
    #[error("type model has not been fitted")]
    NotFitted,

    /// `fit` was called without any training sequences.
    #[error("cannot fit an n-gram table from an empty corpus")]
    EmptyCorpus,

    /// The embedding store has no tokens to sample or decode against.
    #[error("embedding vocabulary is empty")]
    EmptyVocabulary,

    /// The model was configured without any n-gram order.
    #[error("at least one n-gram order must be configured")]
    NoNGramOrders,

    /// The smoothing constant must be a finite positive number.
    #[error("smoothing constant must be finite and positive, got {0}")]
    InvalidSmoothing(f64),

    /// Any other rejected configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A vector or matrix does not match the embedding dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A token was looked up that the embedding does not contain.
    #[error("token {0:?} is not in the embedding vocabulary")]
    UnknownToken(String),

    /// A covariance matrix stayed singular even after regularisation.
    #[error("covariance of component {component} is not positive definite")]
    SingularCovariance { component: usize },

    /// A saved model was written with an unknown format version.
    #[error("unsupported model format version {found} (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },

    /// Weighted sampling rejected its weights (all zero, NaN, ...).
    #[error("weighted sampling failed: {0}")]
    Sampling(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    pub fn out_of_range(id: usize, count: usize) -> Self {
        Self::OutOfRange { id, count }
    }

    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }
}
