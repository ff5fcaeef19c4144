use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    #[error("unknown element type: {0:?}")]
    UnknownType(String),
    #[error("invalid dimension {input:?}: {reason}")]
    InvalidDimension { input: String, reason: String },
    #[error("buffer size mismatch: expected {expected} bytes, got {got}")]
    SizeMismatch { expected: usize, got: usize },
    #[error("invalid value {value:?} for property {property:?}")]
    InvalidValue { property: String, value: String },
    #[error("invalid frame rate {numerator}/{denominator}")]
    InvalidFramerate { numerator: i32, denominator: i32 },
}

impl TensorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TensorError::SizeMismatch { .. } => ErrorCategory::Processing,
            _ => ErrorCategory::Configuration,
        }
    }
}

/// Failure classes surfaced to the host pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Raised while setting properties, before any buffer flows.
    Configuration,
    /// The computed capability does not fit the peer's.
    Negotiation,
    /// A buffer arrived before configuration completed.
    NotReady,
    /// A single buffer could not be processed.
    Processing,
}

pub type Result<T> = std::result::Result<T, TensorError>;
