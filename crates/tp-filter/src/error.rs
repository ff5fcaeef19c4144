use thiserror::Error;

use tp_tensor::{Direction, ErrorCategory, TensorError};

/// Errors raised by a back-end implementation.
#[derive(Error, Debug)]
pub enum SubpluginError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported model: {0}")]
    UnsupportedModel(String),
    #[error("invoke failed: {0}")]
    Invoke(String),
    #[error("tensor error: {0}")]
    Tensor(#[from] TensorError),
}

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("property {0:?} is already set and cannot be changed")]
    AlreadySet(&'static str),
    #[error("unknown framework {0:?}")]
    UnknownFramework(String),
    #[error("framework {0:?} is not supported in this build")]
    UnsupportedFramework(String),
    #[error("invalid model {path:?}: {reason}")]
    InvalidModel { path: String, reason: String },
    #[error("failed to open framework {framework:?}: {source}")]
    Open {
        framework: String,
        source: SubpluginError,
    },
    #[error("unknown property {0:?}")]
    UnknownProperty(String),
    #[error("negotiation failed on {direction}: {reason}")]
    Negotiation { direction: Direction, reason: String },
    #[error("not ready: {0}")]
    NotReady(String),
    #[error("processing failed: {0}")]
    Processing(String),
    #[error("tensor error: {0}")]
    Tensor(#[from] TensorError),
}

impl FilterError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FilterError::Negotiation { .. } => ErrorCategory::Negotiation,
            FilterError::NotReady(_) => ErrorCategory::NotReady,
            FilterError::Processing(_) => ErrorCategory::Processing,
            FilterError::Tensor(e) => e.category(),
            _ => ErrorCategory::Configuration,
        }
    }
}

pub type Result<T> = std::result::Result<T, FilterError>;
