use thiserror::Error;

pub use tp_tensor::ErrorCategory;
use tp_tensor::TensorError;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("invalid mode {0:?}, expected \"typecast\" or \"arithmetic\"")]
    InvalidMode(String),
    #[error("property {0:?} is already set and cannot be changed")]
    AlreadySet(&'static str),
    #[error("unknown property {0:?}")]
    UnknownProperty(String),
    #[error("negotiation failed: {0}")]
    Negotiation(String),
    #[error("not ready: {0}")]
    NotReady(String),
    #[error("processing failed: {0}")]
    Processing(String),
    #[error("tensor error: {0}")]
    Tensor(#[from] TensorError),
}

impl TransformError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TransformError::Negotiation(_) => ErrorCategory::Negotiation,
            TransformError::NotReady(_) => ErrorCategory::NotReady,
            TransformError::Processing(_) => ErrorCategory::Processing,
            TransformError::Tensor(e) => e.category(),
            _ => ErrorCategory::Configuration,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;
