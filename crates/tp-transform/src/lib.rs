pub mod accel;
pub mod chain;
pub mod element;
pub mod error;
pub mod executor;
pub mod scalar;

pub use accel::AcceleratedExecutor;
pub use chain::{ExecutionPlan, OperationChain, OperationStep, PlannedStep, TransformMode};
pub use element::TransformElement;
pub use error::{ErrorCategory, Result, TransformError};
pub use executor::{select_executor, Executor};
pub use scalar::ScalarExecutor;
