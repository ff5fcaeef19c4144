//! `tp-tensor` - Tensor metadata and element handling for tensor-pipeline.
//!
//! This crate provides:
//! - The canonical set of element types (`ElementType`) and their names
//! - Fixed-rank dimensions (`Dimension`) and per-stream `TensorInfo`
//! - Stream capabilities (`TensorCaps`) with intersection for negotiation
//! - Single-element values (`TensorValue`) carrying the conversion rules
//! - Typed buffer storage (`TensorStorage`)
//! - Property value parsing shared by the elements (`parse_bool`)

pub mod caps;
pub mod dimension;
pub mod dtype;
pub mod error;
pub mod info;
pub mod property;
pub mod storage;
pub mod value;

// Re-export primary types at the crate root for convenience.
pub use caps::{CapsField, Direction, TensorCaps};
pub use dimension::{Dimension, MAX_DIMENSION, RANK_LIMIT};
pub use dtype::ElementType;
pub use error::{ErrorCategory, Result, TensorError};
pub use info::{StreamConfig, TensorInfo};
pub use property::parse_bool;
pub use storage::TensorStorage;
pub use value::{ArithOp, TensorValue};
