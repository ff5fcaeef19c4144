//! `tp-filter` - Inference back-end dispatch for tensor-pipeline.
//!
//! Back-ends implement [`Subplugin`] and are looked up by framework name in
//! an immutable [`Registry`]. A [`FilterElement`] collects its write-once
//! configuration, opens the selected back-end once and invokes it per
//! buffer.

pub mod backends;
pub mod element;
pub mod error;
pub mod registry;
pub mod state;
pub mod subplugin;

pub use element::FilterElement;
pub use error::{FilterError, Result, SubpluginError};
pub use registry::{Registry, RegistryBuilder};
pub use state::{FilterState, WriteOnce};
pub use subplugin::{FnSubplugin, OpenParams, Subplugin, SubpluginHandle};
pub use tp_tensor::ErrorCategory;
