use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tp_tensor::TensorInfo;

use crate::error::SubpluginError;

/// Everything a back-end needs to load a model.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenParams {
    pub model: PathBuf,
    pub input: TensorInfo,
    pub output: TensorInfo,
}

/// An inference back-end registered under a framework name.
pub trait Subplugin: Send + Sync {
    /// Framework name used by the `framework` property.
    fn name(&self) -> &str;

    /// Whether this build can run the framework. Unsupported back-ends stay
    /// registered so their names resolve, but cannot be selected.
    fn is_supported(&self) -> bool {
        true
    }

    /// Load the model and return a handle for per-buffer inference.
    fn open(&self, params: &OpenParams) -> Result<Box<dyn SubpluginHandle>, SubpluginError>;
}

/// A loaded model. Owned by exactly one filter element.
pub trait SubpluginHandle: Send {
    /// Run inference on one input buffer. `output` is sized for the
    /// configured output tensor.
    fn invoke(&mut self, input: &[u8], output: &mut [u8]) -> Result<(), SubpluginError>;

    /// Release the model.
    fn close(self: Box<Self>) {}
}

type InvokeFn = dyn Fn(&[u8], &mut [u8]) -> Result<(), SubpluginError> + Send + Sync;

/// A back-end built from a closure, for hosts that run inference
/// themselves.
#[derive(Clone)]
pub struct FnSubplugin {
    name: String,
    invoke: Arc<InvokeFn>,
}

impl FnSubplugin {
    pub fn new<F>(name: impl Into<String>, invoke: F) -> Self
    where
        F: Fn(&[u8], &mut [u8]) -> Result<(), SubpluginError> + Send + Sync + 'static,
    {
        FnSubplugin {
            name: name.into(),
            invoke: Arc::new(invoke),
        }
    }
}

impl fmt::Debug for FnSubplugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSubplugin").field("name", &self.name).finish()
    }
}

impl Subplugin for FnSubplugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, _params: &OpenParams) -> Result<Box<dyn SubpluginHandle>, SubpluginError> {
        Ok(Box::new(FnHandle {
            invoke: Arc::clone(&self.invoke),
        }))
    }
}

struct FnHandle {
    invoke: Arc<InvokeFn>,
}

impl SubpluginHandle for FnHandle {
    fn invoke(&mut self, input: &[u8], output: &mut [u8]) -> Result<(), SubpluginError> {
        (self.invoke)(input, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tp_tensor::{Dimension, ElementType};

    #[test]
    fn test_fn_subplugin_invokes_closure() {
        let plugin = FnSubplugin::new("double", |input: &[u8], output: &mut [u8]| {
            for (o, i) in output.iter_mut().zip(input) {
                *o = i.wrapping_mul(2);
            }
            Ok(())
        });
        assert_eq!(plugin.name(), "double");
        assert!(plugin.is_supported());

        let info = TensorInfo::new(ElementType::Uint8, Dimension::parse("3").unwrap());
        let params = OpenParams {
            model: PathBuf::from("unused"),
            input: info,
            output: info,
        };
        let mut handle = plugin.open(&params).unwrap();
        let mut out = [0u8; 3];
        handle.invoke(&[1, 2, 200], &mut out).unwrap();
        assert_eq!(out, [2, 4, 144]);
        handle.close();
    }
}
