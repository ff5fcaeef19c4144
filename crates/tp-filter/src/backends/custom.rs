use std::fs::File;

use memmap2::Mmap;
use tracing::debug;

use crate::error::SubpluginError;
use crate::subplugin::{OpenParams, Subplugin, SubpluginHandle};

/// The `custom` framework: maps the model file and passes each buffer
/// through unchanged. Input and output tensors must have the same byte
/// size.
#[derive(Debug, Default, Clone, Copy)]
pub struct CustomSubplugin;

impl Subplugin for CustomSubplugin {
    fn name(&self) -> &str {
        "custom"
    }

    fn open(&self, params: &OpenParams) -> Result<Box<dyn SubpluginHandle>, SubpluginError> {
        let (input, output) = (params.input.byte_size()?, params.output.byte_size()?);
        if input != output {
            return Err(SubpluginError::UnsupportedModel(format!(
                "custom passes buffers through; input {} is {} bytes but output {} is {} bytes",
                params.input, input, params.output, output
            )));
        }

        let file = File::open(&params.model)?;
        if file.metadata()?.len() == 0 {
            return Err(SubpluginError::UnsupportedModel(format!(
                "{} is empty",
                params.model.display()
            )));
        }
        // SAFETY: the mapping is read-only and lives as long as the handle.
        let model = unsafe { Mmap::map(&file)? };
        debug!(
            model = %params.model.display(),
            bytes = model.len(),
            "custom model mapped"
        );

        Ok(Box::new(CustomHandle { model }))
    }
}

struct CustomHandle {
    model: Mmap,
}

impl SubpluginHandle for CustomHandle {
    fn invoke(&mut self, input: &[u8], output: &mut [u8]) -> Result<(), SubpluginError> {
        if input.len() != output.len() {
            return Err(SubpluginError::Invoke(format!(
                "input is {} bytes, output is {} bytes",
                input.len(),
                output.len()
            )));
        }
        output.copy_from_slice(input);
        Ok(())
    }

    fn close(self: Box<Self>) {
        debug!(bytes = self.model.len(), "custom model unmapped");
    }
}
