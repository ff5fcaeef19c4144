use crate::error::SubpluginError;
use crate::subplugin::{OpenParams, Subplugin, SubpluginHandle};

/// Placeholder for a framework this build cannot run. Its name resolves,
/// but it reports itself unsupported and refuses to open.
#[derive(Debug, Clone, Copy)]
pub struct UnavailableSubplugin {
    name: &'static str,
}

impl UnavailableSubplugin {
    pub const fn new(name: &'static str) -> Self {
        UnavailableSubplugin { name }
    }
}

impl Subplugin for UnavailableSubplugin {
    fn name(&self) -> &str {
        self.name
    }

    fn is_supported(&self) -> bool {
        false
    }

    fn open(&self, _params: &OpenParams) -> Result<Box<dyn SubpluginHandle>, SubpluginError> {
        Err(SubpluginError::UnsupportedModel(format!(
            "{} support is not built in",
            self.name
        )))
    }
}
