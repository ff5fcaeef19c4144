//! Framework name to back-end lookup.
//!
//! A [`Registry`] is assembled once with [`RegistryBuilder`] and never
//! changes afterwards. The process-wide registry is created on first use
//! from [`Registry::with_defaults`] unless the host installs its own first.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use crate::backends;
use crate::error::{FilterError, Result};
use crate::subplugin::Subplugin;

#[derive(Default)]
pub struct RegistryBuilder {
    subplugins: Vec<Arc<dyn Subplugin>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        RegistryBuilder::default()
    }

    pub fn register(self, subplugin: impl Subplugin + 'static) -> Self {
        self.register_arc(Arc::new(subplugin))
    }

    pub fn register_arc(mut self, subplugin: Arc<dyn Subplugin>) -> Self {
        self.subplugins.push(subplugin);
        self
    }

    /// Freeze the registry. A later registration under an existing name
    /// replaces the earlier one.
    pub fn build(self) -> Registry {
        let mut subplugins = HashMap::with_capacity(self.subplugins.len());
        for subplugin in self.subplugins {
            let name = subplugin.name().to_string();
            debug!(
                framework = %name,
                supported = subplugin.is_supported(),
                "registering sub-plugin"
            );
            if subplugins.insert(name.clone(), subplugin).is_some() {
                warn!(framework = %name, "sub-plugin registered twice, keeping the last one");
            }
        }
        Registry { subplugins }
    }
}

/// Immutable set of back-ends keyed by framework name.
pub struct Registry {
    subplugins: HashMap<String, Arc<dyn Subplugin>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry holding the built-in back-ends.
    pub fn with_defaults() -> Registry {
        backends::register_defaults(RegistryBuilder::new()).build()
    }

    /// Look up a back-end by name, supported or not.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Subplugin>> {
        self.subplugins.get(name).cloned()
    }

    /// Resolve a framework name to a back-end that can be opened.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Subplugin>> {
        let subplugin = self
            .get(name)
            .ok_or_else(|| FilterError::UnknownFramework(name.to_string()))?;
        if !subplugin.is_supported() {
            return Err(FilterError::UnsupportedFramework(name.to_string()));
        }
        Ok(subplugin)
    }

    /// Registered framework names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.subplugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.subplugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subplugins.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("frameworks", &self.names()).finish()
    }
}

static GLOBAL: OnceCell<Arc<Registry>> = OnceCell::new();

/// The process-wide registry.
pub fn global() -> Arc<Registry> {
    Arc::clone(GLOBAL.get_or_init(|| Arc::new(Registry::with_defaults())))
}

/// Install the process-wide registry. Fails once [`global`] has been used
/// or a registry was already installed.
pub fn install(registry: Registry) -> Result<()> {
    GLOBAL
        .set(Arc::new(registry))
        .map_err(|_| FilterError::AlreadySet("global registry"))
}
