//! Built-in back-ends.

mod custom;
mod unavailable;

pub use custom::CustomSubplugin;
pub use unavailable::UnavailableSubplugin;

use crate::registry::RegistryBuilder;

/// Frameworks whose runtimes are not linked into this build.
pub const UNAVAILABLE_FRAMEWORKS: [&str; 3] = ["tensorflow-lite", "tensorflow", "caffe2"];

/// Register every built-in back-end.
pub fn register_defaults(builder: RegistryBuilder) -> RegistryBuilder {
    UNAVAILABLE_FRAMEWORKS
        .into_iter()
        .fold(builder.register(CustomSubplugin), |b, name| {
            b.register(UnavailableSubplugin::new(name))
        })
}
