use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use tp_tensor::{parse_bool, Dimension, Direction, ElementType, TensorCaps, TensorInfo};

use crate::error::{FilterError, Result};
use crate::registry::{self, Registry};
use crate::state::{FilterState, WriteOnce};
use crate::subplugin::{OpenParams, Subplugin, SubpluginHandle};

/// Per-direction tensor configuration.
#[derive(Debug, Default)]
struct Port {
    element_type: WriteOnce<ElementType>,
    dimension: WriteOnce<Dimension>,
    /// Capability currently held by the peer.
    peer: TensorCaps,
    negotiated: Option<TensorCaps>,
}

impl Port {
    fn info(&self) -> Option<TensorInfo> {
        Some(TensorInfo::new(*self.element_type.get()?, *self.dimension.get()?))
    }
}

/// Dispatches tensor buffers to an inference back-end.
///
/// Framework, model and the type and dimension of each direction are set
/// once. When a direction has both, its capability is fixed and checked
/// against the peer's. The back-end is opened as soon as everything is
/// configured; an empty intersection or a failed open is terminal.
pub struct FilterElement {
    registry: Arc<Registry>,
    framework: WriteOnce<Arc<dyn Subplugin>>,
    model: WriteOnce<PathBuf>,
    input: Port,
    output: Port,
    handle: Option<Box<dyn SubpluginHandle>>,
    failure: Option<String>,
    silent: bool,
    debug: bool,
}

impl Default for FilterElement {
    fn default() -> Self {
        FilterElement::new()
    }
}

impl FilterElement {
    /// Element resolving frameworks through the process-wide registry.
    pub fn new() -> Self {
        FilterElement::with_registry(registry::global())
    }

    pub fn with_registry(registry: Arc<Registry>) -> Self {
        FilterElement {
            registry,
            framework: WriteOnce::Unset,
            model: WriteOnce::Unset,
            input: Port::default(),
            output: Port::default(),
            handle: None,
            failure: None,
            silent: false,
            debug: false,
        }
    }

    pub fn state(&self) -> FilterState {
        match (&self.failure, &self.handle) {
            (Some(reason), _) => FilterState::Failed(reason.clone()),
            (None, Some(_)) => FilterState::Ready,
            (None, None) => FilterState::Configuring,
        }
    }

    pub fn set_framework(&mut self, name: &str) -> Result<()> {
        self.framework.ensure_unset("framework")?;
        let subplugin = self.registry.lookup(name.trim())?;
        self.framework.set("framework", subplugin)?;
        self.log_property("framework", name);
        self.try_open()
    }

    pub fn set_model(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.model.ensure_unset("model")?;
        let path = path.as_ref();
        check_model(path)?;
        self.model.set("model", path.to_path_buf())?;
        self.log_property("model", &path.display().to_string());
        self.try_open()
    }

    pub fn set_type(&mut self, direction: Direction, name: &str) -> Result<()> {
        let field = match direction {
            Direction::Input => "inputtype",
            Direction::Output => "outputtype",
        };
        self.port(direction).element_type.ensure_unset(field)?;
        let element_type = ElementType::parse_name(name.trim())?;
        if let Some(&dimension) = self.port(direction).dimension.get() {
            TensorInfo::new(element_type, dimension).byte_size()?;
        }
        self.port_mut(direction).element_type.set(field, element_type)?;
        self.log_property(field, name);
        self.fix_caps(direction)?;
        self.try_open()
    }

    pub fn set_dimension(&mut self, direction: Direction, dims: &str) -> Result<()> {
        let field = direction.name();
        self.port(direction).dimension.ensure_unset(field)?;
        let dimension = Dimension::parse(dims)?;
        if let Some(&element_type) = self.port(direction).element_type.get() {
            TensorInfo::new(element_type, dimension).byte_size()?;
        }
        self.port_mut(direction).dimension.set(field, dimension)?;
        self.log_property(field, dims);
        self.fix_caps(direction)?;
        self.try_open()
    }

    pub fn set_input_type(&mut self, name: &str) -> Result<()> {
        self.set_type(Direction::Input, name)
    }

    pub fn set_output_type(&mut self, name: &str) -> Result<()> {
        self.set_type(Direction::Output, name)
    }

    pub fn set_input_dimension(&mut self, dims: &str) -> Result<()> {
        self.set_dimension(Direction::Input, dims)
    }

    pub fn set_output_dimension(&mut self, dims: &str) -> Result<()> {
        self.set_dimension(Direction::Output, dims)
    }

    pub fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Offer the capability the peer on `direction` holds. A configured
    /// direction is re-checked immediately.
    pub fn set_peer_caps(&mut self, direction: Direction, caps: TensorCaps) -> Result<()> {
        self.port_mut(direction).peer = caps;
        self.fix_caps(direction)
    }

    /// Set a property by name, as the host's property plumbing does.
    pub fn set_property(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "framework" => self.set_framework(value),
            "model" => self.set_model(value),
            "input" => self.set_dimension(Direction::Input, value),
            "inputtype" => self.set_type(Direction::Input, value),
            "output" => self.set_dimension(Direction::Output, value),
            "outputtype" => self.set_type(Direction::Output, value),
            "silent" => {
                self.set_silent(parse_bool(name, value)?);
                Ok(())
            }
            "debug" => {
                self.set_debug(parse_bool(name, value)?);
                Ok(())
            }
            other => Err(FilterError::UnknownProperty(other.to_string())),
        }
    }

    /// Current value of a property; `None` when it was never set.
    pub fn property(&self, name: &str) -> Result<Option<String>> {
        if self.debug {
            debug!(property = name, "property read");
        }
        Ok(match name {
            "framework" => self.framework.get().map(|s| s.name().to_string()),
            "model" => self.model.get().map(|p| p.display().to_string()),
            "input" => self.input.dimension.get().map(Dimension::to_string),
            "inputtype" => self.input.element_type.get().map(ElementType::to_string),
            "output" => self.output.dimension.get().map(Dimension::to_string),
            "outputtype" => self.output.element_type.get().map(ElementType::to_string),
            "silent" => Some(self.silent.to_string()),
            "debug" => Some(self.debug.to_string()),
            other => return Err(FilterError::UnknownProperty(other.to_string())),
        })
    }

    /// Tensor info of `direction`, once both its type and dimension are set.
    pub fn info(&self, direction: Direction) -> Option<TensorInfo> {
        self.port(direction).info()
    }

    /// Capability fixed for `direction` after intersecting with the peer.
    pub fn negotiated_caps(&self, direction: Direction) -> Option<TensorCaps> {
        self.port(direction).negotiated
    }

    /// Map a capability offered on `direction` to the opposite side.
    ///
    /// `caps` must fit what is fixed for `direction`. The result is the
    /// opposite side's fixed capability, or any while it is unconfigured.
    pub fn transform_caps(&self, direction: Direction, caps: &TensorCaps) -> Result<TensorCaps> {
        if let Some(fixed) = self.port(direction).negotiated {
            if fixed.intersect(caps).is_none() {
                return Err(FilterError::Negotiation {
                    direction,
                    reason: format!("{} does not fit {}", caps, fixed),
                });
            }
        }
        Ok(self
            .port(direction.opposite())
            .negotiated
            .unwrap_or_else(TensorCaps::any))
    }

    /// Run inference on one buffer.
    pub fn process(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        if let Some(reason) = &self.failure {
            return Err(FilterError::NotReady(format!("element failed: {}", reason)));
        }
        let (Some(handle), Some(input_info), Some(output_info)) =
            (self.handle.as_mut(), self.input.info(), self.output.info())
        else {
            return Err(FilterError::NotReady(
                "framework, model, input and output must all be configured".to_string(),
            ));
        };
        input_info.check_buffer(input.len())?;

        let mut output = vec![0u8; output_info.byte_size()?];
        handle
            .invoke(input, &mut output)
            .map_err(|e| FilterError::Processing(e.to_string()))?;
        if self.debug {
            debug!(
                input = input.len(),
                output = output.len(),
                "buffer invoked"
            );
        }
        Ok(output)
    }

    fn port(&self, direction: Direction) -> &Port {
        match direction {
            Direction::Input => &self.input,
            Direction::Output => &self.output,
        }
    }

    fn port_mut(&mut self, direction: Direction) -> &mut Port {
        match direction {
            Direction::Input => &mut self.input,
            Direction::Output => &mut self.output,
        }
    }

    /// Fix the capability of a fully configured direction against its peer.
    fn fix_caps(&mut self, direction: Direction) -> Result<()> {
        let port = self.port(direction);
        let Some(info) = port.info() else {
            return Ok(());
        };
        let computed = TensorCaps::from_info(&info);
        match port.peer.intersect(&computed) {
            Some(caps) => {
                self.port_mut(direction).negotiated = Some(caps);
                if !self.silent {
                    info!(%direction, caps = %caps, "direction configured");
                }
                Ok(())
            }
            None => {
                let reason = format!("{} does not intersect peer {}", computed, port.peer);
                self.port_mut(direction).negotiated = None;
                self.fail(reason.clone());
                Err(FilterError::Negotiation { direction, reason })
            }
        }
    }

    /// Open the back-end once everything is configured.
    fn try_open(&mut self) -> Result<()> {
        if self.handle.is_some() || self.failure.is_some() {
            return Ok(());
        }
        let (Some(subplugin), Some(model), Some(input), Some(output)) = (
            self.framework.get(),
            self.model.get(),
            self.input.info(),
            self.output.info(),
        ) else {
            return Ok(());
        };

        let params = OpenParams {
            model: model.clone(),
            input,
            output,
        };
        let framework = subplugin.name().to_string();
        match subplugin.open(&params) {
            Ok(handle) => {
                self.handle = Some(handle);
                if !self.silent {
                    info!(
                        %framework,
                        model = %params.model.display(),
                        %input,
                        %output,
                        "back-end opened"
                    );
                }
                Ok(())
            }
            Err(source) => {
                self.fail(format!("{} failed to open: {}", framework, source));
                Err(FilterError::Open { framework, source })
            }
        }
    }

    fn fail(&mut self, reason: String) {
        warn!(%reason, "filter element failed");
        if let Some(handle) = self.handle.take() {
            handle.close();
        }
        self.failure = Some(reason);
    }

    fn log_property(&self, name: &str, value: &str) {
        if self.debug {
            debug!(property = name, value, "property set");
        }
    }
}

impl Drop for FilterElement {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
        }
    }
}

fn check_model(path: &Path) -> Result<()> {
    let invalid = |reason: String| FilterError::InvalidModel {
        path: path.display().to_string(),
        reason,
    };
    let metadata = std::fs::metadata(path).map_err(|e| invalid(e.to_string()))?;
    if !metadata.is_file() {
        return Err(invalid("not a regular file".to_string()));
    }
    std::fs::File::open(path).map_err(|e| invalid(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subplugin::FnSubplugin;
    use std::io::Write;
    use tp_tensor::{CapsField, ErrorCategory};

    fn registry() -> Arc<Registry> {
        Arc::new(
            Registry::builder()
                .register(FnSubplugin::new("invert", |input: &[u8], output: &mut [u8]| {
                    for (o, i) in output.iter_mut().zip(input) {
                        *o = !i;
                    }
                    Ok(())
                }))
                .build(),
        )
    }

    fn model_file() -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"weights").unwrap();
        f
    }

    #[test]
    fn test_opens_when_fully_configured() {
        let model = model_file();
        let mut e = FilterElement::with_registry(registry());
        e.set_property("framework", "invert").unwrap();
        e.set_model(model.path()).unwrap();
        e.set_property("input", "4").unwrap();
        e.set_property("inputtype", "uint8").unwrap();
        e.set_property("output", "4").unwrap();
        assert_eq!(e.state(), FilterState::Configuring);
        e.set_property("outputtype", "uint8").unwrap();
        assert_eq!(e.state(), FilterState::Ready);

        assert_eq!(e.process(&[0, 1, 2, 255]).unwrap(), vec![255, 254, 253, 0]);
    }

    #[test]
    fn test_process_before_ready() {
        let mut e = FilterElement::with_registry(registry());
        let err = e.process(&[0]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::NotReady);
    }

    #[test]
    fn test_framework_twice_keeps_first() {
        let mut e = FilterElement::with_registry(registry());
        e.set_framework("invert").unwrap();
        assert!(matches!(
            e.set_framework("other"),
            Err(FilterError::AlreadySet("framework"))
        ));
        assert_eq!(e.property("framework").unwrap().as_deref(), Some("invert"));
    }

    #[test]
    fn test_bad_values_do_not_fill_slots() {
        let mut e = FilterElement::with_registry(registry());
        assert!(e.set_property("inputtype", "float16").is_err());
        assert!(e.set_property("input", "0:2").is_err());
        assert!(e.set_property("framework", "missing").is_err());
        assert_eq!(e.property("inputtype").unwrap(), None);
        assert_eq!(e.property("input").unwrap(), None);
        e.set_property("inputtype", "float32").unwrap();
        e.set_property("input", "3:2").unwrap();
        assert_eq!(e.property("input").unwrap().as_deref(), Some("3:2:1:1"));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_oversized_buffer_is_rejected_before_storing() {
        let mut e = FilterElement::with_registry(registry());
        e.set_property("input", "65535:65535:65535:65535").unwrap();
        let err = e.set_property("inputtype", "float64").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(e.property("inputtype").unwrap(), None);
        assert_eq!(e.state(), FilterState::Configuring);

        e.set_property("inputtype", "uint8").unwrap();
        assert_eq!(e.info(Direction::Input).unwrap().byte_size().unwrap(), 65535usize.pow(4));

        e.set_property("outputtype", "int64").unwrap();
        assert!(e.set_property("output", "65535:65535:65535:65535").is_err());
        assert_eq!(e.property("output").unwrap(), None);
    }

    #[test]
    fn test_boolean_properties() {
        let mut e = FilterElement::with_registry(registry());
        e.set_property("silent", "yes").unwrap();
        e.set_property("debug", "1").unwrap();
        assert_eq!(e.property("silent").unwrap().as_deref(), Some("true"));
        assert_eq!(e.property("debug").unwrap().as_deref(), Some("true"));
        let err = e.set_property("silent", "maybe").unwrap_err();
        assert!(matches!(
            err,
            FilterError::Tensor(tp_tensor::TensorError::InvalidValue { .. })
        ));
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_model_must_be_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut e = FilterElement::with_registry(registry());
        let err = e.set_model(dir.path()).unwrap_err();
        assert!(matches!(err, FilterError::InvalidModel { .. }));
        assert!(e.set_model(dir.path().join("missing")).is_err());
        assert_eq!(e.property("model").unwrap(), None);
    }

    #[test]
    fn test_peer_caps_conflict_is_terminal() {
        let mut e = FilterElement::with_registry(registry());
        e.set_peer_caps(
            Direction::Input,
            TensorCaps::any().with_element_type(CapsField::Fixed(ElementType::Float32)),
        )
        .unwrap();
        e.set_input_dimension("4").unwrap();
        let err = e.set_input_type("uint8").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Negotiation);
        assert!(matches!(e.state(), FilterState::Failed(_)));
        assert_eq!(e.process(&[0; 4]).unwrap_err().category(), ErrorCategory::NotReady);
    }

    #[test]
    fn test_negotiated_caps_and_transform() {
        let mut e = FilterElement::with_registry(registry());
        e.set_input_type("uint8").unwrap();
        e.set_input_dimension("3:4").unwrap();
        let caps = e.negotiated_caps(Direction::Input).unwrap();
        assert_eq!(caps.rank, CapsField::Fixed(2));
        assert_eq!(e.negotiated_caps(Direction::Output), None);

        assert_eq!(e.transform_caps(Direction::Input, &caps).unwrap(), TensorCaps::any());
        let wrong = TensorCaps::any().with_element_type(CapsField::Fixed(ElementType::Int8));
        assert!(e.transform_caps(Direction::Input, &wrong).is_err());
        assert_eq!(e.transform_caps(Direction::Output, &TensorCaps::any()).unwrap(), caps);
    }

    #[test]
    fn test_wrong_input_size() {
        let model = model_file();
        let mut e = FilterElement::with_registry(registry());
        e.set_framework("invert").unwrap();
        e.set_model(model.path()).unwrap();
        e.set_input_type("uint16").unwrap();
        e.set_input_dimension("2").unwrap();
        e.set_output_type("uint8").unwrap();
        e.set_output_dimension("4").unwrap();
        let err = e.process(&[1, 2]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Processing);
        assert_eq!(e.state(), FilterState::Ready);
    }

    #[test]
    fn test_unknown_property() {
        let mut e = FilterElement::with_registry(registry());
        assert!(matches!(
            e.set_property("mode", "typecast"),
            Err(FilterError::UnknownProperty(_))
        ));
        assert!(e.property("option").is_err());
    }
}
