use tracing::{debug, info};

use tp_tensor::{parse_bool, CapsField, Direction, StreamConfig, TensorCaps};

use crate::chain::{ExecutionPlan, OperationChain, TransformMode};
use crate::error::{Result, TransformError};
use crate::executor::select_executor;

#[derive(Debug, Clone)]
struct Configured {
    input: StreamConfig,
    output: StreamConfig,
    plan: ExecutionPlan,
}

/// Element that retypes and rescales every buffer of a tensor stream.
///
/// `mode` and `option` are each set once. Once both are set the chain is
/// parsed; [`configure`](Self::configure) binds it to the negotiated input
/// stream and [`process`](Self::process) runs it on each buffer.
#[derive(Debug, Default)]
pub struct TransformElement {
    mode: Option<TransformMode>,
    option: Option<String>,
    chain: Option<OperationChain>,
    acceleration: bool,
    silent: bool,
    debug: bool,
    configured: Option<Configured>,
}

impl TransformElement {
    pub fn new() -> Self {
        TransformElement::default()
    }

    pub fn set_mode(&mut self, name: &str) -> Result<()> {
        if self.mode.is_some() {
            return Err(TransformError::AlreadySet("mode"));
        }
        let mode = TransformMode::parse_name(name)?;
        if let Some(option) = &self.option {
            self.chain = Some(OperationChain::parse(mode, option)?);
        }
        self.mode = Some(mode);
        self.log_property("mode", mode.name());
        self.log_chain();
        Ok(())
    }

    pub fn set_option(&mut self, option: &str) -> Result<()> {
        if self.option.is_some() {
            return Err(TransformError::AlreadySet("option"));
        }
        if let Some(mode) = self.mode {
            self.chain = Some(OperationChain::parse(mode, option)?);
        }
        self.option = Some(option.to_string());
        self.log_property("option", option);
        self.log_chain();
        Ok(())
    }

    pub fn set_acceleration(&mut self, enabled: bool) {
        self.acceleration = enabled;
        self.log_property("acceleration", if enabled { "true" } else { "false" });
    }

    pub fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn mode(&self) -> Option<TransformMode> {
        self.mode
    }

    pub fn option(&self) -> Option<&str> {
        self.option.as_deref()
    }

    pub fn chain(&self) -> Option<&OperationChain> {
        self.chain.as_ref()
    }

    pub fn acceleration(&self) -> bool {
        self.acceleration
    }

    /// Set a property by name, as the host's property plumbing does.
    pub fn set_property(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "mode" => self.set_mode(value),
            "option" => self.set_option(value),
            "acceleration" => {
                self.set_acceleration(parse_bool(name, value)?);
                Ok(())
            }
            "silent" => {
                self.set_silent(parse_bool(name, value)?);
                Ok(())
            }
            "debug" => {
                self.set_debug(parse_bool(name, value)?);
                Ok(())
            }
            other => Err(TransformError::UnknownProperty(other.to_string())),
        }
    }

    /// Current value of a property; `None` when it was never set.
    pub fn property(&self, name: &str) -> Result<Option<String>> {
        Ok(match name {
            "mode" => self.mode.map(|m| m.name().to_string()),
            "option" => self.option.clone(),
            "acceleration" => Some(self.acceleration.to_string()),
            "silent" => Some(self.silent.to_string()),
            "debug" => Some(self.debug.to_string()),
            other => return Err(TransformError::UnknownProperty(other.to_string())),
        })
    }

    /// Map a capability offered on `direction` to the opposite side.
    ///
    /// Dimensions and frame rate pass through unchanged. Going from input
    /// to output a fixed type becomes the chain's output type; going back,
    /// the type is relaxed to any when the chain retypes.
    pub fn transform_caps(&self, direction: Direction, caps: &TensorCaps) -> Result<TensorCaps> {
        let chain = self.require_chain()?;
        let element_type = match direction {
            Direction::Input => match (caps.element_type, chain.first_typecast()) {
                (_, Some(to)) => CapsField::Fixed(to),
                (field, None) => field,
            },
            Direction::Output => match chain.first_typecast() {
                Some(_) => CapsField::Any,
                None => caps.element_type,
            },
        };
        Ok(caps.with_element_type(element_type))
    }

    /// Bind the chain to the negotiated input stream and return the output
    /// stream config.
    ///
    /// The input config is immutable once set; configuring again with the
    /// same config is a no-op.
    pub fn configure(&mut self, input: &StreamConfig) -> Result<StreamConfig> {
        if let Some(configured) = &self.configured {
            if configured.input == *input {
                return Ok(configured.output);
            }
            return Err(TransformError::Negotiation(format!(
                "input already configured as {}, got {}",
                configured.input.info, input.info
            )));
        }

        let plan = self.require_chain()?.plan(input.info.element_type)?;
        let output = StreamConfig::with_rate(
            input.info.with_type(plan.output_type()),
            input.rate_n,
            input.rate_d,
        );
        input.info.byte_size()?;
        output.info.byte_size()?;

        if !self.silent {
            info!(
                input = %input.info,
                output = %output.info,
                steps = plan.steps().len(),
                "transform configured"
            );
        }
        self.configured = Some(Configured {
            input: *input,
            output,
            plan,
        });
        Ok(output)
    }

    pub fn input_config(&self) -> Option<&StreamConfig> {
        self.configured.as_ref().map(|c| &c.input)
    }

    pub fn output_config(&self) -> Option<&StreamConfig> {
        self.configured.as_ref().map(|c| &c.output)
    }

    /// Transform one buffer.
    pub fn process(&self, input: &[u8]) -> Result<Vec<u8>> {
        let configured = self.configured.as_ref().ok_or_else(|| {
            TransformError::NotReady("input stream is not configured".to_string())
        })?;
        configured.input.info.check_buffer(input.len())?;

        let executor = select_executor(self.acceleration);
        if self.debug {
            debug!(
                executor = executor.name(),
                bytes = input.len(),
                "transforming buffer"
            );
        }
        executor.execute(&configured.plan, input)
    }

    fn require_chain(&self) -> Result<&OperationChain> {
        self.chain.as_ref().ok_or_else(|| {
            TransformError::NotReady("mode and option must both be set".to_string())
        })
    }

    fn log_property(&self, name: &str, value: &str) {
        if self.debug {
            debug!(property = name, value, "property set");
        }
    }

    fn log_chain(&self) {
        if let (Some(chain), false) = (&self.chain, self.silent) {
            info!(mode = %chain.mode(), option = %chain, "operation chain parsed");
        }
    }
}
