use std::fmt::Debug;

use tp_tensor::TensorError;

use crate::accel::AcceleratedExecutor;
use crate::chain::ExecutionPlan;
use crate::error::Result;
use crate::scalar::ScalarExecutor;

/// Runs an [`ExecutionPlan`] over one buffer of native-endian elements.
///
/// Every implementation must produce output bit-identical to
/// [`ScalarExecutor`] for every input.
pub trait Executor: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Transform `input`, a whole number of `plan.input_type()` elements,
    /// into a buffer of `plan.output_type()` elements.
    fn execute(&self, plan: &ExecutionPlan, input: &[u8]) -> Result<Vec<u8>>;
}

static SCALAR: ScalarExecutor = ScalarExecutor;
static ACCELERATED: AcceleratedExecutor = AcceleratedExecutor;

/// Pick the executor for the `acceleration` property. Falls back to the
/// scalar executor when no accelerated path exists for this build.
pub fn select_executor(acceleration: bool) -> &'static dyn Executor {
    if acceleration && AcceleratedExecutor::is_available() {
        &ACCELERATED
    } else {
        &SCALAR
    }
}

pub(crate) fn check_input_len(plan: &ExecutionPlan, input: &[u8]) -> Result<()> {
    let width = plan.input_type().size_in_bytes();
    if input.len() % width != 0 {
        return Err(TensorError::SizeMismatch {
            expected: input.len() / width * width,
            got: input.len(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_scalar_when_not_accelerated() {
        assert_eq!(select_executor(false).name(), "scalar");
    }

    #[test]
    fn test_select_accelerated_when_available() {
        let expected = if AcceleratedExecutor::is_available() { "sse2" } else { "scalar" };
        assert_eq!(select_executor(true).name(), expected);
    }
}
