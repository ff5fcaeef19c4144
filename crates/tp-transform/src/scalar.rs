use tp_tensor::TensorValue;

use crate::chain::ExecutionPlan;
use crate::error::Result;
use crate::executor::{check_input_len, Executor};

/// Reference executor: reads one element, runs every step on it, writes it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScalarExecutor;

impl Executor for ScalarExecutor {
    fn name(&self) -> &str {
        "scalar"
    }

    fn execute(&self, plan: &ExecutionPlan, input: &[u8]) -> Result<Vec<u8>> {
        check_input_len(plan, input)?;

        let width = plan.input_type().size_in_bytes();
        let mut out = Vec::with_capacity(plan.output_len(input.len()));
        for raw in input.chunks_exact(width) {
            let mut value = TensorValue::read_ne(plan.input_type(), raw)?;
            for step in plan.steps() {
                value = step.apply(value);
            }
            value.write_ne(&mut out);
        }
        Ok(out)
    }
}
