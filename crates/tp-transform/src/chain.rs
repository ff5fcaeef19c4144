use std::fmt;

use tracing::warn;

use tp_tensor::{ArithOp, ElementType, TensorValue};

use crate::error::{Result, TransformError};

/// Grammar selected by the `mode` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformMode {
    /// The option is a single target type name.
    Typecast,
    /// The option is a comma-separated list of typecast and arithmetic steps.
    Arithmetic,
}

impl TransformMode {
    pub fn name(&self) -> &'static str {
        match self {
            TransformMode::Typecast => "typecast",
            TransformMode::Arithmetic => "arithmetic",
        }
    }

    pub fn parse_name(name: &str) -> Result<TransformMode> {
        match name.trim() {
            "typecast" => Ok(TransformMode::Typecast),
            "arithmetic" => Ok(TransformMode::Arithmetic),
            other => Err(TransformError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for TransformMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One parsed step of an operation chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperationStep {
    Typecast(ElementType),
    Arithmetic { op: ArithOp, operand: f64 },
}

impl fmt::Display for OperationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationStep::Typecast(ty) => write!(f, "typecast:{}", ty),
            OperationStep::Arithmetic { op, operand } => write!(f, "{}:{}", op, operand),
        }
    }
}

/// An ordered, immutable list of steps parsed from the `option` property.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationChain {
    mode: TransformMode,
    steps: Vec<OperationStep>,
}

impl OperationChain {
    /// Parse `option` according to `mode`.
    ///
    /// In typecast mode the option must be exactly one type name. In
    /// arithmetic mode it is a comma-separated list of `typecast:<type>`,
    /// `<type>`, `add:<value>`, `mul:<value>` and `div:<value>` tokens.
    pub fn parse(mode: TransformMode, option: &str) -> Result<OperationChain> {
        let option = option.trim();
        if option.is_empty() {
            return Err(TransformError::InvalidOperation(
                "option must not be empty".to_string(),
            ));
        }

        let steps = match mode {
            TransformMode::Typecast => vec![OperationStep::Typecast(parse_type(option)?)],
            TransformMode::Arithmetic => option
                .split(',')
                .map(parse_token)
                .collect::<Result<Vec<_>>>()?,
        };

        Ok(OperationChain { mode, steps })
    }

    pub fn mode(&self) -> TransformMode {
        self.mode
    }

    pub fn steps(&self) -> &[OperationStep] {
        &self.steps
    }

    /// Target of the first typecast step, if any.
    pub fn first_typecast(&self) -> Option<ElementType> {
        self.steps.iter().find_map(|step| match step {
            OperationStep::Typecast(ty) => Some(*ty),
            OperationStep::Arithmetic { .. } => None,
        })
    }

    /// Element type produced for a stream of `input` elements.
    pub fn output_type(&self, input: ElementType) -> ElementType {
        self.first_typecast().unwrap_or(input)
    }

    /// Resolve the chain against a concrete input type.
    ///
    /// Only the first typecast changes the working type. Later typecasts are
    /// dropped from the plan. Operands are converted to the working type at
    /// their position; an integer division whose operand converts to zero is
    /// rejected.
    pub fn plan(&self, input: ElementType) -> Result<ExecutionPlan> {
        let mut working = input;
        let mut cast_seen = false;
        let mut steps = Vec::with_capacity(self.steps.len());

        for (index, step) in self.steps.iter().enumerate() {
            match *step {
                OperationStep::Typecast(to) => {
                    if cast_seen {
                        warn!(
                            step = index,
                            ignored = %to,
                            output = %working,
                            "typecast after the first one does not change the output type; ignored"
                        );
                        continue;
                    }
                    cast_seen = true;
                    steps.push(PlannedStep::Cast { from: working, to });
                    working = to;
                }
                OperationStep::Arithmetic { op, operand } => {
                    let value = TensorValue::from_f64(working, operand);
                    if op == ArithOp::Div && value.is_integer_zero() {
                        return Err(TransformError::InvalidOperation(format!(
                            "div:{} divides {} elements by zero",
                            operand, working
                        )));
                    }
                    steps.push(PlannedStep::Arithmetic { op, operand: value });
                }
            }
        }

        Ok(ExecutionPlan {
            input_type: input,
            output_type: working,
            steps,
        })
    }
}

impl fmt::Display for OperationChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mode == TransformMode::Typecast {
            if let Some(OperationStep::Typecast(ty)) = self.steps.first() {
                return write!(f, "{}", ty);
            }
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

fn parse_type(name: &str) -> Result<ElementType> {
    ElementType::parse_name(name.trim()).map_err(|_| {
        TransformError::InvalidOperation(format!("unknown element type {:?}", name.trim()))
    })
}

fn parse_token(token: &str) -> Result<OperationStep> {
    let token = token.trim();
    let Some((op, value)) = token.split_once(':') else {
        return Ok(OperationStep::Typecast(parse_type(token)?));
    };

    let op = op.trim();
    if op == "typecast" {
        return Ok(OperationStep::Typecast(parse_type(value)?));
    }

    let op = ArithOp::parse_name(op)
        .ok_or_else(|| TransformError::InvalidOperation(format!("unknown operator {:?}", op)))?;
    Ok(OperationStep::Arithmetic {
        op,
        operand: parse_operand(value)?,
    })
}

/// Signed decimal literal: optional sign, digits, at most one point.
fn parse_operand(literal: &str) -> Result<f64> {
    let literal = literal.trim();
    let invalid = || TransformError::InvalidOperation(format!("invalid operand {:?}", literal));

    let digits = literal
        .strip_prefix(['+', '-'])
        .unwrap_or(literal);
    let mut points = 0;
    let mut has_digit = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => has_digit = true,
            '.' => points += 1,
            _ => return Err(invalid()),
        }
    }
    if !has_digit || points > 1 {
        return Err(invalid());
    }

    literal.parse::<f64>().map_err(|_| invalid())
}

/// A step resolved against a concrete working type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlannedStep {
    Cast { from: ElementType, to: ElementType },
    Arithmetic { op: ArithOp, operand: TensorValue },
}

impl PlannedStep {
    /// Apply this step to a single element.
    pub fn apply(&self, value: TensorValue) -> TensorValue {
        match *self {
            PlannedStep::Cast { to, .. } => value.cast(to),
            PlannedStep::Arithmetic { op, operand } => value.apply(op, operand),
        }
    }
}

/// An operation chain bound to an input element type.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    input_type: ElementType,
    output_type: ElementType,
    steps: Vec<PlannedStep>,
}

impl ExecutionPlan {
    pub fn input_type(&self) -> ElementType {
        self.input_type
    }

    pub fn output_type(&self) -> ElementType {
        self.output_type
    }

    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    /// Output buffer size for an input buffer of `input_len` bytes.
    pub fn output_len(&self, input_len: usize) -> usize {
        input_len / self.input_type.size_in_bytes() * self.output_type.size_in_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_typecast_mode() {
        let chain = OperationChain::parse(TransformMode::Typecast, "uint32").unwrap();
        assert_eq!(chain.steps(), &[OperationStep::Typecast(ElementType::Uint32)]);
        assert_eq!(chain.output_type(ElementType::Uint8), ElementType::Uint32);
        assert_eq!(chain.to_string(), "uint32");
    }

    #[test]
    fn test_typecast_mode_rejects_chain() {
        assert!(OperationChain::parse(TransformMode::Typecast, "typecast:uint32").is_err());
        assert!(OperationChain::parse(TransformMode::Typecast, "uint32,add:1").is_err());
        assert!(OperationChain::parse(TransformMode::Typecast, "uint128").is_err());
    }

    #[test]
    fn test_parse_arithmetic_chain() {
        let chain =
            OperationChain::parse(TransformMode::Arithmetic, "typecast:float32,add:.5,mul:0.2")
                .unwrap();
        assert_eq!(
            chain.steps(),
            &[
                OperationStep::Typecast(ElementType::Float32),
                OperationStep::Arithmetic { op: ArithOp::Add, operand: 0.5 },
                OperationStep::Arithmetic { op: ArithOp::Mul, operand: 0.2 },
            ]
        );
        assert_eq!(chain.to_string(), "typecast:float32,add:0.5,mul:0.2");
    }

    #[test]
    fn test_parse_bare_type_and_whitespace() {
        let chain = OperationChain::parse(TransformMode::Arithmetic, " int16 , div: -2 ").unwrap();
        assert_eq!(
            chain.steps(),
            &[
                OperationStep::Typecast(ElementType::Int16),
                OperationStep::Arithmetic { op: ArithOp::Div, operand: -2.0 },
            ]
        );
    }

    #[test]
    fn test_parse_errors() {
        let bad = [
            "",
            "sub:1",
            "add:",
            "add:abc",
            "add:1.2.3",
            "add:inf",
            "mul:nan",
            "add:1e3",
            "typecast:float16",
            "add:1,,mul:2",
        ];
        for option in bad {
            assert!(
                matches!(
                    OperationChain::parse(TransformMode::Arithmetic, option),
                    Err(TransformError::InvalidOperation(_))
                ),
                "{:?} should be rejected",
                option
            );
        }
    }

    #[test]
    fn test_operand_literals() {
        assert_eq!(parse_operand(".5").unwrap(), 0.5);
        assert_eq!(parse_operand("-1").unwrap(), -1.0);
        assert_eq!(parse_operand("+2.").unwrap(), 2.0);
        assert!(parse_operand("-").is_err());
        assert!(parse_operand(".").is_err());
    }

    #[test]
    fn test_first_typecast_fixes_output_type() {
        let chain = OperationChain::parse(
            TransformMode::Arithmetic,
            "typecast:float64,add:0.2,add:0.1,typecast:uint16",
        )
        .unwrap();
        assert_eq!(chain.steps().len(), 4);
        assert_eq!(chain.output_type(ElementType::Uint8), ElementType::Float64);

        let plan = chain.plan(ElementType::Uint8).unwrap();
        assert_eq!(plan.output_type(), ElementType::Float64);
        assert_eq!(plan.steps().len(), 3);
        assert!(plan
            .steps()
            .iter()
            .all(|s| !matches!(s, PlannedStep::Cast { to: ElementType::Uint16, .. })));
    }

    #[test]
    fn test_plan_without_typecast_keeps_input_type() {
        let chain = OperationChain::parse(TransformMode::Arithmetic, "add:.5").unwrap();
        let plan = chain.plan(ElementType::Float32).unwrap();
        assert_eq!(plan.output_type(), ElementType::Float32);
        assert_eq!(
            plan.steps(),
            &[PlannedStep::Arithmetic {
                op: ArithOp::Add,
                operand: TensorValue::Float32(0.5)
            }]
        );
    }

    #[test]
    fn test_plan_converts_operand_at_position() {
        let chain = OperationChain::parse(TransformMode::Arithmetic, "add:-1.7,typecast:float64,mul:2.5").unwrap();
        let plan = chain.plan(ElementType::Int32).unwrap();
        assert_eq!(
            plan.steps()[0],
            PlannedStep::Arithmetic { op: ArithOp::Add, operand: TensorValue::Int32(-1) }
        );
        assert_eq!(
            plan.steps()[2],
            PlannedStep::Arithmetic { op: ArithOp::Mul, operand: TensorValue::Float64(2.5) }
        );
    }

    #[test]
    fn test_plan_rejects_integer_division_by_zero() {
        let chain = OperationChain::parse(TransformMode::Arithmetic, "div:0.5").unwrap();
        assert!(matches!(
            chain.plan(ElementType::Int16),
            Err(TransformError::InvalidOperation(_))
        ));
        // Floating-point division by a fraction is fine.
        assert!(chain.plan(ElementType::Float32).is_ok());
    }

    #[test]
    fn test_output_len() {
        let chain = OperationChain::parse(TransformMode::Typecast, "float64").unwrap();
        let plan = chain.plan(ElementType::Int16).unwrap();
        assert_eq!(plan.output_len(10), 40);
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(TransformMode::parse_name("arithmetic").unwrap(), TransformMode::Arithmetic);
        assert!(matches!(
            TransformMode::parse_name("dimchg"),
            Err(TransformError::InvalidMode(_))
        ));
    }
}
