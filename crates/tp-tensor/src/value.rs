use std::fmt;

use crate::dtype::ElementType;
use crate::error::{Result, TensorError};

/// Arithmetic applied between an element and a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Mul,
    Div,
}

impl ArithOp {
    pub fn name(&self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
        }
    }

    pub fn parse_name(name: &str) -> Option<ArithOp> {
        match name {
            "add" => Some(ArithOp::Add),
            "mul" => Some(ArithOp::Mul),
            "div" => Some(ArithOp::Div),
            _ => None,
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single tensor element tagged with its type.
///
/// `cast` and `apply` define the reference numeric semantics every executor
/// must reproduce bit for bit:
/// - integer to integer keeps the low bits of the sign- or zero-extended value
/// - float to integer truncates toward zero into `i32` (`i64` for 64-bit
///   targets), saturating, then keeps the low bits
/// - `uint32` to float goes through `i32`
/// - integer arithmetic wraps
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TensorValue {
    Int8(i8),
    Uint8(u8),
    Int16(i16),
    Uint16(u16),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
}

macro_rules! read_ne {
    ($t:ty, $bytes:expr) => {
        <$t>::from_ne_bytes($bytes.try_into().map_err(|_| TensorError::SizeMismatch {
            expected: std::mem::size_of::<$t>(),
            got: $bytes.len(),
        })?)
    };
}

impl TensorValue {
    /// Returns the element type of this value.
    pub fn element_type(&self) -> ElementType {
        match self {
            TensorValue::Int8(_) => ElementType::Int8,
            TensorValue::Uint8(_) => ElementType::Uint8,
            TensorValue::Int16(_) => ElementType::Int16,
            TensorValue::Uint16(_) => ElementType::Uint16,
            TensorValue::Int32(_) => ElementType::Int32,
            TensorValue::Uint32(_) => ElementType::Uint32,
            TensorValue::Int64(_) => ElementType::Int64,
            TensorValue::Uint64(_) => ElementType::Uint64,
            TensorValue::Float32(_) => ElementType::Float32,
            TensorValue::Float64(_) => ElementType::Float64,
        }
    }

    /// Decode one native-endian element of type `ty`.
    ///
    /// # Errors
    /// Returns `SizeMismatch` if `bytes` is not exactly one element wide.
    pub fn read_ne(ty: ElementType, bytes: &[u8]) -> Result<TensorValue> {
        Ok(match ty {
            ElementType::Int8 => TensorValue::Int8(read_ne!(i8, bytes)),
            ElementType::Uint8 => TensorValue::Uint8(read_ne!(u8, bytes)),
            ElementType::Int16 => TensorValue::Int16(read_ne!(i16, bytes)),
            ElementType::Uint16 => TensorValue::Uint16(read_ne!(u16, bytes)),
            ElementType::Int32 => TensorValue::Int32(read_ne!(i32, bytes)),
            ElementType::Uint32 => TensorValue::Uint32(read_ne!(u32, bytes)),
            ElementType::Int64 => TensorValue::Int64(read_ne!(i64, bytes)),
            ElementType::Uint64 => TensorValue::Uint64(read_ne!(u64, bytes)),
            ElementType::Float32 => TensorValue::Float32(read_ne!(f32, bytes)),
            ElementType::Float64 => TensorValue::Float64(read_ne!(f64, bytes)),
        })
    }

    /// Append the native-endian encoding of this value to `out`.
    pub fn write_ne(&self, out: &mut Vec<u8>) {
        match self {
            TensorValue::Int8(v) => out.extend_from_slice(&v.to_ne_bytes()),
            TensorValue::Uint8(v) => out.extend_from_slice(&v.to_ne_bytes()),
            TensorValue::Int16(v) => out.extend_from_slice(&v.to_ne_bytes()),
            TensorValue::Uint16(v) => out.extend_from_slice(&v.to_ne_bytes()),
            TensorValue::Int32(v) => out.extend_from_slice(&v.to_ne_bytes()),
            TensorValue::Uint32(v) => out.extend_from_slice(&v.to_ne_bytes()),
            TensorValue::Int64(v) => out.extend_from_slice(&v.to_ne_bytes()),
            TensorValue::Uint64(v) => out.extend_from_slice(&v.to_ne_bytes()),
            TensorValue::Float32(v) => out.extend_from_slice(&v.to_ne_bytes()),
            TensorValue::Float64(v) => out.extend_from_slice(&v.to_ne_bytes()),
        }
    }

    /// Convert a `float64` constant (an arithmetic operand) to `ty`.
    pub fn from_f64(ty: ElementType, v: f64) -> TensorValue {
        TensorValue::Float64(v).cast(ty)
    }

    /// Convert this value to `to`.
    pub fn cast(self, to: ElementType) -> TensorValue {
        match self {
            TensorValue::Float32(v) => match to {
                ElementType::Float32 => TensorValue::Float32(v),
                ElementType::Float64 => TensorValue::Float64(v as f64),
                _ => float_to_integer(v as f64, to),
            },
            TensorValue::Float64(v) => match to {
                ElementType::Float32 => TensorValue::Float32(v as f32),
                ElementType::Float64 => TensorValue::Float64(v),
                _ => float_to_integer(v, to),
            },
            TensorValue::Uint64(v) => match to {
                ElementType::Float32 => TensorValue::Float32(v as f32),
                ElementType::Float64 => TensorValue::Float64(v as f64),
                _ => integer_to_integer(v as i64, to),
            },
            int => {
                let extended = int.integer_bits();
                match to {
                    ElementType::Float32 => TensorValue::Float32(int.float_source() as f32),
                    ElementType::Float64 => TensorValue::Float64(int.float_source() as f64),
                    _ => integer_to_integer(extended, to),
                }
            }
        }
    }

    /// Sign- or zero-extended integer value. Floats truncate.
    fn integer_bits(&self) -> i64 {
        match *self {
            TensorValue::Int8(v) => v as i64,
            TensorValue::Uint8(v) => v as i64,
            TensorValue::Int16(v) => v as i64,
            TensorValue::Uint16(v) => v as i64,
            TensorValue::Int32(v) => v as i64,
            TensorValue::Uint32(v) => v as i64,
            TensorValue::Int64(v) => v,
            TensorValue::Uint64(v) => v as i64,
            TensorValue::Float32(v) => v as i64,
            TensorValue::Float64(v) => v as i64,
        }
    }

    /// Integer value as seen by an int-to-float conversion; `uint32` is read
    /// as `int32`.
    fn float_source(&self) -> i64 {
        match *self {
            TensorValue::Uint32(v) => v as i32 as i64,
            other => other.integer_bits(),
        }
    }

    /// Apply `op` with `operand`, which is first converted to this value's type.
    ///
    /// Integer division by zero yields zero.
    pub fn apply(self, op: ArithOp, operand: TensorValue) -> TensorValue {
        macro_rules! int_op {
            ($variant:ident, $x:expr, $y:expr) => {
                TensorValue::$variant(match op {
                    ArithOp::Add => $x.wrapping_add($y),
                    ArithOp::Mul => $x.wrapping_mul($y),
                    ArithOp::Div => {
                        if $y == 0 {
                            0
                        } else {
                            $x.wrapping_div($y)
                        }
                    }
                })
            };
        }
        macro_rules! float_op {
            ($variant:ident, $x:expr, $y:expr) => {
                TensorValue::$variant(match op {
                    ArithOp::Add => $x + $y,
                    ArithOp::Mul => $x * $y,
                    ArithOp::Div => $x / $y,
                })
            };
        }

        match (self, operand.cast(self.element_type())) {
            (TensorValue::Int8(x), TensorValue::Int8(y)) => int_op!(Int8, x, y),
            (TensorValue::Uint8(x), TensorValue::Uint8(y)) => int_op!(Uint8, x, y),
            (TensorValue::Int16(x), TensorValue::Int16(y)) => int_op!(Int16, x, y),
            (TensorValue::Uint16(x), TensorValue::Uint16(y)) => int_op!(Uint16, x, y),
            (TensorValue::Int32(x), TensorValue::Int32(y)) => int_op!(Int32, x, y),
            (TensorValue::Uint32(x), TensorValue::Uint32(y)) => int_op!(Uint32, x, y),
            (TensorValue::Int64(x), TensorValue::Int64(y)) => int_op!(Int64, x, y),
            (TensorValue::Uint64(x), TensorValue::Uint64(y)) => int_op!(Uint64, x, y),
            (TensorValue::Float32(x), TensorValue::Float32(y)) => float_op!(Float32, x, y),
            (TensorValue::Float64(x), TensorValue::Float64(y)) => float_op!(Float64, x, y),
            // `cast` always returns the requested type.
            (value, _) => value,
        }
    }

    /// Returns true for an integer zero. Floats are never treated as zero
    /// divisors.
    pub fn is_integer_zero(&self) -> bool {
        !self.element_type().is_float() && self.integer_bits() == 0
    }

    /// Lossy widening to `f64`, for display and tests.
    pub fn to_f64(&self) -> f64 {
        match *self {
            TensorValue::Float32(v) => v as f64,
            TensorValue::Float64(v) => v,
            TensorValue::Uint64(v) => v as f64,
            other => other.integer_bits() as f64,
        }
    }
}

/// Truncate toward zero. Unsigned 32 and 64-bit targets keep their full
/// positive range; negative values wrap through the signed type.
fn float_to_integer(v: f64, to: ElementType) -> TensorValue {
    match to {
        ElementType::Int64 => TensorValue::Int64(v as i64),
        ElementType::Uint64 if v >= 0.0 => TensorValue::Uint64(v as u64),
        ElementType::Uint64 => TensorValue::Uint64(v as i64 as u64),
        ElementType::Uint32 => TensorValue::Uint32(v as i64 as u32),
        _ => integer_to_integer((v as i32) as i64, to),
    }
}

fn integer_to_integer(bits: i64, to: ElementType) -> TensorValue {
    match to {
        ElementType::Int8 => TensorValue::Int8(bits as i8),
        ElementType::Uint8 => TensorValue::Uint8(bits as u8),
        ElementType::Int16 => TensorValue::Int16(bits as i16),
        ElementType::Uint16 => TensorValue::Uint16(bits as u16),
        ElementType::Int32 => TensorValue::Int32(bits as i32),
        ElementType::Uint32 => TensorValue::Uint32(bits as u32),
        ElementType::Int64 => TensorValue::Int64(bits),
        ElementType::Uint64 => TensorValue::Uint64(bits as u64),
        ElementType::Float32 => TensorValue::Float32(bits as f32),
        ElementType::Float64 => TensorValue::Float64(bits as f64),
    }
}

impl fmt::Display for TensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorValue::Int8(v) => write!(f, "{}", v),
            TensorValue::Uint8(v) => write!(f, "{}", v),
            TensorValue::Int16(v) => write!(f, "{}", v),
            TensorValue::Uint16(v) => write!(f, "{}", v),
            TensorValue::Int32(v) => write!(f, "{}", v),
            TensorValue::Uint32(v) => write!(f, "{}", v),
            TensorValue::Int64(v) => write!(f, "{}", v),
            TensorValue::Uint64(v) => write!(f, "{}", v),
            TensorValue::Float32(v) => write!(f, "{}", v),
            TensorValue::Float64(v) => write!(f, "{}", v),
        }
    }
}
