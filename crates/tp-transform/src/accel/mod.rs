//! Step-at-a-time executor over typed storage.
//!
//! Each planned step runs over the whole buffer before the next one starts.
//! Conversions and constant arithmetic with an SSE2 kernel use it; every
//! other combination runs a lane loop that applies the scalar rule per
//! element, so results are bit-identical to [`ScalarExecutor`].

#[cfg(target_arch = "x86_64")]
mod sse2;

use tp_tensor::{ArithOp, ElementType, TensorStorage, TensorValue};

use crate::chain::{ExecutionPlan, PlannedStep};
use crate::error::Result;
use crate::executor::{check_input_len, Executor};
use crate::scalar::ScalarExecutor;

#[derive(Debug, Default, Clone, Copy)]
pub struct AcceleratedExecutor;

impl AcceleratedExecutor {
    /// True when this build carries vector kernels.
    pub fn is_available() -> bool {
        cfg!(target_arch = "x86_64")
    }
}

impl Executor for AcceleratedExecutor {
    fn name(&self) -> &str {
        "sse2"
    }

    fn execute(&self, plan: &ExecutionPlan, input: &[u8]) -> Result<Vec<u8>> {
        if !Self::is_available() {
            return ScalarExecutor.execute(plan, input);
        }
        check_input_len(plan, input)?;

        let mut storage = TensorStorage::from_bytes(plan.input_type(), input)?;
        for step in plan.steps() {
            match *step {
                PlannedStep::Cast { to, .. } => storage = convert(storage, to),
                PlannedStep::Arithmetic { op, operand } => apply(&mut storage, op, operand),
            }
        }
        Ok(storage.to_bytes())
    }
}

/// Primitive element types. Every bit pattern is a valid value.
pub(crate) trait Lane: Copy + Default + 'static {
    fn to_value(self) -> TensorValue;
    /// Extract a value of this lane's type; other variants yield the default.
    fn from_value(value: TensorValue) -> Self;
}

macro_rules! impl_lane {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl Lane for $t {
                fn to_value(self) -> TensorValue {
                    TensorValue::$variant(self)
                }

                fn from_value(value: TensorValue) -> Self {
                    match value {
                        TensorValue::$variant(x) => x,
                        _ => <$t>::default(),
                    }
                }
            }
        )*
    };
}

impl_lane!(
    i8 => Int8, u8 => Uint8, i16 => Int16, u16 => Uint16, i32 => Int32,
    u32 => Uint32, i64 => Int64, u64 => Uint64, f32 => Float32, f64 => Float64,
);

/// Reinterpret a slice as a same-width lane type. Callers only pair
/// signed and unsigned types of one width.
#[cfg_attr(not(target_arch = "x86_64"), allow(dead_code))]
fn view<T: Lane, U: Lane>(v: &[T]) -> &[U] {
    debug_assert_eq!(std::mem::size_of::<T>(), std::mem::size_of::<U>());
    debug_assert_eq!(std::mem::align_of::<T>(), std::mem::align_of::<U>());
    // SAFETY: both are primitive numeric types of equal size and alignment,
    // and any bit pattern is a valid U.
    unsafe { std::slice::from_raw_parts(v.as_ptr() as *const U, v.len()) }
}

#[cfg_attr(not(target_arch = "x86_64"), allow(dead_code))]
fn view_mut<T: Lane, U: Lane>(v: &mut [T]) -> &mut [U] {
    debug_assert_eq!(std::mem::size_of::<T>(), std::mem::size_of::<U>());
    debug_assert_eq!(std::mem::align_of::<T>(), std::mem::align_of::<U>());
    // SAFETY: as in `view`; the borrow is exclusive for its lifetime.
    unsafe { std::slice::from_raw_parts_mut(v.as_mut_ptr() as *mut U, v.len()) }
}

/// Convert every element of `storage` to `to`.
pub(crate) fn convert(storage: TensorStorage, to: ElementType) -> TensorStorage {
    if storage.element_type() == to {
        return storage;
    }
    if let Some(out) = simd_convert(&storage, to) {
        return out;
    }
    match &storage {
        TensorStorage::Int8(v) => convert_lanes(v, to),
        TensorStorage::Uint8(v) => convert_lanes(v, to),
        TensorStorage::Int16(v) => convert_lanes(v, to),
        TensorStorage::Uint16(v) => convert_lanes(v, to),
        TensorStorage::Int32(v) => convert_lanes(v, to),
        TensorStorage::Uint32(v) => convert_lanes(v, to),
        TensorStorage::Int64(v) => convert_lanes(v, to),
        TensorStorage::Uint64(v) => convert_lanes(v, to),
        TensorStorage::Float32(v) => convert_lanes(v, to),
        TensorStorage::Float64(v) => convert_lanes(v, to),
    }
}

/// Apply `op` with a constant to every element of `storage` in place.
pub(crate) fn apply(storage: &mut TensorStorage, op: ArithOp, operand: TensorValue) {
    if simd_apply(storage, op, operand) {
        return;
    }
    match storage {
        TensorStorage::Int8(v) => apply_lanes(v, op, operand),
        TensorStorage::Uint8(v) => apply_lanes(v, op, operand),
        TensorStorage::Int16(v) => apply_lanes(v, op, operand),
        TensorStorage::Uint16(v) => apply_lanes(v, op, operand),
        TensorStorage::Int32(v) => apply_lanes(v, op, operand),
        TensorStorage::Uint32(v) => apply_lanes(v, op, operand),
        TensorStorage::Int64(v) => apply_lanes(v, op, operand),
        TensorStorage::Uint64(v) => apply_lanes(v, op, operand),
        TensorStorage::Float32(v) => apply_lanes(v, op, operand),
        TensorStorage::Float64(v) => apply_lanes(v, op, operand),
    }
}

fn cast_lanes<S: Lane, D: Lane>(src: &[S], to: ElementType) -> Vec<D> {
    src.iter()
        .map(|&x| D::from_value(x.to_value().cast(to)))
        .collect()
}

fn convert_lanes<S: Lane>(src: &[S], to: ElementType) -> TensorStorage {
    match to {
        ElementType::Int8 => TensorStorage::Int8(cast_lanes(src, to)),
        ElementType::Uint8 => TensorStorage::Uint8(cast_lanes(src, to)),
        ElementType::Int16 => TensorStorage::Int16(cast_lanes(src, to)),
        ElementType::Uint16 => TensorStorage::Uint16(cast_lanes(src, to)),
        ElementType::Int32 => TensorStorage::Int32(cast_lanes(src, to)),
        ElementType::Uint32 => TensorStorage::Uint32(cast_lanes(src, to)),
        ElementType::Int64 => TensorStorage::Int64(cast_lanes(src, to)),
        ElementType::Uint64 => TensorStorage::Uint64(cast_lanes(src, to)),
        ElementType::Float32 => TensorStorage::Float32(cast_lanes(src, to)),
        ElementType::Float64 => TensorStorage::Float64(cast_lanes(src, to)),
    }
}

fn apply_lanes<T: Lane>(data: &mut [T], op: ArithOp, operand: TensorValue) {
    for x in data.iter_mut() {
        *x = T::from_value(x.to_value().apply(op, operand));
    }
}

/// Allocate a lane buffer of `len` and let a kernel fill it.
#[cfg(target_arch = "x86_64")]
fn filled<T: Lane>(len: usize, fill: impl FnOnce(&mut [T])) -> Vec<T> {
    let mut out = vec![T::default(); len];
    fill(&mut out);
    out
}

/// Store 32-bit lane results as `to`, keeping the low bits.
#[cfg(target_arch = "x86_64")]
fn from_i32_lanes(bits: Vec<i32>, to: ElementType) -> Option<TensorStorage> {
    Some(match to {
        ElementType::Int32 => TensorStorage::Int32(bits),
        ElementType::Uint32 => TensorStorage::Uint32(bits.iter().map(|&x| x as u32).collect()),
        ElementType::Int16 | ElementType::Uint16 => {
            let halves = filled::<u16>(bits.len(), |out| sse2::narrow_32_to_16(view(&bits), out));
            from_u16_lanes(halves, to)?
        }
        ElementType::Int8 => TensorStorage::Int8(bits.iter().map(|&x| x as i8).collect()),
        ElementType::Uint8 => TensorStorage::Uint8(bits.iter().map(|&x| x as u8).collect()),
        _ => return None,
    })
}

#[cfg(target_arch = "x86_64")]
fn from_u16_lanes(bits: Vec<u16>, to: ElementType) -> Option<TensorStorage> {
    Some(match to {
        ElementType::Uint16 => TensorStorage::Uint16(bits),
        ElementType::Int16 => TensorStorage::Int16(bits.iter().map(|&x| x as i16).collect()),
        _ => return None,
    })
}

/// Integer lanes of at most 32 bits widened to 32-bit bit patterns.
#[cfg(target_arch = "x86_64")]
fn widen_to_i32(storage: &TensorStorage) -> Option<Vec<i32>> {
    let widen16 = |src: &[u16], signed: bool| {
        filled::<i32>(src.len(), |out| sse2::widen_16_to_32(src, view_mut(out), signed))
    };
    let widen8 = |src: &[u8], signed: bool| {
        let halves = filled::<u16>(src.len(), |out| sse2::widen_8_to_16(src, out, signed));
        widen16(&halves, signed)
    };
    Some(match storage {
        TensorStorage::Int8(v) => widen8(view(v), true),
        TensorStorage::Uint8(v) => widen8(v, false),
        TensorStorage::Int16(v) => widen16(view(v), true),
        TensorStorage::Uint16(v) => widen16(v, false),
        TensorStorage::Int32(v) => v.clone(),
        TensorStorage::Uint32(v) => view::<u32, i32>(v).to_vec(),
        _ => return None,
    })
}

#[cfg(target_arch = "x86_64")]
fn simd_convert(storage: &TensorStorage, to: ElementType) -> Option<TensorStorage> {
    use ElementType as E;
    use TensorStorage as S;

    // uint32 keeps values above i32::MAX, so it takes the lane loop.
    let narrow_int = matches!(to, E::Int8 | E::Uint8 | E::Int16 | E::Uint16 | E::Int32);

    match (storage, to) {
        (S::Float32(v), E::Float64) => Some(S::Float64(filled(v.len(), |o| sse2::f32_to_f64(v, o)))),
        (S::Float64(v), E::Float32) => Some(S::Float32(filled(v.len(), |o| sse2::f64_to_f32(v, o)))),
        (S::Float32(v), _) if narrow_int => {
            from_i32_lanes(filled(v.len(), |o| sse2::f32_to_i32(v, o)), to)
        }
        (S::Float64(v), _) if narrow_int => {
            from_i32_lanes(filled(v.len(), |o| sse2::f64_to_i32(v, o)), to)
        }
        (S::Int8(v), E::Int16 | E::Uint16) => {
            from_u16_lanes(filled(v.len(), |o| sse2::widen_8_to_16(view(v), o, true)), to)
        }
        (S::Uint8(v), E::Int16 | E::Uint16) => {
            from_u16_lanes(filled(v.len(), |o| sse2::widen_8_to_16(v, o, false)), to)
        }
        (S::Int16(v), E::Int8 | E::Uint8) => narrow_16(view(v), to),
        (S::Uint16(v), E::Int8 | E::Uint8) => narrow_16(v, to),
        (S::Int32(v), E::Int16 | E::Uint16) => {
            from_u16_lanes(filled(v.len(), |o| sse2::narrow_32_to_16(view(v), o)), to)
        }
        (S::Uint32(v), E::Int16 | E::Uint16) => {
            from_u16_lanes(filled(v.len(), |o| sse2::narrow_32_to_16(v, o)), to)
        }
        (_, E::Int32 | E::Uint32 | E::Float32 | E::Float64) => {
            let bits = widen_to_i32(storage)?;
            match to {
                E::Float32 => Some(S::Float32(filled(bits.len(), |o| sse2::i32_to_f32(&bits, o)))),
                E::Float64 => Some(S::Float64(filled(bits.len(), |o| sse2::i32_to_f64(&bits, o)))),
                _ => from_i32_lanes(bits, to),
            }
        }
        _ => None,
    }
}

#[cfg(target_arch = "x86_64")]
fn narrow_16(src: &[u16], to: ElementType) -> Option<TensorStorage> {
    let bytes = filled::<u8>(src.len(), |o| sse2::narrow_16_to_8(src, o));
    Some(match to {
        ElementType::Uint8 => TensorStorage::Uint8(bytes),
        ElementType::Int8 => TensorStorage::Int8(bytes.iter().map(|&x| x as i8).collect()),
        _ => return None,
    })
}

/// Returns false when no kernel covers this combination.
#[cfg(target_arch = "x86_64")]
fn simd_apply(storage: &mut TensorStorage, op: ArithOp, operand: TensorValue) -> bool {
    use ArithOp::{Add, Div, Mul};
    use TensorStorage as S;
    use TensorValue as V;

    match (storage, op, operand) {
        (S::Float32(v), Add, V::Float32(c)) => sse2::add_f32(v, c),
        (S::Float32(v), Mul, V::Float32(c)) => sse2::mul_f32(v, c),
        (S::Float32(v), Div, V::Float32(c)) => sse2::div_f32(v, c),
        (S::Float64(v), Add, V::Float64(c)) => sse2::add_f64(v, c),
        (S::Float64(v), Mul, V::Float64(c)) => sse2::mul_f64(v, c),
        (S::Float64(v), Div, V::Float64(c)) => sse2::div_f64(v, c),
        (S::Int8(v), Add, V::Int8(c)) => sse2::add_u8(view_mut(v), c as u8),
        (S::Uint8(v), Add, V::Uint8(c)) => sse2::add_u8(v, c),
        (S::Int16(v), Add, V::Int16(c)) => sse2::add_u16(view_mut(v), c as u16),
        (S::Uint16(v), Add, V::Uint16(c)) => sse2::add_u16(v, c),
        (S::Int32(v), Add, V::Int32(c)) => sse2::add_u32(view_mut(v), c as u32),
        (S::Uint32(v), Add, V::Uint32(c)) => sse2::add_u32(v, c),
        (S::Int64(v), Add, V::Int64(c)) => sse2::add_u64(view_mut(v), c as u64),
        (S::Uint64(v), Add, V::Uint64(c)) => sse2::add_u64(v, c),
        (S::Int8(v), Mul, V::Int8(c)) => sse2::mul_u8(view_mut(v), c as u8),
        (S::Uint8(v), Mul, V::Uint8(c)) => sse2::mul_u8(v, c),
        (S::Int16(v), Mul, V::Int16(c)) => sse2::mul_u16(view_mut(v), c as u16),
        (S::Uint16(v), Mul, V::Uint16(c)) => sse2::mul_u16(v, c),
        (S::Int32(v), Mul, V::Int32(c)) => sse2::mul_u32(view_mut(v), c as u32),
        (S::Uint32(v), Mul, V::Uint32(c)) => sse2::mul_u32(v, c),
        _ => return false,
    }
    true
}

#[cfg(not(target_arch = "x86_64"))]
fn simd_convert(_: &TensorStorage, _: ElementType) -> Option<TensorStorage> {
    None
}

#[cfg(not(target_arch = "x86_64"))]
fn simd_apply(_: &mut TensorStorage, _: ArithOp, _: TensorValue) -> bool {
    false
}
