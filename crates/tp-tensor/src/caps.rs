use std::fmt;

use crate::dimension::{Dimension, RANK_LIMIT};
use crate::dtype::ElementType;
use crate::error::{Result, TensorError};
use crate::info::{StreamConfig, TensorInfo};

/// Which side of an element a capability describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Buffers flowing into the element (sink side).
    Input,
    /// Buffers produced by the element (source side).
    Output,
}

impl Direction {
    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Input => Direction::Output,
            Direction::Output => Direction::Input,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single capability field: unconstrained, or pinned to one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CapsField<T> {
    #[default]
    Any,
    Fixed(T),
}

impl<T: PartialEq + Copy> CapsField<T> {
    /// Field-wise intersection. `None` means the intersection is empty.
    pub fn intersect(&self, other: &CapsField<T>) -> Option<CapsField<T>> {
        match (self, other) {
            (CapsField::Any, x) | (x, CapsField::Any) => Some(*x),
            (CapsField::Fixed(a), CapsField::Fixed(b)) if a == b => Some(CapsField::Fixed(*a)),
            _ => None,
        }
    }

    pub fn fixed(&self) -> Option<T> {
        match self {
            CapsField::Any => None,
            CapsField::Fixed(v) => Some(*v),
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, CapsField::Fixed(_))
    }
}

/// Stream capability of a tensor pad: rank, element type, four axes and an
/// optional frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TensorCaps {
    pub rank: CapsField<usize>,
    pub element_type: CapsField<ElementType>,
    pub dims: [CapsField<u32>; RANK_LIMIT],
    /// Frame rate as a reduced `(numerator, denominator)` pair.
    pub framerate: CapsField<(i32, i32)>,
}

impl TensorCaps {
    /// The unconstrained template capability.
    pub fn any() -> Self {
        TensorCaps::default()
    }

    /// Capability pinned to `info`; the frame rate stays unconstrained.
    pub fn from_info(info: &TensorInfo) -> Self {
        let d = info.dimension.dims();
        TensorCaps {
            rank: CapsField::Fixed(info.dimension.rank()),
            element_type: CapsField::Fixed(info.element_type),
            dims: [
                CapsField::Fixed(d[0]),
                CapsField::Fixed(d[1]),
                CapsField::Fixed(d[2]),
                CapsField::Fixed(d[3]),
            ],
            framerate: CapsField::Any,
        }
    }

    /// Capability pinned to `config`, frame rate included. Fails when the
    /// frame rate has a zero denominator or its reduced form does not fit
    /// in `i32`.
    pub fn from_config(config: &StreamConfig) -> Result<Self> {
        Ok(TensorCaps {
            framerate: CapsField::Fixed(reduce_fraction(config.rate_n, config.rate_d)?),
            ..TensorCaps::from_info(&config.info)
        })
    }

    pub fn with_element_type(mut self, element_type: CapsField<ElementType>) -> Self {
        self.element_type = element_type;
        self
    }

    /// Intersect two capabilities. Returns `None` when any field conflicts.
    pub fn intersect(&self, other: &TensorCaps) -> Option<TensorCaps> {
        let mut dims = [CapsField::Any; RANK_LIMIT];
        for (i, dim) in dims.iter_mut().enumerate() {
            *dim = self.dims[i].intersect(&other.dims[i])?;
        }
        Some(TensorCaps {
            rank: self.rank.intersect(&other.rank)?,
            element_type: self.element_type.intersect(&other.element_type)?,
            dims,
            framerate: self.framerate.intersect(&other.framerate)?,
        })
    }

    /// Returns true when rank, type and all four axes are pinned.
    pub fn is_fixed(&self) -> bool {
        self.rank.is_fixed()
            && self.element_type.is_fixed()
            && self.dims.iter().all(CapsField::is_fixed)
    }

    /// Converts a fixed capability into a stream config. An unconstrained
    /// frame rate becomes 0/1.
    pub fn to_stream_config(&self) -> Option<StreamConfig> {
        let element_type = self.element_type.fixed()?;
        let mut axes = [1u32; RANK_LIMIT];
        for (axis, field) in axes.iter_mut().zip(self.dims.iter()) {
            *axis = field.fixed()?;
        }
        let dimension = Dimension::new(axes).ok()?;
        if self.rank.fixed()? != dimension.rank() {
            return None;
        }
        let (rate_n, rate_d) = self.framerate.fixed().unwrap_or((0, 1));
        Some(StreamConfig::with_rate(
            TensorInfo::new(element_type, dimension),
            rate_n,
            rate_d,
        ))
    }
}

/// Lowest terms with a positive denominator; `0/d` becomes `0/1`.
fn reduce_fraction(n: i32, d: i32) -> Result<(i32, i32)> {
    let invalid = || TensorError::InvalidFramerate {
        numerator: n,
        denominator: d,
    };
    if n == 0 {
        return Ok((0, 1));
    }
    if d == 0 {
        return Err(invalid());
    }
    let mut a = n.unsigned_abs();
    let mut b = d.unsigned_abs();
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    let g = i64::from(a);
    let sign: i64 = if d < 0 { -1 } else { 1 };
    let n = i32::try_from(sign * i64::from(n) / g).map_err(|_| invalid())?;
    let d = i32::try_from(sign * i64::from(d) / g).map_err(|_| invalid())?;
    Ok((n, d))
}

impl fmt::Display for TensorCaps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "other/tensor")?;
        if let Some(rank) = self.rank.fixed() {
            write!(f, ", rank={}", rank)?;
        }
        if let Some(ty) = self.element_type.fixed() {
            write!(f, ", type={}", ty)?;
        }
        for (i, dim) in self.dims.iter().enumerate() {
            if let Some(d) = dim.fixed() {
                write!(f, ", dim{}={}", i + 1, d)?;
            }
        }
        if let Some((n, d)) = self.framerate.fixed() {
            write!(f, ", framerate={}/{}", n, d)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(ty: ElementType, dims: &str) -> TensorInfo {
        TensorInfo::new(ty, Dimension::parse(dims).unwrap())
    }

    #[test]
    fn test_any_intersect_is_identity() {
        let caps = TensorCaps::from_info(&info(ElementType::Uint8, "5"));
        assert_eq!(TensorCaps::any().intersect(&caps), Some(caps));
        assert_eq!(caps.intersect(&TensorCaps::any()), Some(caps));
    }

    #[test]
    fn test_conflicting_type_is_empty() {
        let a = TensorCaps::from_info(&info(ElementType::Uint8, "5"));
        let b = TensorCaps::from_info(&info(ElementType::Float32, "5"));
        assert_eq!(a.intersect(&b), None);
    }

    #[test]
    fn test_conflicting_dim_is_empty() {
        let a = TensorCaps::from_info(&info(ElementType::Uint8, "5"));
        let b = TensorCaps::from_info(&info(ElementType::Uint8, "6"));
        assert_eq!(a.intersect(&b), None);
    }

    #[test]
    fn test_partial_caps_narrow() {
        let held = TensorCaps::any().with_element_type(CapsField::Fixed(ElementType::Int16));
        let computed = TensorCaps::from_config(&StreamConfig::with_rate(
            info(ElementType::Int16, "2:2"),
            30,
            1,
        ))
        .unwrap();
        let result = held.intersect(&computed).unwrap();
        assert!(result.is_fixed());
        assert_eq!(result.framerate, CapsField::Fixed((30, 1)));
    }

    #[test]
    fn test_framerate_is_reduced() {
        let rate = |n, d| {
            TensorCaps::from_config(&StreamConfig::with_rate(info(ElementType::Uint8, "1"), n, d))
        };
        let a = rate(60, 2).unwrap();
        let b = rate(30, 1).unwrap();
        assert!(a.intersect(&b).is_some());
        assert_eq!(rate(-30, -2).unwrap().framerate, CapsField::Fixed((15, 1)));
        assert_eq!(rate(15, -2).unwrap().framerate, CapsField::Fixed((-15, 2)));
        assert_eq!(rate(0, 7).unwrap().framerate, CapsField::Fixed((0, 1)));
    }

    #[test]
    fn test_unrepresentable_framerate_is_an_error() {
        let rate = |n, d| {
            TensorCaps::from_config(&StreamConfig::with_rate(info(ElementType::Uint8, "1"), n, d))
        };
        assert_eq!(
            rate(1, i32::MIN),
            Err(TensorError::InvalidFramerate {
                numerator: 1,
                denominator: i32::MIN
            })
        );
        assert!(rate(i32::MIN, -1).is_err());
        assert!(rate(5, 0).is_err());
        assert_eq!(rate(2, i32::MIN).unwrap().framerate, CapsField::Fixed((-1, 1 << 30)));
        assert_eq!(
            rate(1, i32::MIN).unwrap_err().category(),
            crate::ErrorCategory::Configuration
        );
    }

    #[test]
    fn test_to_stream_config() {
        let config = StreamConfig::with_rate(info(ElementType::Float64, "3:4"), 15, 1);
        let caps = TensorCaps::from_config(&config).unwrap();
        assert_eq!(caps.to_stream_config(), Some(config));
        assert_eq!(TensorCaps::any().to_stream_config(), None);
    }

    #[test]
    fn test_display() {
        let caps = TensorCaps::from_config(&StreamConfig::new(info(ElementType::Uint8, "5"))).unwrap();
        assert_eq!(
            caps.to_string(),
            "other/tensor, rank=1, type=uint8, dim1=5, dim2=1, dim3=1, dim4=1, framerate=0/1"
        );
        assert_eq!(TensorCaps::any().to_string(), "other/tensor");
    }

    #[test]
    fn test_direction_opposite() {
        assert_eq!(Direction::Input.opposite(), Direction::Output);
        assert_eq!(Direction::Output.to_string(), "output");
    }
}
