use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TensorError};

/// Number of axes every dimension carries.
pub const RANK_LIMIT: usize = 4;

/// Largest size a single axis may have.
pub const MAX_DIMENSION: u32 = 65535;

/// A fixed four-axis tensor shape, innermost axis first.
///
/// Axes beyond the declared rank are 1. Every axis is in `[1, MAX_DIMENSION]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimension {
    dims: [u32; RANK_LIMIT],
}

impl Dimension {
    /// Create a dimension from four axis sizes.
    pub fn new(dims: [u32; RANK_LIMIT]) -> Result<Self> {
        for (i, &d) in dims.iter().enumerate() {
            if d == 0 || d > MAX_DIMENSION {
                return Err(TensorError::InvalidDimension {
                    input: format_axes(&dims),
                    reason: format!("axis {} is {}, must be in [1, {}]", i, d, MAX_DIMENSION),
                });
            }
        }
        let dimension = Dimension { dims };
        dimension.element_count()?;
        Ok(dimension)
    }

    /// Parse a `d1:d2:d3:d4` string. Missing trailing axes are 1.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: String| TensorError::InvalidDimension {
            input: input.to_string(),
            reason,
        };

        let fields: Vec<&str> = input.split(':').collect();
        if fields.len() > RANK_LIMIT {
            return Err(invalid(format!(
                "{} axes given, at most {} allowed",
                fields.len(),
                RANK_LIMIT
            )));
        }

        let mut dims = [1u32; RANK_LIMIT];
        for (i, field) in fields.iter().enumerate() {
            let field = field.trim();
            let value: u32 = field
                .parse()
                .map_err(|_| invalid(format!("axis {} ({:?}) is not a positive integer", i, field)))?;
            if value == 0 || value > MAX_DIMENSION {
                return Err(invalid(format!(
                    "axis {} is {}, must be in [1, {}]",
                    i, value, MAX_DIMENSION
                )));
            }
            dims[i] = value;
        }

        let dimension = Dimension { dims };
        dimension.element_count()?;
        Ok(dimension)
    }

    /// Returns the size of axis `i` (0 is innermost).
    ///
    /// # Panics
    /// Panics if `i >= RANK_LIMIT`.
    pub fn dim(&self, i: usize) -> u32 {
        self.dims[i]
    }

    /// Returns all four axis sizes.
    pub fn dims(&self) -> &[u32; RANK_LIMIT] {
        &self.dims
    }

    /// Number of significant axes: the 1-based index of the outermost axis
    /// greater than 1, or 1 when every axis is 1.
    pub fn rank(&self) -> usize {
        self.dims
            .iter()
            .rposition(|&d| d > 1)
            .map(|i| i + 1)
            .unwrap_or(1)
    }

    /// Total number of elements (product of all axes). Fails when the
    /// product does not fit in `usize`.
    pub fn element_count(&self) -> Result<usize> {
        self.dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d as usize))
            .ok_or_else(|| TensorError::InvalidDimension {
                input: self.to_string(),
                reason: "element count overflows usize".to_string(),
            })
    }
}

impl Default for Dimension {
    fn default() -> Self {
        Dimension {
            dims: [1; RANK_LIMIT],
        }
    }
}

fn format_axes(dims: &[u32]) -> String {
    dims.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(":")
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_axes(&self.dims))
    }
}

impl FromStr for Dimension {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self> {
        Dimension::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_axis() {
        let d = Dimension::parse("5").unwrap();
        assert_eq!(d.dims(), &[5, 1, 1, 1]);
        assert_eq!(d.rank(), 1);
        assert_eq!(d.element_count().unwrap(), 5);
    }

    #[test]
    fn test_parse_full() {
        let d = Dimension::parse("3:224:224:1").unwrap();
        assert_eq!(d.dims(), &[3, 224, 224, 1]);
        assert_eq!(d.rank(), 3);
        assert_eq!(d.element_count().unwrap(), 3 * 224 * 224);
    }

    #[test]
    fn test_rank_ignores_trailing_ones() {
        assert_eq!(Dimension::parse("1:1:1:1").unwrap().rank(), 1);
        assert_eq!(Dimension::parse("1:7").unwrap().rank(), 2);
        assert_eq!(Dimension::parse("2:1:1:9").unwrap().rank(), 4);
        assert_eq!(Dimension::parse("2:3:1:1").unwrap().rank(), 2);
    }

    #[test]
    fn test_parse_too_many_axes() {
        assert!(matches!(
            Dimension::parse("1:2:3:4:5"),
            Err(TensorError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn test_parse_out_of_range() {
        assert!(Dimension::parse("0").is_err());
        assert!(Dimension::parse("65536").is_err());
        assert!(Dimension::parse("65535").is_ok());
        assert!(Dimension::parse("-3").is_err());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(Dimension::parse("").is_err());
        assert!(Dimension::parse("3::4").is_err());
        assert!(Dimension::parse("a:b").is_err());
        assert!(Dimension::parse("2.5").is_err());
    }

    #[test]
    fn test_parse_trims_fields() {
        let d = Dimension::parse(" 3 : 4 ").unwrap();
        assert_eq!(d.dims(), &[3, 4, 1, 1]);
    }

    #[test]
    fn test_new_validates() {
        assert!(Dimension::new([1, 2, 3, 4]).is_ok());
        assert!(Dimension::new([1, 0, 3, 4]).is_err());
        assert!(Dimension::new([70000, 1, 1, 1]).is_err());
    }

    #[test]
    fn test_display() {
        let d = Dimension::parse("10:2").unwrap();
        assert_eq!(d.to_string(), "10:2:1:1");
        assert_eq!(Dimension::default().to_string(), "1:1:1:1");
    }
}
