use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TensorError};

/// Element types a tensor stream can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
}

impl ElementType {
    /// Every element type, in canonical order.
    pub const ALL: [ElementType; 10] = [
        ElementType::Int8,
        ElementType::Uint8,
        ElementType::Int16,
        ElementType::Uint16,
        ElementType::Int32,
        ElementType::Uint32,
        ElementType::Int64,
        ElementType::Uint64,
        ElementType::Float32,
        ElementType::Float64,
    ];

    /// Returns the size in bytes of a single element.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            ElementType::Int8 | ElementType::Uint8 => 1,
            ElementType::Int16 | ElementType::Uint16 => 2,
            ElementType::Int32 | ElementType::Uint32 | ElementType::Float32 => 4,
            ElementType::Int64 | ElementType::Uint64 | ElementType::Float64 => 8,
        }
    }

    /// Returns the canonical lowercase name used in capabilities and options.
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Int8 => "int8",
            ElementType::Uint8 => "uint8",
            ElementType::Int16 => "int16",
            ElementType::Uint16 => "uint16",
            ElementType::Int32 => "int32",
            ElementType::Uint32 => "uint32",
            ElementType::Int64 => "int64",
            ElementType::Uint64 => "uint64",
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
        }
    }

    /// Looks up an element type by its canonical name. Matching is
    /// case-sensitive.
    pub fn parse_name(name: &str) -> Result<ElementType> {
        ElementType::ALL
            .iter()
            .copied()
            .find(|t| t.name() == name)
            .ok_or_else(|| TensorError::UnknownType(name.to_string()))
    }

    /// Returns true for `float32` and `float64`.
    pub fn is_float(&self) -> bool {
        matches!(self, ElementType::Float32 | ElementType::Float64)
    }

    /// Returns true for the signed integer types.
    pub fn is_signed_integer(&self) -> bool {
        matches!(
            self,
            ElementType::Int8 | ElementType::Int16 | ElementType::Int32 | ElementType::Int64
        )
    }
}

impl FromStr for ElementType {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self> {
        ElementType::parse_name(s)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_in_bytes() {
        assert_eq!(ElementType::Int8.size_in_bytes(), 1);
        assert_eq!(ElementType::Uint16.size_in_bytes(), 2);
        assert_eq!(ElementType::Float32.size_in_bytes(), 4);
        assert_eq!(ElementType::Uint32.size_in_bytes(), 4);
        assert_eq!(ElementType::Int64.size_in_bytes(), 8);
        assert_eq!(ElementType::Float64.size_in_bytes(), 8);
    }

    #[test]
    fn test_name_roundtrip() {
        for ty in ElementType::ALL {
            assert_eq!(ElementType::parse_name(ty.name()).unwrap(), ty);
            assert_eq!(ty.to_string(), ty.name());
        }
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            ElementType::parse_name("float16"),
            Err(TensorError::UnknownType("float16".to_string()))
        );
        assert!(ElementType::parse_name("").is_err());
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!(ElementType::parse_name("UINT8").is_err());
        assert!("Float32".parse::<ElementType>().is_err());
        assert_eq!("float32".parse::<ElementType>().unwrap(), ElementType::Float32);
    }

    #[test]
    fn test_classification() {
        assert!(ElementType::Float64.is_float());
        assert!(!ElementType::Uint64.is_float());
        assert!(ElementType::Int16.is_signed_integer());
        assert!(!ElementType::Uint16.is_signed_integer());
        assert!(!ElementType::Float32.is_signed_integer());
    }
}
