use std::fmt;

use crate::dimension::Dimension;
use crate::dtype::ElementType;
use crate::error::{Result, TensorError};

/// Element type plus shape of every buffer in a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorInfo {
    pub element_type: ElementType,
    pub dimension: Dimension,
}

impl TensorInfo {
    pub fn new(element_type: ElementType, dimension: Dimension) -> Self {
        TensorInfo {
            element_type,
            dimension,
        }
    }

    /// Number of elements in one buffer.
    pub fn element_count(&self) -> Result<usize> {
        self.dimension.element_count()
    }

    /// Size in bytes of one buffer: product of axes times element width.
    /// Fails when the size does not fit in `usize`.
    pub fn byte_size(&self) -> Result<usize> {
        self.element_count()?
            .checked_mul(self.element_type.size_in_bytes())
            .ok_or_else(|| TensorError::InvalidDimension {
                input: self.dimension.to_string(),
                reason: format!("{} buffer size overflows usize", self.element_type),
            })
    }

    /// Returns the same shape with a different element type.
    pub fn with_type(&self, element_type: ElementType) -> TensorInfo {
        TensorInfo {
            element_type,
            dimension: self.dimension,
        }
    }

    /// Checks that a buffer of `len` bytes matches this info.
    pub fn check_buffer(&self, len: usize) -> Result<()> {
        let expected = self.byte_size()?;
        if len != expected {
            return Err(TensorError::SizeMismatch { expected, got: len });
        }
        Ok(())
    }
}

impl fmt::Display for TensorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.element_type, self.dimension)
    }
}

/// Negotiated configuration of one stream direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamConfig {
    pub info: TensorInfo,
    /// Frame rate numerator; 0 means variable rate.
    pub rate_n: i32,
    pub rate_d: i32,
}

impl StreamConfig {
    /// Create a config with a variable (0/1) frame rate.
    pub fn new(info: TensorInfo) -> Self {
        StreamConfig {
            info,
            rate_n: 0,
            rate_d: 1,
        }
    }

    pub fn with_rate(info: TensorInfo, rate_n: i32, rate_d: i32) -> Self {
        StreamConfig {
            info,
            rate_n,
            rate_d,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_size() {
        let info = TensorInfo::new(ElementType::Uint8, Dimension::parse("5").unwrap());
        assert_eq!(info.byte_size().unwrap(), 5);
        assert_eq!(info.with_type(ElementType::Uint32).byte_size().unwrap(), 20);
        assert_eq!(info.with_type(ElementType::Float64).byte_size().unwrap(), 40);
    }

    #[test]
    fn test_byte_size_multi_axis() {
        let info = TensorInfo::new(ElementType::Float32, Dimension::parse("3:224:224").unwrap());
        assert_eq!(info.element_count().unwrap(), 150528);
        assert_eq!(info.byte_size().unwrap(), 602112);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_byte_size_overflow_is_an_error() {
        let largest = Dimension::parse("65535:65535:65535:65535").unwrap();
        let info = TensorInfo::new(ElementType::Uint8, largest);
        assert_eq!(info.byte_size().unwrap(), 65535usize.pow(4));

        let wide = info.with_type(ElementType::Float64);
        assert!(matches!(wide.byte_size(), Err(TensorError::InvalidDimension { .. })));
        assert!(wide.check_buffer(0).is_err());
        assert_eq!(wide.byte_size().unwrap_err().category(), crate::ErrorCategory::Configuration);
    }

    #[test]
    fn test_check_buffer() {
        let info = TensorInfo::new(ElementType::Int16, Dimension::parse("4").unwrap());
        assert!(info.check_buffer(8).is_ok());
        assert_eq!(
            info.check_buffer(4),
            Err(TensorError::SizeMismatch {
                expected: 8,
                got: 4
            })
        );
    }

    #[test]
    fn test_stream_config_default_rate() {
        let info = TensorInfo::new(ElementType::Uint8, Dimension::default());
        let config = StreamConfig::new(info);
        assert_eq!((config.rate_n, config.rate_d), (0, 1));
    }

    #[test]
    fn test_display() {
        let info = TensorInfo::new(ElementType::Int32, Dimension::parse("2:3").unwrap());
        assert_eq!(info.to_string(), "int32[2:3:1:1]");
    }
}
