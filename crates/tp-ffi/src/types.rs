use tp_tensor::{Dimension, ElementType, ErrorCategory, StreamConfig, TensorInfo};

/// Status codes returned by all FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TPStatus {
    Ok = 0,
    ErrorInvalidArgument = 1,
    ErrorConfiguration = 2,
    ErrorNegotiation = 3,
    ErrorNotReady = 4,
    ErrorProcessing = 5,
    ErrorInternal = 6,
}

impl From<ErrorCategory> for TPStatus {
    fn from(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Configuration => TPStatus::ErrorConfiguration,
            ErrorCategory::Negotiation => TPStatus::ErrorNegotiation,
            ErrorCategory::NotReady => TPStatus::ErrorNotReady,
            ErrorCategory::Processing => TPStatus::ErrorProcessing,
        }
    }
}

/// Tensor element type selector.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TPElementType {
    Int8 = 0,
    Uint8 = 1,
    Int16 = 2,
    Uint16 = 3,
    Int32 = 4,
    Uint32 = 5,
    Int64 = 6,
    Uint64 = 7,
    Float32 = 8,
    Float64 = 9,
}

impl From<TPElementType> for ElementType {
    fn from(ty: TPElementType) -> Self {
        match ty {
            TPElementType::Int8 => ElementType::Int8,
            TPElementType::Uint8 => ElementType::Uint8,
            TPElementType::Int16 => ElementType::Int16,
            TPElementType::Uint16 => ElementType::Uint16,
            TPElementType::Int32 => ElementType::Int32,
            TPElementType::Uint32 => ElementType::Uint32,
            TPElementType::Int64 => ElementType::Int64,
            TPElementType::Uint64 => ElementType::Uint64,
            TPElementType::Float32 => ElementType::Float32,
            TPElementType::Float64 => ElementType::Float64,
        }
    }
}

impl From<ElementType> for TPElementType {
    fn from(ty: ElementType) -> Self {
        match ty {
            ElementType::Int8 => TPElementType::Int8,
            ElementType::Uint8 => TPElementType::Uint8,
            ElementType::Int16 => TPElementType::Int16,
            ElementType::Uint16 => TPElementType::Uint16,
            ElementType::Int32 => TPElementType::Int32,
            ElementType::Uint32 => TPElementType::Uint32,
            ElementType::Int64 => TPElementType::Int64,
            ElementType::Uint64 => TPElementType::Uint64,
            ElementType::Float32 => TPElementType::Float32,
            ElementType::Float64 => TPElementType::Float64,
        }
    }
}

/// Negotiated configuration of one stream: element type, four axes
/// (unused axes are 1) and frame rate (`0/1` for variable rate).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TPTensorConfig {
    pub element_type: TPElementType,
    pub dims: [u32; 4],
    pub rate_n: i32,
    pub rate_d: i32,
}

impl TPTensorConfig {
    pub fn to_stream_config(&self) -> tp_tensor::Result<StreamConfig> {
        let info = TensorInfo::new(self.element_type.into(), Dimension::new(self.dims)?);
        Ok(StreamConfig::with_rate(info, self.rate_n, self.rate_d))
    }
}

impl From<&StreamConfig> for TPTensorConfig {
    fn from(config: &StreamConfig) -> Self {
        TPTensorConfig {
            element_type: config.info.element_type.into(),
            dims: *config.info.dimension.dims(),
            rate_n: config.rate_n,
            rate_d: config.rate_d,
        }
    }
}
