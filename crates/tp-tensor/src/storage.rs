use crate::dtype::ElementType;
use crate::error::{Result, TensorError};
use crate::value::TensorValue;

/// Typed, owned element storage for one buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorStorage {
    Int8(Vec<i8>),
    Uint8(Vec<u8>),
    Int16(Vec<i16>),
    Uint16(Vec<u16>),
    Int32(Vec<i32>),
    Uint32(Vec<u32>),
    Int64(Vec<i64>),
    Uint64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

macro_rules! decode {
    ($t:ty, $bytes:expr) => {
        $bytes
            .chunks_exact(std::mem::size_of::<$t>())
            .map(|c| {
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(c);
                <$t>::from_ne_bytes(raw)
            })
            .collect()
    };
}

macro_rules! encode {
    ($v:expr) => {{
        let mut out = Vec::with_capacity(std::mem::size_of_val(&$v[..]));
        for x in $v.iter() {
            out.extend_from_slice(&x.to_ne_bytes());
        }
        out
    }};
}

macro_rules! for_each_variant {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            TensorStorage::Int8($v) => $body,
            TensorStorage::Uint8($v) => $body,
            TensorStorage::Int16($v) => $body,
            TensorStorage::Uint16($v) => $body,
            TensorStorage::Int32($v) => $body,
            TensorStorage::Uint32($v) => $body,
            TensorStorage::Int64($v) => $body,
            TensorStorage::Uint64($v) => $body,
            TensorStorage::Float32($v) => $body,
            TensorStorage::Float64($v) => $body,
        }
    };
}

impl TensorStorage {
    /// Decode a native-endian byte buffer of `ty` elements.
    ///
    /// # Errors
    /// Returns `SizeMismatch` if `bytes` is not a whole number of elements.
    pub fn from_bytes(ty: ElementType, bytes: &[u8]) -> Result<Self> {
        let width = ty.size_in_bytes();
        if bytes.len() % width != 0 {
            return Err(TensorError::SizeMismatch {
                expected: bytes.len() / width * width,
                got: bytes.len(),
            });
        }
        Ok(match ty {
            ElementType::Int8 => TensorStorage::Int8(decode!(i8, bytes)),
            ElementType::Uint8 => TensorStorage::Uint8(bytes.to_vec()),
            ElementType::Int16 => TensorStorage::Int16(decode!(i16, bytes)),
            ElementType::Uint16 => TensorStorage::Uint16(decode!(u16, bytes)),
            ElementType::Int32 => TensorStorage::Int32(decode!(i32, bytes)),
            ElementType::Uint32 => TensorStorage::Uint32(decode!(u32, bytes)),
            ElementType::Int64 => TensorStorage::Int64(decode!(i64, bytes)),
            ElementType::Uint64 => TensorStorage::Uint64(decode!(u64, bytes)),
            ElementType::Float32 => TensorStorage::Float32(decode!(f32, bytes)),
            ElementType::Float64 => TensorStorage::Float64(decode!(f64, bytes)),
        })
    }

    /// Build storage of type `ty` from element values, converting each one.
    pub fn from_values(ty: ElementType, values: impl IntoIterator<Item = TensorValue>) -> Self {
        let mut storage = TensorStorage::empty(ty);
        for value in values {
            storage.push(value.cast(ty));
        }
        storage
    }

    /// Create empty storage of type `ty`.
    pub fn empty(ty: ElementType) -> Self {
        match ty {
            ElementType::Int8 => TensorStorage::Int8(Vec::new()),
            ElementType::Uint8 => TensorStorage::Uint8(Vec::new()),
            ElementType::Int16 => TensorStorage::Int16(Vec::new()),
            ElementType::Uint16 => TensorStorage::Uint16(Vec::new()),
            ElementType::Int32 => TensorStorage::Int32(Vec::new()),
            ElementType::Uint32 => TensorStorage::Uint32(Vec::new()),
            ElementType::Int64 => TensorStorage::Int64(Vec::new()),
            ElementType::Uint64 => TensorStorage::Uint64(Vec::new()),
            ElementType::Float32 => TensorStorage::Float32(Vec::new()),
            ElementType::Float64 => TensorStorage::Float64(Vec::new()),
        }
    }

    /// Append a value that already has this storage's type. Values of other
    /// types are converted first.
    pub fn push(&mut self, value: TensorValue) {
        let value = value.cast(self.element_type());
        match (self, value) {
            (TensorStorage::Int8(v), TensorValue::Int8(x)) => v.push(x),
            (TensorStorage::Uint8(v), TensorValue::Uint8(x)) => v.push(x),
            (TensorStorage::Int16(v), TensorValue::Int16(x)) => v.push(x),
            (TensorStorage::Uint16(v), TensorValue::Uint16(x)) => v.push(x),
            (TensorStorage::Int32(v), TensorValue::Int32(x)) => v.push(x),
            (TensorStorage::Uint32(v), TensorValue::Uint32(x)) => v.push(x),
            (TensorStorage::Int64(v), TensorValue::Int64(x)) => v.push(x),
            (TensorStorage::Uint64(v), TensorValue::Uint64(x)) => v.push(x),
            (TensorStorage::Float32(v), TensorValue::Float32(x)) => v.push(x),
            (TensorStorage::Float64(v), TensorValue::Float64(x)) => v.push(x),
            _ => {}
        }
    }

    /// Returns the element at `i`, or `None` past the end.
    pub fn get(&self, i: usize) -> Option<TensorValue> {
        match self {
            TensorStorage::Int8(v) => v.get(i).map(|&x| TensorValue::Int8(x)),
            TensorStorage::Uint8(v) => v.get(i).map(|&x| TensorValue::Uint8(x)),
            TensorStorage::Int16(v) => v.get(i).map(|&x| TensorValue::Int16(x)),
            TensorStorage::Uint16(v) => v.get(i).map(|&x| TensorValue::Uint16(x)),
            TensorStorage::Int32(v) => v.get(i).map(|&x| TensorValue::Int32(x)),
            TensorStorage::Uint32(v) => v.get(i).map(|&x| TensorValue::Uint32(x)),
            TensorStorage::Int64(v) => v.get(i).map(|&x| TensorValue::Int64(x)),
            TensorStorage::Uint64(v) => v.get(i).map(|&x| TensorValue::Uint64(x)),
            TensorStorage::Float32(v) => v.get(i).map(|&x| TensorValue::Float32(x)),
            TensorStorage::Float64(v) => v.get(i).map(|&x| TensorValue::Float64(x)),
        }
    }

    /// Iterate over the elements as tagged values.
    pub fn values(&self) -> impl Iterator<Item = TensorValue> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Encode the elements as native-endian bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        for_each_variant!(self, v => encode!(v))
    }

    /// Number of elements in this storage.
    pub fn len(&self) -> usize {
        for_each_variant!(self, v => v.len())
    }

    /// Returns true if the storage contains no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element type of this storage.
    pub fn element_type(&self) -> ElementType {
        match self {
            TensorStorage::Int8(_) => ElementType::Int8,
            TensorStorage::Uint8(_) => ElementType::Uint8,
            TensorStorage::Int16(_) => ElementType::Int16,
            TensorStorage::Uint16(_) => ElementType::Uint16,
            TensorStorage::Int32(_) => ElementType::Int32,
            TensorStorage::Uint32(_) => ElementType::Uint32,
            TensorStorage::Int64(_) => ElementType::Int64,
            TensorStorage::Uint64(_) => ElementType::Uint64,
            TensorStorage::Float32(_) => ElementType::Float32,
            TensorStorage::Float64(_) => ElementType::Float64,
        }
    }
}
