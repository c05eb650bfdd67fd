//! Dense host tensors exchanged across the host/provider boundary.
//!
//! A [`Tensor`] is a shape plus typed element storage. Providers receive
//! tensors read-only as kernel inputs and write results into tensors the
//! execution context allocates for them.

use crate::error::{ProviderError, Result};

/// Element types a tensor can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 32-bit IEEE 754 floating point.
    F32,
    /// 64-bit IEEE 754 floating point.
    F64,
    /// 8-bit signed integer.
    I8,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 8-bit unsigned integer.
    U8,
    /// 32-bit unsigned integer.
    U32,
    /// Boolean.
    Bool,
}

impl DataType {
    /// Size of one element in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            DataType::F32 | DataType::I32 | DataType::U32 => 4,
            DataType::F64 | DataType::I64 => 8,
            DataType::I8 | DataType::U8 | DataType::Bool => 1,
        }
    }
}

/// Typed element storage backing a [`Tensor`].
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    /// 32-bit float elements.
    F32(Vec<f32>),
    /// 64-bit float elements.
    F64(Vec<f64>),
    /// 8-bit signed integer elements.
    I8(Vec<i8>),
    /// 32-bit signed integer elements.
    I32(Vec<i32>),
    /// 64-bit signed integer elements.
    I64(Vec<i64>),
    /// 8-bit unsigned integer elements.
    U8(Vec<u8>),
    /// 32-bit unsigned integer elements.
    U32(Vec<u32>),
    /// Boolean elements.
    Bool(Vec<bool>),
}

impl TensorData {
    fn len(&self) -> usize {
        match self {
            TensorData::F32(v) => v.len(),
            TensorData::F64(v) => v.len(),
            TensorData::I8(v) => v.len(),
            TensorData::I32(v) => v.len(),
            TensorData::I64(v) => v.len(),
            TensorData::U8(v) => v.len(),
            TensorData::U32(v) => v.len(),
            TensorData::Bool(v) => v.len(),
        }
    }

    fn dtype(&self) -> DataType {
        match self {
            TensorData::F32(_) => DataType::F32,
            TensorData::F64(_) => DataType::F64,
            TensorData::I8(_) => DataType::I8,
            TensorData::I32(_) => DataType::I32,
            TensorData::I64(_) => DataType::I64,
            TensorData::U8(_) => DataType::U8,
            TensorData::U32(_) => DataType::U32,
            TensorData::Bool(_) => DataType::Bool,
        }
    }
}

/// A dense host tensor: a shape plus typed element storage in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: TensorData,
}

impl Tensor {
    /// Create a tensor from typed storage and a shape.
    ///
    /// Fails when the element count implied by the shape does not match the
    /// storage length.
    pub fn new(data: TensorData, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(ProviderError::invalid_argument(format!(
                "data length {} does not match shape {:?} ({} elements)",
                data.len(),
                shape,
                expected
            )));
        }
        Ok(Self { shape, data })
    }

    /// Create an F32 tensor from raw values.
    pub fn from_f32(data: Vec<f32>, shape: Vec<usize>) -> Result<Self> {
        Self::new(TensorData::F32(data), shape)
    }

    /// Create an I32 tensor from raw values.
    pub fn from_i32(data: Vec<i32>, shape: Vec<usize>) -> Result<Self> {
        Self::new(TensorData::I32(data), shape)
    }

    /// Create an I64 tensor from raw values.
    pub fn from_i64(data: Vec<i64>, shape: Vec<usize>) -> Result<Self> {
        Self::new(TensorData::I64(data), shape)
    }

    /// Create a zero-filled tensor of the given shape and element type.
    pub fn zeros(shape: Vec<usize>, dtype: DataType) -> Self {
        let numel: usize = shape.iter().product();
        let data = match dtype {
            DataType::F32 => TensorData::F32(vec![0.0; numel]),
            DataType::F64 => TensorData::F64(vec![0.0; numel]),
            DataType::I8 => TensorData::I8(vec![0; numel]),
            DataType::I32 => TensorData::I32(vec![0; numel]),
            DataType::I64 => TensorData::I64(vec![0; numel]),
            DataType::U8 => TensorData::U8(vec![0; numel]),
            DataType::U32 => TensorData::U32(vec![0; numel]),
            DataType::Bool => TensorData::Bool(vec![false; numel]),
        };
        Self { shape, data }
    }

    /// Shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Element type of the tensor.
    pub fn dtype(&self) -> DataType {
        self.data.dtype()
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Borrow the elements as an F32 slice.
    ///
    /// Fails when the tensor holds a different element type.
    pub fn as_f32(&self) -> Result<&[f32]> {
        match &self.data {
            TensorData::F32(v) => Ok(v),
            other => Err(ProviderError::fail(format!(
                "expected F32 elements, tensor holds {:?}",
                other.dtype()
            ))),
        }
    }

    /// Borrow the elements as a mutable F32 slice.
    pub fn as_f32_mut(&mut self) -> Result<&mut [f32]> {
        match &mut self.data {
            TensorData::F32(v) => Ok(v),
            other => Err(ProviderError::fail(format!(
                "expected F32 elements, tensor holds {:?}",
                other.dtype()
            ))),
        }
    }
}
