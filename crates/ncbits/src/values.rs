use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::{ContainerError, ElementType};

/// A decoded variable payload: an n-dimensional array tagged with its element
/// type.
///
/// Payloads are held in standard (row-major) layout; the element order in
/// memory is the logical order of the array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum Values {
    I16(ArrayD<i16>),
    U16(ArrayD<u16>),
    I32(ArrayD<i32>),
    U32(ArrayD<u32>),
    I64(ArrayD<i64>),
    U64(ArrayD<u64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
    Text(ArrayD<u8>),
    Str(ArrayD<String>),
    Opaque {
        /// Byte width of a single element.
        size: usize,
        /// Raw element bytes in logical order.
        data: ArrayD<u8>,
    },
}

impl Values {
    /// Returns the element type of the payload.
    #[must_use]
    pub fn dtype(&self) -> ElementType {
        match self {
            Self::I16(_) => ElementType::I16,
            Self::U16(_) => ElementType::U16,
            Self::I32(_) => ElementType::I32,
            Self::U32(_) => ElementType::U32,
            Self::I64(_) => ElementType::I64,
            Self::U64(_) => ElementType::U64,
            Self::F32(_) => ElementType::F32,
            Self::F64(_) => ElementType::F64,
            Self::Text(_) => ElementType::Text,
            Self::Str(_) => ElementType::Str,
            Self::Opaque { size, .. } => ElementType::Opaque { size: *size },
        }
    }

    /// Returns the logical shape of the payload.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::I16(a) => a.shape(),
            Self::U16(a) => a.shape(),
            Self::I32(a) => a.shape(),
            Self::U32(a) => a.shape(),
            Self::I64(a) => a.shape(),
            Self::U64(a) => a.shape(),
            Self::F32(a) => a.shape(),
            Self::F64(a) => a.shape(),
            Self::Text(a) => a.shape(),
            Self::Str(a) => a.shape(),
            // the trailing byte axis is storage, not shape
            Self::Opaque { data, .. } => &data.shape()[..data.ndim() - 1],
        }
    }

    /// Returns the total number of logical elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    /// Returns whether the payload has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrows the payload as a float32 slice, if it is float32 data in
    /// standard layout.
    #[must_use]
    pub fn as_f32_slice(&self) -> Option<&[f32]> {
        match self {
            Self::F32(a) => a.as_slice(),
            _ => None,
        }
    }

    /// Mutably borrows the payload as a float32 slice, if it is float32 data
    /// in standard layout.
    pub fn as_f32_slice_mut(&mut self) -> Option<&mut [f32]> {
        match self {
            Self::F32(a) => a.as_slice_mut(),
            _ => None,
        }
    }

    /// Serialises the payload to native-endian bytes in logical order.
    ///
    /// # Errors
    ///
    /// Errors with [`ContainerError::UnsupportedType`] for variable-length
    /// string payloads, which have no flat byte image.
    pub fn to_ne_bytes(&self) -> Result<Vec<u8>, ContainerError> {
        fn pod_bytes<T: Copy, const N: usize>(
            a: &ArrayD<T>,
            encode: impl Fn(T) -> [u8; N],
        ) -> Vec<u8> {
            let mut bytes = Vec::with_capacity(a.len() * N);
            for &x in a {
                bytes.extend_from_slice(&encode(x));
            }
            bytes
        }

        match self {
            Self::I16(a) => Ok(pod_bytes(a, i16::to_ne_bytes)),
            Self::U16(a) => Ok(pod_bytes(a, u16::to_ne_bytes)),
            Self::I32(a) => Ok(pod_bytes(a, i32::to_ne_bytes)),
            Self::U32(a) => Ok(pod_bytes(a, u32::to_ne_bytes)),
            Self::I64(a) => Ok(pod_bytes(a, i64::to_ne_bytes)),
            Self::U64(a) => Ok(pod_bytes(a, u64::to_ne_bytes)),
            Self::F32(a) => Ok(pod_bytes(a, f32::to_ne_bytes)),
            Self::F64(a) => Ok(pod_bytes(a, f64::to_ne_bytes)),
            Self::Text(a) | Self::Opaque { data: a, .. } => Ok(a.iter().copied().collect()),
            Self::Str(_) => Err(ContainerError::UnsupportedType {
                dtype: ElementType::Str,
            }),
        }
    }

    /// Reconstructs a payload of the given `dtype` and `shape` from
    /// native-endian bytes in logical order.
    ///
    /// # Errors
    ///
    /// Errors with [`ContainerError::UnsupportedType`] for variable-length
    /// strings and with [`ContainerError::ShapeMismatch`] if the byte length
    /// does not match `shape`.
    pub fn from_ne_bytes(
        dtype: ElementType,
        shape: &[usize],
        bytes: &[u8],
    ) -> Result<Self, ContainerError> {
        fn pod_array<T: Copy, const N: usize>(
            shape: &[usize],
            bytes: &[u8],
            decode: impl Fn([u8; N]) -> T,
        ) -> Result<ArrayD<T>, ContainerError> {
            let count: usize = shape.iter().product();
            if bytes.len() != count * N {
                return Err(ContainerError::ShapeMismatch {
                    expected: count * N,
                    actual: bytes.len(),
                });
            }
            let elems = bytes
                .chunks_exact(N)
                .map(|chunk| {
                    let mut buf = [0_u8; N];
                    buf.copy_from_slice(chunk);
                    decode(buf)
                })
                .collect::<Vec<T>>();
            ArrayD::from_shape_vec(IxDyn(shape), elems)
                .map_err(|_| ContainerError::ShapeMismatch {
                    expected: count,
                    actual: bytes.len() / N,
                })
        }

        match dtype {
            ElementType::I16 => Ok(Self::I16(pod_array(shape, bytes, i16::from_ne_bytes)?)),
            ElementType::U16 => Ok(Self::U16(pod_array(shape, bytes, u16::from_ne_bytes)?)),
            ElementType::I32 => Ok(Self::I32(pod_array(shape, bytes, i32::from_ne_bytes)?)),
            ElementType::U32 => Ok(Self::U32(pod_array(shape, bytes, u32::from_ne_bytes)?)),
            ElementType::I64 => Ok(Self::I64(pod_array(shape, bytes, i64::from_ne_bytes)?)),
            ElementType::U64 => Ok(Self::U64(pod_array(shape, bytes, u64::from_ne_bytes)?)),
            ElementType::F32 => Ok(Self::F32(pod_array(shape, bytes, f32::from_ne_bytes)?)),
            ElementType::F64 => Ok(Self::F64(pod_array(shape, bytes, f64::from_ne_bytes)?)),
            ElementType::Text => Ok(Self::Text(pod_array(shape, bytes, |[b]: [u8; 1]| b)?)),
            ElementType::Opaque { size } => {
                let mut storage_shape = shape.to_vec();
                storage_shape.push(size);
                Ok(Self::Opaque {
                    size,
                    data: pod_array(&storage_shape, bytes, |[b]: [u8; 1]| b)?,
                })
            }
            ElementType::Str => Err(ContainerError::UnsupportedType {
                dtype: ElementType::Str,
            }),
        }
    }

    /// Creates a zero-filled payload of the given `dtype` and `shape`.
    ///
    /// # Errors
    ///
    /// Errors with [`ContainerError::UnsupportedType`] for variable-length
    /// strings and opaque data, which have no zero element.
    pub fn zeros(dtype: ElementType, shape: &[usize]) -> Result<Self, ContainerError> {
        match dtype {
            ElementType::I16 => Ok(Self::I16(ArrayD::zeros(shape))),
            ElementType::U16 => Ok(Self::U16(ArrayD::zeros(shape))),
            ElementType::I32 => Ok(Self::I32(ArrayD::zeros(shape))),
            ElementType::U32 => Ok(Self::U32(ArrayD::zeros(shape))),
            ElementType::I64 => Ok(Self::I64(ArrayD::zeros(shape))),
            ElementType::U64 => Ok(Self::U64(ArrayD::zeros(shape))),
            ElementType::F32 => Ok(Self::F32(ArrayD::zeros(shape))),
            ElementType::F64 => Ok(Self::F64(ArrayD::zeros(shape))),
            ElementType::Text => Ok(Self::Text(ArrayD::zeros(shape))),
            dtype @ (ElementType::Opaque { .. } | ElementType::Str) => {
                Err(ContainerError::UnsupportedType { dtype })
            }
        }
    }
}
