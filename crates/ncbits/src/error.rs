use thiserror::Error;

use crate::ElementType;

/// Errors reported by container readers and writers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContainerError {
    /// The named variable does not exist.
    #[error("variable {name:?} does not exist")]
    VarNotFound {
        /// The requested variable name.
        name: String,
    },
    /// The named dimension does not exist.
    #[error("dimension {name:?} does not exist")]
    DimNotFound {
        /// The requested dimension name.
        name: String,
    },
    /// A buffer or selection did not match the variable's shape.
    #[error("selection of {actual} elements does not match the expected {expected}")]
    ShapeMismatch {
        /// Expected element or byte count.
        expected: usize,
        /// Provided element or byte count.
        actual: usize,
    },
    /// A hyperslab selection fell outside the variable's extents.
    #[error("hyperslab {start:?} + {count:?} exceeds the variable shape {shape:?}")]
    SlabOutOfBounds {
        /// Selection start per axis.
        start: Vec<usize>,
        /// Selection extent per axis.
        count: Vec<usize>,
        /// Variable shape.
        shape: Vec<usize>,
    },
    /// The operation does not support the variable's element type.
    #[error("unsupported element type {dtype}")]
    UnsupportedType {
        /// The unsupported element type.
        dtype: ElementType,
    },
    /// A chunk-level operation was applied to a contiguous variable.
    #[error("variable {name:?} is not chunked")]
    NotChunked {
        /// The variable name.
        name: String,
    },
    /// A dimension or variable name is invalid or already taken.
    #[error("name {name:?} is invalid or already in use")]
    InvalidName {
        /// The rejected name.
        name: String,
    },
    /// A raw chunk coordinate does not lie on the variable's chunk grid.
    #[error("chunk origin {origin:?} is not aligned to the chunk shape {chunk_shape:?}")]
    UnalignedChunk {
        /// The requested chunk origin.
        origin: Vec<usize>,
        /// The variable's chunk shape.
        chunk_shape: Vec<usize>,
    },
    /// A filtered chunk payload could not be decoded.
    #[error("corrupt chunk payload: {reason}")]
    CorruptChunk {
        /// Single-line diagnostic.
        reason: String,
    },
    /// The file image could not be read or written.
    #[error("container I/O failed")]
    Io {
        /// The underlying I/O diagnostic.
        #[from]
        source: std::io::Error,
    },
    /// The file image could not be decoded.
    #[error("container file image is not valid")]
    InvalidImage {
        /// The underlying decode diagnostic.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
