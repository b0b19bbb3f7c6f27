use serde::{Deserialize, Serialize};

use crate::ElementType;

/// Name of the conventional fill-value attribute.
pub const FILL_VALUE_ATTR: &str = "_FillValue";

/// A named dimension of a container.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimMeta {
    /// Dimension name, unique within the container.
    pub name: String,
    /// Current extent of the dimension.
    pub extent: usize,
    /// Whether the dimension may grow by appending records.
    pub is_unlimited: bool,
}

/// One codec of a variable's filter stack, applied in order on write and in
/// reverse order on read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    /// Byte-transpose shuffle across the element width.
    Shuffle,
    /// Deflate compression at the given level (1..=9).
    Deflate {
        /// Compression level.
        level: u8,
    },
    /// A codec this toolkit moves but never decodes.
    Opaque {
        /// Registered filter identifier.
        id: u32,
        /// Raw filter parameters.
        params: Vec<u32>,
    },
}

/// Ordered list of filters applied to every chunk of a variable.
pub type FilterStack = Vec<Filter>;

/// A typed attribute value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum AttrValue {
    Text(String),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    I32Vec(Vec<i32>),
    F32Vec(Vec<f32>),
    F64Vec(Vec<f64>),
    /// A list of strings, e.g. dimension paths referenced by a variable.
    TextVec(Vec<String>),
}

/// A named attribute attached to a container or a variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attr {
    /// Attribute name.
    pub name: String,
    /// Attribute payload, copied verbatim by clone operations.
    pub value: AttrValue,
}

impl Attr {
    /// Creates a text attribute.
    #[must_use]
    pub fn text(name: &str, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            value: AttrValue::Text(value.to_owned()),
        }
    }
}

/// Metadata describing one container variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarMeta {
    /// Variable name (UTF-8, at most 255 bytes).
    pub name: String,
    /// Element type.
    pub dtype: ElementType,
    /// Dimension names, one per axis, in storage order.
    pub dims: Vec<String>,
    /// Current extents, one per axis.
    pub shape: Vec<usize>,
    /// Chunk extents, same rank as the variable, or `None` for contiguous
    /// storage.
    pub chunk_shape: Option<Vec<usize>>,
    /// Filter stack applied to every chunk.
    pub filters: FilterStack,
    /// Attributes attached to the variable.
    pub attrs: Vec<Attr>,
}

impl VarMeta {
    /// Number of axes.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Uncompressed storage size in bytes.
    #[must_use]
    pub fn uncompressed_size(&self) -> u64 {
        self.total_len() as u64 * self.dtype.size_of() as u64
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| &attr.value)
    }

    /// Returns the declared `_FillValue` if it is a float32 scalar.
    #[must_use]
    pub fn fill_value_f32(&self) -> Option<f32> {
        match self.attr(FILL_VALUE_ATTR) {
            Some(AttrValue::F32(fill)) => Some(*fill),
            _ => None,
        }
    }

    /// Extent along the named dimension, if the variable has that axis.
    #[must_use]
    pub fn extent_along(&self, dim: &str) -> Option<usize> {
        let axis = self.dims.iter().position(|name| name == dim)?;
        self.shape.get(axis).copied()
    }
}
