use std::fmt;

use serde::{Deserialize, Serialize};

/// Element type of a container variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum ElementType {
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    /// Fixed-width character data, one byte per element.
    Text,
    /// Opaque fixed-size elements of the given byte width.
    Opaque {
        /// Byte width of a single element.
        size: usize,
    },
    /// Variable-length strings.
    Str,
}

impl ElementType {
    /// Returns the storage size of a single element in bytes.
    ///
    /// Variable-length strings report the size of a reference slot, which is
    /// what uncompressed-size accounting uses for them.
    #[must_use]
    pub const fn size_of(self) -> usize {
        match self {
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
            Self::Text => 1,
            Self::Opaque { size } => size,
            Self::Str => std::mem::size_of::<usize>(),
        }
    }

    /// Returns the bit width relevant for per-bit analysis, or `None` for
    /// types the analysers do not cover.
    #[must_use]
    pub const fn bit_width(self) -> Option<u32> {
        match self {
            Self::I16 | Self::U16 => Some(16),
            Self::I32 | Self::U32 | Self::F32 => Some(32),
            Self::I64 | Self::U64 | Self::F64 => Some(64),
            Self::Text | Self::Opaque { .. } | Self::Str => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::I16 => fmt.write_str("i16"),
            Self::U16 => fmt.write_str("u16"),
            Self::I32 => fmt.write_str("i32"),
            Self::U32 => fmt.write_str("u32"),
            Self::I64 => fmt.write_str("i64"),
            Self::U64 => fmt.write_str("u64"),
            Self::F32 => fmt.write_str("f32"),
            Self::F64 => fmt.write_str("f64"),
            Self::Text => fmt.write_str("text"),
            Self::Opaque { size } => write!(fmt, "opaque[{size}]"),
            Self::Str => fmt.write_str("string"),
        }
    }
}
