//! Container data model and trait seams for the `ncbits` toolkit.
//!
//! A container is a file of named dimensions, variables, and attributes in
//! the NetCDF-4 / HDF5 family. This crate defines the metadata types, the
//! dtype-tagged value arrays, and the two narrow interfaces — a
//! [`ContainerReader`] and a [`ContainerWriter`] — through which the rest of
//! the toolkit consumes container libraries.

mod classify;
mod container;
mod dtype;
mod error;
mod meta;
mod slab;
mod values;

pub use classify::{classify, VarClass};
pub use container::{AttrScope, ChunkRecord, ContainerReader, ContainerWriter};
pub use dtype::ElementType;
pub use error::ContainerError;
pub use meta::{Attr, AttrValue, DimMeta, Filter, FilterStack, VarMeta, FILL_VALUE_ATTR};
pub use slab::{slab_label, SlabIter};
pub use values::Values;
