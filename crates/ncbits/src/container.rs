use crate::{Attr, ContainerError, DimMeta, Values, VarMeta};

/// The scope an attribute is attached to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AttrScope<'a> {
    /// The container's root group.
    Global,
    /// The named variable.
    Var(&'a str),
}

/// Location and size of one stored chunk of a chunked variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkRecord {
    /// Element coordinate of the chunk's first element, a multiple of the
    /// chunk shape along every axis.
    pub origin: Vec<usize>,
    /// Bitmask of filters that were skipped when the chunk was written.
    pub filter_mask: u32,
    /// Size of the stored (filtered) payload in bytes.
    pub payload_size: u64,
}

/// Read access to one container file.
///
/// Implementations present values in native endianness; any byte reordering
/// for disk happens below this interface. Multiple read-only handles to the
/// same file are allowed.
pub trait ContainerReader {
    /// Enumerates the container's dimensions in definition order.
    fn dimensions(&self) -> Vec<DimMeta>;

    /// Enumerates the container's variables in container index order.
    fn variables(&self) -> Vec<VarMeta>;

    /// Reads a whole variable.
    ///
    /// # Errors
    ///
    /// Errors if the variable does not exist or its payload cannot be
    /// decoded.
    fn read_all(&self, var: &str) -> Result<Values, ContainerError>;

    /// Reads the hyperslab starting at `start` spanning `count` elements per
    /// axis.
    ///
    /// # Errors
    ///
    /// Errors if the selection is out of bounds or the payload cannot be
    /// decoded.
    fn read_hyperslab(
        &self,
        var: &str,
        start: &[usize],
        count: &[usize],
    ) -> Result<Values, ContainerError>;

    /// Enumerates the stored chunks of a chunked variable.
    ///
    /// # Errors
    ///
    /// Errors if the variable does not exist or is not chunked.
    fn chunk_info(&self, var: &str) -> Result<Vec<ChunkRecord>, ContainerError>;

    /// Reads one raw (still filtered) chunk payload and its filter mask.
    ///
    /// # Errors
    ///
    /// Errors if the variable is not chunked or no chunk starts at `origin`.
    fn read_raw_chunk(&self, var: &str, origin: &[usize])
        -> Result<(u32, Vec<u8>), ContainerError>;

    /// Enumerates the attributes of the given scope.
    ///
    /// # Errors
    ///
    /// Errors if the scope does not exist.
    fn attributes(&self, scope: AttrScope) -> Result<Vec<Attr>, ContainerError>;

    /// On-disk storage size of a variable in bytes: the sum of stored chunk
    /// payloads for chunked variables, the raw storage size otherwise.
    ///
    /// # Errors
    ///
    /// Errors if the variable does not exist.
    fn storage_size(&self, var: &str) -> Result<u64, ContainerError>;
}

/// Write access to one container file.
///
/// The orchestrator is the sole owner of a writer; writer errors are always
/// fatal to the operation that encounters them. Dropping a writer closes it;
/// [`flush`][`ContainerWriter::flush`] persists buffered state first.
pub trait ContainerWriter {
    /// Defines a dimension.
    ///
    /// # Errors
    ///
    /// Errors if a dimension of the same name already exists.
    fn define_dimension(&mut self, meta: &DimMeta) -> Result<(), ContainerError>;

    /// Creates a variable with the type, shape, chunking, and filter stack
    /// carried by `meta`.
    ///
    /// # Errors
    ///
    /// Errors if the metadata references unknown dimensions or clashes with
    /// an existing variable.
    fn create_var(&mut self, meta: &VarMeta) -> Result<(), ContainerError>;

    /// Writes a whole variable.
    ///
    /// # Errors
    ///
    /// Errors if the payload's dtype or shape does not match the variable.
    fn write_all(&mut self, var: &str, values: &Values) -> Result<(), ContainerError>;

    /// Writes the hyperslab starting at `start` spanning `count` elements per
    /// axis.
    ///
    /// # Errors
    ///
    /// Errors if the selection is out of bounds or the payload does not match
    /// it.
    fn write_hyperslab(
        &mut self,
        var: &str,
        start: &[usize],
        count: &[usize],
        values: &Values,
    ) -> Result<(), ContainerError>;

    /// Stores one raw (already filtered) chunk payload at the chunk-aligned
    /// `origin` without decoding it.
    ///
    /// # Errors
    ///
    /// Errors if the variable is not chunked or `origin` is not aligned to
    /// the chunk grid.
    fn write_raw_chunk(
        &mut self,
        var: &str,
        origin: &[usize],
        filter_mask: u32,
        payload: &[u8],
    ) -> Result<(), ContainerError>;

    /// Grows a variable to `new_shape`; only axes backed by an unlimited
    /// dimension may grow.
    ///
    /// # Errors
    ///
    /// Errors if a fixed axis would change.
    fn set_extent(&mut self, var: &str, new_shape: &[usize]) -> Result<(), ContainerError>;

    /// Attaches (or replaces) an attribute in the given scope.
    ///
    /// # Errors
    ///
    /// Errors if the scope does not exist.
    fn put_attribute(&mut self, scope: AttrScope, attr: Attr) -> Result<(), ContainerError>;

    /// Flushes buffered state to the backing file.
    ///
    /// # Errors
    ///
    /// Errors if the backing file cannot be written.
    fn flush(&mut self) -> Result<(), ContainerError>;
}
