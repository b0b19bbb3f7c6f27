//! Reference chunked container store for the `ncbits` toolkit.
//!
//! [`MemContainer`] implements the [`ContainerReader`] and
//! [`ContainerWriter`] seams over an in-memory tree of dimensions, variables,
//! and attributes, with chunked variables held as filtered byte payloads the
//! same way a NetCDF-4/HDF5 file holds them. A container can be persisted to
//! and reopened from a single-file image.
//!
//! Production deployments plug the real container-library bindings into the
//! same two traits; this store is what the test suite and the command-line
//! tools run against.

mod filters;
mod region;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use ncbits::{
    Attr, AttrScope, ChunkRecord, ContainerError, ContainerReader, ContainerWriter, DimMeta,
    Values, VarMeta,
};

/// An in-memory container with an optional backing file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MemContainer {
    dims: Vec<DimMeta>,
    vars: Vec<Variable>,
    attrs: Vec<Attr>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Variable {
    meta: VarMeta,
    storage: Storage,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
enum Storage {
    /// Whole-variable payload; `None` until first written.
    Contiguous(Option<Values>),
    /// Filtered chunk payloads keyed by chunk origin, in row-major order.
    Chunked(BTreeMap<Vec<usize>, StoredChunk>),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredChunk {
    filter_mask: u32,
    payload: Vec<u8>,
}

impl MemContainer {
    /// Creates an empty container with no backing file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty container that [`flush`][`ContainerWriter::flush`]es
    /// to `path`.
    #[must_use]
    pub fn create(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_owned()),
            ..Self::default()
        }
    }

    /// Opens a container from its file image.
    ///
    /// # Errors
    ///
    /// Errors if the file cannot be read or is not a valid image.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ContainerError> {
        let bytes = std::fs::read(&path)?;
        let mut container: Self = postcard::from_bytes(&bytes)
            .map_err(|err| ContainerError::InvalidImage {
                source: Box::new(err),
            })?;
        container.path = Some(path.as_ref().to_owned());
        Ok(container)
    }

    /// Writes the container's file image to `path`.
    ///
    /// # Errors
    ///
    /// Errors if the image cannot be encoded or the file cannot be written.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ContainerError> {
        let bytes = postcard::to_allocvec(self).map_err(|err| ContainerError::InvalidImage {
            source: Box::new(err),
        })?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn find(&self, name: &str) -> Result<&Variable, ContainerError> {
        self.vars
            .iter()
            .find(|var| var.meta.name == name)
            .ok_or_else(|| ContainerError::VarNotFound {
                name: name.to_owned(),
            })
    }

    fn find_mut(&mut self, name: &str) -> Result<&mut Variable, ContainerError> {
        self.vars
            .iter_mut()
            .find(|var| var.meta.name == name)
            .ok_or_else(|| ContainerError::VarNotFound {
                name: name.to_owned(),
            })
    }
}

impl Variable {
    fn chunk_shape(&self) -> Result<&[usize], ContainerError> {
        self.meta
            .chunk_shape
            .as_deref()
            .ok_or_else(|| ContainerError::NotChunked {
                name: self.meta.name.clone(),
            })
    }

    fn decode_chunk(
        &self,
        origin: &[usize],
        chunk: &StoredChunk,
    ) -> Result<Values, ContainerError> {
        let chunk_shape = self.chunk_shape()?;
        let extent = region::chunk_extent(&self.meta.shape, chunk_shape, origin);
        let bytes = filters::decode(
            chunk.payload.clone(),
            &self.meta.filters,
            chunk.filter_mask,
            self.meta.dtype.size_of(),
        )?;
        Values::from_ne_bytes(self.meta.dtype, &extent, &bytes)
    }

    fn encode_chunk(&self, values: &Values) -> Result<StoredChunk, ContainerError> {
        let bytes = values.to_ne_bytes()?;
        let payload = filters::encode(
            bytes,
            &self.meta.filters,
            0,
            self.meta.dtype.size_of(),
        )?;
        Ok(StoredChunk {
            filter_mask: 0,
            payload,
        })
    }
}

impl ContainerReader for MemContainer {
    fn dimensions(&self) -> Vec<DimMeta> {
        self.dims.clone()
    }

    fn variables(&self) -> Vec<VarMeta> {
        self.vars.iter().map(|var| var.meta.clone()).collect()
    }

    fn read_all(&self, name: &str) -> Result<Values, ContainerError> {
        let var = self.find(name)?;
        match &var.storage {
            Storage::Contiguous(Some(values)) => Ok(values.clone()),
            Storage::Contiguous(None) => Values::zeros(var.meta.dtype, &var.meta.shape),
            Storage::Chunked(chunks) => {
                let mut out = Values::zeros(var.meta.dtype, &var.meta.shape)?;
                for (origin, chunk) in chunks {
                    let decoded = var.decode_chunk(origin, chunk)?;
                    region::assign_region(&mut out, origin, &decoded)?;
                }
                Ok(out)
            }
        }
    }

    fn read_hyperslab(
        &self,
        name: &str,
        start: &[usize],
        count: &[usize],
    ) -> Result<Values, ContainerError> {
        let var = self.find(name)?;
        region::check_bounds(start, count, &var.meta.shape)?;

        match &var.storage {
            Storage::Contiguous(Some(values)) => region::extract_region(values, start, count),
            Storage::Contiguous(None) => Values::zeros(var.meta.dtype, count),
            Storage::Chunked(chunks) => {
                let chunk_shape = var.chunk_shape()?.to_vec();
                let mut out = Values::zeros(var.meta.dtype, count)?;

                for (origin, chunk) in chunks {
                    let extent = region::chunk_extent(&var.meta.shape, &chunk_shape, origin);
                    let Some((overlap_start, overlap_count)) =
                        region::intersect(start, count, origin, &extent)
                    else {
                        continue;
                    };

                    let decoded = var.decode_chunk(origin, chunk)?;
                    let local_start: Vec<usize> = overlap_start
                        .iter()
                        .zip(origin)
                        .map(|(&o, &c)| o - c)
                        .collect();
                    let piece = region::extract_region(&decoded, &local_start, &overlap_count)?;

                    let out_start: Vec<usize> = overlap_start
                        .iter()
                        .zip(start)
                        .map(|(&o, &s)| o - s)
                        .collect();
                    region::assign_region(&mut out, &out_start, &piece)?;
                }
                Ok(out)
            }
        }
    }

    fn chunk_info(&self, name: &str) -> Result<Vec<ChunkRecord>, ContainerError> {
        let var = self.find(name)?;
        let Storage::Chunked(chunks) = &var.storage else {
            return Err(ContainerError::NotChunked {
                name: name.to_owned(),
            });
        };

        Ok(chunks
            .iter()
            .map(|(origin, chunk)| ChunkRecord {
                origin: origin.clone(),
                filter_mask: chunk.filter_mask,
                payload_size: chunk.payload.len() as u64,
            })
            .collect())
    }

    fn read_raw_chunk(
        &self,
        name: &str,
        origin: &[usize],
    ) -> Result<(u32, Vec<u8>), ContainerError> {
        let var = self.find(name)?;
        let chunk_shape = var.chunk_shape()?;
        region::check_aligned(origin, chunk_shape)?;

        let Storage::Chunked(chunks) = &var.storage else {
            return Err(ContainerError::NotChunked {
                name: name.to_owned(),
            });
        };
        let chunk = chunks
            .get(origin)
            .ok_or_else(|| ContainerError::CorruptChunk {
                reason: format!("no chunk stored at {origin:?}"),
            })?;
        Ok((chunk.filter_mask, chunk.payload.clone()))
    }

    fn attributes(&self, scope: AttrScope) -> Result<Vec<Attr>, ContainerError> {
        match scope {
            AttrScope::Global => Ok(self.attrs.clone()),
            AttrScope::Var(name) => Ok(self.find(name)?.meta.attrs.clone()),
        }
    }

    fn storage_size(&self, name: &str) -> Result<u64, ContainerError> {
        let var = self.find(name)?;
        Ok(match &var.storage {
            Storage::Contiguous(_) => var.meta.uncompressed_size(),
            Storage::Chunked(chunks) => {
                chunks.values().map(|chunk| chunk.payload.len() as u64).sum()
            }
        })
    }
}

impl ContainerWriter for MemContainer {
    fn define_dimension(&mut self, meta: &DimMeta) -> Result<(), ContainerError> {
        if self.dims.iter().any(|dim| dim.name == meta.name) {
            return Err(ContainerError::InvalidName {
                name: meta.name.clone(),
            });
        }
        self.dims.push(meta.clone());
        Ok(())
    }

    fn create_var(&mut self, meta: &VarMeta) -> Result<(), ContainerError> {
        if meta.name.len() > 255 || self.vars.iter().any(|var| var.meta.name == meta.name) {
            return Err(ContainerError::InvalidName {
                name: meta.name.clone(),
            });
        }
        if meta.dims.len() != meta.shape.len() {
            return Err(ContainerError::ShapeMismatch {
                expected: meta.dims.len(),
                actual: meta.shape.len(),
            });
        }

        let mut unlimited_axes = 0;
        for (dim_name, &extent) in meta.dims.iter().zip(&meta.shape) {
            let dim = self
                .dims
                .iter()
                .find(|dim| &dim.name == dim_name)
                .ok_or_else(|| ContainerError::DimNotFound {
                    name: dim_name.clone(),
                })?;
            if dim.is_unlimited {
                unlimited_axes += 1;
            } else if dim.extent != extent {
                return Err(ContainerError::ShapeMismatch {
                    expected: dim.extent,
                    actual: extent,
                });
            }
        }
        if unlimited_axes > 1 {
            return Err(ContainerError::ShapeMismatch {
                expected: 1,
                actual: unlimited_axes,
            });
        }

        if let Some(chunk_shape) = &meta.chunk_shape {
            if chunk_shape.len() != meta.shape.len()
                || chunk_shape.iter().any(|&extent| extent == 0)
            {
                return Err(ContainerError::ShapeMismatch {
                    expected: meta.shape.len(),
                    actual: chunk_shape.len(),
                });
            }
        }

        let storage = if meta.chunk_shape.is_some() {
            Storage::Chunked(BTreeMap::new())
        } else {
            Storage::Contiguous(None)
        };
        self.vars.push(Variable {
            meta: meta.clone(),
            storage,
        });
        log::debug!("created variable {:?}", meta.name);
        Ok(())
    }

    fn write_all(&mut self, name: &str, values: &Values) -> Result<(), ContainerError> {
        let var = self.find_mut(name)?;
        if values.dtype() != var.meta.dtype || values.shape() != var.meta.shape {
            return Err(ContainerError::ShapeMismatch {
                expected: var.meta.total_len(),
                actual: values.len(),
            });
        }

        if var.meta.chunk_shape.is_none() {
            var.storage = Storage::Contiguous(Some(values.clone()));
            return Ok(());
        }

        let chunk_shape = var.chunk_shape()?.to_vec();
        let mut encoded = BTreeMap::new();
        for origin in region::chunk_origins(&var.meta.shape, &chunk_shape) {
            let extent = region::chunk_extent(&var.meta.shape, &chunk_shape, &origin);
            let piece = region::extract_region(values, &origin, &extent)?;
            encoded.insert(origin, var.encode_chunk(&piece)?);
        }
        var.storage = Storage::Chunked(encoded);
        Ok(())
    }

    fn write_hyperslab(
        &mut self,
        name: &str,
        start: &[usize],
        count: &[usize],
        values: &Values,
    ) -> Result<(), ContainerError> {
        let var = self.find_mut(name)?;
        region::check_bounds(start, count, &var.meta.shape)?;
        if values.dtype() != var.meta.dtype || values.shape() != count {
            return Err(ContainerError::ShapeMismatch {
                expected: count.iter().product(),
                actual: values.len(),
            });
        }

        if var.meta.chunk_shape.is_none() {
            if matches!(var.storage, Storage::Contiguous(None)) {
                var.storage =
                    Storage::Contiguous(Some(Values::zeros(var.meta.dtype, &var.meta.shape)?));
            }
            if let Storage::Contiguous(Some(stored)) = &mut var.storage {
                region::assign_region(stored, start, values)?;
            }
            return Ok(());
        }

        let chunk_shape = var.chunk_shape()?.to_vec();
        for origin in region::chunk_origins(&var.meta.shape, &chunk_shape) {
            let extent = region::chunk_extent(&var.meta.shape, &chunk_shape, &origin);
            let Some((overlap_start, overlap_count)) =
                region::intersect(start, count, &origin, &extent)
            else {
                continue;
            };

            let existing = match &var.storage {
                Storage::Chunked(chunks) => chunks.get(&origin).cloned(),
                Storage::Contiguous(_) => None,
            };
            let mut decoded = match existing {
                Some(chunk) => var.decode_chunk(&origin, &chunk)?,
                None => Values::zeros(var.meta.dtype, &extent)?,
            };

            let src_start: Vec<usize> = overlap_start
                .iter()
                .zip(start)
                .map(|(&o, &s)| o - s)
                .collect();
            let piece = region::extract_region(values, &src_start, &overlap_count)?;
            let local_start: Vec<usize> = overlap_start
                .iter()
                .zip(&origin)
                .map(|(&o, &c)| o - c)
                .collect();
            region::assign_region(&mut decoded, &local_start, &piece)?;

            let encoded = var.encode_chunk(&decoded)?;
            if let Storage::Chunked(chunks) = &mut var.storage {
                chunks.insert(origin, encoded);
            }
        }
        Ok(())
    }

    fn write_raw_chunk(
        &mut self,
        name: &str,
        origin: &[usize],
        filter_mask: u32,
        payload: &[u8],
    ) -> Result<(), ContainerError> {
        let var = self.find_mut(name)?;
        let chunk_shape = var.chunk_shape()?;
        region::check_aligned(origin, chunk_shape)?;
        let ones = vec![1; origin.len()];
        region::check_bounds(origin, &ones, &var.meta.shape)?;

        let Storage::Chunked(chunks) = &mut var.storage else {
            return Err(ContainerError::NotChunked {
                name: name.to_owned(),
            });
        };
        chunks.insert(
            origin.to_vec(),
            StoredChunk {
                filter_mask,
                payload: payload.to_vec(),
            },
        );
        Ok(())
    }

    fn set_extent(&mut self, name: &str, new_shape: &[usize]) -> Result<(), ContainerError> {
        let meta = self.find(name)?.meta.clone();
        if new_shape.len() != meta.shape.len() {
            return Err(ContainerError::ShapeMismatch {
                expected: meta.shape.len(),
                actual: new_shape.len(),
            });
        }

        let mut dim_updates = Vec::new();
        for (axis, (&old, &new)) in meta.shape.iter().zip(new_shape).enumerate() {
            if new == old {
                continue;
            }
            let dim_name = &meta.dims[axis];
            let dim_index = self
                .dims
                .iter()
                .position(|dim| &dim.name == dim_name)
                .ok_or_else(|| ContainerError::DimNotFound {
                    name: dim_name.clone(),
                })?;
            if !self.dims[dim_index].is_unlimited || new < old {
                return Err(ContainerError::ShapeMismatch {
                    expected: old,
                    actual: new,
                });
            }
            dim_updates.push((dim_index, new));
        }

        // only chunked storage can grow
        if !dim_updates.is_empty() && meta.chunk_shape.is_none() {
            return Err(ContainerError::NotChunked { name: meta.name });
        }

        for (dim_index, extent) in dim_updates {
            self.dims[dim_index].extent = self.dims[dim_index].extent.max(extent);
        }

        let old_shape = meta.shape;
        let var = self.find_mut(name)?;
        var.meta.shape = new_shape.to_vec();

        // stored chunks that were clipped by the old extent grow with the
        // variable; the grown region reads back as fill
        if let Some(chunk_shape) = var.meta.chunk_shape.clone() {
            let origins: Vec<Vec<usize>> = match &var.storage {
                Storage::Chunked(chunks) => chunks.keys().cloned().collect(),
                Storage::Contiguous(_) => Vec::new(),
            };

            for origin in origins {
                let old_extent = region::chunk_extent(&old_shape, &chunk_shape, &origin);
                let new_extent = region::chunk_extent(new_shape, &chunk_shape, &origin);
                if old_extent == new_extent {
                    continue;
                }

                let stored = match &var.storage {
                    Storage::Chunked(chunks) => chunks.get(&origin).cloned(),
                    Storage::Contiguous(_) => None,
                };
                let Some(stored) = stored else { continue };

                let bytes = filters::decode(
                    stored.payload,
                    &var.meta.filters,
                    stored.filter_mask,
                    var.meta.dtype.size_of(),
                )?;
                let decoded = Values::from_ne_bytes(var.meta.dtype, &old_extent, &bytes)?;

                let mut padded = Values::zeros(var.meta.dtype, &new_extent)?;
                let zero_start = vec![0; new_extent.len()];
                region::assign_region(&mut padded, &zero_start, &decoded)?;

                let encoded = var.encode_chunk(&padded)?;
                if let Storage::Chunked(chunks) = &mut var.storage {
                    chunks.insert(origin, encoded);
                }
            }
        }
        Ok(())
    }

    fn put_attribute(&mut self, scope: AttrScope, attr: Attr) -> Result<(), ContainerError> {
        let attrs = match scope {
            AttrScope::Global => &mut self.attrs,
            AttrScope::Var(name) => &mut self.find_mut(name)?.meta.attrs,
        };
        if let Some(existing) = attrs.iter_mut().find(|a| a.name == attr.name) {
            *existing = attr;
        } else {
            attrs.push(attr);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ContainerError> {
        if let Some(path) = self.path.clone() {
            self.save_to(path)?;
        }
        Ok(())
    }
}
