//! The filter pipeline applied to chunk payloads.

use ncbits::{ContainerError, Filter};

/// Applies the filter stack to a chunk's byte image, first filter first.
///
/// Filters whose bit is set in `filter_mask` are skipped, mirroring how
/// partially-filtered chunks are stored on disk.
///
/// # Errors
///
/// Errors with [`ContainerError::CorruptChunk`] if the stack contains a
/// filter this store cannot apply.
pub fn encode(
    mut bytes: Vec<u8>,
    filters: &[Filter],
    filter_mask: u32,
    elem_size: usize,
) -> Result<Vec<u8>, ContainerError> {
    for (index, filter) in filters.iter().enumerate() {
        if filter_mask & (1 << index) != 0 {
            continue;
        }
        bytes = match filter {
            Filter::Shuffle => shuffle(&bytes, elem_size),
            Filter::Deflate { level } => {
                miniz_oxide::deflate::compress_to_vec_zlib(&bytes, *level)
            }
            Filter::Opaque { id, .. } => {
                return Err(ContainerError::CorruptChunk {
                    reason: format!("filter {id} is opaque to this store"),
                })
            }
        };
    }
    Ok(bytes)
}

/// Undoes the filter stack on a stored chunk payload, last filter first.
///
/// # Errors
///
/// Errors with [`ContainerError::CorruptChunk`] if a payload fails to
/// decompress or the stack contains a filter this store cannot undo.
pub fn decode(
    mut bytes: Vec<u8>,
    filters: &[Filter],
    filter_mask: u32,
    elem_size: usize,
) -> Result<Vec<u8>, ContainerError> {
    for (index, filter) in filters.iter().enumerate().rev() {
        if filter_mask & (1 << index) != 0 {
            continue;
        }
        bytes = match filter {
            Filter::Shuffle => unshuffle(&bytes, elem_size),
            Filter::Deflate { .. } => miniz_oxide::inflate::decompress_to_vec_zlib(&bytes)
                .map_err(|err| ContainerError::CorruptChunk {
                    reason: format!("inflate failed: {err}"),
                })?,
            Filter::Opaque { id, .. } => {
                return Err(ContainerError::CorruptChunk {
                    reason: format!("filter {id} is opaque to this store"),
                })
            }
        };
    }
    Ok(bytes)
}

/// Byte-transpose across the element width: all first bytes, then all second
/// bytes, and so on. Same-valued elements then produce long constant runs
/// for the compressor that follows.
fn shuffle(bytes: &[u8], elem_size: usize) -> Vec<u8> {
    if elem_size <= 1 || bytes.len() % elem_size != 0 {
        return bytes.to_vec();
    }
    let count = bytes.len() / elem_size;
    let mut out = vec![0_u8; bytes.len()];
    for elem in 0..count {
        for byte in 0..elem_size {
            out[byte * count + elem] = bytes[elem * elem_size + byte];
        }
    }
    out
}

fn unshuffle(bytes: &[u8], elem_size: usize) -> Vec<u8> {
    if elem_size <= 1 || bytes.len() % elem_size != 0 {
        return bytes.to_vec();
    }
    let count = bytes.len() / elem_size;
    let mut out = vec![0_u8; bytes.len()];
    for elem in 0..count {
        for byte in 0..elem_size {
            out[elem * elem_size + byte] = bytes[byte * count + elem];
        }
    }
    out
}
