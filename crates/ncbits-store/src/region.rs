//! Rectangular region arithmetic shared by the chunked read and write paths.

use ndarray::{ArrayD, SliceInfoElem};

use ncbits::{ContainerError, Values};

/// Row-major iterator over the chunk origins of a `shape` gridded by
/// `chunk_shape`. Origins are multiples of the chunk extents; trailing
/// chunks may be clipped by the shape.
pub fn chunk_origins(shape: &[usize], chunk_shape: &[usize]) -> Vec<Vec<usize>> {
    let mut origins = vec![Vec::new()];
    for (&extent, &chunk) in shape.iter().zip(chunk_shape) {
        let mut grown = Vec::new();
        for origin in &origins {
            let mut start = 0;
            while start < extent {
                let mut next = origin.clone();
                next.push(start);
                grown.push(next);
                start += chunk;
            }
        }
        origins = grown;
    }
    origins
}

/// Extent of the chunk at `origin`, clipping trailing chunks to the shape.
pub fn chunk_extent(shape: &[usize], chunk_shape: &[usize], origin: &[usize]) -> Vec<usize> {
    origin
        .iter()
        .zip(chunk_shape)
        .zip(shape)
        .map(|((&start, &chunk), &extent)| chunk.min(extent - start))
        .collect()
}

/// Checks that `origin` lies on the chunk grid.
pub fn check_aligned(origin: &[usize], chunk_shape: &[usize]) -> Result<(), ContainerError> {
    let aligned = origin.len() == chunk_shape.len()
        && origin
            .iter()
            .zip(chunk_shape)
            .all(|(&start, &chunk)| chunk > 0 && start % chunk == 0);
    if aligned {
        Ok(())
    } else {
        Err(ContainerError::UnalignedChunk {
            origin: origin.to_vec(),
            chunk_shape: chunk_shape.to_vec(),
        })
    }
}

/// Checks that `start` plus `count` stays within `shape`.
pub fn check_bounds(
    start: &[usize],
    count: &[usize],
    shape: &[usize],
) -> Result<(), ContainerError> {
    let ok = start.len() == shape.len()
        && count.len() == shape.len()
        && start
            .iter()
            .zip(count)
            .zip(shape)
            .all(|((&s, &c), &extent)| s + c <= extent);
    if ok {
        Ok(())
    } else {
        Err(ContainerError::SlabOutOfBounds {
            start: start.to_vec(),
            count: count.to_vec(),
            shape: shape.to_vec(),
        })
    }
}

/// Intersection of the box `(start, count)` with the box `(origin, extent)`,
/// or `None` if they are disjoint. Returns the overlap start and extent.
pub fn intersect(
    start: &[usize],
    count: &[usize],
    origin: &[usize],
    extent: &[usize],
) -> Option<(Vec<usize>, Vec<usize>)> {
    let mut lo = Vec::with_capacity(start.len());
    let mut len = Vec::with_capacity(start.len());
    for axis in 0..start.len() {
        let begin = start[axis].max(origin[axis]);
        let end = (start[axis] + count[axis]).min(origin[axis] + extent[axis]);
        if begin >= end {
            return None;
        }
        lo.push(begin);
        len.push(end - begin);
    }
    Some((lo, len))
}

fn slice_spec(start: &[usize], count: &[usize]) -> Vec<SliceInfoElem> {
    start
        .iter()
        .zip(count)
        .map(|(&s, &c)| SliceInfoElem::Slice {
            start: s as isize,
            end: Some((s + c) as isize),
            step: 1,
        })
        .collect()
}

fn extract_array<T: Clone>(src: &ArrayD<T>, start: &[usize], count: &[usize]) -> ArrayD<T> {
    src.slice(slice_spec(start, count).as_slice()).to_owned()
}

fn assign_array<T: Clone>(dst: &mut ArrayD<T>, start: &[usize], src: &ArrayD<T>) {
    dst.slice_mut(slice_spec(start, src.shape()).as_slice())
        .assign(src);
}

/// Copies the region `(start, count)` of `src` into a new owned payload.
///
/// # Errors
///
/// Errors if the selection leaves the array bounds.
pub fn extract_region(
    src: &Values,
    start: &[usize],
    count: &[usize],
) -> Result<Values, ContainerError> {
    check_bounds(start, count, src.shape())?;

    Ok(match src {
        Values::I16(a) => Values::I16(extract_array(a, start, count)),
        Values::U16(a) => Values::U16(extract_array(a, start, count)),
        Values::I32(a) => Values::I32(extract_array(a, start, count)),
        Values::U32(a) => Values::U32(extract_array(a, start, count)),
        Values::I64(a) => Values::I64(extract_array(a, start, count)),
        Values::U64(a) => Values::U64(extract_array(a, start, count)),
        Values::F32(a) => Values::F32(extract_array(a, start, count)),
        Values::F64(a) => Values::F64(extract_array(a, start, count)),
        Values::Text(a) => Values::Text(extract_array(a, start, count)),
        Values::Str(a) => Values::Str(extract_array(a, start, count)),
        Values::Opaque { size, data } => {
            // the storage axis is copied whole
            let mut start = start.to_vec();
            let mut count = count.to_vec();
            start.push(0);
            count.push(*size);
            Values::Opaque {
                size: *size,
                data: extract_array(data, &start, &count),
            }
        }
        #[allow(unreachable_patterns)]
        _ => unreachable!("unhandled Values variant"),
    })
}

/// Copies `src` into the region of `dst` starting at `start`.
///
/// # Errors
///
/// Errors if the dtypes differ or the region leaves the array bounds.
pub fn assign_region(
    dst: &mut Values,
    start: &[usize],
    src: &Values,
) -> Result<(), ContainerError> {
    check_bounds(start, src.shape(), dst.shape())?;

    match (dst, src) {
        (Values::I16(d), Values::I16(s)) => assign_array(d, start, s),
        (Values::U16(d), Values::U16(s)) => assign_array(d, start, s),
        (Values::I32(d), Values::I32(s)) => assign_array(d, start, s),
        (Values::U32(d), Values::U32(s)) => assign_array(d, start, s),
        (Values::I64(d), Values::I64(s)) => assign_array(d, start, s),
        (Values::U64(d), Values::U64(s)) => assign_array(d, start, s),
        (Values::F32(d), Values::F32(s)) => assign_array(d, start, s),
        (Values::F64(d), Values::F64(s)) => assign_array(d, start, s),
        (Values::Text(d), Values::Text(s)) => assign_array(d, start, s),
        (Values::Str(d), Values::Str(s)) => assign_array(d, start, s),
        (
            Values::Opaque { size, data: d },
            Values::Opaque {
                size: src_size,
                data: s,
            },
        ) if size == src_size => {
            let mut start = start.to_vec();
            start.push(0);
            assign_array(d, &start, s);
        }
        (dst, src) => {
            return Err(ContainerError::UnsupportedType {
                dtype: if dst.dtype() == src.dtype() {
                    dst.dtype()
                } else {
                    src.dtype()
                },
            })
        }
    }

    Ok(())
}
