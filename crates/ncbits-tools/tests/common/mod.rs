//! Shared fixtures for the tool integration tests.

#![allow(dead_code)]

use ndarray::{ArrayD, IxDyn};

use ncbits::{Attr, AttrValue, ContainerWriter as _, DimMeta, ElementType, Filter, Values, VarMeta};
use ncbits_store::MemContainer;

pub fn dim(name: &str, extent: usize, unlimited: bool) -> DimMeta {
    DimMeta {
        name: name.to_owned(),
        extent,
        is_unlimited: unlimited,
    }
}

pub fn var(
    name: &str,
    dtype: ElementType,
    dims: &[&str],
    shape: &[usize],
    chunk_shape: Option<Vec<usize>>,
    filters: Vec<Filter>,
) -> VarMeta {
    VarMeta {
        name: name.to_owned(),
        dtype,
        dims: dims.iter().map(|&d| d.to_owned()).collect(),
        shape: shape.to_vec(),
        chunk_shape,
        filters,
        attrs: Vec::new(),
    }
}

/// Smoothly varying float32 data so that adjacent elements correlate.
pub fn ramp_f32(shape: &[usize], offset: f32) -> Values {
    let len: usize = shape.iter().product();
    #[allow(clippy::cast_precision_loss)]
    let data: Vec<f32> = (0..len)
        .map(|i| offset + (i as f32) * 0.125 + (i as f32 * 0.01).sin())
        .collect();
    Values::F32(ArrayD::from_shape_vec(IxDyn(shape), data).expect("shape matches data"))
}

pub fn fill_attr(value: f32) -> Attr {
    Attr {
        name: ncbits::FILL_VALUE_ATTR.to_owned(),
        value: AttrValue::F32(value),
    }
}

/// Defines the dimensions and variables of `vars` in a fresh container.
pub fn container_with(dims: &[DimMeta], vars: &[VarMeta]) -> MemContainer {
    let mut container = MemContainer::new();
    for d in dims {
        container.define_dimension(d).expect("dimension is fresh");
    }
    for meta in vars {
        container.create_var(meta).expect("variable is valid");
    }
    container
}

/// Bit-for-bit float32 equality, treating NaN as equal to itself.
pub fn f32_bits(values: &Values) -> Vec<u32> {
    match values {
        Values::F32(a) => a.iter().map(|x| x.to_bits()).collect(),
        _ => panic!("expected float32 data"),
    }
}
