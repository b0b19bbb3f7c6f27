//! End-to-end tests of the bit-rounding rewrite.

#![allow(clippy::unwrap_used)]

mod common;

use ndarray::{ArrayD, IxDyn};

use common::{container_with, dim, f32_bits, fill_attr, ramp_f32, var};
use ncbits::{
    AttrScope, ContainerReader as _, ContainerWriter as _, ElementType, Filter, SlabIter, Values,
};
use ncbits_bit_info::{bitinformation, get_keepbits, KeepBitsRule};
use ncbits_bit_round::bitround_inplace;
use ncbits_store::MemContainer;
use ncbits_tools::{bit_round_rewrite, RewriteConfig};

fn weather_input() -> MemContainer {
    let dims = [
        dim("time", 4, true),
        dim("lat", 16, false),
        dim("lon", 32, false),
    ];
    let mut lat_var = var("lat", ElementType::F32, &["lat"], &[16], None, Vec::new());
    lat_var.attrs.push(ncbits::Attr::text("units", "degrees_north"));
    let vars = [
        lat_var,
        var(
            "mask",
            ElementType::I32,
            &["lat", "lon"],
            &[16, 32],
            None,
            Vec::new(),
        ),
        var(
            "sst",
            ElementType::F32,
            &["lat", "lon"],
            &[16, 32],
            None,
            Vec::new(),
        ),
        var(
            "t3d",
            ElementType::F32,
            &["time", "lat", "lon"],
            &[4, 16, 32],
            Some(vec![1, 16, 32]),
            Vec::new(),
        ),
    ];
    let mut container = container_with(&dims, &vars);

    container
        .write_all("lat", &ramp_f32(&[16], -90.0))
        .unwrap();
    container
        .write_all(
            "mask",
            &Values::I32(ArrayD::from_shape_vec(IxDyn(&[16, 32]), (0..512).collect()).unwrap()),
        )
        .unwrap();
    container.write_all("sst", &ramp_f32(&[16, 32], 271.3)).unwrap();
    container
        .write_all("t3d", &ramp_f32(&[4, 16, 32], 250.0))
        .unwrap();
    container
}

fn config(inflevel: f64) -> RewriteConfig {
    RewriteConfig {
        inflevel,
        complevel: None,
        rule: KeepBitsRule::TailFilteredCdf,
    }
}

#[test]
fn full_inflevel_is_identity_on_clean_data() {
    let input = weather_input();
    let mut output = MemContainer::new();
    let mut report: Vec<u8> = Vec::new();

    let summary = bit_round_rewrite(&input, &mut output, &config(1.0), &mut report).unwrap();
    assert_eq!(summary.processed, 4);

    for name in ["sst", "t3d"] {
        assert_eq!(
            f32_bits(&output.read_all(name).unwrap()),
            f32_bits(&input.read_all(name).unwrap()),
            "{name} must be untouched at inflevel 1.0"
        );
    }
}

#[test]
fn passthrough_variables_are_bit_equal() {
    let input = weather_input();
    let mut output = MemContainer::new();
    let mut report: Vec<u8> = Vec::new();

    bit_round_rewrite(&input, &mut output, &config(0.5), &mut report).unwrap();

    // float32 coordinate
    assert_eq!(
        f32_bits(&output.read_all("lat").unwrap()),
        f32_bits(&input.read_all("lat").unwrap())
    );
    // non-float32 data
    assert_eq!(
        output.read_all("mask").unwrap(),
        input.read_all("mask").unwrap()
    );
    // attributes come across unchanged
    assert_eq!(
        output.attributes(AttrScope::Var("lat")).unwrap(),
        input.attributes(AttrScope::Var("lat")).unwrap()
    );
}

#[test]
fn small_variable_matches_direct_pipeline() {
    let input = weather_input();
    let mut output = MemContainer::new();
    let mut report: Vec<u8> = Vec::new();

    bit_round_rewrite(&input, &mut output, &config(0.9), &mut report).unwrap();

    let mut expected = input.read_all("sst").unwrap();
    {
        let data = expected.as_f32_slice_mut().unwrap();
        let info = bitinformation(data).unwrap();
        let nsb = get_keepbits(&info, 0.9, KeepBitsRule::TailFilteredCdf);
        bitround_inplace(data, nsb, None).unwrap();
    }
    assert_eq!(
        f32_bits(&output.read_all("sst").unwrap()),
        f32_bits(&expected)
    );

    let report = String::from_utf8(report).unwrap();
    assert!(report.contains("Variable sst: chunk_size=512, NSB="), "{report}");
}

#[test]
fn large_variable_rounds_slab_by_slab() {
    let input = weather_input();
    let mut output = MemContainer::new();
    let mut report: Vec<u8> = Vec::new();

    bit_round_rewrite(&input, &mut output, &config(0.9), &mut report).unwrap();

    let meta = input
        .variables()
        .into_iter()
        .find(|meta| meta.name == "t3d")
        .unwrap();
    let mut expected = input.read_all("t3d").unwrap();
    {
        let data = expected.as_f32_slice_mut().unwrap();
        for index in SlabIter::new(&meta.shape) {
            let slab_len = meta.shape[1] * meta.shape[2];
            let slab = &mut data[index[0] * slab_len..(index[0] + 1) * slab_len];
            let info = bitinformation(slab).unwrap();
            let nsb = get_keepbits(&info, 0.9, KeepBitsRule::TailFilteredCdf);
            bitround_inplace(slab, nsb, None).unwrap();
        }
    }
    assert_eq!(
        f32_bits(&output.read_all("t3d").unwrap()),
        f32_bits(&expected)
    );

    let report = String::from_utf8(report).unwrap();
    assert!(
        report.contains("Variable t3d: chunk_size=512, num_chunks=4"),
        "{report}"
    );
    assert!(report.contains("Processed 4/4 chunks, NSB min="), "{report}");
}

#[test]
fn nan_contamination_passes_variable_through() {
    let dims = [dim("lat", 8, false)];
    let vars = [var(
        "qc",
        ElementType::F32,
        &["lat"],
        &[8],
        None,
        Vec::new(),
    )];
    let mut input = container_with(&dims, &vars);
    let data = vec![1.0_f32, 2.0, f32::NAN, 4.0, 5.0, 6.0, 7.0, 8.0];
    input
        .write_all(
            "qc",
            &Values::F32(ArrayD::from_shape_vec(IxDyn(&[8]), data).unwrap()),
        )
        .unwrap();

    let mut output = MemContainer::new();
    let mut report: Vec<u8> = Vec::new();
    let summary = bit_round_rewrite(&input, &mut output, &config(0.5), &mut report).unwrap();

    assert_eq!(summary.rounded, 0);
    assert_eq!(
        f32_bits(&output.read_all("qc").unwrap()),
        f32_bits(&input.read_all("qc").unwrap())
    );
    let report = String::from_utf8(report).unwrap();
    assert!(report.contains("contains missing values or NaNs"), "{report}");
}

#[test]
fn fill_value_contamination_in_one_slab_aborts_whole_variable() {
    let dims = [
        dim("time", 3, true),
        dim("lat", 4, false),
        dim("lon", 4, false),
    ];
    let mut meta = var(
        "t",
        ElementType::F32,
        &["time", "lat", "lon"],
        &[3, 4, 4],
        Some(vec![1, 4, 4]),
        Vec::new(),
    );
    let fill = 9.96921e36_f32;
    meta.attrs.push(fill_attr(fill));
    let mut input = container_with(&dims, &[meta]);

    let mut values = ramp_f32(&[3, 4, 4], 10.0);
    if let Values::F32(a) = &mut values {
        // only the middle slab is contaminated
        a[[1, 2, 2]] = fill;
    }
    input.write_all("t", &values).unwrap();

    let mut output = MemContainer::new();
    let mut report: Vec<u8> = Vec::new();
    let summary = bit_round_rewrite(&input, &mut output, &config(0.5), &mut report).unwrap();

    assert_eq!(summary.rounded, 0);
    assert_eq!(
        f32_bits(&output.read_all("t").unwrap()),
        f32_bits(&input.read_all("t").unwrap())
    );
}

#[test]
fn compression_request_rewrites_layout() {
    let input = weather_input();
    let mut output = MemContainer::new();
    let mut report: Vec<u8> = Vec::new();

    let compressed = RewriteConfig {
        inflevel: 0.9,
        complevel: Some(5),
        rule: KeepBitsRule::TailFilteredCdf,
    };
    bit_round_rewrite(&input, &mut output, &compressed, &mut report).unwrap();

    let meta = |name: &str| {
        output
            .variables()
            .into_iter()
            .find(|meta| meta.name == name)
            .unwrap()
    };

    let t3d = meta("t3d");
    assert_eq!(t3d.chunk_shape, Some(vec![1, 16, 32]));
    assert_eq!(
        t3d.filters,
        vec![Filter::Shuffle, Filter::Deflate { level: 5 }]
    );

    let sst = meta("sst");
    assert_eq!(sst.chunk_shape, Some(vec![16, 32]));

    // the filters are lossless: data matches the uncompressed rewrite
    let mut plain = MemContainer::new();
    bit_round_rewrite(&input, &mut plain, &config(0.9), &mut Vec::<u8>::new()).unwrap();
    assert_eq!(
        f32_bits(&output.read_all("t3d").unwrap()),
        f32_bits(&plain.read_all("t3d").unwrap())
    );
}

#[test]
fn invalid_parameters_are_rejected() {
    let input = weather_input();
    let mut output = MemContainer::new();

    let bad_inflevel = RewriteConfig {
        inflevel: 1.5,
        complevel: None,
        rule: KeepBitsRule::TailFilteredCdf,
    };
    assert!(bit_round_rewrite(&input, &mut output, &bad_inflevel, &mut Vec::<u8>::new()).is_err());

    let bad_level = RewriteConfig {
        inflevel: 0.9,
        complevel: Some(12),
        rule: KeepBitsRule::TailFilteredCdf,
    };
    let mut output = MemContainer::new();
    assert!(bit_round_rewrite(&input, &mut output, &bad_level, &mut Vec::<u8>::new()).is_err());
}
