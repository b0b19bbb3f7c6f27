//! End-to-end tests of the raw-chunk concatenation.

#![allow(clippy::unwrap_used)]

mod common;

use common::{container_with, dim, f32_bits, ramp_f32, var};
use ncbits::{
    Attr, AttrScope, AttrValue, ContainerReader as _, ContainerWriter as _, ElementType, Filter,
    Values,
};
use ncbits_store::MemContainer;
use ncbits_tools::{concat, ToolError};

fn input_with(time_extent: usize, chunk_time: usize, offset: f32) -> MemContainer {
    let dims = [
        dim("time", time_extent, true),
        dim("lat", 4, false),
        dim("lon", 6, false),
    ];
    let vars = [
        var("lat", ElementType::F32, &["lat"], &[4], None, Vec::new()),
        var(
            "t",
            ElementType::F32,
            &["time", "lat", "lon"],
            &[time_extent, 4, 6],
            Some(vec![chunk_time, 4, 6]),
            vec![Filter::Shuffle, Filter::Deflate { level: 6 }],
        ),
    ];
    let mut container = container_with(&dims, &vars);
    container.write_all("lat", &ramp_f32(&[4], -90.0)).unwrap();
    container
        .write_all("t", &ramp_f32(&[time_extent, 4, 6], offset))
        .unwrap();
    container
}

fn concatenated_bits(inputs: &[&MemContainer]) -> Vec<u32> {
    let mut bits = Vec::new();
    for input in inputs {
        bits.extend(f32_bits(&input.read_all("t").unwrap()));
    }
    bits
}

#[test]
fn aligned_chunks_are_copied_raw() {
    let first = input_with(10, 1, 250.0);
    let second = input_with(7, 1, 260.0);
    let mut output = MemContainer::new();

    concat(
        &[first.clone(), second.clone()],
        &mut output,
        "ncbits concat a.ncb b.ncb out.ncb",
    )
    .unwrap();

    // summed record extent
    let meta = output
        .variables()
        .into_iter()
        .find(|meta| meta.name == "t")
        .unwrap();
    assert_eq!(meta.shape, vec![17, 4, 6]);

    // the second input's chunks land at record coordinates 10..=16
    let origins: Vec<usize> = output
        .chunk_info("t")
        .unwrap()
        .iter()
        .map(|record| record.origin[0])
        .collect();
    assert_eq!(origins, (0..17).collect::<Vec<usize>>());

    // raw copy leaves the payload bytes untouched
    let (src_mask, src_payload) = second.read_raw_chunk("t", &[0, 0, 0]).unwrap();
    let (dst_mask, dst_payload) = output.read_raw_chunk("t", &[10, 0, 0]).unwrap();
    assert_eq!(src_mask, dst_mask);
    assert_eq!(src_payload, dst_payload);

    // record data is the concatenation of the inputs
    assert_eq!(
        f32_bits(&output.read_all("t").unwrap()),
        concatenated_bits(&[&first, &second])
    );

    // non-record datasets equal the first input's bit for bit
    assert_eq!(
        f32_bits(&output.read_all("lat").unwrap()),
        f32_bits(&first.read_all("lat").unwrap())
    );
}

#[test]
fn short_trailing_chunk_falls_back_to_hyperslab() {
    // chunk extent 4 over a record extent of 10 leaves a short chunk at 8,
    // and shifts every later chunk off the grid
    let first = input_with(10, 4, 10.0);
    let second = input_with(6, 4, 20.0);
    let mut output = MemContainer::new();

    concat(
        &[first.clone(), second.clone()],
        &mut output,
        "ncbits concat a.ncb b.ncb out.ncb",
    )
    .unwrap();

    let meta = output
        .variables()
        .into_iter()
        .find(|meta| meta.name == "t")
        .unwrap();
    assert_eq!(meta.shape, vec![16, 4, 6]);

    // every stored chunk origin still lies on the chunk grid
    for record in output.chunk_info("t").unwrap() {
        assert_eq!(record.origin[0] % 4, 0, "origin {:?}", record.origin);
    }

    assert_eq!(
        f32_bits(&output.read_all("t").unwrap()),
        concatenated_bits(&[&first, &second])
    );
}

#[test]
fn three_inputs_accumulate_offsets() {
    let first = input_with(3, 1, 1.0);
    let second = input_with(4, 1, 2.0);
    let third = input_with(2, 1, 3.0);
    let mut output = MemContainer::new();

    concat(
        &[first.clone(), second.clone(), third.clone()],
        &mut output,
        "ncbits concat a b c out",
    )
    .unwrap();

    assert_eq!(
        f32_bits(&output.read_all("t").unwrap()),
        concatenated_bits(&[&first, &second, &third])
    );
}

#[test]
fn history_attribute_is_prepended() {
    let mut first = input_with(3, 1, 1.0);
    first
        .put_attribute(
            AttrScope::Global,
            Attr::text("history", "2020-01-01 00:00:00 UTC: created\n"),
        )
        .unwrap();
    let second = input_with(2, 1, 2.0);
    let mut output = MemContainer::new();

    concat(&[first, second], &mut output, "ncbits concat a b out").unwrap();

    let history = output
        .attributes(AttrScope::Global)
        .unwrap()
        .into_iter()
        .find(|attr| attr.name == "history")
        .unwrap();
    let AttrValue::Text(history) = history.value else {
        panic!("history must be text");
    };
    let mut lines = history.lines();
    let newest = lines.next().unwrap();
    assert!(newest.ends_with("UTC: ncbits concat a b out"), "{newest}");
    assert_eq!(lines.next().unwrap(), "2020-01-01 00:00:00 UTC: created");
}

#[test]
fn dimension_references_are_rewritten_by_path() {
    let mut first = input_with(3, 1, 1.0);
    first
        .put_attribute(
            AttrScope::Var("t"),
            Attr {
                name: "DIMENSION_LIST".to_owned(),
                value: AttrValue::TextVec(vec!["<stale object reference>".to_owned()]),
            },
        )
        .unwrap();
    let mut second = input_with(2, 1, 2.0);
    second
        .put_attribute(
            AttrScope::Var("t"),
            Attr {
                name: "DIMENSION_LIST".to_owned(),
                value: AttrValue::TextVec(vec!["<stale object reference>".to_owned()]),
            },
        )
        .unwrap();
    let mut output = MemContainer::new();

    concat(&[first, second], &mut output, "ncbits concat a b out").unwrap();

    let attr = output
        .attributes(AttrScope::Var("t"))
        .unwrap()
        .into_iter()
        .find(|attr| attr.name == "DIMENSION_LIST")
        .unwrap();
    assert_eq!(
        attr.value,
        AttrValue::TextVec(vec![
            "/time".to_owned(),
            "/lat".to_owned(),
            "/lon".to_owned()
        ])
    );
}

#[test]
fn fewer_than_two_inputs_is_invalid() {
    let only = input_with(3, 1, 1.0);
    let mut output = MemContainer::new();
    let err = concat(&[only], &mut output, "ncbits concat a out");
    assert!(matches!(err, Err(ToolError::InvalidInput { .. })));
}

#[test]
fn missing_record_dataset_is_a_schema_mismatch() {
    let first = input_with(3, 1, 1.0);

    let dims = [
        dim("time", 2, true),
        dim("lat", 4, false),
        dim("lon", 6, false),
    ];
    let second = container_with(
        &dims,
        &[var("lat", ElementType::F32, &["lat"], &[4], None, Vec::new())],
    );

    let mut output = MemContainer::new();
    let err = concat(&[first, second], &mut output, "ncbits concat a b out");
    assert!(matches!(err, Err(ToolError::SchemaMismatch { .. })));
}

#[test]
fn differing_chunk_shapes_are_a_schema_mismatch() {
    let first = input_with(4, 1, 1.0);
    let second = input_with(4, 2, 2.0);
    let mut output = MemContainer::new();
    let err = concat(&[first, second], &mut output, "ncbits concat a b out");
    assert!(matches!(err, Err(ToolError::SchemaMismatch { .. })));
}

#[test]
fn no_record_variables_is_invalid() {
    let dims = [dim("lat", 4, false)];
    let vars = [var("lat", ElementType::F32, &["lat"], &[4], None, Vec::new())];
    let mut first = container_with(&dims, &vars);
    first.write_all("lat", &ramp_f32(&[4], 0.0)).unwrap();
    let second = first.clone();

    let mut output = MemContainer::new();
    let err = concat(&[first, second], &mut output, "ncbits concat a b out");
    assert!(matches!(err, Err(ToolError::InvalidInput { .. })));
}

#[test]
fn second_input_values_land_after_first() {
    let first = input_with(2, 1, 5.0);
    let second = input_with(2, 1, 50.0);
    let mut output = MemContainer::new();

    concat(&[first, second.clone()], &mut output, "ncbits concat a b out").unwrap();

    let tail = output.read_hyperslab("t", &[2, 0, 0], &[2, 4, 6]).unwrap();
    let Values::F32(tail) = tail else {
        panic!("expected float32 data");
    };
    let Values::F32(expected) = second.read_all("t").unwrap() else {
        panic!("expected float32 data");
    };
    assert_eq!(
        tail.iter().map(|x| x.to_bits()).collect::<Vec<u32>>(),
        expected.iter().map(|x| x.to_bits()).collect::<Vec<u32>>()
    );
}
