//! End-to-end tests of the size statistics report.

#![allow(clippy::unwrap_used)]

mod common;

use ndarray::{ArrayD, IxDyn};

use common::{container_with, dim, ramp_f32, var};
use ncbits::{ContainerReader as _, ContainerWriter as _, ElementType, Filter, Values};
use ncbits_tools::size_stat;

#[test]
fn categorised_sizes_and_totals() {
    let dims = [
        dim("time", 6, true),
        dim("lat", 8, false),
        dim("lon", 16, false),
    ];
    let vars = [
        var("lat", ElementType::F32, &["lat"], &[8], None, Vec::new()),
        var(
            "sst",
            ElementType::F32,
            &["lat", "lon"],
            &[8, 16],
            None,
            Vec::new(),
        ),
        var(
            "t3d",
            ElementType::F32,
            &["time", "lat", "lon"],
            &[6, 8, 16],
            Some(vec![2, 8, 16]),
            vec![Filter::Shuffle, Filter::Deflate { level: 6 }],
        ),
        var("count", ElementType::I64, &["time"], &[6], None, Vec::new()),
    ];
    let mut container = container_with(&dims, &vars);

    container.write_all("lat", &ramp_f32(&[8], -90.0)).unwrap();
    container.write_all("sst", &ramp_f32(&[8, 16], 271.0)).unwrap();
    // constant data compresses very well
    container
        .write_all("t3d", &Values::F32(ArrayD::from_elem(IxDyn(&[6, 8, 16]), 1.0)))
        .unwrap();
    container
        .write_all(
            "count",
            &Values::I64(ArrayD::from_shape_vec(IxDyn(&[6]), (0..6).collect()).unwrap()),
        )
        .unwrap();

    // deflated constant chunks use far less than 6*8*16*4 bytes
    let on_disk = container.storage_size("t3d").unwrap();
    assert!(on_disk < 3072, "on-disk size {on_disk}");

    let mut report: Vec<u8> = Vec::new();
    size_stat(&container, "weather.ncb", &mut report).unwrap();
    let report = String::from_utf8(report).unwrap();

    assert!(report.contains("Size analysis: weather.ncb"), "{report}");
    assert!(report.contains("3D+ Variables:"), "{report}");
    assert!(report.contains("2D Variables:"), "{report}");
    assert!(report.contains("Coordinate Variables:"), "{report}");
    assert!(report.contains("Other Variables:"), "{report}");

    // the chunked variable reports per-chunk statistics
    let t3d_line = report
        .lines()
        .find(|line| line.trim_start().starts_with("t3d"))
        .unwrap();
    assert!(t3d_line.contains("(3 chunks: min="), "{t3d_line}");

    assert!(report.contains("TOTAL COMPRESSED SIZE:"), "{report}");
    assert!(report.contains("TOTAL ORIGINAL SIZE:"), "{report}");
    assert!(report.contains("COMPRESSION RATIO:"), "{report}");
}

#[test]
fn categories_sort_by_on_disk_size() {
    let dims = [dim("lat", 64, false), dim("lon", 64, false)];
    let vars = [
        var(
            "small2d",
            ElementType::I16,
            &["lat", "lon"],
            &[64, 64],
            None,
            Vec::new(),
        ),
        var(
            "big2d",
            ElementType::F64,
            &["lat", "lon"],
            &[64, 64],
            None,
            Vec::new(),
        ),
    ];
    let mut container = container_with(&dims, &vars);
    container
        .write_all(
            "small2d",
            &Values::I16(ArrayD::from_elem(IxDyn(&[64, 64]), 1)),
        )
        .unwrap();
    container
        .write_all(
            "big2d",
            &Values::F64(ArrayD::from_elem(IxDyn(&[64, 64]), 1.0)),
        )
        .unwrap();

    let mut report: Vec<u8> = Vec::new();
    size_stat(&container, "sorted.ncb", &mut report).unwrap();
    let report = String::from_utf8(report).unwrap();

    let big = report.find("big2d").unwrap();
    let small = report.find("small2d").unwrap();
    assert!(big < small, "larger datasets print first:\n{report}");
}
