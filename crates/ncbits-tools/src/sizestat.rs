//! Compressed versus uncompressed size statistics for a container.

use std::io::Write;

use ncbits::{ChunkRecord, ContainerReader, VarMeta};

use crate::report::{format_size_mb, format_size_smart};
use crate::ToolError;

struct DatasetSizes {
    meta: VarMeta,
    uncompressed: u64,
    on_disk: u64,
    chunks: Option<ChunkStats>,
}

struct ChunkStats {
    count: usize,
    min: u64,
    max: u64,
    mean: f64,
}

fn chunk_stats(records: &[ChunkRecord]) -> Option<ChunkStats> {
    if records.is_empty() {
        return None;
    }
    let mut min = u64::MAX;
    let mut max = 0;
    let mut sum = 0_u64;
    for record in records {
        min = min.min(record.payload_size);
        max = max.max(record.payload_size);
        sum += record.payload_size;
    }
    #[allow(clippy::cast_precision_loss)]
    Some(ChunkStats {
        count: records.len(),
        min,
        max,
        mean: sum as f64 / records.len() as f64,
    })
}

/// Prints per-variable and per-category size statistics of `reader` to
/// `out`. `source` names the analysed container in the table title.
///
/// Within each category (3-D+, 2-D, coordinate, other) variables are sorted
/// by on-disk size, largest first; each line reports the dataset's share of
/// the file total. A reader failure on one variable is logged and the
/// statistics continue without it.
///
/// # Errors
///
/// Errors if the report cannot be written.
pub fn size_stat<R: ContainerReader>(
    reader: &R,
    source: &str,
    out: &mut impl Write,
) -> Result<(), ToolError> {
    let dim_names: Vec<String> = reader
        .dimensions()
        .into_iter()
        .map(|dim| dim.name)
        .collect();

    let mut datasets = Vec::new();
    for meta in reader.variables() {
        let on_disk = match reader.storage_size(&meta.name) {
            Ok(size) => size,
            Err(err) => {
                log::warn!("cannot size variable {:?}: {err}", meta.name);
                continue;
            }
        };
        let chunks = if meta.chunk_shape.is_some() {
            match reader.chunk_info(&meta.name) {
                Ok(records) => chunk_stats(&records),
                Err(err) => {
                    log::warn!("cannot enumerate chunks of {:?}: {err}", meta.name);
                    None
                }
            }
        } else {
            None
        };

        datasets.push(DatasetSizes {
            uncompressed: meta.uncompressed_size(),
            on_disk,
            chunks,
            meta,
        });
    }

    let total_on_disk: u64 = datasets.iter().map(|d| d.on_disk).sum();
    let total_uncompressed: u64 = datasets.iter().map(|d| d.uncompressed).sum();

    writeln!(out)?;
    writeln!(out, "Size analysis: {source}")?;
    writeln!(out, "{}", "=".repeat(160))?;
    writeln!(
        out,
        "{:<47} {:<15} {:<15} {:<15} {:<10}",
        "Variable", "Compressed (MB)", "Original (MB)", "Compression", "File %"
    )?;
    writeln!(out, "{}", "-".repeat(160))?;

    let mut coordinate = Vec::new();
    let mut two_d = Vec::new();
    let mut many_d = Vec::new();
    let mut other = Vec::new();
    for dataset in &datasets {
        if dim_names.contains(&dataset.meta.name) {
            coordinate.push(dataset);
        } else if dataset.meta.rank() >= 3 {
            many_d.push(dataset);
        } else if dataset.meta.rank() == 2 {
            two_d.push(dataset);
        } else {
            other.push(dataset);
        }
    }

    print_category(out, "3D+ Variables", &mut many_d, total_on_disk)?;
    print_category(out, "2D Variables", &mut two_d, total_on_disk)?;
    print_category(out, "Coordinate Variables", &mut coordinate, total_on_disk)?;
    print_category(out, "Other Variables", &mut other, total_on_disk)?;

    #[allow(clippy::cast_precision_loss)]
    let overall_ratio = if total_on_disk > 0 {
        total_uncompressed as f64 / total_on_disk as f64
    } else {
        0.0
    };

    writeln!(out, "{}", "-".repeat(160))?;
    writeln!(
        out,
        "{:<40} {:<15} MB",
        "TOTAL COMPRESSED SIZE:",
        format_size_mb(total_on_disk)
    )?;
    writeln!(
        out,
        "{:<40} {:<15} MB",
        "TOTAL ORIGINAL SIZE:",
        format_size_mb(total_uncompressed)
    )?;
    writeln!(out, "{:<40} {overall_ratio:.1}x", "COMPRESSION RATIO:")?;
    writeln!(out, "{}", "=".repeat(160))?;

    Ok(())
}

fn print_category(
    out: &mut impl Write,
    title: &str,
    datasets: &mut [&DatasetSizes],
    total_on_disk: u64,
) -> Result<(), ToolError> {
    if datasets.is_empty() {
        return Ok(());
    }
    datasets.sort_by(|a, b| b.on_disk.cmp(&a.on_disk));

    writeln!(out, "{title}:")?;
    for dataset in datasets.iter() {
        #[allow(clippy::cast_precision_loss)]
        let ratio = if dataset.on_disk > 0 {
            dataset.uncompressed as f64 / dataset.on_disk as f64
        } else {
            0.0
        };
        #[allow(clippy::cast_precision_loss)]
        let proportion = if total_on_disk > 0 {
            dataset.on_disk as f64 / total_on_disk as f64 * 100.0
        } else {
            0.0
        };

        write!(
            out,
            "  {:<45} {:<15} {:<15} {ratio:>6.1}x{:<9} {proportion:>5.1}%",
            dataset.meta.name,
            format_size_mb(dataset.on_disk),
            format_size_mb(dataset.uncompressed),
            ""
        )?;
        if let Some(stats) = &dataset.chunks {
            if stats.count > 1 {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let mean = stats.mean as u64;
                write!(
                    out,
                    " ({} chunks: min={}, max={}, mean={})",
                    stats.count,
                    format_size_smart(stats.min),
                    format_size_smart(stats.max),
                    format_size_smart(mean)
                )?;
            }
        }
        writeln!(out)?;
    }
    writeln!(out)?;

    Ok(())
}
