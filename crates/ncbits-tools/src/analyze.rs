//! Per-bit-position constancy analysis over a whole container.

use std::io::Write;

use ncbits::{slab_label, ContainerReader, SlabIter, Values, VarMeta};
use ncbits_bit_pattern::{summarize, BitPatternSummary};

use crate::report::{rule, shape_string, NAME_WIDTH, SHAPE_WIDTH};
use crate::ToolError;

/// Tally of one analysis run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AnalyzeSummary {
    /// Total number of variables visited.
    pub total_vars: usize,
    /// Variables analysed slab by slab (rank ≥ 3).
    pub slab_analyzed: usize,
}

fn summarize_values(values: &Values) -> Option<BitPatternSummary> {
    match values {
        Values::I16(a) => a.as_slice().map(summarize),
        Values::U16(a) => a.as_slice().map(summarize),
        Values::I32(a) => a.as_slice().map(summarize),
        Values::U32(a) => a.as_slice().map(summarize),
        Values::I64(a) => a.as_slice().map(summarize),
        Values::U64(a) => a.as_slice().map(summarize),
        Values::F32(a) => a.as_slice().map(summarize),
        Values::F64(a) => a.as_slice().map(summarize),
        Values::Text(_) | Values::Str(_) | Values::Opaque { .. } => None,
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

fn is_coordinate(meta: &VarMeta, dim_names: &[String]) -> bool {
    dim_names.iter().any(|name| name == &meta.name)
}

/// Analyses the bit patterns of every variable of `reader` and prints the
/// fixed-width report to `out`.
///
/// Coordinate variables, scalars, and variables of unsupported element types
/// are noted and skipped. Variables of rank ≥ 3 are analysed per 2-D slab
/// over the trailing two dimensions, in row-major order of the leading
/// indices. A reader failure on one variable is logged and the analysis
/// continues with the next.
///
/// # Errors
///
/// Errors if the report cannot be written.
pub fn bit_analyze<R: ContainerReader>(
    reader: &R,
    out: &mut impl Write,
) -> Result<AnalyzeSummary, ToolError> {
    let dim_names: Vec<String> = reader
        .dimensions()
        .into_iter()
        .map(|dim| dim.name)
        .collect();
    let vars = reader.variables();

    writeln!(out, "Dataset contains {} data variables", vars.len())?;
    writeln!(out, "{}", rule())?;
    writeln!(
        out,
        "{:<NAME_WIDTH$} {:<SHAPE_WIDTH$} {}",
        "Variable", "Shape", "Bit Pattern (MSB->LSB)"
    )?;
    writeln!(out, "{}", rule())?;

    let mut summary = AnalyzeSummary {
        total_vars: vars.len(),
        ..AnalyzeSummary::default()
    };

    for meta in &vars {
        let shape_str = shape_string(&meta.shape);

        if is_coordinate(meta, &dim_names) {
            writeln!(
                out,
                "{:<NAME_WIDTH$} {shape_str:<SHAPE_WIDTH$} (skipped - coordinate variable)",
                meta.name
            )?;
            continue;
        }
        if meta.total_len() <= 1 {
            writeln!(
                out,
                "{:<NAME_WIDTH$} {:<SHAPE_WIDTH$} (skipped - single value)",
                meta.name, "N/A"
            )?;
            continue;
        }
        if meta.dtype.bit_width().is_none() {
            writeln!(
                out,
                "{:<NAME_WIDTH$} {:<SHAPE_WIDTH$} (skipped - unsupported type)",
                meta.name, "N/A"
            )?;
            continue;
        }

        if meta.rank() >= 3 {
            summary.slab_analyzed += 1;
            analyze_slabs(reader, meta, &shape_str, out)?;
        } else {
            match reader.read_all(&meta.name) {
                Ok(values) => match summarize_values(&values) {
                    Some(pattern) => writeln!(
                        out,
                        "{:<NAME_WIDTH$} {shape_str:<SHAPE_WIDTH$} {}",
                        meta.name,
                        pattern.pattern()
                    )?,
                    None => writeln!(
                        out,
                        "{:<NAME_WIDTH$} {shape_str:<SHAPE_WIDTH$} (analysis failed)",
                        meta.name
                    )?,
                },
                Err(err) => {
                    log::warn!("cannot read variable {:?}: {err}", meta.name);
                }
            }
        }
    }

    writeln!(out, "{}", rule())?;
    writeln!(out, "Analysis complete for {} variables", summary.total_vars)?;
    writeln!(
        out,
        "  {} variables analyzed slice-by-slice (3D+)",
        summary.slab_analyzed
    )?;
    writeln!(
        out,
        "  {} variables analyzed as whole (<=2D)",
        summary.total_vars - summary.slab_analyzed
    )?;
    writeln!(out)?;
    writeln!(out, "Summary:")?;
    writeln!(
        out,
        "  Bit patterns show the state of each bit position across all values"
    )?;
    writeln!(out, "  '0' = all values have 0 at this bit position")?;
    writeln!(out, "  '1' = all values have 1 at this bit position")?;
    writeln!(
        out,
        "  '-' = mixed (some values have 0, some have 1)"
    )?;
    writeln!(
        out,
        "  Pattern format: (MSB) xxxxxxxx xxxxxxxx xxxxxxxx xxxxxxxx (LSB)"
    )?;

    Ok(summary)
}

fn analyze_slabs<R: ContainerReader>(
    reader: &R,
    meta: &VarMeta,
    shape_str: &str,
    out: &mut impl Write,
) -> Result<(), ToolError> {
    let rank = meta.rank();
    let slab_shape = &meta.shape[rank - 2..];
    let slab_shape_str = shape_string(slab_shape);

    writeln!(out, "{} (3D+)", meta.name)?;
    writeln!(
        out,
        "  {:<43} {shape_str:<SHAPE_WIDTH$} {}",
        "Slice", "Bit Pattern (MSB->LSB)"
    )?;

    for index in SlabIter::new(&meta.shape) {
        let mut start = index.clone();
        start.extend([0, 0]);
        let mut count = vec![1; rank - 2];
        count.extend_from_slice(slab_shape);

        let values = match reader.read_hyperslab(&meta.name, &start, &count) {
            Ok(values) => values,
            Err(err) => {
                log::warn!(
                    "cannot read slice {} of variable {:?}: {err}",
                    slab_label(&index),
                    meta.name
                );
                continue;
            }
        };

        if let Some(pattern) = summarize_values(&values) {
            writeln!(
                out,
                "  {:<43} {slab_shape_str:<SHAPE_WIDTH$} {}",
                slab_label(&index),
                pattern.pattern()
            )?;
        }
    }

    Ok(())
}
