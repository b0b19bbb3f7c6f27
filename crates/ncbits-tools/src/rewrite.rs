//! Information-preserving bit-rounding rewrite of a whole container.

use std::io::Write;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use ncbits::{
    classify, AttrScope, ContainerReader, ContainerWriter, DimMeta, ElementType, Filter, SlabIter,
    VarClass, VarMeta,
};
use ncbits_bit_info::{bitinformation_with, get_keepbits, BitInfoError, BitpairCounter, KeepBitsRule};
use ncbits_bit_round::bitround_inplace;

use crate::ToolError;

/// Parameters of one rewrite run.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RewriteConfig {
    /// Target fraction of total cleaned information to preserve, in `[0, 1]`.
    pub inflevel: f64,
    /// Deflate level in `[1, 9]`; when set, output variables are defined with
    /// the shuffle filter followed by deflate at this level.
    #[serde(default)]
    pub complevel: Option<u8>,
    /// Spectrum-cleaning rule of the keep-bits selector.
    #[serde(default)]
    pub rule: KeepBitsRule,
}

impl RewriteConfig {
    /// Validates the caller-supplied parameters.
    ///
    /// # Errors
    ///
    /// Errors with [`ToolError::InvalidInput`] if `inflevel` is outside
    /// `[0, 1]` or `complevel` is outside `[1, 9]`.
    pub fn validate(&self) -> Result<(), ToolError> {
        if !self.inflevel.is_finite() || !(0.0..=1.0).contains(&self.inflevel) {
            return Err(ToolError::invalid_input(format!(
                "inflevel must be between 0.0 and 1.0, got {}",
                self.inflevel
            )));
        }
        if let Some(level) = self.complevel {
            if !(1..=9).contains(&level) {
                return Err(ToolError::invalid_input(format!(
                    "compression level must be between 1 and 9, got {level}"
                )));
            }
        }
        Ok(())
    }
}

/// Tally of one rewrite run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Variables written to the output.
    pub processed: usize,
    /// Variables that received bit rounding.
    pub rounded: usize,
}

enum ChunkOutcome {
    Rounded(u8),
    Contaminated,
    TooSmall,
}

fn chunk_contaminated(data: &[f32], missing: Option<f32>) -> bool {
    data.iter()
        .any(|x| x.is_nan() || missing.is_some_and(|m| *x == m))
}

fn round_chunk(
    data: &mut [f32],
    missing: Option<f32>,
    config: &RewriteConfig,
    counter: &mut BitpairCounter,
) -> Result<ChunkOutcome, ToolError> {
    if chunk_contaminated(data, missing) {
        return Ok(ChunkOutcome::Contaminated);
    }
    let info = match bitinformation_with(counter, data) {
        Ok(info) => info,
        Err(BitInfoError::InsufficientSamples { .. }) => return Ok(ChunkOutcome::TooSmall),
    };
    let nsb = get_keepbits(&info, config.inflevel, config.rule);
    bitround_inplace(data, nsb, missing)?;
    Ok(ChunkOutcome::Rounded(nsb))
}

fn output_meta(meta: &VarMeta, dims: &[DimMeta], complevel: Option<u8>) -> VarMeta {
    let mut out = meta.clone();
    let Some(level) = complevel else {
        // no compression requested: keep chunking and filters verbatim
        return out;
    };
    if meta.dtype == ElementType::Str || meta.rank() == 0 || meta.shape.contains(&0) {
        return out;
    }

    let rank = meta.rank();
    let chunk_shape = if rank >= 3 && classify(meta, dims) == VarClass::Large {
        let mut chunk = vec![1; rank];
        chunk[rank - 2] = meta.shape[rank - 2];
        chunk[rank - 1] = meta.shape[rank - 1];
        chunk
    } else {
        meta.shape.clone()
    };

    out.chunk_shape = Some(chunk_shape);
    out.filters = vec![Filter::Shuffle, Filter::Deflate { level }];
    out
}

/// Rewrites `reader` into `writer`, bit rounding every float32 data variable
/// at the configured information-preservation level.
///
/// Coordinate variables, scalars, and non-float32 variables pass through
/// unchanged. A variable whose data contains NaN or its declared
/// `_FillValue` in any chunk is copied unchanged and noted. Small (rank ≤ 2)
/// variables are rounded whole; large (rank ≥ 3) variables are rounded one
/// 2-D slab at a time with per-variable NSB minimum/maximum statistics.
/// All attributes are copied unchanged.
///
/// Reader failures on a single variable are logged and the rewrite continues
/// with the next variable; writer failures are fatal.
///
/// # Errors
///
/// Errors with [`ToolError::InvalidInput`] on out-of-range parameters, or if
/// the writer or the report output fails.
pub fn bit_round_rewrite<R: ContainerReader, W: ContainerWriter>(
    reader: &R,
    writer: &mut W,
    config: &RewriteConfig,
    out: &mut impl Write,
) -> Result<RewriteSummary, ToolError> {
    config.validate()?;

    let dims = reader.dimensions();
    for dim in &dims {
        writer.define_dimension(dim)?;
    }
    let vars = reader.variables();
    for meta in &vars {
        writer.create_var(&output_meta(meta, &dims, config.complevel))?;
    }
    for attr in reader.attributes(AttrScope::Global)? {
        writer.put_attribute(AttrScope::Global, attr)?;
    }

    let mut counter = BitpairCounter::new();
    let mut summary = RewriteSummary::default();

    for meta in &vars {
        summary.processed += 1;
        match classify(meta, &dims) {
            VarClass::Coordinate => {
                writeln!(
                    out,
                    "Variable {}: skipping bitrounding (coordinate variable)",
                    meta.name
                )?;
                copy_whole(reader, writer, meta)?;
            }
            VarClass::NonFloat32 => {
                writeln!(out, "Variable {}: dtype={}, passthrough", meta.name, meta.dtype)?;
                copy_whole(reader, writer, meta)?;
            }
            VarClass::Scalar => {
                writeln!(out, "Variable {}: skipping bitrounding (scalar)", meta.name)?;
                copy_whole(reader, writer, meta)?;
            }
            VarClass::Small => {
                if round_small(reader, writer, meta, config, &mut counter, out)? {
                    summary.rounded += 1;
                }
            }
            VarClass::Large => {
                if round_large(reader, writer, meta, config, &mut counter, out)? {
                    summary.rounded += 1;
                }
            }
        }
    }

    writer.flush()?;
    Ok(summary)
}

fn copy_whole<R: ContainerReader, W: ContainerWriter>(
    reader: &R,
    writer: &mut W,
    meta: &VarMeta,
) -> Result<(), ToolError> {
    match reader.read_all(&meta.name) {
        Ok(values) => {
            writer.write_all(&meta.name, &values)?;
        }
        Err(err) => {
            log::warn!("cannot read variable {:?}: {err}", meta.name);
        }
    }
    Ok(())
}

fn round_small<R: ContainerReader, W: ContainerWriter>(
    reader: &R,
    writer: &mut W,
    meta: &VarMeta,
    config: &RewriteConfig,
    counter: &mut BitpairCounter,
    out: &mut impl Write,
) -> Result<bool, ToolError> {
    let mut values = match reader.read_all(&meta.name) {
        Ok(values) => values,
        Err(err) => {
            log::warn!("cannot read variable {:?}: {err}", meta.name);
            return Ok(false);
        }
    };
    let missing = meta.fill_value_f32();

    let outcome = match values.as_f32_slice_mut() {
        Some(data) => round_chunk(data, missing, config, counter)?,
        None => ChunkOutcome::TooSmall,
    };

    let rounded = match outcome {
        ChunkOutcome::Rounded(nsb) => {
            writeln!(
                out,
                "Variable {}: chunk_size={}, NSB={nsb}",
                meta.name,
                values.len()
            )?;
            true
        }
        ChunkOutcome::Contaminated => {
            writeln!(
                out,
                "Variable {}: skipping bitrounding (contains missing values or NaNs)",
                meta.name
            )?;
            log::info!("variable {:?} contains missing", meta.name);
            false
        }
        ChunkOutcome::TooSmall => {
            writeln!(out, "Variable {}: NSB analysis failed or invalid", meta.name)?;
            false
        }
    };

    writer.write_all(&meta.name, &values)?;
    Ok(rounded)
}

fn slab_selection(meta: &VarMeta, index: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let rank = meta.rank();
    let mut start = index.to_vec();
    start.extend([0, 0]);
    let mut count = vec![1; rank - 2];
    count.extend_from_slice(&meta.shape[rank - 2..]);
    (start, count)
}

fn round_large<R: ContainerReader, W: ContainerWriter>(
    reader: &R,
    writer: &mut W,
    meta: &VarMeta,
    config: &RewriteConfig,
    counter: &mut BitpairCounter,
    out: &mut impl Write,
) -> Result<bool, ToolError> {
    let missing = meta.fill_value_f32();
    let num_slabs = SlabIter::new(&meta.shape).count_slabs();
    let slab_len: usize = meta.shape[meta.rank() - 2..].iter().product();

    // contamination is decided per chunk but aborts rounding for the whole
    // variable, so scan before writing anything
    for index in SlabIter::new(&meta.shape) {
        let (start, count) = slab_selection(meta, &index);
        let values = match reader.read_hyperslab(&meta.name, &start, &count) {
            Ok(values) => values,
            Err(err) => {
                log::warn!("cannot read variable {:?}: {err}", meta.name);
                return Ok(false);
            }
        };
        let contaminated = values
            .as_f32_slice()
            .is_some_and(|data| chunk_contaminated(data, missing));
        if contaminated {
            writeln!(
                out,
                "Variable {}: skipping bitrounding (contains missing values or NaNs)",
                meta.name
            )?;
            log::info!("variable {:?} contains missing", meta.name);
            return copy_slabs(reader, writer, meta).map(|()| false);
        }
    }

    writeln!(
        out,
        "Variable {}: chunk_size={slab_len}, num_chunks={num_slabs}",
        meta.name
    )?;

    let mut done = 0_usize;
    let mut min_nsb = u8::MAX;
    let mut max_nsb = u8::MIN;

    for index in SlabIter::new(&meta.shape) {
        let (start, count) = slab_selection(meta, &index);
        let mut values = match reader.read_hyperslab(&meta.name, &start, &count) {
            Ok(values) => values,
            Err(err) => {
                log::warn!("cannot read variable {:?}: {err}", meta.name);
                return Ok(false);
            }
        };

        if let Some(data) = values.as_f32_slice_mut() {
            if let ChunkOutcome::Rounded(nsb) = round_chunk(data, missing, config, counter)? {
                done += 1;
                min_nsb = min_nsb.min(nsb);
                max_nsb = max_nsb.max(nsb);
            }
        }
        writer.write_hyperslab(&meta.name, &start, &count, &values)?;
    }

    if done > 0 {
        writeln!(
            out,
            "  Processed {done}/{num_slabs} chunks, NSB min={min_nsb} max={max_nsb}"
        )?;
        Ok(true)
    } else {
        writeln!(out, "  No chunks processed successfully")?;
        Ok(false)
    }
}

fn copy_slabs<R: ContainerReader, W: ContainerWriter>(
    reader: &R,
    writer: &mut W,
    meta: &VarMeta,
) -> Result<(), ToolError> {
    for index in SlabIter::new(&meta.shape) {
        let (start, count) = slab_selection(meta, &index);
        let values = match reader.read_hyperslab(&meta.name, &start, &count) {
            Ok(values) => values,
            Err(err) => {
                log::warn!("cannot read variable {:?}: {err}", meta.name);
                return Ok(());
            }
        };
        writer.write_hyperslab(&meta.name, &start, &count, &values)?;
    }
    Ok(())
}
