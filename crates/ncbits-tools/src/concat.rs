//! Concatenation of containers along their unlimited record dimension
//! without decoding or re-encoding chunk payloads.

use ncbits::{Attr, AttrScope, AttrValue, ContainerReader, ContainerWriter, VarMeta};

use crate::ToolError;

/// Variable-scope attribute that references dimension scales by path.
const DIMENSION_LIST_ATTR: &str = "DIMENSION_LIST";
/// Root attribute that records the processing history of a container.
const HISTORY_ATTR: &str = "history";

struct RecordVar {
    name: String,
    rec_axis: usize,
    total_len: usize,
    offset: usize,
}

fn find_var(metas: &[VarMeta], name: &str) -> Result<VarMeta, ToolError> {
    metas
        .iter()
        .find(|meta| meta.name == name)
        .cloned()
        .ok_or_else(|| ToolError::schema_mismatch(format!("dataset {name:?} missing in an input")))
}

/// Concatenates `inputs` into `writer` along the unlimited dimension.
///
/// Record variables are discovered in the first input; the whole metadata
/// and attribute tree is cloned from it, record datasets are extended to the
/// summed extents, and every input's chunks are appended with the chunk
/// coordinate shifted by the running record offset. A chunk whose shifted
/// coordinate is off the chunk grid, or whose extent does not match the
/// extent expected at the target coordinate, is moved through a decoded
/// hyperslab instead of a raw copy.
///
/// A `history` entry of the form `"YYYY-MM-DD HH:MM:SS UTC: <command>"` is
/// prepended to the root history attribute. All errors are fatal except
/// per-attribute copy failures, which degrade to warnings.
///
/// # Errors
///
/// Errors with [`ToolError::InvalidInput`] for fewer than two inputs or when
/// no record variable exists, with [`ToolError::SchemaMismatch`] when the
/// inputs disagree on a record dataset's presence, shape, chunking, or
/// filters, and with [`ToolError::Container`] on any reader or writer
/// failure.
pub fn concat<R: ContainerReader, W: ContainerWriter>(
    inputs: &[R],
    writer: &mut W,
    command_line: &str,
) -> Result<(), ToolError> {
    if inputs.len() < 2 {
        return Err(ToolError::invalid_input(format!(
            "concatenation needs at least 2 inputs, got {}",
            inputs.len()
        )));
    }

    let first = &inputs[0];
    let dims = first.dimensions();
    let vars = first.variables();

    // 1. discover record variables in the first input
    let unlimited: Vec<&str> = dims
        .iter()
        .filter(|dim| dim.is_unlimited)
        .map(|dim| dim.name.as_str())
        .collect();

    let mut record_vars = Vec::new();
    for meta in &vars {
        let rec_axis = meta
            .dims
            .iter()
            .position(|name| unlimited.contains(&name.as_str()));
        match rec_axis {
            Some(rec_axis) => {
                if meta.chunk_shape.is_none() {
                    return Err(ToolError::schema_mismatch(format!(
                        "record dataset {:?} is not chunked",
                        meta.name
                    )));
                }
                record_vars.push(RecordVar {
                    name: meta.name.clone(),
                    rec_axis,
                    total_len: 0,
                    offset: 0,
                });
            }
            None => {
                log::info!(
                    "fixed-size dataset {:?} - copied from first file only",
                    meta.name
                );
            }
        }
    }
    if record_vars.is_empty() {
        return Err(ToolError::invalid_input(
            "no unlimited datasets found - nothing to concatenate",
        ));
    }
    log::info!("found {} record variables", record_vars.len());

    // 2. sum record extents over all inputs, validating the shared schema
    for input in inputs {
        let metas = input.variables();
        for rec in &mut record_vars {
            let meta = find_var(&metas, &rec.name)?;
            let reference = find_var(&vars, &rec.name)?;
            if meta.chunk_shape != reference.chunk_shape {
                return Err(ToolError::schema_mismatch(format!(
                    "chunk shape of {:?} differs between inputs",
                    rec.name
                )));
            }
            if meta.filters != reference.filters {
                return Err(ToolError::schema_mismatch(format!(
                    "filter stack of {:?} differs between inputs",
                    rec.name
                )));
            }
            if meta.shape.len() != reference.shape.len() {
                return Err(ToolError::schema_mismatch(format!(
                    "rank of {:?} differs between inputs",
                    rec.name
                )));
            }
            for axis in 0..reference.shape.len() {
                if axis != rec.rec_axis && meta.shape[axis] != reference.shape[axis] {
                    return Err(ToolError::schema_mismatch(format!(
                        "fixed extent of {:?} differs between inputs",
                        rec.name
                    )));
                }
            }
            rec.total_len += meta.shape[rec.rec_axis];
        }
    }

    // 3. clone the metadata and attribute tree of the first input
    for dim in &dims {
        writer.define_dimension(dim)?;
    }
    for meta in &vars {
        writer.create_var(meta)?;
        // dimension references are carried by path, never by object id
        if meta.attr(DIMENSION_LIST_ATTR).is_some() {
            let paths: Vec<String> = meta.dims.iter().map(|name| format!("/{name}")).collect();
            let attr = Attr {
                name: DIMENSION_LIST_ATTR.to_owned(),
                value: AttrValue::TextVec(paths),
            };
            if let Err(err) = writer.put_attribute(AttrScope::Var(&meta.name), attr) {
                log::warn!("failed to rewrite dimension list of {:?}: {err}", meta.name);
            }
        }
    }
    for attr in first.attributes(AttrScope::Global)? {
        if let Err(err) = writer.put_attribute(AttrScope::Global, attr) {
            log::warn!("failed to copy a root attribute: {err}");
        }
    }

    // non-record datasets carry their data over from the first input only
    let record_names: Vec<&str> = record_vars.iter().map(|rec| rec.name.as_str()).collect();
    for meta in &vars {
        if record_names.contains(&meta.name.as_str()) {
            continue;
        }
        let values = first.read_all(&meta.name)?;
        writer.write_all(&meta.name, &values)?;
    }

    // 4. extend record datasets to their accumulated extents
    for rec in &record_vars {
        let meta = find_var(&vars, &rec.name)?;
        let mut shape = meta.shape.clone();
        shape[rec.rec_axis] = rec.total_len;
        writer.set_extent(&rec.name, &shape)?;
    }

    // 5. append every input's chunks at the running record offset
    for (file_index, input) in inputs.iter().enumerate() {
        log::info!("processing input {}/{}", file_index + 1, inputs.len());

        let metas = input.variables();
        for rec in &mut record_vars {
            let meta = find_var(&metas, &rec.name)?;
            let chunk_shape = meta.chunk_shape.clone().ok_or_else(|| {
                ToolError::schema_mismatch(format!("record dataset {:?} is not chunked", rec.name))
            })?;
            let chunk_rec = chunk_shape[rec.rec_axis];
            let in_len = meta.shape[rec.rec_axis];

            for record in input.chunk_info(&rec.name)? {
                let mut shifted = record.origin.clone();
                shifted[rec.rec_axis] += rec.offset;

                let in_extent = chunk_rec.min(in_len - record.origin[rec.rec_axis]);
                let out_extent = chunk_rec.min(rec.total_len - shifted[rec.rec_axis]);
                let aligned = shifted[rec.rec_axis] % chunk_rec == 0;

                if aligned && in_extent == out_extent {
                    let (mask, payload) = input.read_raw_chunk(&rec.name, &record.origin)?;
                    writer.write_raw_chunk(&rec.name, &shifted, mask, &payload)?;
                    log::debug!(
                        "{}: raw chunk {:?} -> {:?}",
                        rec.name,
                        record.origin,
                        shifted
                    );
                } else {
                    // short or misaligned chunks go through a decoded write
                    let count: Vec<usize> = record
                        .origin
                        .iter()
                        .zip(&chunk_shape)
                        .zip(&meta.shape)
                        .map(|((&origin, &chunk), &extent)| chunk.min(extent - origin))
                        .collect();
                    let values = input.read_hyperslab(&rec.name, &record.origin, &count)?;
                    writer.write_hyperslab(&rec.name, &shifted, &count, &values)?;
                    log::debug!(
                        "{}: hyperslab fallback {:?} -> {:?}",
                        rec.name,
                        record.origin,
                        shifted
                    );
                }
            }

            rec.offset += in_len;
        }
    }

    // 6. prepend the history entry
    let stamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    let entry = format!("{stamp}: {command_line}\n");
    let previous = first
        .attributes(AttrScope::Global)?
        .into_iter()
        .find(|attr| attr.name == HISTORY_ATTR);
    let history = match previous {
        Some(Attr {
            value: AttrValue::Text(old),
            ..
        }) => format!("{entry}{old}"),
        _ => entry,
    };
    if let Err(err) = writer.put_attribute(
        AttrScope::Global,
        Attr {
            name: HISTORY_ATTR.to_owned(),
            value: AttrValue::Text(history),
        },
    ) {
        log::warn!("failed to update the history attribute: {err}");
    }

    writer.flush()?;
    Ok(())
}
