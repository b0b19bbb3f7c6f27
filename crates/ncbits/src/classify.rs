use crate::{DimMeta, ElementType, VarMeta};

/// Processing class of a variable, decided once per variable by the
/// orchestrator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VarClass {
    /// Shares its name with a dimension; copied verbatim.
    Coordinate,
    /// Element type is not float32; copied verbatim.
    NonFloat32,
    /// Holds at most one element; skipped by analysis, copied as-is.
    Scalar,
    /// Rank ≤ 2; processed whole.
    Small,
    /// Rank ≥ 3; processed in 2-D slabs over the trailing two dimensions.
    Large,
}

/// Classifies a variable for the rewrite pipeline.
///
/// The coordinate test wins over the dtype test so that float32 coordinate
/// variables are passed through untouched.
#[must_use]
pub fn classify(meta: &VarMeta, dims: &[DimMeta]) -> VarClass {
    if dims.iter().any(|dim| dim.name == meta.name) {
        return VarClass::Coordinate;
    }
    if meta.dtype != ElementType::F32 {
        return VarClass::NonFloat32;
    }
    if meta.total_len() <= 1 {
        return VarClass::Scalar;
    }
    if meta.rank() <= 2 {
        VarClass::Small
    } else {
        VarClass::Large
    }
}
