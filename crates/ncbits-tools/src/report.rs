//! Fixed-width report formatting shared by the analysis tools.
//!
//! The column layout is load-bearing: downstream tooling parses these
//! tables. Variable names are left-aligned in a 45-character column, shapes
//! in a 20-character column.

use std::fmt::Write as _;

/// Width of the variable-name column.
pub const NAME_WIDTH: usize = 45;
/// Width of the shape column.
pub const SHAPE_WIDTH: usize = 20;

/// Horizontal rule above and below the analysis table header.
#[must_use]
pub fn rule() -> String {
    "-".repeat(120)
}

/// Formats a shape as `(10, 721, 1440)`; a rank-0 shape reads `scalar`.
#[must_use]
pub fn shape_string(shape: &[usize]) -> String {
    if shape.is_empty() {
        return String::from("scalar");
    }
    let mut out = String::from("(");
    for (axis, extent) in shape.iter().enumerate() {
        if axis > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{extent}");
    }
    out.push(')');
    out
}

/// Formats a byte count as megabytes with two decimals; values under 0.01 MB
/// read `<0.01`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size_mb(bytes: u64) -> String {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    if mb < 0.01 {
        String::from("<0.01")
    } else {
        format!("{mb:.2}")
    }
}

/// Formats a byte count in the largest unit that keeps it at or above one.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size_smart(bytes: u64) -> String {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    if mb >= 1.0 {
        return format!("{mb:.2} MB");
    }
    let kb = bytes as f64 / 1024.0;
    if kb >= 1.0 {
        return format!("{kb:.2} KB");
    }
    format!("{bytes} B")
}
