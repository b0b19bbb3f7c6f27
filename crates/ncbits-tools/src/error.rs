use thiserror::Error;

use ncbits::ContainerError;
use ncbits_bit_info::BitInfoError;
use ncbits_bit_round::BitRoundError;

/// Errors that abort a toolkit operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ToolError {
    /// A caller-supplied parameter is out of range.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Single-line diagnostic.
        reason: String,
    },
    /// The inputs of a concatenation do not share a schema.
    #[error("schema mismatch: {reason}")]
    SchemaMismatch {
        /// Single-line diagnostic.
        reason: String,
    },
    /// A container reader or writer failed.
    #[error(transparent)]
    Container(#[from] ContainerError),
    /// The bit rounder rejected its parameters.
    #[error(transparent)]
    BitRound(#[from] BitRoundError),
    /// The information estimator rejected its input.
    #[error(transparent)]
    BitInfo(#[from] BitInfoError),
    /// A report could not be written.
    #[error("failed to write report output")]
    Report {
        /// The underlying I/O diagnostic.
        #[from]
        source: std::io::Error,
    },
}

impl ToolError {
    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn schema_mismatch(reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            reason: reason.into(),
        }
    }
}
