//! Point lookup of extrinsics within an assembled block.
//!
//! Lookup itself is a bounds-checked index into the block's extrinsic list.
//! Validation of externally supplied textual indices happens before the
//! lookup, so a malformed parameter never reaches it.

use thiserror::Error;

use crate::types::{Block, Extrinsic};

/// The requested index does not exist in this block. Client-facing: a bad
/// request, never fatal.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Requested extrinsic index {index} does not exist in a block with {count} extrinsics")]
pub struct IndexOutOfRangeError {
    pub index: usize,
    pub count: usize,
}

impl IndexOutOfRangeError {
    /// Stable machine-readable kind for error responses.
    pub fn kind(&self) -> &'static str {
        "extrinsic-index-out-of-range"
    }
}

/// A caller-supplied index that is not a non-negative integer. Raised before
/// the indexer is ever invoked.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{field} path param is not a number")]
pub struct InvalidIndexFormatError {
    pub field: String,
}

impl InvalidIndexFormatError {
    /// Stable machine-readable kind for error responses.
    pub fn kind(&self) -> &'static str {
        "invalid-index-format"
    }
}

/// Parse a caller-supplied textual index into a non-negative integer.
/// Negative and non-numeric input is rejected here, at the boundary.
pub fn parse_index_param(field: &str, raw: &str) -> Result<usize, InvalidIndexFormatError> {
    raw.parse::<usize>().map_err(|_| InvalidIndexFormatError {
        field: field.to_string(),
    })
}

/// Return the extrinsic at `index`, with its paired events.
pub fn extrinsic_at(block: &Block, index: usize) -> Result<&Extrinsic, IndexOutOfRangeError> {
    block.extrinsics.get(index).ok_or(IndexOutOfRangeError {
        index,
        count: block.extrinsics.len(),
    })
}
