// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use thiserror::Error;

/// Result type alias for text buffer operations
pub type TextResult<T> = Result<T, TextError>;

/// Errors raised by text edits with bad arguments
///
/// Malformed SQL never produces one of these; it produces diagnostics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TextError {
    /// Offset beyond the end of the buffer
    #[error("Offset {offset} out of range for text of {len} bytes")]
    OffsetOutOfRange { offset: usize, len: usize },

    /// Erased range extends past the end of the buffer
    #[error("Range {offset}+{length} out of range for text of {len} bytes")]
    RangeOutOfRange {
        offset: usize,
        length: usize,
        len: usize,
    },

    /// Offset splits a multi-byte character
    #[error("Offset {0} is not on a character boundary")]
    NotCharBoundary(usize),
}
