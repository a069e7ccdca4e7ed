// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Text Buffer
//!
//! Mutable script text backed by a rope.
//!
//! ## Overview
//!
//! The buffer is addressed with UTF-8 byte offsets, the unit every token and
//! node location uses. Offsets must lie within `[0, len]` and on a character
//! boundary; anything else is rejected before the rope is touched.
//!
//! Every successful mutation bumps [`TextBuffer::version`], which downstream
//! stages compare against to detect stale results.
//!
//! ## Example
//!
//! ```rust
//! use sqlscript_grammar::TextBuffer;
//!
//! let mut buffer = TextBuffer::new();
//! buffer.insert_text_at(0, "select 1").unwrap();
//! buffer.erase_text_range(6, 2).unwrap();
//! assert_eq!(buffer.to_string(), "select");
//! assert_eq!(buffer.version(), 2);
//! ```

use crate::error::{TextError, TextResult};
use ropey::Rope;
use std::fmt;

/// Versioned, rope-backed script text
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    /// Content as a rope for efficient editing
    content: Rope,

    /// Edit counter, incremented on each change
    version: u64,
}

impl TextBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer holding `text`
    pub fn from_text(text: &str) -> Self {
        Self {
            content: Rope::from_str(text),
            version: 0,
        }
    }

    /// Length in bytes
    pub fn len_bytes(&self) -> usize {
        self.content.len_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.content.len_bytes() == 0
    }

    /// Number of successful edits so far
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of lines
    pub fn line_count(&self) -> usize {
        self.content.len_lines()
    }

    /// Insert `text` at byte `offset`
    pub fn insert_text_at(&mut self, offset: usize, text: &str) -> TextResult<()> {
        let char_idx = self.char_index(offset)?;
        self.content.insert(char_idx, text);
        self.version += 1;
        Ok(())
    }

    /// Insert a single character at byte `offset`
    pub fn insert_char_at(&mut self, offset: usize, ch: char) -> TextResult<()> {
        let char_idx = self.char_index(offset)?;
        self.content.insert_char(char_idx, ch);
        self.version += 1;
        Ok(())
    }

    /// Erase `length` bytes starting at byte `offset`
    ///
    /// Both ends of the range must be character boundaries.
    pub fn erase_text_range(&mut self, offset: usize, length: usize) -> TextResult<()> {
        let len = self.len_bytes();
        let end = offset
            .checked_add(length)
            .filter(|end| *end <= len)
            .ok_or(TextError::RangeOutOfRange {
                offset,
                length,
                len,
            })?;
        let begin_char = self.char_index(offset)?;
        let end_char = self.char_index(end)?;
        self.content.remove(begin_char..end_char);
        self.version += 1;
        Ok(())
    }

    /// Replace the whole content
    pub fn replace_text(&mut self, text: &str) {
        self.content = Rope::from_str(text);
        self.version += 1;
    }

    /// Get `[offset, offset + length)` as a string
    pub fn slice(&self, offset: usize, length: usize) -> TextResult<String> {
        let len = self.len_bytes();
        let end = offset
            .checked_add(length)
            .filter(|end| *end <= len)
            .ok_or(TextError::RangeOutOfRange {
                offset,
                length,
                len,
            })?;
        let begin_char = self.char_index(offset)?;
        let end_char = self.char_index(end)?;
        Ok(self.content.slice(begin_char..end_char).to_string())
    }

    /// Convert a byte offset to a `(line, column)` pair, both 0-indexed
    ///
    /// The column counts characters, not bytes.
    pub fn byte_to_position(&self, offset: usize) -> TextResult<(usize, usize)> {
        let char_idx = self.char_index(offset)?;
        let line = self.content.char_to_line(char_idx);
        let col = char_idx - self.content.line_to_char(line);
        Ok((line, col))
    }

    /// Validate a byte offset and map it to a char index
    fn char_index(&self, offset: usize) -> TextResult<usize> {
        let len = self.len_bytes();
        if offset > len {
            return Err(TextError::OffsetOutOfRange { offset, len });
        }
        let char_idx = self.content.byte_to_char(offset);
        if self.content.char_to_byte(char_idx) != offset {
            return Err(TextError::NotCharBoundary(offset));
        }
        Ok(char_idx)
    }
}

impl fmt::Display for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.content.chunks() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}
