// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use serde::{Deserialize, Serialize};

/// A byte range in the script text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    /// Byte offset of the first byte
    pub offset: u32,
    /// Length in bytes
    pub length: u32,
}

impl Location {
    pub const fn new(offset: u32, length: u32) -> Self {
        Self { offset, length }
    }

    /// Location spanning `[begin, end)`
    pub fn from_range(begin: u32, end: u32) -> Self {
        Self {
            offset: begin,
            length: end.saturating_sub(begin),
        }
    }

    /// Exclusive end offset
    pub const fn end(&self) -> u32 {
        self.offset + self.length
    }

    /// Whether `offset` lies in `[offset, end)`
    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.offset && offset < self.end()
    }

    /// Whether `offset` lies in `[offset, end]`
    pub fn contains_inclusive(&self, offset: u32) -> bool {
        offset >= self.offset && offset <= self.end()
    }

    /// Whether `other` lies entirely within this location
    pub fn covers(&self, other: &Location) -> bool {
        other.offset >= self.offset && other.end() <= self.end()
    }

    /// Smallest location covering both
    pub fn merge(&self, other: &Location) -> Location {
        let begin = self.offset.min(other.offset);
        let end = self.end().max(other.end());
        Location::from_range(begin, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        let loc = Location::new(4, 3);
        assert!(!loc.contains(3));
        assert!(loc.contains(4));
        assert!(loc.contains(6));
        assert!(!loc.contains(7));
        assert!(loc.contains_inclusive(7));
    }

    #[test]
    fn test_merge_and_cover() {
        let a = Location::new(0, 6);
        let b = Location::new(9, 4);
        let merged = a.merge(&b);
        assert_eq!(merged, Location::new(0, 13));
        assert!(merged.covers(&a));
        assert!(merged.covers(&b));
        assert!(!a.covers(&merged));
    }
}
