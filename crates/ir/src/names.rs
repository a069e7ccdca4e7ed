// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Roles a name plays somewhere in a script or catalog
    ///
    /// Tags accumulate: `select foo from foo foo` tags `foo` as a column
    /// name, a table name and a table alias.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct NameTags: u32 {
        const KEYWORD = 1 << 0;
        const DATABASE_NAME = 1 << 1;
        const SCHEMA_NAME = 1 << 2;
        const TABLE_NAME = 1 << 3;
        const TABLE_ALIAS = 1 << 4;
        const COLUMN_NAME = 1 << 5;
        const FUNCTION_NAME = 1 << 6;
    }
}

impl NameTags {
    /// Tags that may qualify a column reference
    pub fn qualifies_column(&self) -> bool {
        self.intersects(NameTags::TABLE_NAME | NameTags::TABLE_ALIAS)
    }

    /// Tags that may appear in a table reference
    pub fn names_relation(&self) -> bool {
        self.intersects(NameTags::DATABASE_NAME | NameTags::SCHEMA_NAME | NameTags::TABLE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_accumulate() {
        let mut tags = NameTags::empty();
        tags |= NameTags::COLUMN_NAME;
        tags |= NameTags::TABLE_NAME;
        tags |= NameTags::TABLE_ALIAS;
        assert!(tags.contains(NameTags::COLUMN_NAME | NameTags::TABLE_ALIAS));
        assert!(tags.qualifies_column());
        assert!(tags.names_relation());
        assert!(!NameTags::COLUMN_NAME.names_relation());
    }
}
