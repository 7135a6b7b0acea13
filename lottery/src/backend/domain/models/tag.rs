//! lottery/src/backend/domain/models/tag.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical attendee category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    Student,
    Kol,
    Enterprise,
}

impl Tag {
    pub const ALL: [Tag; 3] = [Tag::Student, Tag::Kol, Tag::Enterprise];

    /// Stable identifier used in snapshots
    pub fn value(&self) -> &'static str {
        match self {
            Tag::Student => "student",
            Tag::Kol => "kol",
            Tag::Enterprise => "enterprise",
        }
    }

    /// Label shown to the audience and written to exports
    pub fn label(&self) -> &'static str {
        match self {
            Tag::Student => "学生",
            Tag::Kol => "KOL",
            Tag::Enterprise => "企业代表",
        }
    }

    /// Strict lookup by canonical value. Free-text input goes through
    /// `TagResolver` instead.
    pub fn from_value(value: &str) -> Option<Tag> {
        Tag::ALL.into_iter().find(|tag| tag.value() == value)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
