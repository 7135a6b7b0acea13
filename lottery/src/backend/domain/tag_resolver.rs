//! Tag resolution for free-text tag tokens.
//!
//! Manual entry, batch import and the console all accept tags as typed text.
//! The resolver maps every known surface form (English code, Chinese label,
//! abbreviation) onto a canonical [`Tag`]. Unknown tokens resolve to `None`
//! so a stray word on an import line never fails the whole batch.

use log::debug;
use std::collections::HashMap;

use crate::backend::domain::models::Tag;

/// Surface forms recognised out of the box.
const DEFAULT_ALIASES: &[(&str, Tag)] = &[
    ("student", Tag::Student),
    ("学生", Tag::Student),
    ("kol", Tag::Kol),
    ("enterprise", Tag::Enterprise),
    ("企业代表", Tag::Enterprise),
    ("企业", Tag::Enterprise),
];

/// Case-insensitive lookup table from surface form to canonical tag
#[derive(Debug, Clone)]
pub struct TagResolver {
    aliases: HashMap<String, Tag>,
}

impl Default for TagResolver {
    fn default() -> Self {
        let mut resolver = Self::empty();
        for (surface, tag) in DEFAULT_ALIASES {
            resolver.add_alias(surface, *tag);
        }
        resolver
    }
}

impl TagResolver {
    /// Resolver with the built-in vocabulary
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver that recognises nothing until aliases are added
    pub fn empty() -> Self {
        Self {
            aliases: HashMap::new(),
        }
    }

    pub fn with_alias(mut self, surface: &str, tag: Tag) -> Self {
        self.add_alias(surface, tag);
        self
    }

    /// Register another surface form. Blank forms are ignored.
    pub fn add_alias(&mut self, surface: &str, tag: Tag) {
        let key = normalize(surface);
        if key.is_empty() {
            return;
        }
        self.aliases.insert(key, tag);
    }

    /// Resolve a token to its canonical tag, or `None` if unrecognised.
    pub fn resolve(&self, token: &str) -> Option<Tag> {
        let key = normalize(token);
        if key.is_empty() {
            return None;
        }
        let resolved = self.aliases.get(&key).copied();
        if resolved.is_none() {
            debug!("Unrecognised tag token '{}', storing no tag", token.trim());
        }
        resolved
    }
}

fn normalize(token: &str) -> String {
    token.trim().to_lowercase()
}
