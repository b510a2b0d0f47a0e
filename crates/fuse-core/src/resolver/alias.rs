//! User alias table.
//!
//! Keys ending in `$` match only the whole specifier; other keys match as a
//! literal prefix and the remainder of the specifier is kept after the
//! replacement. Entries are checked in insertion order and the first match
//! wins.

use crate::error::ResolveError;
use fuse_util::hash::blake3_fields;
use serde_json::Value;
use std::sync::OnceLock;

/// Marker suffix for exact-match keys.
const EXACT_MARKER: char = '$';

#[derive(Debug, Clone, PartialEq, Eq)]
enum AliasKey {
    Exact(String),
    Prefix(String),
}

#[derive(Debug, Clone)]
struct AliasEntry {
    key: AliasKey,
    target: String,
}

/// Ordered alias table.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
    rejected: Vec<ResolveError>,
    fingerprint: OnceLock<String>,
}

impl AliasTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an alias. Invalid keys are recorded in [`rejected`](Self::rejected)
    /// and otherwise ignored.
    pub fn alias(mut self, key: impl Into<String>, target: impl Into<String>) -> Self {
        self.push(key.into(), target.into());
        self
    }

    /// Build a table from a JSON object (`{"key": "target", …}`), keeping key order.
    ///
    /// Non-string targets are rejected; a non-object value yields an empty
    /// table with a single rejection.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let mut table = Self::new();
        let Some(map) = value.as_object() else {
            table
                .rejected
                .push(ResolveError::invalid_mapping("alias", "alias table must be an object"));
            return table;
        };

        for (key, target) in map {
            match target.as_str() {
                Some(target) => table.push(key.clone(), target.to_string()),
                None => table.rejected.push(ResolveError::invalid_mapping(
                    key.clone(),
                    "alias target must be a string",
                )),
            }
        }
        table
    }

    fn push(&mut self, key: String, target: String) {
        let parsed = match key.strip_suffix(EXACT_MARKER) {
            Some(exact) => AliasKey::Exact(exact.to_string()),
            None => AliasKey::Prefix(key.clone()),
        };

        let empty = match &parsed {
            AliasKey::Exact(k) | AliasKey::Prefix(k) => k.is_empty(),
        };
        if empty {
            self.rejected
                .push(ResolveError::invalid_mapping(key, "alias key is empty"));
            return;
        }

        self.entries.push(AliasEntry {
            key: parsed,
            target,
        });
        self.fingerprint = OnceLock::new();
    }

    /// Rewrite `spec` with the first matching entry, or `None` if nothing matches.
    #[must_use]
    pub fn rewrite(&self, spec: &str) -> Option<String> {
        self.entries.iter().find_map(|entry| match &entry.key {
            AliasKey::Exact(key) => (spec == key.as_str()).then(|| entry.target.clone()),
            AliasKey::Prefix(key) => spec
                .strip_prefix(key.as_str())
                .map(|rest| format!("{}{rest}", entry.target)),
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries dropped while building the table.
    #[must_use]
    pub fn rejected(&self) -> &[ResolveError] {
        &self.rejected
    }

    /// Content fingerprint, stable for equal tables.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        self.fingerprint.get_or_init(|| {
            blake3_fields(self.entries.iter().flat_map(|entry| {
                let (kind, key) = match &entry.key {
                    AliasKey::Exact(k) => ("exact", k.as_str()),
                    AliasKey::Prefix(k) => ("prefix", k.as_str()),
                };
                [kind, key, entry.target.as_str()]
            }))
        })
    }
}
