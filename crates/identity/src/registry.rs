//! Identifier knowledge base.
//!
//! Maps each identifier key to every client that has ever been resolved with
//! that exact fact. One identifier may legitimately belong to several clients,
//! e.g. a couple sharing one email address.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use clientmerge_core::ClientIdNo;

use crate::identifier::Identifier;

/// Registry entry for one identifier key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifierEntry {
    id_type: String,
    value: String,
    client_ids: BTreeSet<ClientIdNo>,
}

impl IdentifierEntry {
    fn new(identifier: &Identifier) -> Self {
        Self {
            id_type: identifier.id_type().to_string(),
            value: identifier.value().to_string(),
            client_ids: BTreeSet::new(),
        }
    }

    pub fn id_type(&self) -> &str {
        &self.id_type
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Every client this identifier has been bound to (ascending).
    pub fn client_ids(&self) -> &BTreeSet<ClientIdNo> {
        &self.client_ids
    }
}

/// Append-only map `key -> entry`.
///
/// Entries are never removed and their client sets never shrink.
#[derive(Debug, Clone, Default)]
pub struct IdentifierRegistry {
    entries: HashMap<String, IdentifierEntry>,
}

impl IdentifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&IdentifierEntry> {
        self.entries.get(key)
    }

    /// Insert an entry with an empty client set.
    ///
    /// Returns `false` (and leaves the entry untouched) if the key is already known.
    pub fn insert(&mut self, identifier: &Identifier) -> bool {
        if self.entries.contains_key(identifier.key()) {
            return false;
        }
        self.entries
            .insert(identifier.key().to_string(), IdentifierEntry::new(identifier));
        true
    }

    /// Bind a client to a known key.
    ///
    /// Returns `true` if the client was newly added; unknown keys are ignored.
    pub fn bind(&mut self, key: &str, client_idno: ClientIdNo) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => entry.client_ids.insert(client_idno),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn entries(&self) -> Vec<(&str, &IdentifierEntry)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}
