//! Immutable credential set.

use std::collections::HashSet;

/// The set of API keys accepted by the gate, frozen at startup.
///
/// Only membership is ever asked of it. An empty set is valid and
/// rejects every key.
#[derive(Debug, Clone, Default)]
pub struct CredentialSet {
    keys: HashSet<String>,
}

impl CredentialSet {
    /// Build a set from configured keys. Empty strings are dropped.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(Into::into)
                .filter(|key: &String| !key.is_empty())
                .collect(),
        }
    }

    /// Returns true if `key` is an authorized key.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
