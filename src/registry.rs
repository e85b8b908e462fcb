//! Ordered Associative Registry
//!
//! A sequence of key/value entries paired with a key → position index. The
//! registry is used both as the "active notes" stack (append = most recent)
//! and as the device registry (stable iteration, O(1) membership).
//!
//! Appends, lookups and membership tests are O(1). Removal and positional
//! insertion are O(n − position) because every following entry has its
//! recorded position renumbered.

use core::borrow::Borrow;
use core::hash::Hash;
use core::ops::ControlFlow;
use std::collections::HashMap;
use thiserror::Error;

/// Contract violations reported by [`Registry`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("key not found")]
    KeyNotFound,

    #[error("registry is empty")]
    EmptyRegistry,

    #[error("position {position} is out of bounds for length {len}")]
    PositionOutOfBounds { position: usize, len: usize },
}

/// A single key/value pair owned by a [`Registry`]
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry<K, V> {
    pub key: K,
    pub value: V,
}

/// Ordered map keyed by an opaque identifier
#[derive(Debug, Clone)]
pub struct Registry<K, V> {
    entries: Vec<RegistryEntry<K, V>>,
    index: HashMap<K, usize>,
}

impl<K, V> Registry<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Create an empty registry with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if `key` is present
    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Position of `key` in iteration order
    pub fn position<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.index.get(key).copied()
    }

    /// Append an entry; a no-op when `key` is already present
    pub fn push(&mut self, key: K, value: V) -> &mut Self {
        if !self.has(&key) {
            self.index.insert(key.clone(), self.entries.len());
            self.entries.push(RegistryEntry { key, value });
        }
        self
    }

    /// Insert an entry at `position`; a no-op when `key` is already present
    ///
    /// Entries at and after `position` move back by one.
    pub fn set(&mut self, key: K, value: V, position: usize) -> Result<&mut Self, RegistryError> {
        if self.has(&key) {
            return Ok(self);
        }
        if position > self.entries.len() {
            return Err(RegistryError::PositionOutOfBounds {
                position,
                len: self.entries.len(),
            });
        }

        self.entries.insert(position, RegistryEntry { key, value });
        self.reindex_from(position);
        Ok(self)
    }

    /// Value stored under `key`
    pub fn get<Q>(&self, key: &Q) -> Result<&V, RegistryError>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let position = self.index.get(key).ok_or(RegistryError::KeyNotFound)?;
        Ok(&self.entries[*position].value)
    }

    /// Mutable value stored under `key`
    pub fn get_mut<Q>(&mut self, key: &Q) -> Result<&mut V, RegistryError>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let position = self.index.get(key).ok_or(RegistryError::KeyNotFound)?;
        Ok(&mut self.entries[*position].value)
    }

    /// Value at an iteration position
    pub fn get_index(&self, position: usize) -> Result<&V, RegistryError> {
        self.entries
            .get(position)
            .map(|entry| &entry.value)
            .ok_or(RegistryError::PositionOutOfBounds {
                position,
                len: self.entries.len(),
            })
    }

    /// Remove an entry, returning its value if it was present
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let position = self.index.remove(key)?;
        let entry = self.entries.remove(position);
        self.reindex_from(position);
        Some(entry.value)
    }

    /// Remove and return the most recently appended value
    pub fn pop(&mut self) -> Option<V> {
        let entry = self.entries.pop()?;
        self.index.remove(&entry.key);
        Some(entry.value)
    }

    /// Oldest value
    pub fn first(&self) -> Result<&V, RegistryError> {
        self.entries
            .first()
            .map(|entry| &entry.value)
            .ok_or(RegistryError::EmptyRegistry)
    }

    /// Most recently appended value
    pub fn last(&self) -> Result<&V, RegistryError> {
        self.entries
            .last()
            .map(|entry| &entry.value)
            .ok_or(RegistryError::EmptyRegistry)
    }

    /// Visit entries in order until the visitor breaks
    pub fn each<F>(&self, mut visitor: F)
    where
        F: FnMut(&V, &K, usize) -> ControlFlow<()>,
    {
        for (i, entry) in self.entries.iter().enumerate() {
            if visitor(&entry.value, &entry.key, i).is_break() {
                break;
            }
        }
    }

    /// Transform every value, preserving order
    pub fn map<R, F>(&self, mut f: F) -> Vec<R>
    where
        F: FnMut(&V, &K, usize) -> R,
    {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| f(&entry.value, &entry.key, i))
            .collect()
    }

    /// Entries in order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|entry| (&entry.key, &entry.value))
    }

    /// Keys in order
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|entry| &entry.key)
    }

    /// Values in order
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|entry| &entry.value)
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    fn reindex_from(&mut self, start: usize) {
        for (position, entry) in self.entries.iter().enumerate().skip(start) {
            self.index.insert(entry.key.clone(), position);
        }
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        assert_eq!(self.index.len(), self.entries.len());
        for (position, entry) in self.entries.iter().enumerate() {
            assert_eq!(self.index.get(&entry.key), Some(&position));
        }
    }
}

impl<K, V> Default for Registry<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for Registry<K, V>
where
    K: Eq + Hash + Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut registry = Registry::new();
        for (key, value) in iter {
            registry.push(key, value);
        }
        registry
    }
}
