// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Keyed entry table
//!
//! An insertion-ordered mapping from integer ids to records, used as the
//! backing store for nodes and edges. Removal vacates a slot without
//! disturbing the order of the remaining entries; `compact` reclaims the
//! vacated slots. The table also provides approximately-uniform random
//! live-key sampling and ordered binary persistence of its pairs.

use std::collections::HashMap;
use std::io::Read;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::persist::{decode_err, encode_err, PersistError};

/// Insertion-ordered table of records keyed by `u64` id.
#[derive(Debug, Clone)]
pub struct EntryTable<V> {
    /// Records in insertion order; removed entries leave a vacant slot
    slots: Vec<Option<(u64, V)>>,

    /// Key -> slot position
    index: HashMap<u64, usize>,
}

impl<V> EntryTable<V> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Create an empty table with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check whether the table has no live entries
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Total slots, including vacated ones awaiting `compact`
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Key existence test
    pub fn contains_key(&self, key: u64) -> bool {
        self.index.contains_key(&key)
    }

    /// Get the record stored under `key`
    pub fn get(&self, key: u64) -> Option<&V> {
        let pos = *self.index.get(&key)?;
        match self.slots.get(pos) {
            Some(Some((_, value))) => Some(value),
            _ => None,
        }
    }

    /// Get a mutable reference to the record stored under `key`
    pub fn get_mut(&mut self, key: u64) -> Option<&mut V> {
        let pos = *self.index.get(&key)?;
        match self.slots.get_mut(pos) {
            Some(Some((_, value))) => Some(value),
            _ => None,
        }
    }

    /// Insert a record under `key`.
    ///
    /// Replacing an existing record keeps its slot, so iteration order is
    /// unchanged. Returns the previous record, if any.
    pub fn insert(&mut self, key: u64, value: V) -> Option<V> {
        match self.index.get(&key) {
            Some(&pos) => match self.slots.get_mut(pos) {
                Some(Some((_, slot))) => Some(std::mem::replace(slot, value)),
                _ => None,
            },
            None => {
                self.index.insert(key, self.slots.len());
                self.slots.push(Some((key, value)));
                None
            }
        }
    }

    /// Remove the record stored under `key`, vacating its slot
    pub fn remove(&mut self, key: u64) -> Option<V> {
        let pos = self.index.remove(&key)?;
        self.slots
            .get_mut(pos)
            .and_then(|slot| slot.take())
            .map(|(_, value)| value)
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
    }

    /// Iterate over `(key, record)` pairs in insertion order
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            slots: self.slots.iter(),
        }
    }

    /// Iterate over live keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Iterate over live records in insertion order
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }

    /// Iterate mutably over live records in insertion order
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.slots
            .iter_mut()
            .filter_map(|slot| slot.as_mut())
            .map(|(_, value)| value)
    }

    /// Reclaim vacated slots, preserving the order of live entries
    pub fn compact(&mut self) {
        self.slots.retain(Option::is_some);
        self.slots.shrink_to_fit();
        self.index.clear();
        for (pos, slot) in self.slots.iter().enumerate() {
            if let Some((key, _)) = slot {
                self.index.insert(*key, pos);
            }
        }
    }

    /// Sample a live key approximately uniformly.
    ///
    /// Rejection-samples slot positions until a live entry is hit, so the
    /// expected probe count grows with the fraction of vacated slots; run
    /// `compact` first if many removals have accumulated. Returns `None`
    /// on an empty table.
    pub fn rnd_key(&self, rng: &mut fastrand::Rng) -> Option<u64> {
        if self.index.is_empty() {
            return None;
        }
        loop {
            let pos = rng.usize(..self.slots.len());
            if let Some(Some((key, _))) = self.slots.get(pos) {
                return Some(*key);
            }
        }
    }
}

impl<V: Serialize> EntryTable<V> {
    /// Append the live length and every `(key, record)` pair, in iteration
    /// order, to `out`
    pub fn save_into(&self, out: &mut Vec<u8>) -> Result<(), PersistError> {
        bincode::serialize_into(&mut *out, &(self.len() as u64)).map_err(encode_err)?;
        for (key, value) in self.iter() {
            bincode::serialize_into(&mut *out, &key).map_err(encode_err)?;
            bincode::serialize_into(&mut *out, value).map_err(encode_err)?;
        }
        Ok(())
    }
}

impl<V: DeserializeOwned> EntryTable<V> {
    /// Read a table previously written by `save_into`.
    ///
    /// The result is compacted: live entries keep their order, vacated
    /// slots are not part of the persisted state.
    pub fn load_from<R: Read>(reader: &mut R) -> Result<Self, PersistError> {
        let len: u64 = bincode::deserialize_from(&mut *reader).map_err(decode_err)?;
        let mut table = Self::with_capacity(len as usize);
        for _ in 0..len {
            let key: u64 = bincode::deserialize_from(&mut *reader).map_err(decode_err)?;
            let value: V = bincode::deserialize_from(&mut *reader).map_err(decode_err)?;
            table.insert(key, value);
        }
        Ok(table)
    }
}

impl<V> Default for EntryTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over `(key, record)` pairs in insertion order
pub struct Iter<'a, V> {
    slots: std::slice::Iter<'a, Option<(u64, V)>>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (u64, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Some((key, value)) = slot {
                return Some((*key, value));
            }
        }
        None
    }
}
