// Copyright 2026 the Lineage Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Weak-keyed association map.
//!
//! [`WeakKeyMap`] associates a value with the *identity* of an `Rc`-held key
//! without keeping the key alive. Each entry stores a [`Weak`] to its key, so
//! the key's allocation (and therefore its address) cannot be reused while
//! the entry exists; an entry whose key has no strong references left is
//! dead, invisible to lookups, and dropped on the next prune.

use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Number of inserts between automatic prunes.
const PRUNE_INTERVAL: usize = 64;

/// Returns the address identity of an `Rc`, ignoring any vtable metadata.
#[inline]
#[must_use]
pub fn rc_addr<K: ?Sized>(rc: &Rc<K>) -> usize {
    Rc::as_ptr(rc).cast::<()>() as usize
}

/// Compares two `Rc`s by address identity only.
#[inline]
#[must_use]
pub fn same_rc<K: ?Sized>(a: &Rc<K>, b: &Rc<K>) -> bool {
    rc_addr(a) == rc_addr(b)
}

/// A map keyed by `Rc` identity that does not extend the keys' lifetimes.
pub struct WeakKeyMap<K: ?Sized, V> {
    entries: HashMap<usize, (Weak<K>, V)>,
    inserts_since_prune: usize,
}

impl<K: ?Sized, V> fmt::Debug for WeakKeyMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakKeyMap")
            .field("entries", &self.entries.len())
            .field("inserts_since_prune", &self.inserts_since_prune)
            .finish()
    }
}

impl<K: ?Sized, V> Default for WeakKeyMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ?Sized, V> WeakKeyMap<K, V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            inserts_since_prune: 0,
        }
    }

    /// Inserts or overwrites the value for `key`, returning the previous value.
    pub fn insert(&mut self, key: &Rc<K>, value: V) -> Option<V> {
        self.inserts_since_prune += 1;
        if self.inserts_since_prune >= PRUNE_INTERVAL {
            self.prune();
        }
        self.entries
            .insert(rc_addr(key), (Rc::downgrade(key), value))
            .map(|(_, old)| old)
    }

    /// Returns the value associated with `key`.
    #[must_use]
    pub fn get(&self, key: &Rc<K>) -> Option<&V> {
        self.entries.get(&rc_addr(key)).map(|(_, v)| v)
    }

    /// Returns a mutable reference to the value associated with `key`.
    pub fn get_mut(&mut self, key: &Rc<K>) -> Option<&mut V> {
        self.entries.get_mut(&rc_addr(key)).map(|(_, v)| v)
    }

    /// Returns the value for `key`, inserting the result of `make` if absent.
    pub fn get_or_insert_with(&mut self, key: &Rc<K>, make: impl FnOnce() -> V) -> &mut V {
        let addr = rc_addr(key);
        if !self.entries.contains_key(&addr) {
            self.inserts_since_prune += 1;
            if self.inserts_since_prune >= PRUNE_INTERVAL {
                self.prune();
            }
        }
        &mut self
            .entries
            .entry(addr)
            .or_insert_with(|| (Rc::downgrade(key), make()))
            .1
    }

    /// Returns whether `key` has an entry.
    #[must_use]
    pub fn contains_key(&self, key: &Rc<K>) -> bool {
        self.entries.contains_key(&rc_addr(key))
    }

    /// Removes and returns the value for `key`.
    pub fn remove(&mut self, key: &Rc<K>) -> Option<V> {
        self.entries.remove(&rc_addr(key)).map(|(_, v)| v)
    }

    /// Drops every entry whose key is no longer reachable.
    pub fn prune(&mut self) {
        self.entries.retain(|_, (weak, _)| weak.strong_count() > 0);
        self.inserts_since_prune = 0;
    }

    /// Returns the number of entries with a live key.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .filter(|(weak, _)| weak.strong_count() > 0)
            .count()
    }

    /// Returns `true` if no entry has a live key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.inserts_since_prune = 0;
    }

    /// Iterates over live entries, upgrading each key.
    pub fn iter(&self) -> impl Iterator<Item = (Rc<K>, &V)> + '_ {
        self.entries
            .values()
            .filter_map(|(weak, v)| weak.upgrade().map(|k| (k, v)))
    }
}
