//! Pending-patch overlay.
//!
//! A sparse map from entity key to a partial patch holding only the fields
//! changed since the last successful save. The canonical records fetched
//! from the backend are never mutated; callers build the working view with
//! [`merge`] and decide when an entry is committed (confirmed persisted) or
//! discarded (reverted).
//!
//! Each entry also remembers the canonical version it was staged against,
//! so a later fetch can reveal edits whose record moved underneath them.

use std::collections::BTreeMap;

/// A partial update that can absorb a newer partial update.
pub trait Patch: Clone {
    /// Fold `newer` into `self`; every field set in `newer` wins.
    fn absorb(&mut self, newer: Self);

    /// `true` when the patch changes nothing.
    fn is_empty(&self) -> bool;
}

/// A canonical record that can produce a patched copy of itself.
pub trait Patchable<P>: Clone {
    fn patched(&self, patch: &P) -> Self;
}

/// Build the working view of one record: overlay fields win.
pub fn merge<T, P>(canonical: &T, patch: Option<&P>) -> T
where
    T: Patchable<P>,
{
    match patch {
        Some(p) => canonical.patched(p),
        None => canonical.clone(),
    }
}

#[derive(Debug, Clone)]
struct Pending<P, V> {
    patch: P,
    base_version: V,
}

/// Sparse overlay of staged, unsaved patches keyed by `K`.
///
/// `V` is the version token of the canonical record at staging time (for
/// example a last-checked timestamp). Use `()` when versions are not
/// tracked.
#[derive(Debug, Clone)]
pub struct PendingPatches<K, P, V = ()> {
    entries: BTreeMap<K, Pending<P, V>>,
}

impl<K, P, V> Default for PendingPatches<K, P, V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K, P, V> PendingPatches<K, P, V>
where
    K: Ord + Clone,
    P: Patch,
    V: PartialEq + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a patch for `key`, folding it into any existing entry.
    ///
    /// The base version of an existing entry is kept: an edit stays anchored
    /// to the record it was first made against. Empty patches on keys with
    /// no entry are ignored.
    pub fn stage(&mut self, key: K, patch: P, base_version: V) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.patch.absorb(patch);
            return;
        }
        if patch.is_empty() {
            return;
        }
        self.entries.insert(
            key,
            Pending {
                patch,
                base_version,
            },
        );
    }

    pub fn get(&self, key: &K) -> Option<&P> {
        self.entries.get(key).map(|e| &e.patch)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys with a staged patch, in key order.
    pub fn dirty_keys(&self) -> Vec<K> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &P)> {
        self.entries.iter().map(|(k, e)| (k, &e.patch))
    }

    /// Working view of a canonical record under its staged patch, if any.
    pub fn view<T>(&self, key: &K, canonical: &T) -> T
    where
        T: Patchable<P>,
    {
        merge(canonical, self.get(key))
    }

    /// Drop entries that were confirmed persisted. Returns how many existed.
    pub fn commit<I>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
    {
        keys.into_iter()
            .filter(|k| self.entries.remove(k).is_some())
            .count()
    }

    /// Drop entries without persisting them. Returns the keys actually
    /// removed; keys with no entry are ignored.
    pub fn discard<I>(&mut self, keys: I) -> Vec<K>
    where
        I: IntoIterator<Item = K>,
    {
        keys.into_iter()
            .filter(|k| self.entries.remove(k).is_some())
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Keys whose canonical version no longer matches the version recorded at
    /// staging time. `current` returns `None` when the record disappeared,
    /// which also counts as stale.
    pub fn stale_keys<F>(&self, current: F) -> Vec<K>
    where
        F: Fn(&K) -> Option<V>,
    {
        self.entries
            .iter()
            .filter(|(k, e)| current(k).map_or(true, |v| v != e.base_version))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Re-anchor an existing entry to a newer canonical version.
    pub fn rebase(&mut self, key: &K, version: V) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.base_version = version;
        }
    }
}
