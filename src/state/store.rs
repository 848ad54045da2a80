// src/state/store.rs

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A keyed map that can be shared between handlers.
///
/// Every operation holds the lock for a single map access; callers never
/// hold it across an `.await`.
#[derive(Debug)]
pub struct Store<K, V> {
    items: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for Store<K, V> {
    fn default() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().collect()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, V>> {
        self.items.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, V>> {
        self.items.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.read().get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.read().contains_key(key)
    }

    /// Insert or replace; returns the previous value.
    pub fn add(&self, key: K, value: V) -> Option<V> {
        self.write().insert(key, value)
    }

    pub fn delete(&self, key: &K) -> Option<V> {
        self.write().remove(key)
    }

    /// Mutate the value at `key` in place. Returns the updated value, or
    /// `None` if the key is absent.
    pub fn update<F>(&self, key: &K, f: F) -> Option<V>
    where
        F: FnOnce(&mut V),
    {
        let mut items = self.write();
        let value = items.get_mut(key)?;
        f(value);
        Some(value.clone())
    }

    pub fn items(&self) -> Vec<(K, V)> {
        self.read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Swap the whole contents, e.g. after rediscovery.
    pub fn replace_items(&self, items: impl IntoIterator<Item = (K, V)>) {
        *self.write() = items.into_iter().collect();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
