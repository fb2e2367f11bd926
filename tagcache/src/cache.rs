// Copyright 2026 tagcache Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{hash::Hash, sync::Arc};

use equivalent::Equivalent;
use parking_lot::RwLock;

use crate::{
    code::{Key, Value},
    error::Result,
    event::EventListener,
    raw::{RawTagCache, Tag},
};

/// Builder for [`TagCache`].
pub struct TagCacheBuilder<K, V>
where
    K: Key,
    V: Value,
{
    capacity: usize,
    event_listener: Option<Arc<dyn EventListener<Key = K, Value = V>>>,
}

impl<K, V> TagCacheBuilder<K, V>
where
    K: Key,
    V: Value,
{
    /// Start building a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            event_listener: None,
        }
    }

    /// Set the event listener, invoked once per entry removal on every removal path.
    ///
    /// The listener runs while the cache's exclusive lock is held and must not call
    /// back into the same cache; see [`EventListener`].
    pub fn with_event_listener(mut self, event_listener: Arc<dyn EventListener<Key = K, Value = V>>) -> Self {
        self.event_listener = Some(event_listener);
        self
    }

    /// Build the cache with the given configuration.
    ///
    /// Returns [`Error::InvalidCapacity`] if the capacity is zero.
    ///
    /// [`Error::InvalidCapacity`]: crate::Error::InvalidCapacity
    pub fn build(self) -> Result<TagCache<K, V>> {
        let raw = RawTagCache::with_event_listener(self.capacity, self.event_listener)?;
        Ok(TagCache {
            inner: Arc::new(RwLock::new(raw)),
        })
    }
}

/// A thread-safe, fixed-capacity lru cache with tag-indexed bulk invalidation.
///
/// Wraps [`RawTagCache`] with a single readers/writer lock: order-preserving reads
/// take the shared lock, and everything that can mutate order or contents takes the
/// exclusive lock, including [`get`], which refreshes recency. The handle is cheaply
/// cloneable and shares the underlying cache.
///
/// [`get`]: TagCache::get
pub struct TagCache<K, V>
where
    K: Key,
    V: Value,
{
    inner: Arc<RwLock<RawTagCache<K, V>>>,
}

impl<K, V> Clone for TagCache<K, V>
where
    K: Key,
    V: Value,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> TagCache<K, V>
where
    K: Key,
    V: Value,
{
    /// Create a cache holding at most `capacity` entries.
    ///
    /// Returns [`Error::InvalidCapacity`] if `capacity` is zero.
    ///
    /// [`Error::InvalidCapacity`]: crate::Error::InvalidCapacity
    pub fn new(capacity: usize) -> Result<Self> {
        Self::builder(capacity).build()
    }

    /// Start building a cache; see [`TagCacheBuilder`].
    pub fn builder(capacity: usize) -> TagCacheBuilder<K, V> {
        TagCacheBuilder::new(capacity)
    }

    /// Insert a key/value pair with no tags. Returns whether an eviction occurred.
    pub fn insert(&self, key: K, value: V) -> bool {
        self.inner.write().insert(key, value)
    }

    /// Insert a key/value pair and register the tags by which it can be invalidated.
    /// Returns whether an eviction occurred.
    ///
    /// Re-inserting a present key updates its value, refreshes its recency, and
    /// **replaces** its tag set.
    pub fn insert_with_tags<T>(&self, key: K, value: V, tags: impl IntoIterator<Item = T>) -> bool
    where
        T: Into<Tag>,
    {
        self.inner.write().insert_with_tags(key, value, tags)
    }

    /// Look up a key's value and refresh its recency.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.inner.write().get(key)
    }

    /// Look up a key's value without updating its recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.inner.read().peek(key)
    }

    /// Whether the key is present, without updating its recency.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.inner.read().contains(key)
    }

    /// Check for the key and insert the value if it is absent, under a single
    /// exclusive-lock acquisition. Returns whether the key was found and whether an
    /// eviction occurred.
    ///
    /// The atomicity closes the race where two callers both observe "absent" and
    /// both insert.
    pub fn contains_or_insert(&self, key: K, value: V) -> (bool, bool) {
        let mut inner = self.inner.write();
        if inner.contains(&key) {
            return (true, false);
        }
        let evicted = inner.insert(key, value);
        (false, evicted)
    }

    /// Remove the entry for `key`. Returns whether it was present.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.inner.write().remove(key).is_some()
    }

    /// Remove and return the least-recently-used entry.
    pub fn pop_oldest(&self) -> Option<(K, V)> {
        self.inner.write().pop_oldest()
    }

    /// Return the least-recently-used entry without removing or touching it.
    pub fn peek_oldest(&self) -> Option<(K, V)> {
        self.inner.read().peek_oldest()
    }

    /// Change the capacity, evicting from the lru end until the cache fits.
    /// Returns the count of evicted entries.
    pub fn resize(&self, capacity: usize) -> usize {
        self.inner.write().resize(capacity)
    }

    /// Remove every entry carrying any of the given tags, returning the count of
    /// removed entries. An entry carrying several of the requested tags is removed
    /// and counted exactly once.
    pub fn invalidate<T>(&self, tags: impl IntoIterator<Item = T>) -> usize
    where
        T: AsRef<str>,
    {
        self.inner.write().invalidate(tags)
    }

    /// Keys of all entries carrying any of the given tags, deduplicated. No recency
    /// effect.
    pub fn find_by_tags<T>(&self, tags: impl IntoIterator<Item = T>) -> Vec<K>
    where
        T: AsRef<str>,
    {
        self.inner.read().find_by_tags(tags)
    }

    /// Remove all entries, firing the event listener for each, and empty the tag
    /// index.
    pub fn clear(&self) {
        self.inner.write().clear()
    }

    /// Keys in the cache, from oldest to newest.
    pub fn keys(&self) -> Vec<K> {
        self.inner.read().keys()
    }

    /// Count of entries in the cache.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.inner.read().capacity()
    }
}
