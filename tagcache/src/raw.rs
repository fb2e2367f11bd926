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

use std::{hash::Hash, mem, sync::Arc};

use equivalent::Equivalent;
use hashbrown::{HashMap, HashSet};

use crate::{
    code::{Key, Value},
    error::{Error, Result},
    event::{Event, EventListener},
    slab::{Slab, Token},
};

/// An invalidation label attachable to many keys.
///
/// Labels are interned: the copy held by an entry and the tag-index bucket key share
/// one allocation.
pub type Tag = Arc<str>;

struct EntryNode<K, V> {
    key: K,
    value: V,
    tags: Vec<Tag>,

    /// Towards the mru end.
    prev: Option<Token>,
    /// Towards the lru end.
    next: Option<Token>,
}

/// The single-threaded eviction engine.
///
/// Entries live in a slab and are threaded into a doubly linked recency list with
/// token links, from most-recently-used (`head`) to least-recently-used (`tail`).
/// A key index maps keys to tokens, and a tag index maps each label to the set of
/// tokens currently carrying it.
///
/// `RawTagCache` performs no synchronization. [`TagCache`] wraps it with a
/// readers/writer lock for multi-threaded callers.
///
/// [`TagCache`]: crate::TagCache
pub struct RawTagCache<K, V>
where
    K: Key,
    V: Value,
{
    capacity: usize,

    slab: Slab<EntryNode<K, V>>,
    head: Option<Token>,
    tail: Option<Token>,

    index: HashMap<K, Token>,
    tags: HashMap<Tag, HashSet<Token>>,

    listener: Option<Arc<dyn EventListener<Key = K, Value = V>>>,
}

impl<K, V> RawTagCache<K, V>
where
    K: Key,
    V: Value,
{
    /// Create an engine holding at most `capacity` entries.
    ///
    /// Returns [`Error::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_event_listener(capacity, None)
    }

    /// Create an engine with an optional event listener invoked once per removal.
    ///
    /// Returns [`Error::InvalidCapacity`] if `capacity` is zero.
    pub fn with_event_listener(
        capacity: usize,
        listener: Option<Arc<dyn EventListener<Key = K, Value = V>>>,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity { given: capacity });
        }
        Ok(Self {
            capacity,
            slab: Slab::with_capacity(capacity),
            head: None,
            tail: None,
            index: HashMap::with_capacity(capacity),
            tags: HashMap::new(),
            listener,
        })
    }

    /// Insert a key/value pair with no tags. Returns whether an eviction occurred.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.insert_with_tags(key, value, std::iter::empty::<Tag>())
    }

    /// Insert a key/value pair and register the tags by which it can be invalidated.
    /// Returns whether an eviction occurred.
    ///
    /// Re-inserting a present key updates its value in place, moves it to the front,
    /// and **replaces** its tag set; the previous tags are fully detached. An update
    /// never evicts and never fires the listener.
    pub fn insert_with_tags<T>(&mut self, key: K, value: V, tags: impl IntoIterator<Item = T>) -> bool
    where
        T: Into<Tag>,
    {
        if let Some(&token) = self.index.get(&key) {
            self.move_to_front(token);
            let old = mem::take(&mut self.slab[token].tags);
            self.detach_all(token, &old);
            let new = tags.into_iter().map(|tag| self.attach(token, tag.into())).collect();
            let entry = &mut self.slab[token];
            entry.value = value;
            entry.tags = new;
            return false;
        }

        let token = self.slab.insert(EntryNode {
            key: key.clone(),
            value,
            tags: Vec::new(),
            prev: None,
            next: None,
        });
        self.link_front(token);
        let new = tags.into_iter().map(|tag| self.attach(token, tag.into())).collect();
        self.slab[token].tags = new;
        self.index.insert(key, token);

        let evict = self.slab.len() > self.capacity;
        if evict {
            self.evict_oldest();
        }
        evict
    }

    /// Look up a key's value and refresh its recency.
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let token = *self.index.get(key)?;
        self.move_to_front(token);
        Some(self.slab[token].value.clone())
    }

    /// Look up a key's value without updating its recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let token = *self.index.get(key)?;
        Some(self.slab[token].value.clone())
    }

    /// Whether the key is present. No recency effect.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Remove the entry for `key`, returning its key/value pair if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let token = self.index.get(key).copied()?;
        Some(self.remove_token(token, Event::Remove))
    }

    /// Remove and return the least-recently-used entry.
    pub fn pop_oldest(&mut self) -> Option<(K, V)> {
        let token = self.tail?;
        Some(self.remove_token(token, Event::Remove))
    }

    /// Return the least-recently-used entry without removing or touching it.
    pub fn peek_oldest(&self) -> Option<(K, V)> {
        let token = self.tail?;
        let entry = &self.slab[token];
        Some((entry.key.clone(), entry.value.clone()))
    }

    /// Change the capacity, evicting from the lru end until the cache fits.
    /// Returns the count of evicted entries; growth evicts nothing.
    pub fn resize(&mut self, capacity: usize) -> usize {
        let mut evicted = 0;
        while self.slab.len() > capacity {
            self.evict_oldest();
            evicted += 1;
        }
        self.capacity = capacity;
        evicted
    }

    /// Remove every entry carrying any of the given tags, returning the count of
    /// removed entries.
    ///
    /// An entry carrying several of the requested tags is removed and counted exactly
    /// once: removal detaches it from all of its buckets, so later tags in the same
    /// call no longer see it.
    pub fn invalidate<T>(&mut self, tags: impl IntoIterator<Item = T>) -> usize
    where
        T: AsRef<str>,
    {
        let mut removed = 0;
        for label in tags {
            let label = label.as_ref();
            let Some(bucket) = self.tags.get(label) else {
                continue;
            };
            let tokens = bucket.iter().copied().collect::<Vec<_>>();
            for token in tokens {
                // The snapshot may name an entry already removed under an earlier
                // tag of this call.
                if self.slab.contains(token) {
                    self.remove_token(token, Event::Invalidate);
                    removed += 1;
                }
            }
            tracing::trace!(tag = label, removed, "[tagcache]: invalidate tag");
        }
        removed
    }

    /// Keys of all entries carrying any of the given tags. No recency effect.
    ///
    /// A key carrying several of the queried tags appears once.
    pub fn find_by_tags<T>(&self, tags: impl IntoIterator<Item = T>) -> Vec<K>
    where
        T: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for label in tags {
            if let Some(bucket) = self.tags.get(label.as_ref()) {
                for &token in bucket {
                    if seen.insert(token) {
                        keys.push(self.slab[token].key.clone());
                    }
                }
            }
        }
        keys
    }

    /// Remove all entries and empty the tag index, firing the listener per entry.
    pub fn clear(&mut self) {
        while let Some(token) = self.tail {
            self.remove_token(token, Event::Clear);
        }
        assert!(self.index.is_empty());
        assert!(self.tags.is_empty());
    }

    /// Keys in the cache, from oldest to newest.
    pub fn keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.tail;
        while let Some(token) = cursor {
            let entry = &self.slab[token];
            keys.push(entry.key.clone());
            cursor = entry.prev;
        }
        keys
    }

    /// Count of entries in the cache.
    pub fn len(&self) -> usize {
        self.slab.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.slab.is_empty()
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn link_front(&mut self, token: Token) {
        self.slab[token].next = self.head;
        match self.head {
            Some(head) => self.slab[head].prev = Some(token),
            None => self.tail = Some(token),
        }
        self.head = Some(token);
    }

    fn unlink(&mut self, token: Token) {
        let (prev, next) = {
            let entry = &mut self.slab[token];
            (entry.prev.take(), entry.next.take())
        };
        match prev {
            Some(prev) => self.slab[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.slab[next].prev = prev,
            None => self.tail = prev,
        }
    }

    fn move_to_front(&mut self, token: Token) {
        if self.head == Some(token) {
            return;
        }
        self.unlink(token);
        self.link_front(token);
    }

    /// Insert the token into the label's bucket, lazily creating the bucket.
    /// Returns the interned label for the entry's tag list.
    fn attach(&mut self, token: Token, tag: Tag) -> Tag {
        let tag = match self.tags.get_key_value(&tag) {
            Some((interned, _)) => interned.clone(),
            None => tag,
        };
        self.tags.entry(tag.clone()).or_default().insert(token);
        tag
    }

    /// Remove the token from the label's bucket, dropping the bucket if it empties.
    fn detach(&mut self, token: Token, tag: &Tag) {
        if let Some(bucket) = self.tags.get_mut(tag) {
            bucket.remove(&token);
            if bucket.is_empty() {
                self.tags.remove(tag);
            }
        }
    }

    fn detach_all(&mut self, token: Token, tags: &[Tag]) {
        for tag in tags {
            self.detach(token, tag);
        }
    }

    fn evict_oldest(&mut self) {
        if let Some(token) = self.tail {
            tracing::trace!(capacity = self.capacity, "[tagcache]: evict entry from the lru end");
            self.remove_token(token, Event::Evict);
        }
    }

    /// The single destruction path: unlink, free the slot, drop the index and tag
    /// associations, and fire the listener exactly once.
    fn remove_token(&mut self, token: Token, reason: Event) -> (K, V) {
        self.unlink(token);
        let entry = self.slab.remove(token).unwrap();
        self.index.remove(&entry.key);
        self.detach_all(token, &entry.tags);
        if let Some(listener) = self.listener.as_ref() {
            listener.on_leave(reason, &entry.key, &entry.value);
        }
        (entry.key, entry.value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use itertools::Itertools;

    use super::*;

    #[derive(Debug, Default)]
    struct Tracker {
        events: Mutex<Vec<(Event, u64, u64)>>,
    }

    impl EventListener for Tracker {
        type Key = u64;
        type Value = u64;

        fn on_leave(&self, reason: Event, key: &Self::Key, value: &Self::Value) {
            self.events.lock().unwrap().push((reason, *key, *value));
        }
    }

    impl Tracker {
        fn take(&self) -> Vec<(Event, u64, u64)> {
            mem::take(&mut *self.events.lock().unwrap())
        }
    }

    fn tracked(capacity: usize) -> (RawTagCache<u64, u64>, Arc<Tracker>) {
        let tracker = Arc::new(Tracker::default());
        let cache = RawTagCache::with_event_listener(capacity, Some(tracker.clone())).unwrap();
        (cache, tracker)
    }

    impl<K, V> RawTagCache<K, V>
    where
        K: Key + std::fmt::Debug,
        V: Value,
    {
        /// Check the structural invariants: list, key index, and slab agree in size,
        /// the link chain is consistent, and tag buckets mirror entry tag sets with
        /// no empty buckets.
        fn validate(&self) {
            assert_eq!(self.index.len(), self.slab.len());

            let mut count = 0;
            let mut prev = None;
            let mut cursor = self.head;
            while let Some(token) = cursor {
                let entry = &self.slab[token];
                assert_eq!(entry.prev, prev);
                prev = cursor;
                cursor = entry.next;
                count += 1;
            }
            assert_eq!(self.tail, prev);
            assert_eq!(count, self.slab.len());

            for (tag, bucket) in &self.tags {
                assert!(!bucket.is_empty(), "zombie bucket for tag {tag}");
                for token in bucket {
                    assert!(self.slab[*token].tags.iter().any(|t| t == tag));
                }
            }

            let mut cursor = self.head;
            while let Some(token) = cursor {
                let entry = &self.slab[token];
                for tag in &entry.tags {
                    assert!(self.tags.get(tag).is_some_and(|bucket| bucket.contains(&token)));
                }
                cursor = entry.next;
            }

            for (key, token) in &self.index {
                assert_eq!(&self.slab[*token].key, key);
            }
        }
    }

    #[test]
    fn test_round_trip() {
        let mut cache = RawTagCache::new(4).unwrap();
        assert!(!cache.insert(1, 100));
        assert_eq!(cache.get(&1), Some(100));
        assert_eq!(cache.len(), 1);
        cache.validate();
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            RawTagCache::<u64, u64>::new(0),
            Err(Error::InvalidCapacity { given: 0 })
        ));
    }

    #[test]
    fn test_capacity_bound() {
        let (mut cache, tracker) = tracked(3);
        for i in 0..3 {
            assert!(!cache.insert(i, i));
        }
        assert!(cache.insert(3, 3));
        assert_eq!(cache.len(), 3);
        assert_eq!(tracker.take(), vec![(Event::Evict, 0, 0)]);
        assert!(!cache.contains(&0));
        cache.validate();
    }

    #[test]
    fn test_recency_update() {
        let mut cache = RawTagCache::new(2).unwrap();
        cache.insert('a', ());
        cache.insert('b', ());
        assert_eq!(cache.get(&'a'), Some(()));
        cache.insert('c', ());

        assert!(cache.contains(&'a'));
        assert!(!cache.contains(&'b'));
        assert!(cache.contains(&'c'));
        cache.validate();
    }

    #[test]
    fn test_update_replaces_value_without_eviction() {
        let (mut cache, tracker) = tracked(2);
        cache.insert(1, 100);
        cache.insert(2, 200);

        // Update is not an eviction and fires no event.
        assert!(!cache.insert(1, 101));
        assert!(tracker.take().is_empty());
        assert_eq!(cache.peek(&1), Some(101));

        // The update refreshed recency, so 2 is now the lru entry.
        assert_eq!(cache.peek_oldest(), Some((2, 200)));
        cache.validate();
    }

    #[test]
    fn test_tag_replace_not_union() {
        let mut cache = RawTagCache::new(4).unwrap();
        cache.insert_with_tags(1u64, 1u64, ["a"]);
        cache.insert_with_tags(1, 2, ["b"]);

        assert!(cache.find_by_tags(["a"]).is_empty());
        assert_eq!(cache.find_by_tags(["b"]), vec![1]);
        cache.validate();

        // The "a" bucket must be gone entirely, not merely empty.
        assert!(!cache.tags.contains_key("a"));
    }

    #[test]
    fn test_bulk_invalidation() {
        let (mut cache, tracker) = tracked(8);
        cache.insert_with_tags(1, 1, ["t"]);
        cache.insert_with_tags(2, 2, ["t"]);
        cache.insert_with_tags(3, 3, ["other"]);

        assert_eq!(cache.invalidate(["t"]), 2);
        assert_eq!(cache.len(), 1);

        let events = tracker.take();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|(reason, ..)| *reason == Event::Invalidate));
        assert_eq!(
            events.iter().map(|(_, key, _)| *key).sorted().collect_vec(),
            vec![1, 2]
        );
        cache.validate();
    }

    #[test]
    fn test_double_tag_invalidation_counts_once() {
        let (mut cache, tracker) = tracked(8);
        cache.insert_with_tags(1, 1, ["t1", "t2"]);

        assert_eq!(cache.invalidate(["t1", "t2"]), 1);
        assert_eq!(tracker.take().len(), 1);
        assert!(cache.is_empty());
        cache.validate();
    }

    #[test]
    fn test_invalidate_unknown_tag() {
        let mut cache = RawTagCache::new(4).unwrap();
        cache.insert_with_tags(1u64, 1u64, ["t"]);
        assert_eq!(cache.invalidate(["nope"]), 0);
        assert_eq!(cache.len(), 1);
        cache.validate();
    }

    #[test]
    fn test_invalidate_skips_removed_entries() {
        let mut cache = RawTagCache::new(4).unwrap();
        cache.insert_with_tags(1u64, 1u64, ["t"]);
        cache.remove(&1);
        assert_eq!(cache.invalidate(["t"]), 0);
        cache.validate();
    }

    #[test]
    fn test_find_by_tags_dedups_and_preserves_order() {
        let mut cache = RawTagCache::new(4).unwrap();
        cache.insert_with_tags(1u64, 1u64, ["t1", "t2"]);
        cache.insert_with_tags(2, 2, ["t2"]);

        let found = cache.find_by_tags(["t1", "t2"]);
        assert_eq!(found.iter().copied().sorted().collect_vec(), vec![1, 2]);

        // Pure read: the recency order is untouched.
        assert_eq!(cache.keys(), vec![1, 2]);
        cache.validate();
    }

    #[test]
    fn test_resize() {
        let (mut cache, tracker) = tracked(5);
        for i in 0..5 {
            cache.insert(i, i);
        }

        assert_eq!(cache.resize(2), 3);
        assert_eq!(cache.capacity(), 2);
        assert_eq!(cache.keys(), vec![3, 4]);
        assert_eq!(
            tracker.take(),
            vec![(Event::Evict, 0, 0), (Event::Evict, 1, 1), (Event::Evict, 2, 2)]
        );

        assert_eq!(cache.resize(10), 0);
        assert_eq!(cache.capacity(), 10);
        assert_eq!(cache.len(), 2);
        assert!(tracker.take().is_empty());
        cache.validate();
    }

    #[test]
    fn test_resize_to_zero() {
        let mut cache = RawTagCache::new(2).unwrap();
        cache.insert(1, 1);
        assert_eq!(cache.resize(0), 1);

        // With capacity zero an insert evicts the entry it just added.
        assert!(cache.insert(2, 2));
        assert!(cache.is_empty());
        cache.validate();
    }

    #[test]
    fn test_miss_is_idempotent() {
        let mut cache = RawTagCache::new(4).unwrap();
        cache.insert(1, 1);
        cache.insert(2, 2);

        assert_eq!(cache.get(&3), None);
        assert_eq!(cache.peek(&3), None);
        assert!(!cache.contains(&3));
        assert_eq!(cache.remove(&3), None);

        assert_eq!(cache.keys(), vec![1, 2]);
        cache.validate();
    }

    #[test]
    fn test_keys_oldest_to_newest() {
        let mut cache = RawTagCache::new(4).unwrap();
        cache.insert(1, 1);
        cache.insert(2, 2);
        cache.insert(3, 3);
        cache.get(&1);

        assert_eq!(cache.keys(), vec![2, 3, 1]);
        cache.validate();
    }

    #[test]
    fn test_pop_and_peek_oldest() {
        let (mut cache, tracker) = tracked(4);
        assert_eq!(cache.peek_oldest(), None);
        assert_eq!(cache.pop_oldest(), None);

        cache.insert(1, 100);
        cache.insert(2, 200);

        assert_eq!(cache.peek_oldest(), Some((1, 100)));
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.pop_oldest(), Some((1, 100)));
        assert_eq!(tracker.take(), vec![(Event::Remove, 1, 100)]);
        assert_eq!(cache.len(), 1);
        cache.validate();
    }

    #[test]
    fn test_remove_detaches_tags() {
        let (mut cache, tracker) = tracked(4);
        cache.insert_with_tags(1, 1, ["t"]);

        assert_eq!(cache.remove(&1), Some((1, 1)));
        assert_eq!(tracker.take(), vec![(Event::Remove, 1, 1)]);
        assert!(cache.tags.is_empty());
        assert!(cache.find_by_tags(["t"]).is_empty());
        cache.validate();
    }

    #[test]
    fn test_clear() {
        let (mut cache, tracker) = tracked(4);
        cache.insert_with_tags(1, 1, ["a"]);
        cache.insert_with_tags(2, 2, ["b"]);
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.tags.is_empty());

        let events = tracker.take();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|(reason, ..)| *reason == Event::Clear));
        cache.validate();
    }

    #[test]
    fn test_eviction_detaches_tags() {
        let mut cache = RawTagCache::new(1).unwrap();
        cache.insert_with_tags(1u64, 1u64, ["t"]);
        cache.insert_with_tags(2, 2, ["t"]);

        assert_eq!(cache.find_by_tags(["t"]), vec![2]);
        assert_eq!(cache.invalidate(["t"]), 1);
        cache.validate();
    }

    #[test]
    fn test_shared_tag_bucket_survives_partial_detach() {
        let mut cache = RawTagCache::new(4).unwrap();
        cache.insert_with_tags(1u64, 1u64, ["t"]);
        cache.insert_with_tags(2, 2, ["t"]);
        cache.remove(&1);

        assert_eq!(cache.find_by_tags(["t"]), vec![2]);
        cache.validate();
    }

    #[test]
    fn test_borrowed_key_lookup() {
        let mut cache = RawTagCache::new(2).unwrap();
        cache.insert("hello".to_string(), 1u64);

        assert_eq!(cache.get("hello"), Some(1));
        assert_eq!(cache.peek("hello"), Some(1));
        assert!(cache.contains("hello"));
        assert_eq!(cache.remove("hello"), Some(("hello".to_string(), 1)));
    }

    #[test]
    fn test_randomized_ops_hold_invariants() {
        use rand::{rngs::SmallRng, Rng, SeedableRng};

        let mut rng = SmallRng::seed_from_u64(42);
        let mut cache = RawTagCache::new(64).unwrap();

        for _ in 0..10_000 {
            let key = rng.random_range(0..256u64);
            match rng.random_range(0..100) {
                0..60 => {
                    let tag = format!("tag-{}", key % 8);
                    cache.insert_with_tags(key, key, [tag]);
                }
                60..80 => {
                    cache.get(&key);
                }
                80..90 => {
                    cache.remove(&key);
                }
                90..95 => {
                    cache.invalidate([format!("tag-{}", rng.random_range(0..8u64))]);
                }
                95..98 => {
                    cache.pop_oldest();
                }
                _ => {
                    cache.resize(rng.random_range(1..128));
                }
            }
            assert!(cache.len() <= cache.capacity());
        }
        cache.validate();
    }
}
