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

use crate::code::{Key, Value};

/// The cause of an entry removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Capacity-driven eviction, on insertion or on a shrinking resize.
    Evict,
    /// Explicit removal, by key or from the lru end.
    Remove,
    /// Tag-driven bulk invalidation.
    Invalidate,
    /// Cache clear.
    Clear,
}

/// Trait for the customized event listener.
///
/// The listener is invoked synchronously for every entry removal, on the stack of the
/// operation that triggered it and while the cache's exclusive lock is held. It MUST
/// NOT call back into the same cache instance: the lock is not reentrant and the call
/// deadlocks.
///
/// A panic raised by the listener propagates to the caller of the triggering
/// operation; the cache performs no rollback for that call.
pub trait EventListener: Send + Sync + 'static {
    /// Associated key type.
    type Key;
    /// Associated value type.
    type Value;

    /// Called when an entry leaves the cache, with the removal cause and the entry's
    /// final key and value.
    #[expect(unused_variables)]
    fn on_leave(&self, reason: Event, key: &Self::Key, value: &Self::Value)
    where
        Self::Key: Key,
        Self::Value: Value,
    {
    }
}
