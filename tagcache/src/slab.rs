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

use std::{
    num::NonZeroUsize,
    ops::{Index, IndexMut},
};

/// Handle to an occupied slot in a [`Slab`].
///
/// Niche-packed: `Option<Token>` is pointer-sized, so the intrusive links stored in
/// slab entries cost one word each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(NonZeroUsize);

impl Token {
    fn new(index: usize) -> Self {
        Self(NonZeroUsize::MIN.saturating_add(index))
    }

    fn index(&self) -> usize {
        self.0.get() - 1
    }
}

/// A vector-backed arena whose vacant slots thread a free list.
///
/// Removal leaves a vacant slot for reuse, so a [`Token`] stays valid until the slot
/// it names is removed.
pub struct Slab<T> {
    slots: Vec<Slot<T>>,
    next_free: usize,
    len: usize,
}

#[derive(Debug)]
enum Slot<T> {
    Vacant(usize),
    Occupied(T),
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slab<T> {
    /// Create an empty slab.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            next_free: 0,
            len: 0,
        }
    }

    /// Create an empty slab with space reserved for `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            next_free: 0,
            len: 0,
        }
    }

    /// Insert a value and return the token naming its slot.
    pub fn insert(&mut self, val: T) -> Token {
        let index = self.next_free;
        if index == self.slots.len() {
            self.slots.push(Slot::Occupied(val));
            self.next_free = index + 1;
        } else {
            match std::mem::replace(&mut self.slots[index], Slot::Occupied(val)) {
                Slot::Vacant(next) => self.next_free = next,
                Slot::Occupied(_) => unreachable!("free list entry must be vacant"),
            }
        }
        self.len += 1;
        Token::new(index)
    }

    /// Remove and return the value at `token`, or `None` if the slot is vacant.
    pub fn remove(&mut self, token: Token) -> Option<T> {
        let index = token.index();
        let slot = self.slots.get_mut(index)?;
        if matches!(slot, Slot::Vacant(_)) {
            return None;
        }
        match std::mem::replace(slot, Slot::Vacant(self.next_free)) {
            Slot::Occupied(val) => {
                self.next_free = index;
                self.len -= 1;
                Some(val)
            }
            Slot::Vacant(_) => unreachable!(),
        }
    }

    /// Get a reference to the value at `token`.
    pub fn get(&self, token: Token) -> Option<&T> {
        match self.slots.get(token.index()) {
            Some(Slot::Occupied(val)) => Some(val),
            _ => None,
        }
    }

    /// Get a mutable reference to the value at `token`.
    pub fn get_mut(&mut self, token: Token) -> Option<&mut T> {
        match self.slots.get_mut(token.index()) {
            Some(Slot::Occupied(val)) => Some(val),
            _ => None,
        }
    }

    /// Whether `token` names an occupied slot.
    pub fn contains(&self, token: Token) -> bool {
        self.get(token).is_some()
    }

    /// Count of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the slab holds no values.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Index<Token> for Slab<T> {
    type Output = T;

    fn index(&self, token: Token) -> &T {
        match self.slots.get(token.index()) {
            Some(Slot::Occupied(val)) => val,
            _ => panic!("vacant or out-of-bounds token: {}", token.index()),
        }
    }
}

impl<T> IndexMut<Token> for Slab<T> {
    fn index_mut(&mut self, token: Token) -> &mut T {
        match self.slots.get_mut(token.index()) {
            Some(Slot::Occupied(val)) => val,
            _ => panic!("vacant or out-of-bounds token: {}", token.index()),
        }
    }
}
