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

//! tagcache is a fixed-capacity, in-memory key/value cache with lru eviction and a
//! secondary tag index for bulk invalidation.
//!
//! Tags let many keys be dropped in one call without scanning the whole cache, e.g.
//! caching computed artifacts that must all be invalidated together when an upstream
//! resource changes (one tag per upstream resource).
//!
//! # Example
//!
//! ```
//! use tagcache::TagCache;
//!
//! let cache: TagCache<String, String> = TagCache::new(16).unwrap();
//!
//! cache.insert_with_tags("k1".to_string(), "v1".to_string(), ["upstream-a"]);
//! cache.insert_with_tags("k2".to_string(), "v2".to_string(), ["upstream-a", "upstream-b"]);
//!
//! assert_eq!(cache.get("k1"), Some("v1".to_string()));
//!
//! // Drop everything derived from upstream-a in one call.
//! assert_eq!(cache.invalidate(["upstream-a"]), 2);
//! assert!(cache.is_empty());
//! ```

mod cache;
mod code;
mod error;
mod event;
mod raw;
mod slab;

pub mod prelude;
pub use prelude::*;
