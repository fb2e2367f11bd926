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

use tagcache::TagCache;

fn main() {
    let cache: TagCache<String, String> = TagCache::new(16).unwrap();

    // One tag per upstream resource each artifact was computed from.
    cache.insert_with_tags("thumb:1".to_string(), "…".to_string(), ["image:1"]);
    cache.insert_with_tags("thumb:2".to_string(), "…".to_string(), ["image:2"]);
    cache.insert_with_tags("gallery".to_string(), "…".to_string(), ["image:1", "image:2"]);

    assert_eq!(cache.len(), 3);
    assert!(cache.get("gallery").is_some());

    // image:1 changed; drop everything derived from it.
    let removed = cache.invalidate(["image:1"]);
    assert_eq!(removed, 2);

    assert!(!cache.contains("thumb:1"));
    assert!(!cache.contains("gallery"));
    assert!(cache.contains("thumb:2"));
}
