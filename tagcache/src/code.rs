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

use std::hash::Hash;

/// Key trait for the cache.
///
/// `Clone` is required because the key index keeps its own copy of the key.
pub trait Key: Send + Sync + 'static + Hash + Eq + Clone {}
impl<T> Key for T where T: Send + Sync + 'static + Hash + Eq + Clone {}

/// Value trait for the cache.
///
/// The cache never inspects values; reads hand back clones because a borrow cannot
/// outlive the lock scope.
pub trait Value: Send + Sync + 'static + Clone {}
impl<T> Value for T where T: Send + Sync + 'static + Clone {}
