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

/// Error returned by tagcache functions.
///
/// Construction is the only fallible path. Lookups and removals signal absence with
/// `Option` or `bool`, never with an error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The cache capacity must be a positive value.
    #[error("cache capacity must be a positive value, given: {given}")]
    InvalidCapacity {
        /// The rejected capacity.
        given: usize,
    },
}

/// Result type with [`Error`] pre-filled.
pub type Result<T> = std::result::Result<T, Error>;
