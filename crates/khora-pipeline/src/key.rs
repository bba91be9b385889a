// Copyright 2025 eraflo
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

//! Stable 64-bit identifiers for pipeline nodes and variables.
//!
//! Keys are derived from developer-chosen names with a `const` FNV-1a hash, so
//! a slot such as `NodeKey::from_name("update")` can be declared as a
//! compile-time constant and still match the key the compiler computes for
//! `<step id="update"/>`.

use std::fmt;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hashes a name into a stable 64-bit value (FNV-1a).
pub const fn hash_name(name: &str) -> u64 {
    let bytes = name.as_bytes();
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Identity of a node inside one compiled pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(u64);

impl NodeKey {
    /// Key of the synthetic root node mapped to the document's container element.
    pub const ROOT: NodeKey = NodeKey(0);

    /// Derives the key of a node declared with an explicit `id`.
    pub const fn from_name(name: &str) -> Self {
        Self(hash_name(name))
    }

    /// Positional key for a node declared without an `id`.
    ///
    /// `index` is the node's document-order position, starting at 1 for the
    /// first element under the container.
    pub const fn from_index(index: u64) -> Self {
        Self(index)
    }

    /// Returns the raw 64-bit value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Identity of a variable cell in the [`VariableStore`](crate::VariableStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableKey(u64);

impl VariableKey {
    /// Derives the key of a named variable.
    pub const fn from_name(name: &str) -> Self {
        Self(hash_name(name))
    }

    /// Returns the raw 64-bit value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VariableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
