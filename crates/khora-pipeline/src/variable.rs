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

//! Shared variables consulted by `if` and `deferred` nodes.
//!
//! A variable is created lazily, `Unset`, the first time anything refers to it
//! by name or key. There is no "not found" path. Each cell is guarded by its own
//! lock so a read or write of one variable is atomic, but nothing orders writes
//! across different variables: a frame may observe a value written by a task
//! node that has not joined yet.

use crate::key::VariableKey;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// The dynamically typed content of a variable cell.
#[derive(Clone, Default)]
pub enum Value {
    /// Never written.
    #[default]
    Unset,
    /// A boolean flag.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// An opaque payload shared by convention between subsystems.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wraps an arbitrary payload.
    pub fn opaque<T: Any + Send + Sync>(payload: T) -> Self {
        Value::Opaque(Arc::new(payload))
    }

    /// Returns `true` only for `Bool(true)`.
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    /// Returns `true` if the cell was never written.
    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Unset)
    }

    /// Returns the boolean content, if the value is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer content, if the value is an `Int`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns a numeric value as `f64`, widening `Int`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the opaque payload if it holds a `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Value::Opaque(payload) => Arc::clone(payload).downcast::<T>().ok(),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unset => write!(f, "Unset"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(v) => write!(f, "Float({v})"),
            Value::Opaque(_) => write!(f, "Opaque(..)"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

#[derive(Debug, Default)]
struct VariableCell {
    value: Mutex<Value>,
}

/// A shared handle to one variable cell.
///
/// Handles are cheap to clone; every clone observes the same cell.
#[derive(Clone)]
pub struct Variable {
    key: VariableKey,
    cell: Arc<VariableCell>,
}

impl Variable {
    /// The key this variable is stored under.
    pub fn key(&self) -> VariableKey {
        self.key
    }

    /// Returns a copy of the current value.
    pub fn get(&self) -> Value {
        self.cell
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the current value.
    pub fn set(&self, value: impl Into<Value>) {
        *self
            .cell
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = value.into();
    }

    /// Atomically rewrites the value from its previous content.
    pub fn update(&self, f: impl FnOnce(&Value) -> Value) {
        let mut guard = self
            .cell
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let next = f(&guard);
        *guard = next;
    }

    /// Resets the cell to `Unset`.
    pub fn clear(&self) {
        self.set(Value::Unset);
    }

    /// Shorthand for `get().is_true()`.
    pub fn is_true(&self) -> bool {
        self.get().is_true()
    }

    /// Shorthand for `get().as_f64()`.
    pub fn as_f64(&self) -> Option<f64> {
        self.get().as_f64()
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("key", &self.key)
            .field("value", &self.get())
            .finish()
    }
}

/// The pipeline-wide map of variables.
#[derive(Default)]
pub struct VariableStore {
    cells: RwLock<HashMap<VariableKey, Arc<VariableCell>>>,
}

impl VariableStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the variable named `name`, creating it if needed.
    pub fn get_or_create(&self, name: &str) -> Variable {
        self.get_or_create_by_key(VariableKey::from_name(name))
    }

    /// Returns the variable stored under `key`, creating it if needed.
    pub fn get_or_create_by_key(&self, key: VariableKey) -> Variable {
        if let Some(cell) = self
            .cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Variable {
                key,
                cell: Arc::clone(cell),
            };
        }

        let mut cells = self.cells.write().unwrap_or_else(PoisonError::into_inner);
        let cell = cells.entry(key).or_default();
        Variable {
            key,
            cell: Arc::clone(cell),
        }
    }

    /// Number of variables referenced so far.
    pub fn len(&self) -> usize {
        self.cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no variable has been referenced yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for VariableStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableStore")
            .field("variables", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_first_access_creates_unset_cell() {
        let store = VariableStore::new();
        let paused = store.get_or_create("paused");
        assert!(paused.get().is_unset());
        assert!(!paused.is_true());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_handles_share_the_same_cell() {
        let store = VariableStore::new();
        let a = store.get_or_create("blur");
        let b = store.get_or_create_by_key(VariableKey::from_name("blur"));
        a.set(true);
        assert!(b.is_true());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_only_bool_true_is_true() {
        assert!(Value::Bool(true).is_true());
        assert!(!Value::Bool(false).is_true());
        assert!(!Value::Int(1).is_true());
        assert!(!Value::Float(1.0).is_true());
        assert!(!Value::Unset.is_true());
    }

    #[test]
    fn test_numeric_widening() {
        assert_eq!(Value::from(3).as_f64(), Some(3.0));
        assert_eq!(Value::from(0.5f32).as_f64(), Some(0.5));
        assert_eq!(Value::Bool(true).as_f64(), None);
        assert_eq!(Value::Float(2.0).as_i64(), None);
    }

    #[test]
    fn test_opaque_downcast() {
        struct Atlas {
            pages: u32,
        }
        let value = Value::opaque(Atlas { pages: 4 });
        assert_eq!(value.downcast::<Atlas>().map(|a| a.pages), Some(4));
        assert!(value.downcast::<String>().is_none());
    }

    #[test]
    fn test_concurrent_updates_are_atomic_per_cell() {
        let store = Arc::new(VariableStore::new());
        store.get_or_create("counter").set(0i64);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let counter = store.get_or_create("counter");
                    for _ in 0..1000 {
                        counter.update(|v| Value::Int(v.as_i64().unwrap_or(0) + 1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get_or_create("counter").get().as_i64(), Some(8000));
    }
}
