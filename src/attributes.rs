//! Per-request attribute storage.
//!
//! Attributes are opaque values shared between the pieces of code handling one request.
//! Names keep their insertion order; overwriting a name keeps its original position.
//! Setting a name to `None` removes it, so an attribute is never present without a value.

use std::{any::Any, sync::Arc};

use crate::types::AttributeValue;

/// Insertion-ordered name to value mapping scoped to a single request.
#[derive(Default)]
pub struct AttributeStore {
  entries: Vec<(String, AttributeValue)>,
}

impl AttributeStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn position(&self, name: &str) -> Option<usize> {
    self.entries.iter().position(|(n, _)| n == name)
  }

  /// Raw value stored under `name`.
  pub fn get(&self, name: &str) -> Option<&AttributeValue> {
    self.position(name).map(|idx| &self.entries[idx].1)
  }

  /// Value stored under `name`, downcast to `T`.
  ///
  /// Returns `None` when the attribute is absent or holds another type.
  pub fn get_as<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
    self.get(name)
      .cloned()
      .and_then(|value| value.downcast::<T>().ok())
  }

  /// Stores `value` under `name`, or removes `name` when `value` is `None`.
  pub fn set(&mut self, name: impl Into<String>, value: Option<AttributeValue>) {
    let name = name.into();
    match value {
      None => {
        self.remove(&name);
      }
      Some(value) => match self.position(&name) {
        Some(idx) => self.entries[idx].1 = value,
        None => self.entries.push((name, value)),
      },
    }
  }

  /// Stores a typed value under `name`.
  pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
    let value: AttributeValue = Arc::new(value);
    self.set(name, Some(value));
  }

  pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
    self.position(name).map(|idx| self.entries.remove(idx).1)
  }

  /// Attribute names in insertion order.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(n, _)| n.as_str())
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl std::fmt::Debug for AttributeStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_set().entries(self.names()).finish()
  }
}
