//! Model Collection - ordered, insertion-order-preserving sequence of models
//!
//! A `Collection` never silently deduplicates; `unique()` is an explicit
//! opt-in keyed by primary key.

use std::collections::HashSet;

use serde_json::Value;

use crate::model::Model;

/// Ordered sequence of models with relation-oriented helpers
#[derive(Debug, Clone)]
pub struct Collection<M> {
    items: Vec<M>,
}

impl<M> Default for Collection<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Collection<M> {
    /// Create an empty collection
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Wrap an existing vector, preserving its order
    pub fn from_vec(items: Vec<M>) -> Self {
        Self { items }
    }

    /// Append a model at the end
    pub fn push(&mut self, item: M) {
        self.items.push(item);
    }

    /// First model in insertion order
    pub fn first(&self) -> Option<&M> {
        self.items.first()
    }

    /// Model at the given position
    pub fn get(&self, index: usize) -> Option<&M> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, M> {
        self.items.iter()
    }

    /// Append all models of `other`, preserving order and keeping duplicates
    pub fn union(mut self, other: Collection<M>) -> Self {
        self.items.extend(other.items);
        self
    }

    /// Borrow the underlying slice
    pub fn as_slice(&self) -> &[M] {
        &self.items
    }

    /// Consume the collection into its underlying vector
    pub fn into_vec(self) -> Vec<M> {
        self.items
    }
}

impl<M: Model> Collection<M> {
    /// Extract one attribute value per model, in collection order
    pub fn pluck(&self, column: &str) -> Vec<Value> {
        self.items
            .iter()
            .map(|m| m.attribute(column).unwrap_or(Value::Null))
            .collect()
    }

    /// Drop later models sharing a primary key with an earlier one
    ///
    /// Models without a primary key are always kept.
    pub fn unique(self) -> Self {
        let mut seen = HashSet::new();
        let items = self
            .items
            .into_iter()
            .filter(|m| match m.primary_key() {
                Some(key) => seen.insert(key.to_string()),
                None => true,
            })
            .collect();
        Self { items }
    }
}

impl<M> From<Vec<M>> for Collection<M> {
    fn from(items: Vec<M>) -> Self {
        Self::from_vec(items)
    }
}

impl<M> IntoIterator for Collection<M> {
    type Item = M;
    type IntoIter = std::vec::IntoIter<M>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, M> IntoIterator for &'a Collection<M> {
    type Item = &'a M;
    type IntoIter = std::slice::Iter<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<M> FromIterator<M> for Collection<M> {
    fn from_iter<I: IntoIterator<Item = M>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
