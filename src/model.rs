//! Base Model System - Core trait and per-instance relation cache
//!
//! Models expose a table identity, a primary key, an explicit typed attribute
//! store (`attribute`/`set_attribute` over `serde_json::Value`, no
//! reflection-based property resolution), and a relation cache that eager
//! loading writes once per load cycle.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ModelResult;

/// Trait for database entities participating in relation resolution
pub trait Model: Clone + Debug + Send + Sync + 'static {
    /// Table name for this model
    fn table_name() -> &'static str;

    /// Primary key column name
    fn primary_key_name() -> &'static str {
        "id"
    }

    /// Get the primary key value for this model instance
    fn primary_key(&self) -> Option<Value> {
        self.attribute(Self::primary_key_name())
            .filter(|v| !v.is_null())
    }

    /// Read a single attribute by column name
    fn attribute(&self, column: &str) -> Option<Value> {
        self.to_fields().get(column).cloned()
    }

    /// Write a single attribute by column name
    ///
    /// Attribute keys are a subset of the table's columns; writing an
    /// undeclared column is an `UnknownAttribute` error.
    fn set_attribute(&mut self, column: &str, value: Value) -> ModelResult<()>;

    /// Convert model to column-value pairs for database operations
    fn to_fields(&self) -> HashMap<String, Value>;

    /// Create a model instance from a database row
    fn from_row(row: &sqlx::postgres::PgRow) -> ModelResult<Self>
    where
        Self: Sized;

    /// The per-instance relation cache
    fn relations(&self) -> &RelationBag;

    /// Mutable access to the per-instance relation cache
    fn relations_mut(&mut self) -> &mut RelationBag;
}

/// Per-instance relation cache: relation name → resolved value
///
/// Values are type-erased; to-one relations are stored as `Option<Related>`
/// and to-many relations as `Collection<Related>`. A load cycle writes each
/// entry once (`init_relation` seeds the empty value, `match_related`
/// replaces it for parents with related rows). Entries are shared on clone,
/// which is sound because a resolved value is never mutated in place.
#[derive(Clone, Default)]
pub struct RelationBag {
    loaded: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl RelationBag {
    /// Create an empty relation cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a resolved relation value under the given name
    pub fn set<T: Send + Sync + 'static>(&mut self, name: &str, value: T) {
        self.loaded.insert(name.to_string(), Arc::new(value));
    }

    /// Read a resolved relation value, downcast to its concrete type
    ///
    /// Returns `None` both for a relation that was never loaded and for a
    /// type mismatch; reading an unset relation before it is loaded is the
    /// caller's bug.
    pub fn get<T: 'static>(&self, name: &str) -> Option<&T> {
        self.loaded.get(name)?.downcast_ref::<T>()
    }

    /// Check whether a relation name has been resolved
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    /// Evict a cached relation value
    pub fn unset(&mut self, name: &str) {
        self.loaded.remove(name);
    }

    /// Names of all resolved relations
    pub fn names(&self) -> Vec<&str> {
        self.loaded.keys().map(|k| k.as_str()).collect()
    }
}

impl fmt::Debug for RelationBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationBag")
            .field("loaded", &self.loaded.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_bag_round_trip() {
        let mut bag = RelationBag::new();
        assert!(!bag.is_loaded("posts"));

        bag.set("posts", vec![1i64, 2, 3]);
        assert!(bag.is_loaded("posts"));
        assert_eq!(bag.get::<Vec<i64>>("posts"), Some(&vec![1, 2, 3]));

        // Wrong type downcast yields None rather than panicking
        assert!(bag.get::<String>("posts").is_none());

        bag.unset("posts");
        assert!(!bag.is_loaded("posts"));
    }

    #[test]
    fn relation_bag_clone_shares_resolved_values() {
        let mut bag = RelationBag::new();
        bag.set("owner", Some("acme".to_string()));

        let cloned = bag.clone();
        assert_eq!(
            cloned.get::<Option<String>>("owner"),
            Some(&Some("acme".to_string()))
        );
    }
}
