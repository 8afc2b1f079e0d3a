//! Relations Module - relation variants with dictionary-based eager matching
//!
//! Each variant binds a query builder to one parent model instance and
//! implements the four-step eager contract (`add_eager_constraints`,
//! `init_relation`, one query, `match_related`) on top of it.

pub mod belongs_to;
pub mod belongs_to_many;
pub mod constraints;
pub mod has_many;
pub mod has_one;
pub mod has_one_or_many;
pub mod pivot;
pub mod relation;

pub use belongs_to::BelongsTo;
pub use belongs_to_many::{Attachable, BelongsToMany, SyncResult};
pub use constraints::{without_constraints, Constrained};
pub use has_many::HasMany;
pub use has_one::HasOne;
pub use has_one_or_many::HasOneOrMany;
pub use pivot::{Pivot, PIVOT_RELATION};
pub use relation::Relation;

use std::collections::HashSet;

use serde_json::Value;

use crate::model::Model;

/// Render an attribute value as a dictionary key
///
/// Numbers and strings collapse onto the same representation so an integer
/// foreign key matches a stringly-typed copy of it.
pub(crate) fn dictionary_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Collect the unique, non-null values of one column across a batch of models
///
/// Order of first appearance is preserved so generated `IN (…)` lists are
/// deterministic.
pub(crate) fn eager_keys<M: Model>(models: &[M], column: &str) -> Vec<Value> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for model in models {
        if let Some(value) = model.attribute(column) {
            if value.is_null() {
                continue;
            }
            if seen.insert(dictionary_key(&value)) {
                keys.push(value);
            }
        }
    }
    keys
}
