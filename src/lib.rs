//! Entwine - entity relationship resolution and eager loading for Postgres
//!
//! Models declare relations (`HasOne`, `HasMany`, `BelongsTo`,
//! `BelongsToMany`) as typed objects binding a query builder to one parent
//! instance. Single-record loads scope the query at construction time; batch
//! loads go through the dictionary-based eager loader, which resolves a
//! relation for any number of parents with exactly one related query.

pub mod collection;
pub mod error;
pub mod loading;
pub mod model;
pub mod query;
pub mod relations;

#[cfg(test)]
pub(crate) mod tests;

pub use collection::Collection;
pub use error::{ModelError, ModelResult};
pub use loading::eager_load;
pub use model::{Model, RelationBag};
pub use query::QueryBuilder;
pub use relations::{
    without_constraints, Attachable, BelongsTo, BelongsToMany, Constrained, HasMany, HasOne,
    HasOneOrMany, Pivot, Relation, SyncResult, PIVOT_RELATION,
};
