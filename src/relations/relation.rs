//! Relation trait - the contract every relation variant implements
//!
//! A relation binds a query builder to one parent model instance. The
//! single-record path applies constraints at construction and resolves with
//! `get_results`; the eager path applies one batched constraint, runs one
//! query, and distributes the rows across all parents with `match_related`.

use async_trait::async_trait;
use sqlx::Pool;
use sqlx::Postgres;

use crate::collection::Collection;
use crate::error::ModelResult;
use crate::model::Model;
use crate::query::QueryBuilder;

/// Core relation contract
///
/// `Value` is the cardinality-specific result shape: `Option<Related>` for
/// to-one relations, `Collection<Related>` for to-many relations.
#[async_trait]
pub trait Relation<Parent, Related>: Send
where
    Parent: Model,
    Related: Model,
{
    /// Resolved result shape for one parent
    type Value: Clone + Send + Sync + 'static;

    /// The parent model instance this relation is bound to
    fn parent(&self) -> &Parent;

    /// The underlying query builder
    ///
    /// Together with `query_mut` this is the explicit forwarding seam to the
    /// builder; there is no catch-all delegation of unknown calls.
    fn query(&self) -> &QueryBuilder<Related>;

    /// Mutable access to the underlying query builder
    fn query_mut(&mut self) -> &mut QueryBuilder<Related>;

    /// The empty value appropriate to this relation's cardinality
    fn empty_value(&self) -> Self::Value;

    /// Apply parent-specific filters for a single-record load
    ///
    /// A no-op while constraints are suppressed.
    fn add_constraints(&mut self);

    /// Apply a single batched `WHERE key IN (…)` filter built from the
    /// unique, non-null key set across all supplied models
    fn add_eager_constraints(&mut self, models: &[Parent]);

    /// Seed every model's relation cache with the empty value, so parents
    /// with no related rows still end up with a defined relation value
    fn init_relation(&self, models: &mut [Parent], relation: &str) {
        for model in models.iter_mut() {
            model.relations_mut().set(relation, self.empty_value());
        }
    }

    /// Attach fetched rows to the correct parents in a single linear pass
    fn match_related(&self, models: &mut [Parent], results: Collection<Related>, relation: &str);

    /// Single-record terminal fetch
    async fn get_results(&self, pool: &Pool<Postgres>) -> ModelResult<Self::Value>;

    /// Batch fetch for the eager path
    async fn get_eager(&self, pool: &Pool<Postgres>) -> ModelResult<Collection<Related>> {
        self.query()
            .clone()
            .get(pool)
            .await
            .map(Collection::from_vec)
    }
}
