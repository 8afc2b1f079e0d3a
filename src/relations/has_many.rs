//! HasMany relation - one parent has many related models

use async_trait::async_trait;
use sqlx::Pool;
use sqlx::Postgres;

use super::constraints::Constrained;
use super::has_one_or_many::HasOneOrMany;
use super::relation::Relation;
use crate::collection::Collection;
use crate::error::ModelResult;
use crate::model::Model;
use crate::query::QueryBuilder;

/// HasMany relation - the related table carries the parent's key
#[derive(Debug, Clone)]
pub struct HasMany<Parent, Related>
where
    Parent: Model,
    Related: Model,
{
    inner: HasOneOrMany<Parent, Related>,
}

impl<Parent, Related> HasMany<Parent, Related>
where
    Parent: Model,
    Related: Model,
{
    /// Create the relation with single-record constraints applied
    pub fn new(parent: Parent, foreign_key: &str, local_key: &str) -> Self {
        Self {
            inner: HasOneOrMany::build(parent, foreign_key, local_key, true),
        }
    }

    /// Create the relation without default scoping, for the eager path
    pub fn unconstrained(parent: Parent, foreign_key: &str, local_key: &str) -> Self {
        Self {
            inner: HasOneOrMany::build(parent, foreign_key, local_key, false),
        }
    }

    /// Stamp the foreign key onto `model` and persist it
    pub async fn save(&self, model: Related, pool: &Pool<Postgres>) -> ModelResult<Related> {
        self.inner.save(model, pool).await
    }

    /// Build a new related row with the foreign key pre-populated
    pub async fn create(
        &self,
        attributes: std::collections::HashMap<String, serde_json::Value>,
        pool: &Pool<Postgres>,
    ) -> ModelResult<Related> {
        self.inner.create(attributes, pool).await
    }

    /// Bulk-update all currently matching related rows
    pub async fn update(
        &self,
        attributes: Vec<(String, serde_json::Value)>,
        pool: &Pool<Postgres>,
    ) -> ModelResult<u64> {
        self.inner.update(attributes, pool).await
    }
}

#[async_trait]
impl<Parent, Related> Relation<Parent, Related> for HasMany<Parent, Related>
where
    Parent: Model,
    Related: Model,
{
    type Value = Collection<Related>;

    fn parent(&self) -> &Parent {
        &self.inner.parent
    }

    fn query(&self) -> &QueryBuilder<Related> {
        &self.inner.query
    }

    fn query_mut(&mut self) -> &mut QueryBuilder<Related> {
        &mut self.inner.query
    }

    fn empty_value(&self) -> Self::Value {
        Collection::new()
    }

    fn add_constraints(&mut self) {
        self.inner.add_constraints();
    }

    fn add_eager_constraints(&mut self, models: &[Parent]) {
        self.inner.add_eager_constraints(models);
    }

    fn match_related(&self, models: &mut [Parent], results: Collection<Related>, relation: &str) {
        self.inner
            .match_one_or_many(models, results, relation, false);
    }

    async fn get_results(&self, pool: &Pool<Postgres>) -> ModelResult<Self::Value> {
        self.inner
            .query
            .clone()
            .get(pool)
            .await
            .map(Collection::from_vec)
    }
}

impl<Parent, Related> Constrained for HasMany<Parent, Related>
where
    Parent: Model,
    Related: Model,
{
    fn constraints_enabled(&self) -> bool {
        self.inner.constraints_enabled()
    }

    fn set_constraints_enabled(&mut self, enabled: bool) {
        self.inner.set_constraints_enabled(enabled);
    }
}
