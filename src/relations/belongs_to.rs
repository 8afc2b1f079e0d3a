//! BelongsTo relation - the child holds the foreign key pointing at its owner
//!
//! Constraints scope the owner's table, not the child's. `associate` and
//! `dissociate` are purely in-memory foreign-key mutations; nothing persists
//! until the caller saves the child.

use std::marker::PhantomData;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::Pool;
use sqlx::Postgres;

use super::constraints::Constrained;
use super::relation::Relation;
use super::{dictionary_key, eager_keys};
use crate::collection::Collection;
use crate::error::{ModelError, ModelResult};
use crate::model::Model;
use crate::query::QueryBuilder;

/// BelongsTo relation - inverse single pointer from child to owner
#[derive(Debug, Clone)]
pub struct BelongsTo<Child, Owner>
where
    Child: Model,
    Owner: Model,
{
    query: QueryBuilder<Owner>,
    child: Child,
    foreign_key: String,
    owner_key: String,
    relation_name: String,
    constraints_enabled: bool,
    _owner: PhantomData<Owner>,
}

impl<Child, Owner> BelongsTo<Child, Owner>
where
    Child: Model,
    Owner: Model,
{
    /// Create the relation with single-record constraints applied
    pub fn new(child: Child, foreign_key: &str, owner_key: &str, relation_name: &str) -> Self {
        Self::build(child, foreign_key, owner_key, relation_name, true)
    }

    /// Create the relation without default scoping, for the eager path
    pub fn unconstrained(
        child: Child,
        foreign_key: &str,
        owner_key: &str,
        relation_name: &str,
    ) -> Self {
        Self::build(child, foreign_key, owner_key, relation_name, false)
    }

    fn build(
        child: Child,
        foreign_key: &str,
        owner_key: &str,
        relation_name: &str,
        constrained: bool,
    ) -> Self {
        let query = QueryBuilder::new().from(Owner::table_name());
        let mut relation = Self {
            query,
            child,
            foreign_key: foreign_key.to_string(),
            owner_key: owner_key.to_string(),
            relation_name: relation_name.to_string(),
            constraints_enabled: constrained,
            _owner: PhantomData,
        };
        relation.apply_constraints();
        relation
    }

    /// Owner key column, qualified with the owner table name
    pub fn qualified_owner_key(&self) -> String {
        format!("{}.{}", Owner::table_name(), self.owner_key)
    }

    /// The child's foreign key value, if set and non-null
    pub fn foreign_key_value(&self) -> Option<Value> {
        self.child
            .attribute(&self.foreign_key)
            .filter(|v| !v.is_null())
    }

    fn apply_constraints(&mut self) {
        if !self.constraints_enabled {
            return;
        }
        let value = self.foreign_key_value().unwrap_or(Value::Null);
        self.query = self.query.clone().where_eq(&self.qualified_owner_key(), value);
    }

    /// Point the child at `owner` and seed the relation cache with it
    pub fn associate(&self, child: &mut Child, owner: &Owner) -> ModelResult<()> {
        let key = owner
            .attribute(&self.owner_key)
            .filter(|v| !v.is_null())
            .ok_or_else(|| ModelError::IncompatibleAssociation {
                expected: self.owner_key.clone(),
                model: Owner::table_name().to_string(),
            })?;
        child.set_attribute(&self.foreign_key, key)?;
        child
            .relations_mut()
            .set(&self.relation_name, Some(owner.clone()));
        Ok(())
    }

    /// Point the child at a raw owner id
    ///
    /// Any cached owner is evicted since it may no longer match.
    pub fn associate_id(&self, child: &mut Child, id: Value) -> ModelResult<()> {
        child.set_attribute(&self.foreign_key, id)?;
        child.relations_mut().unset(&self.relation_name);
        Ok(())
    }

    /// Null the foreign key and cache the relation as absent
    pub fn dissociate(&self, child: &mut Child) -> ModelResult<()> {
        child.set_attribute(&self.foreign_key, Value::Null)?;
        child
            .relations_mut()
            .set(&self.relation_name, None::<Owner>);
        Ok(())
    }
}

#[async_trait]
impl<Child, Owner> Relation<Child, Owner> for BelongsTo<Child, Owner>
where
    Child: Model,
    Owner: Model,
{
    type Value = Option<Owner>;

    fn parent(&self) -> &Child {
        &self.child
    }

    fn query(&self) -> &QueryBuilder<Owner> {
        &self.query
    }

    fn query_mut(&mut self) -> &mut QueryBuilder<Owner> {
        &mut self.query
    }

    fn empty_value(&self) -> Self::Value {
        None
    }

    fn add_constraints(&mut self) {
        self.apply_constraints();
    }

    fn add_eager_constraints(&mut self, models: &[Child]) {
        let keys = eager_keys(models, &self.foreign_key);
        self.query = self.query.clone().where_in(&self.qualified_owner_key(), keys);
    }

    fn match_related(&self, models: &mut [Child], results: Collection<Owner>, relation: &str) {
        // At most one owner per key; later duplicates are ignored.
        let mut dictionary = std::collections::HashMap::new();
        for owner in results {
            if let Some(value) = owner.attribute(&self.owner_key) {
                if value.is_null() {
                    continue;
                }
                dictionary.entry(dictionary_key(&value)).or_insert(owner);
            }
        }

        for model in models.iter_mut() {
            let key = match model.attribute(&self.foreign_key) {
                Some(value) if !value.is_null() => dictionary_key(&value),
                _ => continue,
            };
            if let Some(owner) = dictionary.get(&key) {
                model.relations_mut().set(relation, Some(owner.clone()));
            }
        }
    }

    async fn get_results(&self, pool: &Pool<Postgres>) -> ModelResult<Self::Value> {
        // A null foreign key can never match an owner; skip the query.
        if self.foreign_key_value().is_none() {
            return Ok(None);
        }
        self.query.clone().first(pool).await
    }
}

impl<Child, Owner> Constrained for BelongsTo<Child, Owner>
where
    Child: Model,
    Owner: Model,
{
    fn constraints_enabled(&self) -> bool {
        self.constraints_enabled
    }

    fn set_constraints_enabled(&mut self, enabled: bool) {
        self.constraints_enabled = enabled;
    }
}
