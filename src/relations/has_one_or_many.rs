//! HasOneOrMany - shared base for the "local key = foreign key" direction
//!
//! The parent's local key is mirrored into the related table's foreign key
//! column. `HasOne` and `HasMany` wrap this base and fix the cardinality.

use std::collections::HashMap;
use std::marker::PhantomData;

use serde_json::Value;
use sqlx::Pool;
use sqlx::Postgres;

use super::constraints::Constrained;
use super::{dictionary_key, eager_keys};
use crate::collection::Collection;
use crate::error::{ModelError, ModelResult};
use crate::model::Model;
use crate::query::QueryBuilder;

/// Shared state and behavior for HasOne / HasMany
#[derive(Debug, Clone)]
pub struct HasOneOrMany<Parent, Related>
where
    Parent: Model,
    Related: Model,
{
    pub(crate) query: QueryBuilder<Related>,
    pub(crate) parent: Parent,
    pub(crate) foreign_key: String,
    pub(crate) local_key: String,
    pub(crate) constraints_enabled: bool,
    _related: PhantomData<Related>,
}

impl<Parent, Related> HasOneOrMany<Parent, Related>
where
    Parent: Model,
    Related: Model,
{
    pub(crate) fn build(
        parent: Parent,
        foreign_key: &str,
        local_key: &str,
        constrained: bool,
    ) -> Self {
        let query = QueryBuilder::new().from(Related::table_name());
        let mut relation = Self {
            query,
            parent,
            foreign_key: foreign_key.to_string(),
            local_key: local_key.to_string(),
            constraints_enabled: constrained,
            _related: PhantomData,
        };
        relation.add_constraints();
        relation
    }

    /// Foreign key column, qualified with the related table name
    pub fn qualified_foreign_key(&self) -> String {
        format!("{}.{}", Related::table_name(), self.foreign_key)
    }

    /// The parent's local key value, `Null` when unset
    pub fn parent_key(&self) -> Value {
        self.parent
            .attribute(&self.local_key)
            .unwrap_or(Value::Null)
    }

    pub(crate) fn add_constraints(&mut self) {
        if !self.constraints_enabled {
            return;
        }
        let qualified = self.qualified_foreign_key();
        self.query = self
            .query
            .clone()
            .where_eq(&qualified, self.parent_key())
            .where_not_null(&qualified);
    }

    pub(crate) fn add_eager_constraints(&mut self, models: &[Parent]) {
        let keys = eager_keys(models, &self.local_key);
        self.query = self
            .query
            .clone()
            .where_in(&self.qualified_foreign_key(), keys);
    }

    /// Group fetched rows by their foreign key value, preserving result order
    /// within each bucket
    pub(crate) fn build_dictionary(
        &self,
        results: Collection<Related>,
    ) -> HashMap<String, Vec<Related>> {
        let mut dictionary: HashMap<String, Vec<Related>> = HashMap::new();
        for related in results {
            if let Some(value) = related.attribute(&self.foreign_key) {
                if value.is_null() {
                    continue;
                }
                dictionary
                    .entry(dictionary_key(&value))
                    .or_default()
                    .push(related);
            }
        }
        dictionary
    }

    /// One pass over the parents, attaching the matching bucket
    ///
    /// To-one takes the bucket's first element, which is the first row in
    /// underlying query-result order; to-many attaches the whole bucket.
    /// Parents with no bucket keep the value seeded by `init_relation`.
    pub(crate) fn match_one_or_many(
        &self,
        models: &mut [Parent],
        results: Collection<Related>,
        relation: &str,
        one: bool,
    ) {
        let dictionary = self.build_dictionary(results);
        for model in models.iter_mut() {
            let key = match model.attribute(&self.local_key) {
                Some(value) if !value.is_null() => dictionary_key(&value),
                _ => continue,
            };
            if let Some(bucket) = dictionary.get(&key) {
                if one {
                    model
                        .relations_mut()
                        .set(relation, bucket.first().cloned());
                } else {
                    model
                        .relations_mut()
                        .set(relation, Collection::from_vec(bucket.clone()));
                }
            }
        }
    }

    /// Stamp the foreign key onto `model` and persist it
    pub async fn save(&self, mut model: Related, pool: &Pool<Postgres>) -> ModelResult<Related> {
        let parent_key = self.parent_key();
        if parent_key.is_null() {
            return Err(ModelError::MissingPrimaryKey);
        }
        model.set_attribute(&self.foreign_key, parent_key)?;

        let fields: Vec<(String, Value)> = model.to_fields().into_iter().collect();
        QueryBuilder::<Related>::new()
            .insert_into(Related::table_name())
            .set_values(fields)
            .insert_returning(pool)
            .await
    }

    /// Build a new related row with the foreign key pre-populated
    pub async fn create(
        &self,
        attributes: HashMap<String, Value>,
        pool: &Pool<Postgres>,
    ) -> ModelResult<Related> {
        let parent_key = self.parent_key();
        if parent_key.is_null() {
            return Err(ModelError::MissingPrimaryKey);
        }

        let mut values: Vec<(String, Value)> = attributes.into_iter().collect();
        values.push((self.foreign_key.clone(), parent_key));

        QueryBuilder::<Related>::new()
            .insert_into(Related::table_name())
            .set_values(values)
            .insert_returning(pool)
            .await
    }

    /// Bulk-update all currently matching related rows
    pub async fn update(
        &self,
        attributes: Vec<(String, Value)>,
        pool: &Pool<Postgres>,
    ) -> ModelResult<u64> {
        self.query
            .clone()
            .update(Related::table_name())
            .set_values(attributes)
            .execute(pool)
            .await
    }
}

impl<Parent, Related> Constrained for HasOneOrMany<Parent, Related>
where
    Parent: Model,
    Related: Model,
{
    fn constraints_enabled(&self) -> bool {
        self.constraints_enabled
    }

    fn set_constraints_enabled(&mut self, enabled: bool) {
        self.constraints_enabled = enabled;
    }
}
