//! BelongsToMany relation - pivot-mediated many-to-many
//!
//! The owner query joins through the pivot table; eager dictionaries are
//! keyed by the pivot's copy of the owning-side key. The pivot lifecycle
//! (attach/detach/sync/update) runs statements scoped to the pivot table.
//! `sync` is not transactional: a failure mid-way leaves already-executed
//! steps in place, and callers wanting atomicity wrap it externally.

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::Pool;
use sqlx::Postgres;

use super::constraints::Constrained;
use super::pivot::{row_timestamp, row_value, Pivot, PIVOT_RELATION};
use super::relation::Relation;
use super::{dictionary_key, eager_keys};
use crate::collection::Collection;
use crate::error::{ModelError, ModelResult};
use crate::model::Model;
use crate::query::QueryBuilder;

/// Polymorphic attach/sync argument, resolved once at the call boundary
#[derive(Debug, Clone)]
pub enum Attachable<M> {
    /// A single related key
    Id(Value),
    /// A related model; its key is read from the relation's related key column
    Model(M),
    /// Related keys with per-key pivot attributes
    Map(Vec<(Value, HashMap<String, Value>)>),
}

impl<M: Model> Attachable<M> {
    /// Normalize into `(related key, pivot attributes)` pairs
    pub(crate) fn into_pairs(
        self,
        related_key: &str,
    ) -> ModelResult<Vec<(Value, HashMap<String, Value>)>> {
        match self {
            Attachable::Id(id) => Ok(vec![(id, HashMap::new())]),
            Attachable::Model(model) => {
                let key = model
                    .attribute(related_key)
                    .filter(|v| !v.is_null())
                    .ok_or(ModelError::MissingPrimaryKey)?;
                Ok(vec![(key, HashMap::new())])
            }
            Attachable::Map(pairs) => Ok(pairs),
        }
    }
}

impl<M> From<i64> for Attachable<M> {
    fn from(id: i64) -> Self {
        Attachable::Id(Value::from(id))
    }
}

impl<M> From<Value> for Attachable<M> {
    fn from(id: Value) -> Self {
        Attachable::Id(id)
    }
}

impl<M> From<Vec<i64>> for Attachable<M> {
    fn from(ids: Vec<i64>) -> Self {
        Attachable::Map(
            ids.into_iter()
                .map(|id| (Value::from(id), HashMap::new()))
                .collect(),
        )
    }
}

impl<M> From<Vec<Value>> for Attachable<M> {
    fn from(ids: Vec<Value>) -> Self {
        Attachable::Map(ids.into_iter().map(|id| (id, HashMap::new())).collect())
    }
}

/// Report of what one `sync` call changed; this is its full observable
/// contract
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncResult {
    pub attached: Vec<Value>,
    pub detached: Vec<Value>,
    pub updated: Vec<Value>,
}

/// The diff a `sync` call will execute
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SyncPlan {
    pub detach: Vec<Value>,
    pub attach: Vec<(Value, HashMap<String, Value>)>,
    pub update: Vec<(Value, HashMap<String, Value>)>,
}

/// Diff the current pivot rows against the desired set
///
/// A key present on both sides with a non-empty attribute map is always
/// updated, without comparing old and new values; with an empty map it is
/// left untouched. Duplicate desired keys resolve first-occurrence-wins.
pub(crate) fn plan_sync(
    current: &[Value],
    desired: &[(Value, HashMap<String, Value>)],
    detaching: bool,
) -> SyncPlan {
    let desired_keys: HashSet<String> = desired.iter().map(|(id, _)| dictionary_key(id)).collect();
    let current_keys: HashSet<String> = current.iter().map(dictionary_key).collect();

    let mut plan = SyncPlan::default();

    if detaching {
        let mut seen = HashSet::new();
        for id in current {
            let key = dictionary_key(id);
            if !desired_keys.contains(&key) && seen.insert(key) {
                plan.detach.push(id.clone());
            }
        }
    }

    let mut seen = HashSet::new();
    for (id, attributes) in desired {
        let key = dictionary_key(id);
        if !seen.insert(key.clone()) {
            continue;
        }
        if !current_keys.contains(&key) {
            plan.attach.push((id.clone(), attributes.clone()));
        } else if !attributes.is_empty() {
            plan.update.push((id.clone(), attributes.clone()));
        }
    }

    plan
}

/// BelongsToMany relation - owners reached through a pivot table
#[derive(Debug, Clone)]
pub struct BelongsToMany<Parent, Related>
where
    Parent: Model,
    Related: Model,
{
    query: QueryBuilder<Related>,
    parent: Parent,
    pivot_table: String,
    foreign_pivot_key: String,
    related_pivot_key: String,
    parent_key: String,
    related_key: String,
    pivot_columns: Vec<String>,
    pivot_timestamps: Option<(String, String)>,
    constraints_enabled: bool,
    _related: PhantomData<Related>,
}

impl<Parent, Related> BelongsToMany<Parent, Related>
where
    Parent: Model,
    Related: Model,
{
    /// Create the relation with single-record constraints applied
    pub fn new(
        parent: Parent,
        pivot_table: &str,
        foreign_pivot_key: &str,
        related_pivot_key: &str,
        parent_key: &str,
        related_key: &str,
    ) -> Self {
        Self::build(
            parent,
            pivot_table,
            foreign_pivot_key,
            related_pivot_key,
            parent_key,
            related_key,
            true,
        )
    }

    /// Create the relation without default scoping, for the eager path
    pub fn unconstrained(
        parent: Parent,
        pivot_table: &str,
        foreign_pivot_key: &str,
        related_pivot_key: &str,
        parent_key: &str,
        related_key: &str,
    ) -> Self {
        Self::build(
            parent,
            pivot_table,
            foreign_pivot_key,
            related_pivot_key,
            parent_key,
            related_key,
            false,
        )
    }

    fn build(
        parent: Parent,
        pivot_table: &str,
        foreign_pivot_key: &str,
        related_pivot_key: &str,
        parent_key: &str,
        related_key: &str,
        constrained: bool,
    ) -> Self {
        let query = QueryBuilder::new().from(Related::table_name()).join(
            pivot_table,
            &format!("{}.{}", Related::table_name(), related_key),
            &format!("{}.{}", pivot_table, related_pivot_key),
        );
        let mut relation = Self {
            query,
            parent,
            pivot_table: pivot_table.to_string(),
            foreign_pivot_key: foreign_pivot_key.to_string(),
            related_pivot_key: related_pivot_key.to_string(),
            parent_key: parent_key.to_string(),
            related_key: related_key.to_string(),
            pivot_columns: Vec::new(),
            pivot_timestamps: None,
            constraints_enabled: constrained,
            _related: PhantomData,
        };
        relation.apply_constraints();
        relation
    }

    /// Declare extra pivot columns to select and write
    pub fn with_pivot<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            let column = column.into();
            if !self.pivot_columns.contains(&column) {
                self.pivot_columns.push(column);
            }
        }
        self
    }

    /// Enable auto-populated pivot timestamps on attach/update
    ///
    /// `None` falls back to the conventional `created_at`/`updated_at`.
    pub fn with_timestamps(self, created_at: Option<&str>, updated_at: Option<&str>) -> Self {
        let created = created_at.unwrap_or("created_at").to_string();
        let updated = updated_at.unwrap_or("updated_at").to_string();
        let mut relation = self.with_pivot([created.clone(), updated.clone()]);
        relation.pivot_timestamps = Some((created, updated));
        relation
    }

    /// Owning-side pivot column, qualified with the pivot table name
    pub fn qualified_foreign_pivot_key(&self) -> String {
        format!("{}.{}", self.pivot_table, self.foreign_pivot_key)
    }

    fn parent_key_value(&self) -> ModelResult<Value> {
        self.parent
            .attribute(&self.parent_key)
            .filter(|v| !v.is_null())
            .ok_or(ModelError::MissingPrimaryKey)
    }

    fn apply_constraints(&mut self) {
        if !self.constraints_enabled {
            return;
        }
        let value = self
            .parent
            .attribute(&self.parent_key)
            .unwrap_or(Value::Null);
        self.query = self
            .query
            .clone()
            .where_eq(&self.qualified_foreign_pivot_key(), value);
    }

    /// Select list: the related table's columns plus aliased pivot columns
    fn select_columns(&self) -> Vec<String> {
        let mut columns = vec![format!("{}.*", Related::table_name())];
        let mut aliased: Vec<&String> = Vec::new();
        for column in [&self.foreign_pivot_key, &self.related_pivot_key] {
            aliased.push(column);
        }
        for column in &self.pivot_columns {
            if !aliased.contains(&column) {
                aliased.push(column);
            }
        }
        for column in aliased {
            columns.push(format!(
                "{}.{} AS pivot_{}",
                self.pivot_table, column, column
            ));
        }
        columns
    }

    fn pivot_from_row(&self, row: &PgRow) -> Pivot {
        let timestamp_columns = self
            .pivot_timestamps
            .clone()
            .map(|(c, u)| vec![c, u])
            .unwrap_or_default();

        let mut attributes = HashMap::new();
        for column in &self.pivot_columns {
            if timestamp_columns.contains(column) {
                continue;
            }
            attributes.insert(column.clone(), row_value(row, &format!("pivot_{}", column)));
        }

        let (created_at, updated_at) = match &self.pivot_timestamps {
            Some((created, updated)) => (
                row_timestamp(row, &format!("pivot_{}", created)),
                row_timestamp(row, &format!("pivot_{}", updated)),
            ),
            None => (None, None),
        };

        Pivot {
            table: self.pivot_table.clone(),
            foreign_pivot_key: self.foreign_pivot_key.clone(),
            related_pivot_key: self.related_pivot_key.clone(),
            foreign_value: row_value(row, &format!("pivot_{}", self.foreign_pivot_key)),
            related_value: row_value(row, &format!("pivot_{}", self.related_pivot_key)),
            attributes,
            created_at,
            updated_at,
        }
    }

    /// Fetch owners with their pivot rows hydrated under the reserved
    /// `pivot` relation name
    pub async fn get_with_pivots(&self, pool: &Pool<Postgres>) -> ModelResult<Collection<Related>> {
        let query = self.query.clone().select(&self.select_columns().join(", "));
        let sql = query.to_sql();
        let rows = sqlx::query(&sql).fetch_all(pool).await?;

        let mut results = Collection::new();
        for row in rows {
            let mut related = Related::from_row(&row)?;
            let pivot = self.pivot_from_row(&row);
            related.relations_mut().set(PIVOT_RELATION, pivot);
            results.push(related);
        }
        Ok(results)
    }

    /// A fresh statement builder scoped to the pivot table
    fn pivot_statement(&self) -> QueryBuilder<()> {
        QueryBuilder::new()
    }

    /// Build the pivot insert rows for a normalized attach
    fn attach_records(
        &self,
        pairs: &[(Value, HashMap<String, Value>)],
        extra: &HashMap<String, Value>,
    ) -> ModelResult<Vec<Vec<(String, Value)>>> {
        let parent_key = self.parent_key_value()?;
        let now = Value::String(Utc::now().to_rfc3339());

        let mut records = Vec::with_capacity(pairs.len());
        for (id, attributes) in pairs {
            let mut record: Vec<(String, Value)> = vec![
                (self.foreign_pivot_key.clone(), parent_key.clone()),
                (self.related_pivot_key.clone(), id.clone()),
            ];

            let mut merged: HashMap<String, Value> = extra.clone();
            merged.extend(attributes.clone());

            if let Some((created, updated)) = &self.pivot_timestamps {
                merged.entry(created.clone()).or_insert_with(|| now.clone());
                merged.entry(updated.clone()).or_insert_with(|| now.clone());
            }

            let mut columns: Vec<(String, Value)> = merged.into_iter().collect();
            columns.sort_by(|a, b| a.0.cmp(&b.0));
            record.extend(columns);
            records.push(record);
        }
        Ok(records)
    }

    /// Insert pivot rows linking the parent to the given related keys
    pub async fn attach(
        &self,
        targets: Attachable<Related>,
        attributes: HashMap<String, Value>,
        pool: &Pool<Postgres>,
    ) -> ModelResult<()> {
        let pairs = targets.into_pairs(&self.related_key)?;
        let records = self.attach_records(&pairs, &attributes)?;

        tracing::debug!(
            "attaching {} pivot row(s) to {}",
            records.len(),
            self.pivot_table
        );

        for record in records {
            self.pivot_statement()
                .insert_into(&self.pivot_table)
                .set_values(record)
                .execute(pool)
                .await?;
        }
        Ok(())
    }

    /// Delete the parent's pivot rows, optionally filtered to given ids
    ///
    /// `None` detaches everything.
    pub async fn detach(
        &self,
        ids: Option<Vec<Value>>,
        pool: &Pool<Postgres>,
    ) -> ModelResult<u64> {
        let parent_key = self.parent_key_value()?;

        let mut statement = self
            .pivot_statement()
            .delete_from(&self.pivot_table)
            .where_eq(&self.foreign_pivot_key, parent_key);

        if let Some(ids) = ids {
            statement = statement.where_in(&self.related_pivot_key, ids);
        }

        let detached = statement.execute(pool).await?;
        tracing::debug!(
            "detached {} pivot row(s) from {}",
            detached,
            self.pivot_table
        );
        Ok(detached)
    }

    /// Related keys of the parent's existing pivot rows
    async fn current_related_ids(&self, pool: &Pool<Postgres>) -> ModelResult<Vec<Value>> {
        let parent_key = self.parent_key_value()?;

        let sql = self
            .pivot_statement()
            .select(&self.related_pivot_key)
            .from(&self.pivot_table)
            .where_eq(&self.foreign_pivot_key, parent_key)
            .to_sql();

        let rows = sqlx::query(&sql).fetch_all(pool).await?;
        Ok(rows
            .iter()
            .map(|row| row_value(row, &self.related_pivot_key))
            .collect())
    }

    /// Make the pivot rows match the desired set, reporting what changed
    ///
    /// Detaches current-but-undesired keys (when `detaching`), attaches
    /// desired-but-absent keys, and updates keys present on both sides whose
    /// desired attribute map is non-empty. Not atomic: a failure leaves the
    /// steps already executed in place.
    pub async fn sync(
        &self,
        targets: Attachable<Related>,
        detaching: bool,
        pool: &Pool<Postgres>,
    ) -> ModelResult<SyncResult> {
        let desired = targets.into_pairs(&self.related_key)?;
        let current = self.current_related_ids(pool).await?;
        let plan = plan_sync(&current, &desired, detaching);

        tracing::debug!(
            "syncing {}: {} to attach, {} to detach, {} to update",
            self.pivot_table,
            plan.attach.len(),
            plan.detach.len(),
            plan.update.len()
        );

        if !plan.detach.is_empty() {
            self.detach(Some(plan.detach.clone()), pool).await?;
        }

        let mut result = SyncResult {
            detached: plan.detach,
            ..SyncResult::default()
        };

        for (id, attributes) in plan.attach {
            self.attach(Attachable::Id(id.clone()), attributes, pool)
                .await?;
            result.attached.push(id);
        }

        for (id, attributes) in plan.update {
            self.update_existing_pivot(id.clone(), attributes, pool)
                .await?;
            result.updated.push(id);
        }

        Ok(result)
    }

    /// Update one existing pivot row, stamping `updated_at` when timestamps
    /// are enabled
    pub async fn update_existing_pivot(
        &self,
        id: Value,
        mut attributes: HashMap<String, Value>,
        pool: &Pool<Postgres>,
    ) -> ModelResult<u64> {
        let parent_key = self.parent_key_value()?;

        if let Some((_, updated)) = &self.pivot_timestamps {
            attributes.insert(updated.clone(), Value::String(Utc::now().to_rfc3339()));
        }

        // An UPDATE without a SET list is invalid SQL.
        if attributes.is_empty() {
            return Ok(0);
        }

        let mut values: Vec<(String, Value)> = attributes.into_iter().collect();
        values.sort_by(|a, b| a.0.cmp(&b.0));

        self.pivot_statement()
            .update(&self.pivot_table)
            .set_values(values)
            .where_eq(&self.foreign_pivot_key, parent_key)
            .where_eq(&self.related_pivot_key, id)
            .execute(pool)
            .await
    }
}

#[async_trait]
impl<Parent, Related> Relation<Parent, Related> for BelongsToMany<Parent, Related>
where
    Parent: Model,
    Related: Model,
{
    type Value = Collection<Related>;

    fn parent(&self) -> &Parent {
        &self.parent
    }

    fn query(&self) -> &QueryBuilder<Related> {
        &self.query
    }

    fn query_mut(&mut self) -> &mut QueryBuilder<Related> {
        &mut self.query
    }

    fn empty_value(&self) -> Self::Value {
        Collection::new()
    }

    fn add_constraints(&mut self) {
        self.apply_constraints();
    }

    fn add_eager_constraints(&mut self, models: &[Parent]) {
        let keys = eager_keys(models, &self.parent_key);
        self.query = self
            .query
            .clone()
            .where_in(&self.qualified_foreign_pivot_key(), keys);
    }

    fn match_related(&self, models: &mut [Parent], results: Collection<Related>, relation: &str) {
        // Joined rows carry the pivot's copy of the owning-side key.
        let mut dictionary: HashMap<String, Vec<Related>> = HashMap::new();
        for related in results {
            let key = related
                .relations()
                .get::<Pivot>(PIVOT_RELATION)
                .map(|pivot| dictionary_key(&pivot.foreign_value));
            if let Some(key) = key {
                dictionary.entry(key).or_default().push(related);
            }
        }

        for model in models.iter_mut() {
            let key = match model.attribute(&self.parent_key) {
                Some(value) if !value.is_null() => dictionary_key(&value),
                _ => continue,
            };
            if let Some(bucket) = dictionary.get(&key) {
                model
                    .relations_mut()
                    .set(relation, Collection::from_vec(bucket.clone()));
            }
        }
    }

    async fn get_results(&self, pool: &Pool<Postgres>) -> ModelResult<Self::Value> {
        self.get_with_pivots(pool).await
    }

    async fn get_eager(&self, pool: &Pool<Postgres>) -> ModelResult<Collection<Related>> {
        self.get_with_pivots(pool).await
    }
}

impl<Parent, Related> Constrained for BelongsToMany<Parent, Related>
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
