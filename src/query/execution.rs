//! Query Builder execution for Model types
//!
//! Cancellation and timeouts belong to the storage driver; failures surface
//! unmodified through `ModelError::Database`.

use super::builder::QueryBuilder;
use super::types::QueryType;
use crate::error::{ModelError, ModelResult};
use crate::model::Model;

impl<M> QueryBuilder<M> {
    /// Execute an INSERT/UPDATE/DELETE and return the affected row count
    pub async fn execute(self, pool: &sqlx::Pool<sqlx::Postgres>) -> ModelResult<u64> {
        let sql = self.to_sql();
        let done = sqlx::query(&sql).execute(pool).await?;
        Ok(done.rows_affected())
    }
}

// Implement specialized methods for Model-typed query builders
impl<M: Model> QueryBuilder<M> {
    /// Execute query and return models
    pub async fn get(self, pool: &sqlx::Pool<sqlx::Postgres>) -> ModelResult<Vec<M>> {
        if self.query_type == QueryType::Select && self.from_tables.is_empty() {
            return Err(ModelError::UnboundRelated(M::table_name().to_string()));
        }

        let sql = self.to_sql();
        let rows = sqlx::query(&sql).fetch_all(pool).await?;

        let mut models = Vec::new();
        for row in rows {
            models.push(M::from_row(&row)?);
        }

        Ok(models)
    }

    /// Execute query and return first model
    pub async fn first(self, pool: &sqlx::Pool<sqlx::Postgres>) -> ModelResult<Option<M>> {
        let query = self.limit(1);
        let mut results = query.get(pool).await?;
        Ok(results.pop())
    }

    /// Execute query and return first model or error
    pub async fn first_or_fail(self, pool: &sqlx::Pool<sqlx::Postgres>) -> ModelResult<M> {
        self.first(pool)
            .await?
            .ok_or_else(|| ModelError::NotFound(M::table_name().to_string()))
    }

    /// Count query results
    pub async fn count(mut self, pool: &sqlx::Pool<sqlx::Postgres>) -> ModelResult<i64> {
        use sqlx::Row;

        self.select_fields = vec!["COUNT(*)".to_string()];
        let sql = self.to_sql();

        let row = sqlx::query(&sql).fetch_one(pool).await?;

        let count: i64 = row.try_get(0)?;
        Ok(count)
    }

    /// Execute an INSERT with `RETURNING *` and hydrate the created model
    pub async fn insert_returning(self, pool: &sqlx::Pool<sqlx::Postgres>) -> ModelResult<M> {
        let sql = format!("{} RETURNING *", self.to_sql());
        let row = sqlx::query(&sql).fetch_one(pool).await?;
        M::from_row(&row)
    }
}
