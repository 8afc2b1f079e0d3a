//! Query Builder SQL generation

use serde_json::Value;

use super::builder::QueryBuilder;
use super::types::*;

impl<M> QueryBuilder<M> {
    /// Convert the query to a SQL string
    pub fn to_sql(&self) -> String {
        match self.query_type {
            QueryType::Select => self.build_select_sql(),
            QueryType::Insert => self.build_insert_sql(),
            QueryType::Update => self.build_update_sql(),
            QueryType::Delete => self.build_delete_sql(),
        }
    }

    fn build_select_sql(&self) -> String {
        let mut sql = String::new();

        sql.push_str("SELECT ");
        if self.select_fields.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.select_fields.join(", "));
        }

        if !self.from_tables.is_empty() {
            sql.push_str(" FROM ");
            sql.push_str(&self.from_tables.join(", "));
        }

        for join in &self.joins {
            sql.push_str(&format!(" {} {}", join.join_type, join.table));
            if !join.on_conditions.is_empty() {
                sql.push_str(" ON ");
                let conditions: Vec<String> = join
                    .on_conditions
                    .iter()
                    .map(|(left, right)| format!("{} = {}", left, right))
                    .collect();
                sql.push_str(&conditions.join(" AND "));
            }
        }

        if !self.where_conditions.is_empty() {
            sql.push_str(" WHERE ");
            let conditions = self.build_where_conditions(&self.where_conditions);
            sql.push_str(&conditions.join(" AND "));
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            let order_clauses: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction))
                .collect();
            sql.push_str(&order_clauses.join(", "));
        }

        if let Some(limit) = self.limit_count {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.offset_value {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }

    fn build_insert_sql(&self) -> String {
        let mut sql = String::new();

        if let Some(table) = &self.insert_table {
            sql.push_str(&format!("INSERT INTO {}", table));

            if !self.set_clauses.is_empty() {
                sql.push_str(" (");
                let columns: Vec<String> = self
                    .set_clauses
                    .iter()
                    .map(|clause| clause.column.clone())
                    .collect();
                sql.push_str(&columns.join(", "));
                sql.push_str(") VALUES (");

                let values: Vec<String> = self
                    .set_clauses
                    .iter()
                    .map(|clause| match &clause.value {
                        Some(value) => self.format_value(value),
                        None => "NULL".to_string(),
                    })
                    .collect();
                sql.push_str(&values.join(", "));
                sql.push(')');
            }
        }

        sql
    }

    fn build_update_sql(&self) -> String {
        let mut sql = String::new();

        if let Some(table) = &self.update_table {
            sql.push_str(&format!("UPDATE {}", table));

            if !self.set_clauses.is_empty() {
                sql.push_str(" SET ");
                let assignments: Vec<String> = self
                    .set_clauses
                    .iter()
                    .map(|clause| match &clause.value {
                        Some(value) => {
                            format!("{} = {}", clause.column, self.format_value(value))
                        }
                        None => format!("{} = NULL", clause.column),
                    })
                    .collect();
                sql.push_str(&assignments.join(", "));
            }

            if !self.where_conditions.is_empty() {
                sql.push_str(" WHERE ");
                let conditions = self.build_where_conditions(&self.where_conditions);
                sql.push_str(&conditions.join(" AND "));
            }
        }

        sql
    }

    fn build_delete_sql(&self) -> String {
        let mut sql = String::new();

        if let Some(table) = &self.delete_table {
            sql.push_str(&format!("DELETE FROM {}", table));

            if !self.where_conditions.is_empty() {
                sql.push_str(" WHERE ");
                let conditions = self.build_where_conditions(&self.where_conditions);
                sql.push_str(&conditions.join(" AND "));
            }
        }

        sql
    }

    /// Build WHERE condition strings
    fn build_where_conditions(&self, conditions: &[WhereCondition]) -> Vec<String> {
        conditions
            .iter()
            .map(|condition| match &condition.operator {
                QueryOperator::IsNull | QueryOperator::IsNotNull => {
                    format!("{} {}", condition.column, condition.operator)
                }
                // An empty list cannot be rendered as `IN ()`; emit a
                // constant predicate with the same meaning instead.
                QueryOperator::In | QueryOperator::NotIn if condition.values.is_empty() => {
                    if condition.operator == QueryOperator::In {
                        "1 = 0".to_string()
                    } else {
                        "1 = 1".to_string()
                    }
                }
                QueryOperator::In | QueryOperator::NotIn => {
                    let values: Vec<String> = condition
                        .values
                        .iter()
                        .map(|v| self.format_value(v))
                        .collect();
                    format!(
                        "{} {} ({})",
                        condition.column,
                        condition.operator,
                        values.join(", ")
                    )
                }
                _ => {
                    if let Some(value) = &condition.value {
                        format!(
                            "{} {} {}",
                            condition.column,
                            condition.operator,
                            self.format_value(value)
                        )
                    } else {
                        format!("{} = NULL", condition.column) // Fallback
                    }
                }
            })
            .collect()
    }

    /// Format a value for SQL
    pub(crate) fn format_value(&self, value: &Value) -> String {
        match value {
            Value::String(s) => format!("'{}'", s.replace('\'', "''")), // Escape single quotes
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => "NULL".to_string(),
            _ => "NULL".to_string(), // Arrays and objects not supported
        }
    }
}
