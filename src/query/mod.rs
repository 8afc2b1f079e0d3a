//! Query Builder - fluent constraint accumulator with SQL generation
//!
//! A `QueryBuilder<M>` accumulates constraints for one model type; terminal
//! operations (`get`, `first`, `execute`, `insert_returning`) delegate to the
//! storage driver.

pub mod builder;
pub mod dml;
pub mod execution;
pub mod joins;
pub mod sql_generation;
pub mod types;
pub mod where_clause;

pub use builder::QueryBuilder;
pub use types::*;
