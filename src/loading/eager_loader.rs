//! The dictionary-based eager loading driver
//!
//! One query per relation regardless of parent count: constrain by the
//! collected parent keys, seed every parent with the relation's empty value,
//! then distribute the results through the relation's dictionary match.

use sqlx::Pool;
use sqlx::Postgres;

use crate::error::ModelResult;
use crate::model::Model;
use crate::relations::Relation;

/// Load `name` onto every model in `parents` with a single related query
///
/// The relation should be built unconstrained; its per-record scoping is
/// replaced here by a set constraint over all parent keys. After this
/// returns, every parent has the relation cached, parents with no related
/// rows included.
pub async fn eager_load<Parent, Related, R>(
    relation: &mut R,
    parents: &mut [Parent],
    name: &str,
    pool: &Pool<Postgres>,
) -> ModelResult<()>
where
    Parent: Model,
    Related: Model,
    R: Relation<Parent, Related> + Sync,
{
    if parents.is_empty() {
        return Ok(());
    }

    relation.add_eager_constraints(parents);
    relation.init_relation(parents, name);

    let results = relation.get_eager(pool).await?;
    tracing::debug!(
        "eager loaded {} row(s) for relation {} across {} parent(s)",
        results.len(),
        name,
        parents.len()
    );

    relation.match_related(parents, results, name);
    Ok(())
}
