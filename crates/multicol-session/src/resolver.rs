//! Composite foreign key resolution for a single child row.

use multicol_core::{CompositeKey, Error, RelationError, RelationKind, Result, Row, Value};
use multicol_query::{JoinCondition, Select, Side};
use multicol_store::Connection;

use crate::schema::RelationRef;

/// Find the parent row a child row references through a direct foreign key.
///
/// Every paired column must match. No match is `NotFound`, more than one is
/// `AmbiguousMatch`. A key with a NULL part matches nothing and issues no
/// query.
#[tracing::instrument(level = "debug", skip(conn, rel, child), fields(table = rel.source.name, relation = rel.info.name))]
pub fn resolve<C: Connection>(conn: &C, rel: RelationRef<'_>, child: &Row) -> Result<Row> {
    let RelationKind::DirectForeignKey { pairs } = rel.info.kind else {
        return Err(rel.wrong_kind("resolve"));
    };
    let cond = JoinCondition::new(pairs);
    let values = local_values(rel, child)?;
    let Some(key) = CompositeKey::new(values.clone()) else {
        tracing::debug!(key = ?values, "Key has a NULL part, nothing to resolve");
        return Err(not_found(rel, values));
    };

    let select = Select::new(rel.target.name).filter(cond.bind(
        Side::Parent,
        Some(rel.target.name),
        &key,
    ));
    let mut rows = conn.query(&select)?;

    match rows.len() {
        0 => {
            tracing::debug!(key = ?values, "No parent matches every key column");
            Err(not_found(rel, values))
        }
        1 => Ok(rows.remove(0)),
        n => Err(RelationError::ambiguous(rel.target.name, rel.info.name, values, n).into()),
    }
}

/// Like [`resolve`], with `NotFound` mapped to `None`.
pub fn resolve_optional<C: Connection>(
    conn: &C,
    rel: RelationRef<'_>,
    child: &Row,
) -> Result<Option<Row>> {
    match resolve(conn, rel, child) {
        Ok(row) => Ok(Some(row)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Values of the relationship's local columns in `row`, in pair order.
pub(crate) fn local_values(rel: RelationRef<'_>, row: &Row) -> Result<Vec<Value>> {
    rel.info
        .local_columns()
        .into_iter()
        .map(|column| {
            row.get_by_name(column)
                .cloned()
                .ok_or_else(|| Error::column_not_found(rel.source.name, column))
        })
        .collect()
}

fn not_found(rel: RelationRef<'_>, key: Vec<Value>) -> Error {
    RelationError::not_found(rel.target.name, rel.info.name, key).into()
}
