//! Per-parent navigation of multi-valued relationships.
//!
//! A reverse foreign key selects the children whose key columns equal the
//! parent's. A many-to-many relationship joins the related table to the
//! junction on the target pairs and binds the junction's source columns to
//! the parent's key, so a junction row only contributes when it matches
//! both ends on every paired column.

use multicol_core::{CompositeKey, RelationKind, Result, Row};
use multicol_query::{Join, JoinCondition, Select, Side};
use multicol_store::Connection;

use crate::resolver::{local_values, resolve_optional};
use crate::schema::RelationRef;

/// Rows related to `parent`, in the relationship's ordering.
///
/// A direct foreign key yields zero or one row. A parent whose key has a
/// NULL part is related to nothing and issues no query.
#[tracing::instrument(level = "debug", skip(conn, rel, parent), fields(table = rel.source.name, relation = rel.info.name))]
pub fn related_many<C: Connection>(
    conn: &C,
    rel: RelationRef<'_>,
    parent: &Row,
    tie_break: bool,
) -> Result<Vec<Row>> {
    if let RelationKind::DirectForeignKey { .. } = rel.info.kind {
        return Ok(resolve_optional(conn, rel, parent)?.into_iter().collect());
    }

    let Some(key) = CompositeKey::new(local_values(rel, parent)?) else {
        tracing::debug!("Parent key has a NULL part, no related rows");
        return Ok(Vec::new());
    };
    let select = related_select(rel, &key, tie_break)?;
    let rows = conn.query(&select)?;
    tracing::debug!(count = rows.len(), "Loaded related rows");
    Ok(rows)
}

/// The SELECT returning the rows related to the parent holding `key`.
pub fn related_select(rel: RelationRef<'_>, key: &CompositeKey, tie_break: bool) -> Result<Select> {
    let target = rel.target.name;
    let select = match rel.info.kind {
        RelationKind::DirectForeignKey { pairs } => Select::new(target).filter(
            JoinCondition::new(pairs).bind(Side::Parent, Some(target), key),
        ),
        RelationKind::ReverseForeignKey { pairs } => Select::new(target).filter(
            JoinCondition::new(pairs).bind(Side::Child, Some(target), key),
        ),
        RelationKind::ManyToManyThrough(link) => {
            let to_target = JoinCondition::new(link.target);
            let to_source = JoinCondition::new(link.source);
            Select::new(target)
                .join(Join::inner(
                    link.table_name,
                    to_target.reverse(target, link.table_name),
                ))
                .filter(to_source.bind(Side::Child, Some(link.table_name), key))
        }
    };
    Ok(select.order_by_all(rel.target_order(tie_break)?))
}
