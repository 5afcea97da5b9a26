//! Batched relationship loading.
//!
//! Loading works in two phases: collect the distinct keys of all parents,
//! then fetch every related row with one tuple-IN query per hop and
//! redistribute the rows in memory. The number of queries depends only on
//! the relationship kind:
//!
//! | kind                 | queries |
//! |----------------------|---------|
//! | direct foreign key   | 1       |
//! | reverse foreign key  | 1       |
//! | many-to-many through | 2       |
//!
//! No parents with a usable key means no query at all.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use multicol_core::{
    ColumnInfo, ColumnPair, CompositeKey, LinkTableInfo, RelationError, RelationKind, Result,
    Row,
};
use multicol_query::{
    ALIAS_SEPARATOR, Join, JoinCondition, Select, Side, aliased_column, sort_rows,
};
use multicol_store::Connection;

use crate::resolver::local_values;
use crate::schema::RelationRef;

/// Related rows for a batch of parents.
#[derive(Debug, Clone, Default)]
pub struct Prefetched {
    groups: Vec<Vec<Row>>,
    by_key: HashMap<CompositeKey, usize>,
}

impl Prefetched {
    /// Rows related to the parent at `index` in the input slice.
    pub fn for_parent(&self, index: usize) -> &[Row] {
        self.groups.get(index).map_or(&[], Vec::as_slice)
    }

    /// Rows related to the parent whose local key is `key`.
    pub fn for_key(&self, key: &CompositeKey) -> &[Row] {
        self.by_key
            .get(key)
            .and_then(|&index| self.groups.get(index))
            .map_or(&[], Vec::as_slice)
    }

    /// Number of parents.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Row]> {
        self.groups.iter().map(Vec::as_slice)
    }

    /// One row list per parent, in input order.
    pub fn into_groups(self) -> Vec<Vec<Row>> {
        self.groups
    }
}

/// Load the rows related to every parent, in the relationship's ordering.
///
/// Each parent's list equals what [`related_many`](crate::bridge::related_many)
/// returns for it.
#[tracing::instrument(level = "debug", skip(conn, rel, parents), fields(table = rel.source.name, relation = rel.info.name))]
pub fn prefetch<C: Connection>(
    conn: &C,
    rel: RelationRef<'_>,
    parents: &[Row],
    tie_break: bool,
) -> Result<Prefetched> {
    let local_columns = rel.info.local_columns();
    let parent_keys: Vec<Option<CompositeKey>> = parents
        .iter()
        .map(|row| CompositeKey::from_row(row, &local_columns))
        .collect();
    let keys = distinct(parent_keys.iter().flatten().cloned());

    tracing::info!(
        parent_model = rel.source.name,
        related_model = rel.target.name,
        relation_kind = rel.info.kind.as_str(),
        parent_count = parents.len(),
        key_count = keys.len(),
        "Batch loading relationship"
    );

    let queries_before = conn.query_count();
    let mut related: HashMap<CompositeKey, Vec<Row>> = if keys.is_empty() {
        HashMap::new()
    } else {
        match rel.info.kind {
            RelationKind::DirectForeignKey { pairs } => load_parents(conn, rel, pairs, &keys)?,
            RelationKind::ReverseForeignKey { pairs } => {
                load_children(conn, rel, pairs, &keys, tie_break)?
            }
            RelationKind::ManyToManyThrough(link) => load_through(conn, rel, link, &keys, tie_break)?,
        }
    };

    let mut groups = Vec::with_capacity(parents.len());
    let mut by_key = HashMap::new();
    for (index, key) in parent_keys.into_iter().enumerate() {
        let Some(key) = key else {
            groups.push(Vec::new());
            continue;
        };
        let rows = match by_key.get(&key) {
            Some(&first) => groups.get(first).cloned().unwrap_or_default(),
            None => related.remove(&key).unwrap_or_default(),
        };
        by_key.entry(key).or_insert(index);
        groups.push(rows);
    }

    tracing::debug!(
        query_count = conn.query_count().saturating_sub(queries_before),
        loaded = groups.iter().map(Vec::len).sum::<usize>(),
        "Batch load complete"
    );
    Ok(Prefetched { groups, by_key })
}

/// Batched [`resolve_optional`](crate::resolver::resolve_optional): one entry
/// per parent.
pub fn prefetch_one<C: Connection>(
    conn: &C,
    rel: RelationRef<'_>,
    parents: &[Row],
) -> Result<Vec<Option<Row>>> {
    if !matches!(rel.info.kind, RelationKind::DirectForeignKey { .. }) {
        return Err(rel.wrong_kind("prefetch_one"));
    }
    Ok(prefetch(conn, rel, parents, false)?
        .into_groups()
        .into_iter()
        .map(|group| group.into_iter().next())
        .collect())
}

/// Load every row of the declaring table together with its direct foreign
/// key target, in one LEFT JOIN query.
///
/// Rows come back in the declaring table's default ordering. A row whose
/// reference matches nothing is paired with `None`.
#[tracing::instrument(level = "debug", skip(conn, rel), fields(table = rel.source.name, relation = rel.info.name))]
pub fn select_related<C: Connection>(
    conn: &C,
    rel: RelationRef<'_>,
    tie_break: bool,
) -> Result<Vec<(Row, Option<Row>)>> {
    let RelationKind::DirectForeignKey { pairs } = rel.info.kind else {
        return Err(rel.wrong_kind("select_related"));
    };
    let source = rel.source.name;
    let alias = rel.info.name;
    let join = Join::left(
        rel.target.name,
        JoinCondition::new(pairs).forward(source, alias),
    )
    .alias(alias);
    let select = Select::new(source)
        .join_included(
            join,
            rel.target
                .column_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        )
        .order_by_all(rel.source.default_order(tie_break)?);

    let rows = conn.query(&select)?;
    let prefix = format!("{alias}{ALIAS_SEPARATOR}");
    let mut seen: HashMap<CompositeKey, usize> = HashMap::with_capacity(rows.len());
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let base = row.project_base();
        if let Some(pk) = CompositeKey::from_row(&base, rel.source.primary_key) {
            *seen.entry(pk).or_default() += 1;
        }
        let joined = row.project_prefixed(&prefix);
        let related = CompositeKey::from_row(&joined, rel.target.primary_key).map(|_| joined);
        out.push((base, related));
    }

    // A source row repeated by the join matched several targets.
    if let Some((pk, matches)) = seen.into_iter().find(|(_, n)| *n > 1) {
        let key = out
            .iter()
            .find(|(row, _)| {
                CompositeKey::from_row(row, rel.source.primary_key).as_ref() == Some(&pk)
            })
            .map(|(row, _)| local_values(rel, row))
            .transpose()?
            .unwrap_or_default();
        return Err(RelationError::ambiguous(rel.target.name, alias, key, matches).into());
    }
    tracing::debug!(rows = out.len(), "Eager load complete");
    Ok(out)
}

/// Direct foreign key: the parent rows matching any child key.
fn load_parents<C: Connection>(
    conn: &C,
    rel: RelationRef<'_>,
    pairs: &'static [ColumnPair],
    keys: &[CompositeKey],
) -> Result<HashMap<CompositeKey, Vec<Row>>> {
    let cond = JoinCondition::new(pairs);
    let target = rel.target.name;
    let select = Select::new(target).filter(cond.bind_many(Side::Parent, Some(target), keys));
    let grouped = group_by(conn.query(&select)?, |row| cond.key_of(Side::Parent, row));

    if let Some((key, rows)) = grouped.iter().find(|(_, rows)| rows.len() > 1) {
        return Err(RelationError::ambiguous(
            target,
            rel.info.name,
            key.values().to_vec(),
            rows.len(),
        )
        .into());
    }
    Ok(grouped)
}

/// Reverse foreign key: the children of all parents, grouped by parent key.
fn load_children<C: Connection>(
    conn: &C,
    rel: RelationRef<'_>,
    pairs: &'static [ColumnPair],
    keys: &[CompositeKey],
    tie_break: bool,
) -> Result<HashMap<CompositeKey, Vec<Row>>> {
    let cond = JoinCondition::new(pairs);
    let target = rel.target.name;
    let select = Select::new(target)
        .filter(cond.bind_many(Side::Child, Some(target), keys))
        .order_by_all(rel.target_order(tie_break)?);
    Ok(group_by(conn.query(&select)?, |row| {
        cond.key_of(Side::Child, row)
    }))
}

/// Many-to-many: junction rows first, then the far side.
///
/// A junction row only links its source and target when both composite
/// keys are complete; the SQL matching on each hop drops rows whose paired
/// columns disagree with either end. Each far-side row is paired with its
/// junction row under `<junction>__<column>` names, the same shape a
/// per-parent join produces, so orderings over junction columns sort both
/// paths alike.
fn load_through<C: Connection>(
    conn: &C,
    rel: RelationRef<'_>,
    link: LinkTableInfo,
    keys: &[CompositeKey],
    tie_break: bool,
) -> Result<HashMap<CompositeKey, Vec<Row>>> {
    let link_table = link.table_name;
    let to_source = JoinCondition::new(link.source);
    let to_target = JoinCondition::new(link.target);

    let junction = Select::new(link_table).filter(to_source.bind_many(
        Side::Child,
        Some(link_table),
        keys,
    ));
    let links: Vec<(CompositeKey, CompositeKey, Row)> = conn
        .query(&junction)?
        .into_iter()
        .filter_map(|row| {
            let source_key = to_source.key_of(Side::Child, &row)?;
            let target_key = to_target.key_of(Side::Child, &row)?;
            Some((source_key, target_key, row))
        })
        .collect();

    let target_keys = distinct(links.iter().map(|(_, t, _)| t.clone()));
    if target_keys.is_empty() {
        return Ok(HashMap::new());
    }

    let target = rel.target.name;
    let far = Select::new(target).filter(to_target.bind_many(
        Side::Parent,
        Some(target),
        &target_keys,
    ));
    let far_rows = conn.query(&far)?;
    let (Some(first_target), Some((_, _, first_link))) = (far_rows.first(), links.first()) else {
        return Ok(HashMap::new());
    };
    let mut names: Vec<String> = first_target.column_names().map(str::to_string).collect();
    names.extend(
        first_link
            .column_names()
            .map(|column| aliased_column(link_table, column)),
    );
    let info = Arc::new(ColumnInfo::new(names));

    let mut by_target: HashMap<CompositeKey, Vec<(usize, Row)>> = HashMap::new();
    for (position, row) in far_rows.into_iter().enumerate() {
        if let Some(key) = to_target.key_of(Side::Parent, &row) {
            by_target.entry(key).or_default().push((position, row));
        }
    }

    // (far-side position, junction position, paired row)
    let mut gathered: HashMap<CompositeKey, Vec<(usize, usize, Row)>> = HashMap::new();
    for (link_position, (source_key, target_key, link_row)) in links.into_iter().enumerate() {
        let Some(targets) = by_target.get(&target_key) else {
            continue;
        };
        let entry = gathered.entry(source_key).or_default();
        for (target_position, target_row) in targets {
            let values = target_row.values().chain(link_row.values()).cloned().collect();
            entry.push((
                *target_position,
                link_position,
                Row::with_columns(Arc::clone(&info), values),
            ));
        }
    }

    let orders = rel.target_order(tie_break)?;
    gathered
        .into_iter()
        .map(|(key, mut paired)| {
            paired.sort_by_key(|(target_position, link_position, _)| {
                (*target_position, *link_position)
            });
            let rows = paired.into_iter().map(|(_, _, row)| row).collect();
            let sorted = sort_rows(rows, &orders, target)?;
            Ok((key, sorted.iter().map(Row::project_base).collect()))
        })
        .collect()
}

fn group_by(
    rows: Vec<Row>,
    key_of: impl Fn(&Row) -> Option<CompositeKey>,
) -> HashMap<CompositeKey, Vec<Row>> {
    let mut grouped: HashMap<CompositeKey, Vec<Row>> = HashMap::new();
    for row in rows {
        if let Some(key) = key_of(&row) {
            grouped.entry(key).or_default().push(row);
        }
    }
    grouped
}

fn distinct(keys: impl Iterator<Item = CompositeKey>) -> Vec<CompositeKey> {
    let mut seen = HashSet::new();
    keys.filter(|k| seen.insert(k.clone())).collect()
}
