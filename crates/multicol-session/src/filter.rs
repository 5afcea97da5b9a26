//! Filtering through relationship paths.
//!
//! A lookup such as `person__name__contains` walks relationships from the
//! queried table, adding one INNER JOIN per hop (two for a junction), and
//! applies the lookup to the column at the end of the path. Joins use the
//! full composite condition, so a related row only counts when every paired
//! column matches. Lookups sharing a path prefix share its joins.

use std::collections::HashMap;

use multicol_core::{Error, QueryErrorKind, RelationKind, Result};
use multicol_query::{ALIAS_SEPARATOR, Expr, Join, JoinCondition, Lookup, LookupValue, Select};

use crate::schema::{Schema, TableMeta};

/// The joins and predicates accumulated for one filtered query.
struct PathPlanner<'s> {
    schema: &'s Schema,
    base: &'s TableMeta,
    joins: Vec<Join>,
    /// Relationship path prefix (`membership__group`) -> (alias, table).
    walked: HashMap<String, (String, &'s TableMeta)>,
}

impl<'s> PathPlanner<'s> {
    fn new(schema: &'s Schema, base: &'s TableMeta) -> Self {
        Self {
            schema,
            base,
            joins: Vec::new(),
            walked: HashMap::new(),
        }
    }

    fn next_alias(&self) -> String {
        format!("j{}", self.joins.len())
    }

    /// Join every relationship of `relations`, returning the alias and table
    /// the path ends on.
    fn walk(&mut self, relations: &[String]) -> Result<(String, &'s TableMeta)> {
        let mut alias = self.base.name.to_string();
        let mut table = self.base;
        let mut path = String::new();

        for name in relations {
            if !path.is_empty() {
                path.push_str(ALIAS_SEPARATOR);
            }
            path.push_str(name);
            if let Some((known_alias, known_table)) = self.walked.get(&path) {
                alias.clone_from(known_alias);
                table = known_table;
                continue;
            }

            let rel = self.schema.relation(table.name, name).map_err(|_| {
                invalid(format!(
                    "'{}' is neither a relationship nor the last segment on '{}'",
                    name, table.name
                ))
            })?;
            let joined = match rel.info.kind {
                RelationKind::DirectForeignKey { pairs } => {
                    let next = self.next_alias();
                    let on = JoinCondition::new(pairs).forward(&alias, &next);
                    self.joins
                        .push(Join::inner(rel.target.name, on).alias(next.clone()));
                    next
                }
                RelationKind::ReverseForeignKey { pairs } => {
                    let next = self.next_alias();
                    let on = JoinCondition::new(pairs).reverse(&alias, &next);
                    self.joins
                        .push(Join::inner(rel.target.name, on).alias(next.clone()));
                    next
                }
                RelationKind::ManyToManyThrough(link) => {
                    let junction = self.next_alias();
                    let on = JoinCondition::new(link.source).reverse(&alias, &junction);
                    self.joins
                        .push(Join::inner(link.table_name, on).alias(junction.clone()));
                    let next = self.next_alias();
                    let on = JoinCondition::new(link.target).forward(&junction, &next);
                    self.joins
                        .push(Join::inner(rel.target.name, on).alias(next.clone()));
                    next
                }
            };
            tracing::trace!(path = %path, alias = %joined, table = rel.target.name, "Joined lookup path");
            self.walked.insert(path.clone(), (joined.clone(), rel.target));
            alias = joined;
            table = rel.target;
        }
        Ok((alias, table))
    }

    fn predicate(&mut self, path: &str, value: LookupValue) -> Result<Expr> {
        let lookup = Lookup::parse(path)?;
        let (alias, table) = self.walk(&lookup.relations)?;
        if !table.has_column(&lookup.column) {
            return Err(invalid(format!(
                "'{}' has no column '{}' (in lookup '{}')",
                table.name, lookup.column, path
            )));
        }
        lookup.op.build(Expr::qualified(alias, lookup.column), value)
    }
}

/// Build the SELECT for `table` filtered by `lookups`.
///
/// Each matching row is returned once, in the table's default ordering.
pub fn filtered_select(
    schema: &Schema,
    table: &str,
    lookups: &[(String, LookupValue)],
    tie_break: bool,
) -> Result<Select> {
    let base = schema.table(table)?;
    let mut planner = PathPlanner::new(schema, base);
    let predicates = lookups
        .iter()
        .map(|(path, value)| planner.predicate(path, value.clone()))
        .collect::<Result<Vec<_>>>()?;

    let mut select = Select::new(base.name).order_by_all(base.default_order(tie_break)?);
    if !predicates.is_empty() {
        select = select.filter(Expr::all(predicates));
    }
    if !planner.joins.is_empty() {
        select = select.distinct();
    }
    for join in planner.joins {
        select = select.join(join);
    }
    Ok(select)
}

fn invalid(message: String) -> Error {
    Error::query(QueryErrorKind::InvalidLookup, message)
}
