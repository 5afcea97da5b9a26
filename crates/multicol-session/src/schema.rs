//! Registry of models and their relationship declarations.
//!
//! Relationship metadata is plain `'static` data on each `Model`; nothing
//! checks it at compile time. `Schema::validate` walks every declaration
//! once so that resolution code can rely on tables, columns and pair lists
//! being consistent.

use std::collections::HashMap;

use multicol_core::{
    Column, ColumnPair, Error, FieldInfo, Model, RelationKind, RelationshipInfo, Result,
    SchemaErrorKind,
};
use multicol_query::{ALIAS_SEPARATOR, Expr, OrderBy};
use multicol_store::Connection;

/// Static metadata of one registered table.
#[derive(Debug, Clone, Copy)]
pub struct TableMeta {
    pub name: &'static str,
    pub fields: &'static [FieldInfo],
    pub primary_key: &'static [&'static str],
    pub ordering: &'static [&'static str],
    pub relationships: &'static [RelationshipInfo],
}

impl TableMeta {
    /// Collect the metadata of model `M`.
    pub fn of<M: Model>() -> Self {
        Self {
            name: M::TABLE_NAME,
            fields: M::fields(),
            primary_key: M::PRIMARY_KEY,
            ordering: M::DEFAULT_ORDERING,
            relationships: M::RELATIONSHIPS,
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.column_name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.column_name).collect()
    }

    /// Storage column definitions.
    pub fn columns(&self) -> Vec<Column> {
        self.fields.iter().map(Column::from).collect()
    }

    /// Find a relationship by accessor or query name.
    pub fn relationship(&self, name: &str) -> Option<&'static RelationshipInfo> {
        self.relationships.iter().find(|r| r.answers_to(name))
    }

    /// ORDER BY list for rows of this table.
    ///
    /// `declared` entries are qualified with this table's name. With
    /// `tie_break` set, primary key columns not already named are appended
    /// ascending so the order is total.
    pub fn order_by(&self, declared: &[&str], tie_break: bool) -> Result<Vec<OrderBy>> {
        let mut orders = declared
            .iter()
            .map(|entry| OrderBy::parse(entry, Some(self.name)))
            .collect::<Result<Vec<_>>>()?;
        if tie_break {
            self.append_primary_key(&mut orders);
        }
        Ok(orders)
    }

    /// Append this table's primary key columns that `orders` does not
    /// already name.
    fn append_primary_key(&self, orders: &mut Vec<OrderBy>) {
        for pk in self.primary_key {
            let named = orders.iter().any(|o| {
                matches!(
                    &o.expr,
                    Expr::Column { table, name }
                        if name == pk && table.as_deref().is_none_or(|t| t == self.name)
                )
            });
            if !named {
                orders.push(Expr::qualified(self.name, *pk).asc());
            }
        }
    }

    /// This table's default ordering.
    pub fn default_order(&self, tie_break: bool) -> Result<Vec<OrderBy>> {
        self.order_by(self.ordering, tie_break)
    }
}

/// A relationship looked up in a [`Schema`], with both ends resolved.
#[derive(Debug, Clone, Copy)]
pub struct RelationRef<'a> {
    /// The model declaring the relationship.
    pub source: &'a TableMeta,
    pub info: &'static RelationshipInfo,
    /// The related model.
    pub target: &'a TableMeta,
    /// The junction table of a many-to-many relationship.
    pub link: Option<&'a TableMeta>,
}

impl RelationRef<'_> {
    /// Ordering of related rows: the relationship's override, else the
    /// related model's default ordering.
    ///
    /// An override column is looked up on the related table first and then,
    /// for a many-to-many relationship, on the junction table, so
    /// `["date_joined"]` orders members by when they joined.
    pub fn target_order(&self, tie_break: bool) -> Result<Vec<OrderBy>> {
        let Some(declared) = self.info.order_by else {
            return self.target.default_order(tie_break);
        };
        let mut orders = Vec::with_capacity(declared.len() + self.target.primary_key.len());
        for entry in declared {
            let table = match &OrderBy::parse(entry, None)?.expr {
                Expr::Column { name, .. } => self
                    .ordering_table(name)
                    .ok_or_else(|| Error::column_not_found(self.target.name, name))?,
                _ => self.target.name,
            };
            orders.push(OrderBy::parse(entry, Some(table))?);
        }
        if tie_break {
            self.target.append_primary_key(&mut orders);
        }
        Ok(orders)
    }

    fn ordering_table(&self, column: &str) -> Option<&'static str> {
        if self.target.has_column(column) {
            return Some(self.target.name);
        }
        self.link
            .filter(|link| link.has_column(column))
            .map(|link| link.name)
    }

    /// Error for an operation that does not apply to this relationship's kind.
    pub fn wrong_kind(&self, operation: &str) -> Error {
        Error::schema(
            SchemaErrorKind::WrongRelationKind,
            format!(
                "{} does not apply to '{}.{}' ({})",
                operation,
                self.source.name,
                self.info.name,
                self.info.kind.as_str()
            ),
        )
    }
}

/// The set of registered models.
#[derive(Debug, Default, Clone)]
pub struct Schema {
    tables: HashMap<&'static str, TableMeta>,
    order: Vec<&'static str>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register model `M`.
    pub fn register<M: Model>(&mut self) -> Result<()> {
        self.register_table(TableMeta::of::<M>())
    }

    /// Builder form of [`Schema::register`].
    pub fn with<M: Model>(mut self) -> Result<Self> {
        self.register::<M>()?;
        Ok(self)
    }

    /// Register a table from raw metadata.
    pub fn register_table(&mut self, meta: TableMeta) -> Result<()> {
        if self.tables.contains_key(meta.name) {
            return Err(Error::schema(
                SchemaErrorKind::TableExists,
                format!("table '{}' is already registered", meta.name),
            ));
        }
        tracing::debug!(
            table = meta.name,
            relationships = meta.relationships.len(),
            "Registered model"
        );
        self.order.push(meta.name);
        self.tables.insert(meta.name, meta);
        Ok(())
    }

    pub fn table(&self, name: &str) -> Result<&TableMeta> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::table_not_found(name))
    }

    /// Registered tables in registration order.
    pub fn tables(&self) -> impl Iterator<Item = &TableMeta> {
        self.order.iter().filter_map(|name| self.tables.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Look up relationship `name` of table `source`.
    pub fn relation(&self, source: &str, name: &str) -> Result<RelationRef<'_>> {
        let source = self.table(source)?;
        let info = source
            .relationship(name)
            .ok_or_else(|| Error::relationship_not_found(source.name, name))?;
        let target = self.table(info.related_table)?;
        let link = match info.kind {
            RelationKind::ManyToManyThrough(link) => Some(self.table(link.table_name)?),
            _ => None,
        };
        Ok(RelationRef {
            source,
            info,
            target,
            link,
        })
    }

    /// Create every registered table on `conn`.
    pub fn create_tables<C: Connection>(&self, conn: &mut C) -> Result<()> {
        for table in self.tables() {
            conn.create_table(table.name, table.columns())?;
        }
        Ok(())
    }

    /// Check every declaration against the registered tables.
    pub fn validate(&self) -> Result<()> {
        for table in self.tables() {
            validate_columns(table)?;
            for rel in table.relationships {
                self.validate_relationship(table, rel)?;
            }
        }
        tracing::debug!(tables = self.len(), "Schema validated");
        Ok(())
    }

    fn validate_relationship(&self, source: &TableMeta, rel: &RelationshipInfo) -> Result<()> {
        let context = format!("relationship '{}.{}'", source.name, rel.name);
        if rel.name.contains(ALIAS_SEPARATOR) {
            return Err(invalid(format!(
                "{context}: name must not contain '{ALIAS_SEPARATOR}'"
            )));
        }
        if source.has_column(rel.name) || rel.name == source.name {
            return Err(invalid(format!(
                "{context}: name clashes with a column or the table itself"
            )));
        }
        let target = self.table(rel.related_table).map_err(|_| {
            invalid(format!(
                "{context}: related table '{}' is not registered",
                rel.related_table
            ))
        })?;

        let junction = match rel.kind {
            RelationKind::DirectForeignKey { pairs } => {
                check_pairs(&context, pairs, source, target)?;
                None
            }
            RelationKind::ReverseForeignKey { pairs } => {
                check_pairs(&context, pairs, target, source)?;
                None
            }
            RelationKind::ManyToManyThrough(link) => {
                let junction = self.table(link.table_name).map_err(|_| {
                    invalid(format!(
                        "{context}: junction table '{}' is not registered",
                        link.table_name
                    ))
                })?;
                check_pairs(&context, link.source, junction, source)?;
                check_pairs(&context, link.target, junction, target)?;
                Some(junction)
            }
        };

        if let Some(ordering) = rel.order_by {
            match junction {
                Some(junction) => check_ordering(&context, ordering, &[target, junction])?,
                None => check_ordering(&context, ordering, &[target])?,
            }
        }
        Ok(())
    }
}

fn validate_columns(table: &TableMeta) -> Result<()> {
    if table.primary_key.is_empty() {
        return Err(invalid(format!("table '{}' has no primary key", table.name)));
    }
    let mut seen = Vec::with_capacity(table.fields.len());
    for field in table.fields {
        if field.column_name.contains(ALIAS_SEPARATOR) {
            return Err(invalid(format!(
                "column '{}.{}' must not contain '{ALIAS_SEPARATOR}'",
                table.name, field.column_name
            )));
        }
        if seen.contains(&field.column_name) {
            return Err(invalid(format!(
                "column '{}.{}' is declared twice",
                table.name, field.column_name
            )));
        }
        seen.push(field.column_name);
    }
    for pk in table.primary_key {
        if !table.has_column(pk) {
            return Err(Error::column_not_found(table.name, pk));
        }
    }
    check_ordering(&format!("table '{}'", table.name), table.ordering, &[table])
}

/// `pairs` must be non-empty, with child columns on `child` and parent
/// columns on `parent`.
fn check_pairs(
    context: &str,
    pairs: &[ColumnPair],
    child: &TableMeta,
    parent: &TableMeta,
) -> Result<()> {
    if pairs.is_empty() {
        return Err(invalid(format!("{context}: no column pairs declared")));
    }
    for pair in pairs {
        if !child.has_column(pair.child) {
            return Err(invalid(format!(
                "{context}: '{}' has no column '{}'",
                child.name, pair.child
            )));
        }
        if !parent.has_column(pair.parent) {
            return Err(invalid(format!(
                "{context}: '{}' has no column '{}'",
                parent.name, pair.parent
            )));
        }
    }
    Ok(())
}

fn check_ordering(context: &str, ordering: &[&str], tables: &[&TableMeta]) -> Result<()> {
    for entry in ordering {
        let order = OrderBy::parse(entry, None)?;
        if let Expr::Column { name, .. } = &order.expr {
            if !tables.iter().any(|t| t.has_column(name)) {
                let names: Vec<&str> = tables.iter().map(|t| t.name).collect();
                return Err(invalid(format!(
                    "{context}: ordering column '{}' does not exist on '{}'",
                    name,
                    names.join("' or '")
                )));
            }
        }
    }
    Ok(())
}

fn invalid(message: String) -> Error {
    Error::schema(SchemaErrorKind::Invalid, message)
}
