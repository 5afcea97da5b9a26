//! Relationship resolution for multicol.
//!
//! `multicol-session` is the **navigation layer**. It knows the registered
//! models and their composite relationship declarations, and turns "follow
//! this relationship" into queries against a [`Connection`].
//!
//! # Role In The Architecture
//!
//! - **Schema**: registry of models, validated before first use.
//! - **Resolver**: child row to parent row through a composite foreign key.
//! - **Bridge**: parent row to children, directly or through a junction.
//! - **Prefetcher**: the same for a batch of parents in a bounded number of
//!   queries, plus the single-query eager join.
//! - **Filters**: `relation__column__op` lookups compiled into joins.
//!
//! # Example
//!
//! ```ignore
//! let schema = Schema::new()
//!     .with::<Country>()?
//!     .with::<Person>()?
//!     .with::<Group>()?
//!     .with::<Membership>()?;
//! let mut session = Session::new(MemoryConnection::new(), schema)?;
//! session.create_tables()?;
//!
//! // One query per membership.
//! let person: Person = session.resolve(&membership, "person")?;
//!
//! // Two queries for all groups, whatever their number.
//! let groups = session.all::<Group>()?;
//! let members: Vec<Vec<Person>> = session.prefetch(&groups, "members")?;
//! ```

pub mod bridge;
pub mod config;
pub mod filter;
pub mod n1_detection;
pub mod prefetch;
pub mod resolver;
pub mod schema;

pub use config::SessionConfig;
pub use n1_detection::{CallSite, N1QueryTracker, N1Stats};
pub use prefetch::Prefetched;
pub use schema::{RelationRef, Schema, TableMeta};

use std::marker::PhantomData;

use multicol_core::{AutoIncrement, Error, Model, Result, Row, SchemaErrorKind, Value};
use multicol_query::{ALIAS_SEPARATOR, LookupOp, LookupValue, Select};
use multicol_store::Connection;

/// Owns a connection and navigates relationships of the registered models.
pub struct Session<C: Connection> {
    connection: C,
    schema: Schema,
    config: SessionConfig,
    n1_tracker: N1QueryTracker,
}

impl<C: Connection> Session<C> {
    /// Create a session with the default configuration.
    ///
    /// The schema is validated first.
    pub fn new(connection: C, schema: Schema) -> Result<Self> {
        Self::with_config(connection, schema, SessionConfig::default())
    }

    pub fn with_config(connection: C, schema: Schema, config: SessionConfig) -> Result<Self> {
        schema.validate()?;
        let mut n1_tracker = N1QueryTracker::new().with_threshold(config.n1_threshold);
        if !config.n1_detection {
            n1_tracker.disable();
        }
        Ok(Self {
            connection,
            schema,
            config,
            n1_tracker,
        })
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    pub fn into_connection(self) -> C {
        self.connection
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Queries executed by the connection so far.
    pub fn query_count(&self) -> usize {
        self.connection.query_count()
    }

    pub fn n1_tracker(&self) -> &N1QueryTracker {
        &self.n1_tracker
    }

    pub fn n1_tracker_mut(&mut self) -> &mut N1QueryTracker {
        &mut self.n1_tracker
    }

    pub fn n1_stats(&self) -> N1Stats {
        self.n1_tracker.stats()
    }

    /// Create a table for every registered model.
    pub fn create_tables(&mut self) -> Result<()> {
        self.schema.create_tables(&mut self.connection)
    }

    // ========================================================================
    // Rows and models
    // ========================================================================

    /// Insert a raw row into a registered table, returning its primary key.
    pub fn insert_row(&mut self, table: &str, values: Vec<(&str, Value)>) -> Result<Value> {
        let meta = self.schema.table(table)?;
        self.connection.insert(meta.name, values)
    }

    /// Insert a model, returning its primary key.
    ///
    /// A NULL auto-increment key is generated by the store.
    pub fn insert<M: Model>(&mut self, model: &M) -> Result<Value> {
        self.insert_row(M::TABLE_NAME, model.to_row())
    }

    /// Insert a model and store the generated id back into it.
    #[tracing::instrument(level = "debug", skip(self, model), fields(table = M::TABLE_NAME))]
    pub fn add<M: AutoIncrement>(&mut self, model: &mut M) -> Result<()> {
        let key = self.insert(&*model)?;
        if let Some(id) = key.as_i64() {
            model.set_id(id);
            tracing::debug!(id, "Inserted");
        }
        Ok(())
    }

    /// All rows of `table`, in its default ordering.
    pub fn all_rows(&self, table: &str) -> Result<Vec<Row>> {
        let meta = self.schema.table(table)?;
        let select =
            Select::new(meta.name).order_by_all(meta.default_order(self.config.tie_break_on_pk)?);
        self.connection.query(&select)
    }

    /// All instances of `M`, in its default ordering.
    pub fn all<M: Model>(&self) -> Result<Vec<M>> {
        from_rows(&self.all_rows(M::TABLE_NAME)?)
    }

    /// Start a filtered query over `M`.
    pub fn filter<M: Model>(&self) -> FilterQuery<'_, C, M> {
        FilterQuery::new(self)
    }

    // ========================================================================
    // Single-row navigation
    // ========================================================================

    /// Follow direct foreign key `relation` of a `table` row.
    #[track_caller]
    pub fn resolve_row(&mut self, table: &str, relation: &str, row: &Row) -> Result<Row> {
        let rel = self.schema.relation(table, relation)?;
        self.n1_tracker.record_load(rel.source.name, rel.info.name);
        resolver::resolve(&self.connection, rel, row)
    }

    /// Follow direct foreign key `relation` of `child`.
    ///
    /// Fails with `NotFound` unless exactly one `P` matches every paired
    /// column.
    #[track_caller]
    pub fn resolve<M: Model, P: Model>(&mut self, child: &M, relation: &str) -> Result<P> {
        self.check_target::<P>(M::TABLE_NAME, relation)?;
        let row = self.resolve_row(M::TABLE_NAME, relation, &model_row(child))?;
        P::from_row(&row)
    }

    /// Like [`Session::resolve`], with no match mapped to `None`.
    #[track_caller]
    pub fn resolve_optional<M: Model, P: Model>(
        &mut self,
        child: &M,
        relation: &str,
    ) -> Result<Option<P>> {
        match self.resolve(child, relation) {
            Ok(parent) => Ok(Some(parent)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Rows related to a `table` row through `relation`, in the
    /// relationship's ordering.
    #[track_caller]
    pub fn related_rows(&mut self, table: &str, relation: &str, row: &Row) -> Result<Vec<Row>> {
        let rel = self.schema.relation(table, relation)?;
        self.n1_tracker.record_load(rel.source.name, rel.info.name);
        bridge::related_many(&self.connection, rel, row, self.config.tie_break_on_pk)
    }

    /// Instances of `T` related to `parent` through `relation`.
    ///
    /// Works for every relationship kind; many-to-many relationships only
    /// yield rows whose junction entry matches both ends on every paired
    /// column.
    #[track_caller]
    pub fn related<P: Model, T: Model>(&mut self, parent: &P, relation: &str) -> Result<Vec<T>> {
        self.check_target::<T>(P::TABLE_NAME, relation)?;
        from_rows(&self.related_rows(P::TABLE_NAME, relation, &model_row(parent))?)
    }

    // ========================================================================
    // Batch loading
    // ========================================================================

    /// Related rows for every `table` row in `rows`, in a bounded number of
    /// queries.
    pub fn prefetch_rows(&self, table: &str, relation: &str, rows: &[Row]) -> Result<Prefetched> {
        let rel = self.schema.relation(table, relation)?;
        prefetch::prefetch(&self.connection, rel, rows, self.config.tie_break_on_pk)
    }

    /// One list of related `T` per parent, equal to calling
    /// [`Session::related`] on each.
    pub fn prefetch<P: Model, T: Model>(&self, parents: &[P], relation: &str) -> Result<Vec<Vec<T>>> {
        self.check_target::<T>(P::TABLE_NAME, relation)?;
        let rows: Vec<Row> = parents.iter().map(model_row).collect();
        self.prefetch_rows(P::TABLE_NAME, relation, &rows)?
            .iter()
            .map(from_rows)
            .collect()
    }

    /// Batched [`Session::resolve_optional`] for a direct foreign key.
    pub fn prefetch_one<M: Model, P: Model>(
        &self,
        children: &[M],
        relation: &str,
    ) -> Result<Vec<Option<P>>> {
        self.check_target::<P>(M::TABLE_NAME, relation)?;
        let rel = self.schema.relation(M::TABLE_NAME, relation)?;
        let rows: Vec<Row> = children.iter().map(model_row).collect();
        prefetch::prefetch_one(&self.connection, rel, &rows)?
            .iter()
            .map(|row| row.as_ref().map(P::from_row).transpose())
            .collect()
    }

    /// Every `M` with its direct foreign key target attached, in one query.
    pub fn select_related<M: Model, P: Model>(&self, relation: &str) -> Result<Vec<(M, Option<P>)>> {
        self.check_target::<P>(M::TABLE_NAME, relation)?;
        let rel = self.schema.relation(M::TABLE_NAME, relation)?;
        prefetch::select_related(&self.connection, rel, self.config.tie_break_on_pk)?
            .iter()
            .map(|(row, related)| {
                Ok((
                    M::from_row(row)?,
                    related.as_ref().map(P::from_row).transpose()?,
                ))
            })
            .collect()
    }

    fn check_target<T: Model>(&self, table: &str, relation: &str) -> Result<()> {
        let rel = self.schema.relation(table, relation)?;
        if rel.target.name == T::TABLE_NAME {
            Ok(())
        } else {
            Err(Error::schema(
                SchemaErrorKind::Invalid,
                format!(
                    "relationship '{}.{}' leads to '{}', not '{}'",
                    table,
                    relation,
                    rel.target.name,
                    T::TABLE_NAME
                ),
            ))
        }
    }
}

/// A query over `M` filtered through relationship paths.
///
/// ```ignore
/// let bobs: Vec<Membership> = session
///     .filter::<Membership>()
///     .filter("person__name__contains", "o")
///     .all()?;
/// ```
pub struct FilterQuery<'s, C: Connection, M: Model> {
    session: &'s Session<C>,
    lookups: Vec<(String, LookupValue)>,
    limit: Option<u64>,
    _model: PhantomData<fn() -> M>,
}

impl<'s, C: Connection, M: Model> FilterQuery<'s, C, M> {
    fn new(session: &'s Session<C>) -> Self {
        Self {
            session,
            lookups: Vec::new(),
            limit: None,
            _model: PhantomData,
        }
    }

    /// Add a `relation__column__op` lookup. All lookups must hold.
    #[must_use]
    pub fn filter(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.lookups
            .push((path.into(), LookupValue::Single(value.into())));
        self
    }

    /// Add an `in` lookup; `__in` is appended to `path` when missing.
    #[must_use]
    pub fn filter_in<V: Into<Value>>(
        mut self,
        path: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let mut path = path.into();
        let suffix = format!("{ALIAS_SEPARATOR}{}", LookupOp::In.as_str());
        if !path.ends_with(&suffix) {
            path.push_str(&suffix);
        }
        self.lookups.push((
            path,
            LookupValue::List(values.into_iter().map(Into::into).collect()),
        ));
        self
    }

    #[must_use]
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// The SELECT this query runs.
    pub fn to_select(&self) -> Result<Select> {
        let select = filter::filtered_select(
            &self.session.schema,
            M::TABLE_NAME,
            &self.lookups,
            self.session.config.tie_break_on_pk,
        )?;
        Ok(match self.limit {
            Some(n) => select.limit(n),
            None => select,
        })
    }

    pub fn rows(&self) -> Result<Vec<Row>> {
        self.session.connection.query(&self.to_select()?)
    }

    pub fn all(&self) -> Result<Vec<M>> {
        from_rows(&self.rows()?)
    }

    pub fn first(&self) -> Result<Option<M>> {
        let select = self.to_select()?.limit(1);
        self.session
            .connection
            .query(&select)?
            .first()
            .map(M::from_row)
            .transpose()
    }
}

fn model_row<M: Model>(model: &M) -> Row {
    let (names, values): (Vec<String>, Vec<Value>) = model
        .to_row()
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .unzip();
    Row::new(names, values)
}

fn from_rows<M: Model>(rows: &[Row]) -> Result<Vec<M>> {
    rows.iter().map(M::from_row).collect()
}
