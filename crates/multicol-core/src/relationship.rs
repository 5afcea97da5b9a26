//! Relationship metadata.
//!
//! Relationships are declared as static metadata on each `Model`. Every
//! relationship is ultimately a *composite* foreign key: a list of column
//! pairs that must all be equal for two rows to be related. A single-column
//! foreign key is simply a one-element list.
//!
//! Pairs are always written from the referencing (child) table to the
//! referenced (parent) table, whichever side the relationship is declared
//! on. A forward relation and its reverse accessor can therefore share the
//! same `&'static [ColumnPair]` constant; only the bound side differs.

/// One `child_column = parent_column` equality of a composite foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnPair {
    /// Column on the referencing (child) table, e.g. `membership.person_id`.
    pub child: &'static str,
    /// Column on the referenced (parent) table, e.g. `person.id`.
    pub parent: &'static str,
}

impl ColumnPair {
    #[must_use]
    pub const fn new(child: &'static str, parent: &'static str) -> Self {
        Self { child, parent }
    }
}

/// Shorthand for [`ColumnPair::new`] in `const` declarations.
#[must_use]
pub const fn pair(child: &'static str, parent: &'static str) -> ColumnPair {
    ColumnPair::new(child, parent)
}

/// Child-side column names of a pair list, in declaration order.
pub fn child_columns(pairs: &[ColumnPair]) -> Vec<&'static str> {
    pairs.iter().map(|p| p.child).collect()
}

/// Parent-side column names of a pair list, in declaration order.
pub fn parent_columns(pairs: &[ColumnPair]) -> Vec<&'static str> {
    pairs.iter().map(|p| p.parent).collect()
}

/// Information about a junction table for many-to-many relationships.
///
/// The junction row is the child of *both* foreign keys: `source` pairs point
/// from the junction to the model declaring the relationship, `target` pairs
/// from the junction to the related model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTableInfo {
    /// The junction table name (e.g., `"membership"`).
    pub table_name: &'static str,
    /// Junction → declaring model.
    pub source: &'static [ColumnPair],
    /// Junction → related model.
    pub target: &'static [ColumnPair],
}

impl LinkTableInfo {
    #[must_use]
    pub const fn new(
        table_name: &'static str,
        source: &'static [ColumnPair],
        target: &'static [ColumnPair],
    ) -> Self {
        Self {
            table_name,
            source,
            target,
        }
    }
}

/// The shape of a relationship, with its composite column pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// The declaring model holds the foreign key columns: `membership.person`.
    DirectForeignKey { pairs: &'static [ColumnPair] },
    /// The related model holds the foreign key columns: `person.membership_set`.
    ReverseForeignKey { pairs: &'static [ColumnPair] },
    /// Both models are reached through a junction table: `group.members`.
    ManyToManyThrough(LinkTableInfo),
}

impl RelationKind {
    /// Short name used in logs and error messages.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RelationKind::DirectForeignKey { .. } => "direct foreign key",
            RelationKind::ReverseForeignKey { .. } => "reverse foreign key",
            RelationKind::ManyToManyThrough(_) => "many-to-many through",
        }
    }
}

/// Metadata about a relationship between models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipInfo {
    /// Name of the relationship accessor (`person`, `membership_set`, `members`).
    pub name: &'static str,

    /// The related model's table name.
    pub related_table: &'static str,

    /// Kind of relationship, carrying its column pairs.
    pub kind: RelationKind,

    /// Alternative name accepted in filter paths (`membership` for `membership_set`).
    pub query_name: Option<&'static str>,

    /// Ordering override for related rows (e.g. `&["date_joined", "invite_reason DESC"]`).
    ///
    /// When unset, the related model's default ordering applies.
    pub order_by: Option<&'static [&'static str]>,
}

impl RelationshipInfo {
    /// Declare a direct (forward) foreign key from this model to `related_table`.
    #[must_use]
    pub const fn foreign_key(
        name: &'static str,
        related_table: &'static str,
        pairs: &'static [ColumnPair],
    ) -> Self {
        Self::new(
            name,
            related_table,
            RelationKind::DirectForeignKey { pairs },
        )
    }

    /// Declare the reverse side of a foreign key held by `related_table`.
    #[must_use]
    pub const fn reverse(
        name: &'static str,
        related_table: &'static str,
        pairs: &'static [ColumnPair],
    ) -> Self {
        Self::new(
            name,
            related_table,
            RelationKind::ReverseForeignKey { pairs },
        )
    }

    /// Declare a many-to-many relationship through a junction table.
    #[must_use]
    pub const fn through(
        name: &'static str,
        related_table: &'static str,
        link: LinkTableInfo,
    ) -> Self {
        Self::new(name, related_table, RelationKind::ManyToManyThrough(link))
    }

    #[must_use]
    pub const fn new(name: &'static str, related_table: &'static str, kind: RelationKind) -> Self {
        Self {
            name,
            related_table,
            kind,
            query_name: None,
            order_by: None,
        }
    }

    /// Set the name accepted in filter paths.
    #[must_use]
    pub const fn query_name(mut self, name: &'static str) -> Self {
        self.query_name = Some(name);
        self
    }

    /// Set the ordering of related rows.
    #[must_use]
    pub const fn order_by(mut self, ordering: &'static [&'static str]) -> Self {
        self.order_by = Some(ordering);
        self
    }

    /// Does `name` address this relationship (accessor or query name)?
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.query_name == Some(name)
    }

    /// Is this relationship single-valued (at most one related row)?
    pub const fn is_single_valued(&self) -> bool {
        matches!(self.kind, RelationKind::DirectForeignKey { .. })
    }

    /// Columns read from the declaring model's row to navigate this relationship.
    pub fn local_columns(&self) -> Vec<&'static str> {
        match self.kind {
            RelationKind::DirectForeignKey { pairs } => child_columns(pairs),
            RelationKind::ReverseForeignKey { pairs } => parent_columns(pairs),
            RelationKind::ManyToManyThrough(link) => parent_columns(link.source),
        }
    }

    /// Columns of the related model that the relationship constrains.
    pub fn related_columns(&self) -> Vec<&'static str> {
        match self.kind {
            RelationKind::DirectForeignKey { pairs } => parent_columns(pairs),
            RelationKind::ReverseForeignKey { pairs } => child_columns(pairs),
            RelationKind::ManyToManyThrough(link) => parent_columns(link.target),
        }
    }
}

/// Find a relationship by accessor or query name in a model's RELATIONSHIPS.
pub fn find_relationship<M: crate::Model>(name: &str) -> Option<&'static RelationshipInfo> {
    M::RELATIONSHIPS.iter().find(|r| r.answers_to(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMBERSHIP_PERSON: &[ColumnPair] = &[
        pair("person_id", "id"),
        pair("membership_country_id", "person_country_id"),
    ];
    const MEMBERSHIP_GROUP: &[ColumnPair] = &[
        pair("group_id", "id"),
        pair("membership_country_id", "group_country_id"),
    ];

    #[test]
    fn test_forward_and_reverse_share_pairs() {
        let forward = RelationshipInfo::foreign_key("person", "person", MEMBERSHIP_PERSON);
        let reverse = RelationshipInfo::reverse("membership_set", "membership", MEMBERSHIP_PERSON)
            .query_name("membership")
            .order_by(&["date_joined", "invite_reason"]);

        assert!(forward.is_single_valued());
        assert!(!reverse.is_single_valued());
        assert_eq!(
            forward.local_columns(),
            vec!["person_id", "membership_country_id"]
        );
        assert_eq!(forward.related_columns(), vec!["id", "person_country_id"]);
        assert_eq!(reverse.local_columns(), forward.related_columns());
        assert_eq!(reverse.related_columns(), forward.local_columns());
        assert!(reverse.answers_to("membership"));
        assert!(reverse.answers_to("membership_set"));
        assert!(!reverse.answers_to("person"));
    }

    #[test]
    fn test_through_columns() {
        let members = RelationshipInfo::through(
            "members",
            "person",
            LinkTableInfo::new("membership", MEMBERSHIP_GROUP, MEMBERSHIP_PERSON),
        );
        assert_eq!(members.local_columns(), vec!["id", "group_country_id"]);
        assert_eq!(members.related_columns(), vec!["id", "person_country_id"]);
        assert_eq!(members.kind.as_str(), "many-to-many through");
    }
}
