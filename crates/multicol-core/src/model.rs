//! Model trait for struct-to-table mapping.
//!
//! Models are plain structs with hand-written metadata. The metadata is all
//! `'static` so relationship declarations can be shared between the forward
//! and reverse side of the same composite foreign key.

use crate::Result;
use crate::field::FieldInfo;
use crate::relationship::RelationshipInfo;
use crate::row::Row;
use crate::value::Value;

/// Trait for types that can be mapped to database tables.
///
/// # Example
///
/// ```ignore
/// use multicol_core::{ColumnPair, Model, RelationshipInfo, pair};
///
/// const MEMBERSHIP_PERSON: &[ColumnPair] = &[
///     pair("person_id", "id"),
///     pair("membership_country_id", "person_country_id"),
/// ];
///
/// impl Model for Membership {
///     const TABLE_NAME: &'static str = "membership";
///     const PRIMARY_KEY: &'static [&'static str] = &["id"];
///     const DEFAULT_ORDERING: &'static [&'static str] = &["date_joined", "invite_reason"];
///     const RELATIONSHIPS: &'static [RelationshipInfo] =
///         &[RelationshipInfo::foreign_key("person", "person", MEMBERSHIP_PERSON)];
///     // ...
/// }
/// ```
pub trait Model: Sized + Send + Sync {
    /// The name of the database table.
    const TABLE_NAME: &'static str;

    /// The primary key column name(s).
    const PRIMARY_KEY: &'static [&'static str];

    /// Relationship metadata for this model.
    const RELATIONSHIPS: &'static [RelationshipInfo] = &[];

    /// Default ordering of rows of this model when reached through a relationship.
    ///
    /// Each entry is a column name optionally followed by `ASC` or `DESC`.
    const DEFAULT_ORDERING: &'static [&'static str] = &[];

    /// Get field metadata for all columns.
    fn fields() -> &'static [FieldInfo];

    /// Convert this model instance to a row of values.
    fn to_row(&self) -> Vec<(&'static str, Value)>;

    /// Construct a model instance from a database row.
    #[allow(clippy::result_large_err)]
    fn from_row(row: &Row) -> Result<Self>;

    /// Get the value of the primary key field(s).
    fn primary_key_value(&self) -> Vec<Value>;

    /// Check if this is a new record (primary key is None/default).
    fn is_new(&self) -> bool;

    /// Column names in declaration order.
    fn column_names() -> Vec<&'static str> {
        Self::fields().iter().map(|f| f.column_name).collect()
    }
}

/// Marker trait for models that support automatic ID generation.
pub trait AutoIncrement: Model {
    /// Set the auto-generated ID after insert.
    fn set_id(&mut self, id: i64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SqlType;

    struct Country {
        id: Option<i64>,
        name: String,
    }

    impl Model for Country {
        const TABLE_NAME: &'static str = "country";
        const PRIMARY_KEY: &'static [&'static str] = &["id"];
        const DEFAULT_ORDERING: &'static [&'static str] = &["name"];

        fn fields() -> &'static [FieldInfo] {
            static FIELDS: &[FieldInfo] = &[
                FieldInfo::new("id", "id", SqlType::BigInt)
                    .primary_key(true)
                    .auto_increment(true),
                FieldInfo::new("name", "name", SqlType::Text),
            ];
            FIELDS
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            vec![("id", Value::from(self.id)), ("name", Value::from(&self.name))]
        }

        fn from_row(row: &Row) -> Result<Self> {
            Ok(Self {
                id: row.get_named("id")?,
                name: row.get_named("name")?,
            })
        }

        fn primary_key_value(&self) -> Vec<Value> {
            vec![Value::from(self.id)]
        }

        fn is_new(&self) -> bool {
            self.id.is_none()
        }
    }

    impl AutoIncrement for Country {
        fn set_id(&mut self, id: i64) {
            self.id = Some(id);
        }
    }

    #[test]
    fn test_model_metadata_defaults() {
        assert!(Country::RELATIONSHIPS.is_empty());
        assert_eq!(Country::column_names(), vec!["id", "name"]);
        assert_eq!(Country::DEFAULT_ORDERING, &["name"]);
    }

    #[test]
    fn test_model_row_roundtrip_and_set_id() {
        let mut usa = Country {
            id: None,
            name: "United States".to_string(),
        };
        assert!(usa.is_new());
        usa.set_id(1);
        assert_eq!(usa.primary_key_value(), vec![Value::BigInt(1)]);

        let (names, values): (Vec<&str>, Vec<Value>) = usa.to_row().into_iter().unzip();
        let row = Row::new(
            names.into_iter().map(str::to_string).collect(),
            values,
        );
        let back = Country::from_row(&row).unwrap();
        assert_eq!(back.id, Some(1));
        assert_eq!(back.name, "United States");
    }
}
