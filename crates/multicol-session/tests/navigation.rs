//! Row-level navigation against the in-memory store.

use multicol_core::{
    ColumnPair, Error, FieldInfo, LinkTableInfo, RelationErrorKind, RelationshipInfo, Row,
    SchemaErrorKind, SqlType, Value, pair,
};
use multicol_session::filter::filtered_select;
use multicol_session::{Schema, Session, SessionConfig, TableMeta};
use multicol_query::LookupValue;
use multicol_store::{Connection, MemoryConnection};

const MEMBERSHIP_PERSON: &[ColumnPair] = &[
    pair("person_id", "id"),
    pair("membership_country_id", "person_country_id"),
];
const MEMBERSHIP_GROUP: &[ColumnPair] = &[
    pair("group_id", "id"),
    pair("membership_country_id", "group_country_id"),
];
// Deliberately not unique on the person side.
const MEMBERSHIP_COMPATRIOT: &[ColumnPair] = &[pair("membership_country_id", "person_country_id")];

static PERSON_FIELDS: &[FieldInfo] = &[
    FieldInfo::new("id", "id", SqlType::BigInt)
        .primary_key(true)
        .auto_increment(true),
    FieldInfo::new("name", "name", SqlType::Text),
    FieldInfo::new("person_country", "person_country_id", SqlType::BigInt),
];
static GROUP_FIELDS: &[FieldInfo] = &[
    FieldInfo::new("id", "id", SqlType::BigInt)
        .primary_key(true)
        .auto_increment(true),
    FieldInfo::new("name", "name", SqlType::Text),
    FieldInfo::new("group_country", "group_country_id", SqlType::BigInt),
];
static MEMBERSHIP_FIELDS: &[FieldInfo] = &[
    FieldInfo::new("id", "id", SqlType::BigInt)
        .primary_key(true)
        .auto_increment(true),
    FieldInfo::new("membership_country", "membership_country_id", SqlType::BigInt),
    FieldInfo::new("person", "person_id", SqlType::BigInt).nullable(true),
    FieldInfo::new("group", "group_id", SqlType::BigInt),
    FieldInfo::new("date_joined", "date_joined", SqlType::Timestamp),
];

static PERSON_RELATIONSHIPS: &[RelationshipInfo] = &[
    RelationshipInfo::reverse("membership_set", "membership", MEMBERSHIP_PERSON)
        .query_name("membership"),
    RelationshipInfo::through(
        "groups",
        "group",
        LinkTableInfo::new("membership", MEMBERSHIP_PERSON, MEMBERSHIP_GROUP),
    ),
];
static GROUP_RELATIONSHIPS: &[RelationshipInfo] = &[
    RelationshipInfo::through(
        "members",
        "person",
        LinkTableInfo::new("membership", MEMBERSHIP_GROUP, MEMBERSHIP_PERSON),
    ),
    RelationshipInfo::through(
        "members_by_join_date",
        "person",
        LinkTableInfo::new("membership", MEMBERSHIP_GROUP, MEMBERSHIP_PERSON),
    )
    .order_by(&["-date_joined"]),
];
static MEMBERSHIP_RELATIONSHIPS: &[RelationshipInfo] = &[
    RelationshipInfo::foreign_key("person", "person", MEMBERSHIP_PERSON),
    RelationshipInfo::foreign_key("group", "group", MEMBERSHIP_GROUP),
    RelationshipInfo::foreign_key("compatriot", "person", MEMBERSHIP_COMPATRIOT),
];

fn schema() -> Schema {
    let mut schema = Schema::new();
    for meta in [
        TableMeta {
            name: "person",
            fields: PERSON_FIELDS,
            primary_key: &["id"],
            ordering: &["name"],
            relationships: PERSON_RELATIONSHIPS,
        },
        TableMeta {
            name: "group",
            fields: GROUP_FIELDS,
            primary_key: &["id"],
            ordering: &["name"],
            relationships: GROUP_RELATIONSHIPS,
        },
        TableMeta {
            name: "membership",
            fields: MEMBERSHIP_FIELDS,
            primary_key: &["id"],
            ordering: &["date_joined"],
            relationships: MEMBERSHIP_RELATIONSHIPS,
        },
    ] {
        schema.register_table(meta).unwrap();
    }
    schema
}

/// Bob and Jim live in country 1, Jane in country 2. CIA is in country 1,
/// KGB in country 2.
///
/// Memberships (id: country, person, group, joined):
/// 1: 1, Bob, CIA, 10   valid
/// 2: 1, Jim, CIA, 20   valid
/// 3: 1, Jane, CIA, 5   person side mismatched
/// 4: 2, Bob, KGB, 1    person side mismatched
/// 5: 1, NULL, CIA, 30  no person
fn session_with(config: SessionConfig) -> Session<MemoryConnection> {
    let mut session = Session::with_config(MemoryConnection::new(), schema(), config).unwrap();
    session.create_tables().unwrap();

    for (name, country) in [("Bob", 1_i64), ("Jim", 1), ("Jane", 2)] {
        session
            .insert_row(
                "person",
                vec![
                    ("name", Value::from(name)),
                    ("person_country_id", Value::BigInt(country)),
                ],
            )
            .unwrap();
    }
    for (name, country) in [("CIA", 1_i64), ("KGB", 2)] {
        session
            .insert_row(
                "group",
                vec![
                    ("name", Value::from(name)),
                    ("group_country_id", Value::BigInt(country)),
                ],
            )
            .unwrap();
    }
    for (country, person, group, joined) in [
        (1_i64, Some(1_i64), 1_i64, 10_i64),
        (1, Some(2), 1, 20),
        (1, Some(3), 1, 5),
        (2, Some(1), 2, 1),
        (1, None, 1, 30),
    ] {
        session
            .insert_row(
                "membership",
                vec![
                    ("membership_country_id", Value::BigInt(country)),
                    ("person_id", Value::from(person)),
                    ("group_id", Value::BigInt(group)),
                    ("date_joined", Value::Timestamp(joined)),
                ],
            )
            .unwrap();
    }
    session.connection().reset_query_count();
    session
}

fn session() -> Session<MemoryConnection> {
    session_with(SessionConfig::default())
}

fn row_by_id(session: &Session<MemoryConnection>, table: &str, id: i64) -> Row {
    session
        .all_rows(table)
        .unwrap()
        .into_iter()
        .find(|r| r.get_by_name("id") == Some(&Value::BigInt(id)))
        .unwrap()
}

fn ids(rows: &[Row]) -> Vec<i64> {
    rows.iter().map(|r| r.get_named::<i64>("id").unwrap()).collect()
}

fn names(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .map(|r| r.get_named::<String>("name").unwrap())
        .collect()
}

#[test]
fn resolve_matches_every_pair() {
    let mut session = session();
    let membership = row_by_id(&session, "membership", 1);
    let before = session.query_count();

    let person = session.resolve_row("membership", "person", &membership).unwrap();
    assert_eq!(names(&[person]), vec!["Bob"]);
    assert_eq!(session.query_count() - before, 1);
}

#[test]
fn resolve_mismatch_is_not_found() {
    let mut session = session();
    let membership = row_by_id(&session, "membership", 3);
    match session.resolve_row("membership", "person", &membership) {
        Err(Error::Relation(e)) => {
            assert_eq!(e.kind, RelationErrorKind::NotFound);
            assert_eq!(e.key, vec![Value::BigInt(3), Value::BigInt(1)]);
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn resolve_null_key_issues_no_query() {
    let mut session = session();
    let membership = row_by_id(&session, "membership", 5);
    let before = session.query_count();
    let err = session
        .resolve_row("membership", "person", &membership)
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(session.query_count(), before);
}

#[test]
fn resolve_several_matches_is_ambiguous() {
    let mut session = session();
    let membership = row_by_id(&session, "membership", 1);
    match session.resolve_row("membership", "compatriot", &membership) {
        Err(Error::Relation(e)) => {
            assert_eq!(e.kind, RelationErrorKind::AmbiguousMatch);
            assert_eq!(e.matches, 2);
        }
        other => panic!("expected AmbiguousMatch, got {other:?}"),
    }
}

#[test]
fn resolve_rejects_multi_valued_relationship() {
    let mut session = session();
    let bob = row_by_id(&session, "person", 1);
    match session.resolve_row("person", "membership_set", &bob) {
        Err(Error::Schema(e)) => assert_eq!(e.kind, SchemaErrorKind::WrongRelationKind),
        other => panic!("expected WrongRelationKind, got {other:?}"),
    }
}

#[test]
fn reverse_navigation_excludes_mismatched_children() {
    let mut session = session();
    let bob = row_by_id(&session, "person", 1);
    let memberships = session
        .related_rows("person", "membership_set", &bob)
        .unwrap();
    assert_eq!(ids(&memberships), vec![1]);

    let jane = row_by_id(&session, "person", 3);
    assert!(
        session
            .related_rows("person", "membership", &jane)
            .unwrap()
            .is_empty()
    );
}

#[test]
fn through_navigation_requires_both_ends() {
    let mut session = session();
    let cia = row_by_id(&session, "group", 1);
    let members = session.related_rows("group", "members", &cia).unwrap();
    assert_eq!(names(&members), vec!["Bob", "Jim"]);

    let kgb = row_by_id(&session, "group", 2);
    assert!(session.related_rows("group", "members", &kgb).unwrap().is_empty());

    let bob = row_by_id(&session, "person", 1);
    assert_eq!(
        names(&session.related_rows("person", "groups", &bob).unwrap()),
        vec!["CIA"]
    );
}

#[test]
fn prefetch_reverse_equals_per_parent() {
    let mut session = session();
    let people = session.all_rows("person").unwrap();
    let before = session.query_count();
    let batched = session
        .prefetch_rows("person", "membership_set", &people)
        .unwrap();
    assert_eq!(session.query_count() - before, 1);

    for (index, person) in people.iter().enumerate() {
        let single = session
            .related_rows("person", "membership_set", person)
            .unwrap();
        assert_eq!(batched.for_parent(index), single.as_slice());
    }
}

#[test]
fn prefetch_through_equals_per_parent() {
    let mut session = session();
    let groups = session.all_rows("group").unwrap();
    let before = session.query_count();
    let batched = session.prefetch_rows("group", "members", &groups).unwrap();
    assert_eq!(session.query_count() - before, 2);
    assert_eq!(batched.len(), 2);

    for (index, group) in groups.iter().enumerate() {
        let single = session.related_rows("group", "members", group).unwrap();
        assert_eq!(batched.for_parent(index), single.as_slice());
    }
}

#[test]
fn through_ordering_on_junction_columns() {
    let mut session = session();
    let cia = row_by_id(&session, "group", 1);
    // Jim joined CIA at 20, Bob at 10.
    let members = session
        .related_rows("group", "members_by_join_date", &cia)
        .unwrap();
    assert_eq!(names(&members), vec!["Jim", "Bob"]);
    assert_eq!(
        members[0].column_names().collect::<Vec<_>>(),
        vec!["id", "name", "person_country_id"]
    );
}

#[test]
fn prefetch_through_junction_ordering_equals_per_parent() {
    let mut session = session();
    // Bob rejoins CIA after everyone else, so he sorts both first and last.
    session
        .insert_row(
            "membership",
            vec![
                ("membership_country_id", Value::BigInt(1)),
                ("person_id", Value::BigInt(1)),
                ("group_id", Value::BigInt(1)),
                ("date_joined", Value::Timestamp(40)),
            ],
        )
        .unwrap();
    let groups = session.all_rows("group").unwrap();
    let before = session.query_count();
    let batched = session
        .prefetch_rows("group", "members_by_join_date", &groups)
        .unwrap();
    assert_eq!(session.query_count() - before, 2);

    for (index, group) in groups.iter().enumerate() {
        let single = session
            .related_rows("group", "members_by_join_date", group)
            .unwrap();
        assert_eq!(batched.for_parent(index), single.as_slice());
    }
    assert_eq!(names(batched.for_parent(0)), vec!["Bob", "Jim", "Bob"]);
}

#[test]
fn prefetch_direct_leaves_gaps_for_unmatched() {
    let session = session();
    let memberships = session.all_rows("membership").unwrap();
    let before = session.query_count();
    let batched = session
        .prefetch_rows("membership", "person", &memberships)
        .unwrap();
    assert_eq!(session.query_count() - before, 1);

    // Ordered by date_joined: 4, 3, 1, 2, 5.
    assert_eq!(ids(&memberships), vec![4, 3, 1, 2, 5]);
    let resolved: Vec<Vec<String>> = batched.iter().map(names).collect();
    assert_eq!(
        resolved,
        vec![
            vec![],
            vec![],
            vec!["Bob".to_string()],
            vec!["Jim".to_string()],
            vec![],
        ]
    );
}

#[test]
fn prefetch_nothing_issues_no_query() {
    let session = session();
    let before = session.query_count();
    let batched = session.prefetch_rows("group", "members", &[]).unwrap();
    assert!(batched.is_empty());
    assert_eq!(session.query_count(), before);
}

#[test]
fn prefetch_direct_ambiguity_is_an_error() {
    let session = session();
    let memberships = session.all_rows("membership").unwrap();
    let err = session
        .prefetch_rows("membership", "compatriot", &memberships)
        .unwrap_err();
    assert!(err.is_ambiguous());
}

#[test]
fn eager_join_uses_one_query() {
    let session = session();
    let rel = session.schema().relation("membership", "person").unwrap();
    let before = session.query_count();
    let pairs = multicol_session::prefetch::select_related(session.connection(), rel, true).unwrap();
    assert_eq!(session.query_count() - before, 1);

    let attached: Vec<(i64, Option<String>)> = pairs
        .iter()
        .map(|(m, p)| {
            (
                m.get_named::<i64>("id").unwrap(),
                p.as_ref().map(|p| p.get_named::<String>("name").unwrap()),
            )
        })
        .collect();
    assert_eq!(
        attached,
        vec![
            (4, None),
            (3, None),
            (1, Some("Bob".to_string())),
            (2, Some("Jim".to_string())),
            (5, None),
        ]
    );
}

#[test]
fn reverse_path_filter_only_sees_matching_children() {
    let session = session();
    let select = filtered_select(
        session.schema(),
        "person",
        &[(
            "membership__date_joined__gte".to_string(),
            LookupValue::Single(Value::Timestamp(5)),
        )],
        true,
    )
    .unwrap();
    let people = session.connection().query(&select).unwrap();
    // Jane's only membership is mismatched; Bob's valid one counts once.
    assert_eq!(names(&people), vec!["Bob", "Jim"]);
}

#[test]
fn repeated_navigation_is_reported() {
    let mut session = session_with(SessionConfig::default().n1_threshold(2));
    for id in [1, 2, 3] {
        let person = row_by_id(&session, "person", id);
        session
            .related_rows("person", "membership_set", &person)
            .unwrap();
    }
    let stats = session.n1_stats();
    assert_eq!(stats.total_loads, 3);
    assert_eq!(stats.potential_n1, 1);
    assert_eq!(
        session.n1_tracker().count_for("person", "membership_set"),
        3
    );

    let mut quiet = session_with(SessionConfig::default().n1_detection(false));
    let bob = row_by_id(&quiet, "person", 1);
    quiet.related_rows("person", "groups", &bob).unwrap();
    assert_eq!(quiet.n1_stats().total_loads, 0);
}

#[test]
fn invalid_schema_is_rejected_up_front() {
    let mut schema = Schema::new();
    schema
        .register_table(TableMeta {
            name: "membership",
            fields: MEMBERSHIP_FIELDS,
            primary_key: &["id"],
            ordering: &[],
            relationships: MEMBERSHIP_RELATIONSHIPS,
        })
        .unwrap();
    assert!(Session::new(MemoryConnection::new(), schema).is_err());
}

#[test]
fn ordering_column_missing_from_both_ends_is_rejected() {
    static BAD_GROUP_RELATIONSHIPS: &[RelationshipInfo] = &[RelationshipInfo::through(
        "members",
        "person",
        LinkTableInfo::new("membership", MEMBERSHIP_GROUP, MEMBERSHIP_PERSON),
    )
    .order_by(&["invite_reason"])];

    let mut schema = Schema::new();
    for meta in [
        TableMeta {
            name: "person",
            fields: PERSON_FIELDS,
            primary_key: &["id"],
            ordering: &["name"],
            relationships: &[],
        },
        TableMeta {
            name: "group",
            fields: GROUP_FIELDS,
            primary_key: &["id"],
            ordering: &["name"],
            relationships: BAD_GROUP_RELATIONSHIPS,
        },
        TableMeta {
            name: "membership",
            fields: MEMBERSHIP_FIELDS,
            primary_key: &["id"],
            ordering: &[],
            relationships: &[],
        },
    ] {
        schema.register_table(meta).unwrap();
    }
    match schema.validate() {
        Err(Error::Schema(e)) => {
            assert_eq!(e.kind, SchemaErrorKind::Invalid);
            assert!(e.message.contains("'person' or 'membership'"), "{}", e.message);
        }
        other => panic!("expected an invalid schema, got {other:?}"),
    }
}
