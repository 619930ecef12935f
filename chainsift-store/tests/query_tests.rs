use chainsift_schema::{EntityDef, FieldDef, Schema, SchemaDef};
use chainsift_store::{EntityFilter, EntityStore, OrderDirection, StoreError};
use chainsift_types::{Record, ScalarType, Value};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

fn schema() -> Schema {
    Schema::compile(SchemaDef::new(vec![
        EntityDef::new(
            "Account",
            vec![
                FieldDef::id(),
                FieldDef::int("balance"),
                FieldDef::string("label").nullable(),
                FieldDef::list("tags", ScalarType::String).nullable(),
                FieldDef::enumeration("tier", vec!["basic".into(), "pro".into()]).nullable(),
                FieldDef::relationship("referrer", "Account").nullable(),
            ],
        ),
    ]))
    .unwrap()
}

fn store() -> EntityStore {
    let store = EntityStore::open_in_memory().unwrap();
    store.migrate(schema()).unwrap();
    store
}

fn account(store: &EntityStore, id: &str, balance: i64, label: &str) {
    let fields: Record = [
        ("balance", Value::Int(balance)),
        ("label", Value::from(label)),
    ]
    .into_iter()
    .collect();
    store.create("Account", id, fields).unwrap();
}

fn where_filter<const N: usize>(pairs: [(&str, Value); N]) -> EntityFilter {
    EntityFilter {
        where_clause: pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<BTreeMap<_, _>>(),
        ..EntityFilter::default()
    }
}

fn ids(records: &[Record]) -> Vec<&str> {
    records.iter().filter_map(|r| r.get_str("id")).collect()
}

// ── Comparison operators ─────────────────────────────────────────

#[test]
fn equality_and_not() {
    let store = store();
    account(&store, "a", 1, "x");
    account(&store, "b", 2, "y");

    let eq = store
        .query("Account", &where_filter([("balance", Value::Int(2))]))
        .unwrap();
    assert_eq!(ids(&eq), vec!["b"]);

    let not = store
        .query("Account", &where_filter([("balance_not", Value::Int(2))]))
        .unwrap();
    assert_eq!(ids(&not), vec!["a"]);
}

#[test]
fn numeric_comparisons() {
    let store = store();
    account(&store, "a", 10, "x");
    account(&store, "b", 20, "x");
    account(&store, "c", 30, "x");

    let gt = store
        .query("Account", &where_filter([("balance_gt", Value::Int(10))]))
        .unwrap();
    assert_eq!(ids(&gt), vec!["b", "c"]);

    let gte = store
        .query("Account", &where_filter([("balance_gte", Value::Int(20))]))
        .unwrap();
    assert_eq!(ids(&gte), vec!["b", "c"]);

    let lt = store
        .query("Account", &where_filter([("balance_lt", Value::Int(20))]))
        .unwrap();
    assert_eq!(ids(&lt), vec!["a"]);

    let lte = store
        .query("Account", &where_filter([("balance_lte", Value::Int(20))]))
        .unwrap();
    assert_eq!(ids(&lte), vec!["a", "b"]);
}

#[test]
fn update_then_range_query_scenario() {
    let store = store();
    store
        .create("Account", "0xabc", [("balance", Value::Int(100))].into_iter().collect::<Record>())
        .unwrap();
    store
        .update("Account", "0xabc", [("balance", Value::Int(150))].into_iter().collect::<Record>())
        .unwrap();

    let hits = store
        .query("Account", &where_filter([("balance_gt", Value::Int(100))]))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].get_str("id"), Some("0xabc"));
    assert_eq!(hits[0].get_int("balance"), Some(150));
}

#[test]
fn in_and_not_in() {
    let store = store();
    account(&store, "a", 1, "x");
    account(&store, "b", 2, "x");
    account(&store, "c", 3, "x");

    let members = Value::List(vec![Value::Int(1), Value::Int(3)]);
    let found = store
        .query("Account", &where_filter([("balance_in", members.clone())]))
        .unwrap();
    assert_eq!(ids(&found), vec!["a", "c"]);

    let rest = store
        .query("Account", &where_filter([("balance_not_in", members)]))
        .unwrap();
    assert_eq!(ids(&rest), vec!["b"]);
}

#[test]
fn in_with_empty_list() {
    let store = store();
    account(&store, "a", 1, "x");

    let none = store
        .query("Account", &where_filter([("balance_in", Value::List(vec![]))]))
        .unwrap();
    assert!(none.is_empty());

    let all = store
        .query(
            "Account",
            &where_filter([("balance_not_in", Value::List(vec![]))]),
        )
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[test]
fn id_field_filters() {
    let store = store();
    account(&store, "a", 1, "x");
    account(&store, "b", 2, "x");

    let found = store
        .query(
            "Account",
            &where_filter([("id_in", Value::List(vec![Value::from("b")]))]),
        )
        .unwrap();
    assert_eq!(ids(&found), vec!["b"]);
}

// ── String operators ─────────────────────────────────────────────

#[test]
fn string_contains_family() {
    let store = store();
    account(&store, "a", 0, "alice in chains");
    account(&store, "b", 0, "bob");

    let contains = store
        .query(
            "Account",
            &where_filter([("label_contains", Value::from("in ch"))]),
        )
        .unwrap();
    assert_eq!(ids(&contains), vec!["a"]);

    let not_contains = store
        .query(
            "Account",
            &where_filter([("label_not_contains", Value::from("alice"))]),
        )
        .unwrap();
    assert_eq!(ids(&not_contains), vec!["b"]);

    let starts = store
        .query(
            "Account",
            &where_filter([("label_starts_with", Value::from("bo"))]),
        )
        .unwrap();
    assert_eq!(ids(&starts), vec!["b"]);

    let ends = store
        .query(
            "Account",
            &where_filter([("label_ends_with", Value::from("chains"))]),
        )
        .unwrap();
    assert_eq!(ids(&ends), vec!["a"]);

    let not_starts = store
        .query(
            "Account",
            &where_filter([("label_not_starts_with", Value::from("alice"))]),
        )
        .unwrap();
    assert_eq!(ids(&not_starts), vec!["b"]);

    let not_ends = store
        .query(
            "Account",
            &where_filter([("label_not_ends_with", Value::from("chains"))]),
        )
        .unwrap();
    assert_eq!(ids(&not_ends), vec!["b"]);
}

#[test]
fn nocase_variants_match_across_case() {
    let store = store();
    account(&store, "a", 0, "Alice");

    let found = store
        .query(
            "Account",
            &where_filter([("label_contains_nocase", Value::from("aLiCe"))]),
        )
        .unwrap();
    assert_eq!(ids(&found), vec!["a"]);
}

#[test]
fn like_wildcards_in_values_match_literally() {
    let store = store();
    account(&store, "a", 0, "100%");
    account(&store, "b", 0, "1000");
    account(&store, "c", 0, "a_b");
    account(&store, "d", 0, "axb");

    let percent = store
        .query(
            "Account",
            &where_filter([("label_contains", Value::from("0%"))]),
        )
        .unwrap();
    assert_eq!(ids(&percent), vec!["a"]);

    let underscore = store
        .query(
            "Account",
            &where_filter([("label_contains", Value::from("_"))]),
        )
        .unwrap();
    assert_eq!(ids(&underscore), vec!["c"]);
}

#[test]
fn filter_values_with_sql_metacharacters_are_inert() {
    let store = store();
    let hostile = "'; DROP TABLE \"Account\"; --";
    account(&store, "a", 0, hostile);
    account(&store, "b", 0, "benign");

    let found = store
        .query("Account", &where_filter([("label", Value::from(hostile))]))
        .unwrap();
    assert_eq!(ids(&found), vec!["a"]);

    // The table is intact and still queryable.
    assert_eq!(store.query("Account", &EntityFilter::new()).unwrap().len(), 2);
}

// ── Relationship and enum filters ────────────────────────────────

#[test]
fn relationship_filters_as_id_and_string() {
    let store = store();
    account(&store, "root", 0, "x");
    let fields: Record = [
        ("balance", Value::Int(0)),
        ("referrer", Value::from("root")),
    ]
    .into_iter()
    .collect();
    store.create("Account", "child", fields).unwrap();

    let eq = store
        .query("Account", &where_filter([("referrer", Value::from("root"))]))
        .unwrap();
    assert_eq!(ids(&eq), vec!["child"]);

    let contains = store
        .query(
            "Account",
            &where_filter([("referrer_contains", Value::from("oo"))]),
        )
        .unwrap();
    assert_eq!(ids(&contains), vec!["child"]);
}

#[test]
fn enum_membership_filters() {
    let store = store();
    let mut basic: Record = [("balance", Value::Int(0))].into_iter().collect();
    basic.insert("tier", "basic");
    store.create("Account", "a", basic).unwrap();
    let mut pro: Record = [("balance", Value::Int(0))].into_iter().collect();
    pro.insert("tier", "pro");
    store.create("Account", "b", pro).unwrap();

    let found = store
        .query(
            "Account",
            &where_filter([("tier_in", Value::List(vec![Value::from("pro")]))]),
        )
        .unwrap();
    assert_eq!(ids(&found), vec!["b"]);

    // Unknown labels match nothing rather than erroring.
    let none = store
        .query("Account", &where_filter([("tier", Value::from("diamond"))]))
        .unwrap();
    assert!(none.is_empty());
}

// ── List filters ─────────────────────────────────────────────────

#[test]
fn list_contains_matches_elements() {
    let store = store();
    let fields: Record = [
        ("balance", Value::Int(0)),
        ("tags", Value::from(vec!["a".to_string(), "b".to_string(), "c".to_string()])),
    ]
    .into_iter()
    .collect();
    store.create("Account", "0x1", fields).unwrap();

    let hit = store
        .query("Account", &where_filter([("tags_contains", Value::from("b"))]))
        .unwrap();
    assert_eq!(hit.len(), 1);

    let miss = store
        .query("Account", &where_filter([("tags_contains", Value::from("z"))]))
        .unwrap();
    assert!(miss.is_empty());
}

#[test]
fn list_contains_with_delimiter_in_element() {
    let store = store();
    let fields: Record = [
        ("balance", Value::Int(0)),
        ("tags", Value::from(vec!["with,comma".to_string()])),
    ]
    .into_iter()
    .collect();
    store.create("Account", "0x1", fields).unwrap();

    let hit = store
        .query(
            "Account",
            &where_filter([("tags_contains", Value::from("with,comma"))]),
        )
        .unwrap();
    assert_eq!(hit.len(), 1);
}

#[test]
fn list_equality_matches_whole_list() {
    let store = store();
    let tags = Value::from(vec!["a".to_string(), "b".to_string()]);
    let fields: Record = [("balance", Value::Int(0)), ("tags", tags.clone())]
        .into_iter()
        .collect();
    store.create("Account", "0x1", fields).unwrap();

    let hit = store
        .query("Account", &where_filter([("tags", tags)]))
        .unwrap();
    assert_eq!(hit.len(), 1);

    let miss = store
        .query(
            "Account",
            &where_filter([("tags", Value::from(vec!["a".to_string()]))]),
        )
        .unwrap();
    assert!(miss.is_empty());
}

// ── Null predicates ──────────────────────────────────────────────

#[test]
fn null_filters_match_absent_values() {
    let store = store();
    account(&store, "labelled", 0, "x");
    store
        .create("Account", "bare", [("balance", Value::Int(0))].into_iter().collect::<Record>())
        .unwrap();

    let nulls = store
        .query("Account", &where_filter([("label", Value::Null)]))
        .unwrap();
    assert_eq!(ids(&nulls), vec!["bare"]);

    let non_nulls = store
        .query("Account", &where_filter([("label_not", Value::Null)]))
        .unwrap();
    assert_eq!(ids(&non_nulls), vec!["labelled"]);
}

// ── Conjunction ──────────────────────────────────────────────────

#[test]
fn predicates_are_anded() {
    let store = store();
    account(&store, "a", 10, "x");
    account(&store, "b", 20, "x");
    account(&store, "c", 20, "y");

    let found = store
        .query(
            "Account",
            &where_filter([
                ("balance_gte", Value::Int(20)),
                ("label", Value::from("x")),
            ]),
        )
        .unwrap();
    assert_eq!(ids(&found), vec!["b"]);
}

// ── Ordering and pagination ──────────────────────────────────────

#[test]
fn order_by_ascending_and_descending() {
    let store = store();
    account(&store, "a", 3, "x");
    account(&store, "b", 1, "x");
    account(&store, "c", 2, "x");

    let asc = store
        .query(
            "Account",
            &EntityFilter {
                order_by: Some("balance".into()),
                order_direction: Some(OrderDirection::Asc),
                ..EntityFilter::default()
            },
        )
        .unwrap();
    assert_eq!(ids(&asc), vec!["b", "c", "a"]);

    let desc = store
        .query(
            "Account",
            &EntityFilter {
                order_by: Some("balance".into()),
                order_direction: Some(OrderDirection::Desc),
                ..EntityFilter::default()
            },
        )
        .unwrap();
    assert_eq!(ids(&desc), vec!["a", "c", "b"]);
}

#[test]
fn pagination_window() {
    let store = store();
    for i in 0..10 {
        account(&store, &format!("id{i}"), i, "x");
    }

    let page = store
        .query(
            "Account",
            &EntityFilter {
                first: Some(3),
                skip: Some(2),
                order_by: Some("balance".into()),
                ..EntityFilter::default()
            },
        )
        .unwrap();
    assert_eq!(ids(&page), vec!["id2", "id3", "id4"]);
}

#[test]
fn first_zero_returns_no_rows() {
    let store = store();
    account(&store, "a", 1, "x");

    let none = store
        .query(
            "Account",
            &EntityFilter {
                first: Some(0),
                ..EntityFilter::default()
            },
        )
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn skip_without_first_offsets_unlimited_scan() {
    let store = store();
    for i in 0..5 {
        account(&store, &format!("id{i}"), i, "x");
    }

    let rest = store
        .query(
            "Account",
            &EntityFilter {
                skip: Some(2),
                order_by: Some("balance".into()),
                ..EntityFilter::default()
            },
        )
        .unwrap();
    assert_eq!(ids(&rest), vec!["id2", "id3", "id4"]);
}

#[test]
fn empty_filter_returns_everything() {
    let store = store();
    account(&store, "a", 1, "x");
    account(&store, "b", 2, "x");
    assert_eq!(store.query("Account", &EntityFilter::new()).unwrap().len(), 2);
}

// ── Failure modes ────────────────────────────────────────────────

#[test]
fn unsupported_operator_names_the_key() {
    let store = store();
    let err = store
        .query(
            "Account",
            &where_filter([("balance_matches", Value::Int(1))]),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::UnsupportedFilterOperator { ref key } if key == "balance_matches"
    ));
}

#[test]
fn string_operator_on_int_field_is_unsupported() {
    let store = store();
    assert!(matches!(
        store.query(
            "Account",
            &where_filter([("balance_contains", Value::from("1"))]),
        ),
        Err(StoreError::UnsupportedFilterOperator { .. })
    ));
}

#[test]
fn unknown_order_by_field_fails() {
    let store = store();
    let err = store
        .query(
            "Account",
            &EntityFilter {
                order_by: Some("nonsense".into()),
                ..EntityFilter::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::FieldNotFound { ref field, .. } if field == "nonsense"
    ));
}

#[test]
fn query_unknown_entity_fails() {
    let store = store();
    assert!(matches!(
        store.query("Nope", &EntityFilter::new()),
        Err(StoreError::EntityNotFound { .. })
    ));
}
