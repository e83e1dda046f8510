use chrono::{DateTime, Utc};
use sql_bridge::prelude::*;

struct ModelTest;

impl ModelDefinition for ModelTest {
    const TABLE: Option<&'static str> = Some("model_tests");
    const DATES: &'static [&'static str] = &["due_date"];
}

struct Profile;

impl ModelDefinition for Profile {
    const DATES: &'static [&'static str] = &["due_date"];
}

fn clock(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

#[test]
fn plain_attributes_read_back_as_stored() {
    let model = ModelTest::hydrate([("name", "joe")]);
    assert_eq!(model.value("name").unwrap().as_text(), Some("joe"));
    assert!(matches!(
        model.get("name").unwrap(),
        Attribute::Value(RowValues::Text(name)) if name == "joe"
    ));
}

#[test]
fn declared_dates_are_parsed_on_read() {
    let model = ModelTest::hydrate([("name", "joe"), ("due_date", "2020-11-28 11:42:07")]);

    let due = model.date("due_date").unwrap().expect("non-null date");
    assert!(due.is_past_at(clock("2024-01-01T00:00:00Z")));
    assert!(!due.is_future_at(clock("2024-01-01T00:00:00Z")));
    assert!(due.is_future_at(clock("2019-06-01T00:00:00Z")));
    assert!(due.is_past());

    // undeclared columns are never treated as dates
    assert!(model.date("name").is_err());
    assert!(matches!(model.get("name").unwrap(), Attribute::Value(_)));
}

#[test]
fn relations_are_reachable_by_name() {
    let mut model = ModelTest::hydrate([("name", "joe")]);
    model.add_relation([(
        "profile",
        Profile::hydrate([("name", "bob"), ("due_date", "2020-11-28 11:42:07")]),
    )]);

    let profile = model.relation("profile").unwrap().one().unwrap();
    assert_eq!(profile.value("name").unwrap().as_text(), Some("bob"));
    let due = profile.date("due_date").unwrap().unwrap();
    assert!(due.is_past_at(clock("2020-11-28T11:42:08Z")));
    assert_eq!(profile.name(), "Profile");
    assert!(matches!(model.get("profile").unwrap(), Attribute::Relation(_)));
    assert!(model.has("profile"));
}

#[test]
fn to_many_relations_keep_order() {
    let mut model = ModelTest::hydrate([("name", "joe")]);
    model.add_relation([(
        "posts",
        vec![
            Profile::hydrate([("title", "first")]),
            Profile::hydrate([("title", "second")]),
        ],
    )]);

    let posts = model.relation("posts").unwrap();
    assert_eq!(posts.len(), 2);
    let titles: Vec<_> = posts
        .many()
        .iter()
        .filter_map(|post| post.value("title").ok().and_then(RowValues::as_text))
        .collect();
    assert_eq!(titles, vec!["first", "second"]);
}

#[test]
fn missing_attribute_is_distinct_from_null() {
    let model = ModelTest::hydrate([("name", RowValues::Null), ("due_date", RowValues::Null)]);

    assert!(model.value("name").unwrap().is_null());
    assert_eq!(model.date("due_date").unwrap(), None);

    let err = model.get("email").unwrap_err();
    assert!(matches!(
        &err,
        SqlBridgeError::AttributeNotFound { model, attribute }
            if model == "ModelTest" && attribute == "email"
    ));
    assert_eq!(err.kind(), ErrorKind::DataShape);
    assert!(model.relation("name").is_err());
}

#[test]
fn serializes_with_dates_and_relations() {
    let mut model = ModelTest::hydrate([
        ("id", RowValues::Int(1)),
        ("due_date", RowValues::Text("2020-11-28 11:42:07".into())),
    ]);
    model.add_relation([("profile", Profile::hydrate([("name", "bob")]))]);

    let json = serde_json::to_value(&model).unwrap();
    assert_eq!(json["id"], 1);
    assert_eq!(json["due_date"], "2020-11-28T11:42:07+00:00");
    assert_eq!(json["profile"]["name"], "bob");
}

#[test]
fn hydrates_rows_returned_by_a_query() {
    let rows = vec![
        CustomDbRow::from_pairs([("id", RowValues::Int(1)), ("due_date", "2031-05-01".into())]),
        CustomDbRow::from_pairs([("id", RowValues::Int(2)), ("due_date", RowValues::Null)]),
    ];
    let models = ModelTest::hydrate_all(rows);

    assert_eq!(models.len(), 2);
    assert!(
        models[0]
            .date("due_date")
            .unwrap()
            .unwrap()
            .is_future_at(clock("2030-01-01T00:00:00Z"))
    );
    assert_eq!(models[1].date("due_date").unwrap(), None);
    assert_eq!(models[1].table(), Some("model_tests"));
}
