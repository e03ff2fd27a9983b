use pretty_assertions::assert_eq;
use provkit_types::{state_from_json, Error, StateFormatError, StateMap, StateMapExt, StateValue};

fn sample() -> StateMap {
    let mut map = StateMap::new();
    map.insert("project_id".into(), "7".into());
    map.insert("count".into(), 3i64.into());
    map.insert("enabled".into(), true.into());
    map.insert("note".into(), StateValue::Null);
    map
}

// ── StateValue ────────────────────────────────────────────────────

#[test]
fn type_names() {
    assert_eq!(StateValue::Null.type_name(), "null");
    assert_eq!(StateValue::from(true).type_name(), "bool");
    assert_eq!(StateValue::from(1i64).type_name(), "int");
    assert_eq!(StateValue::from(1.5).type_name(), "float");
    assert_eq!(StateValue::from("x").type_name(), "string");
    assert_eq!(StateValue::List(vec![]).type_name(), "list");
    assert_eq!(StateValue::Map(StateMap::new()).type_name(), "map");
}

#[test]
fn float_accessor_widens_ints() {
    assert_eq!(StateValue::Int(2).as_float(), Some(2.0));
    assert_eq!(StateValue::Float(2.5).as_float(), Some(2.5));
    assert_eq!(StateValue::from("2").as_float(), None);
}

#[test]
fn int_accessor_does_not_narrow_floats() {
    assert_eq!(StateValue::Float(2.0).as_int(), None);
}

#[test]
fn json_deserialization_picks_variants() {
    let value: StateValue =
        serde_json::from_str(r#"{"a":1,"b":1.5,"c":"s","d":[true,null],"e":{}}"#).unwrap();
    let map = value.as_map().unwrap();
    assert_eq!(map["a"], StateValue::Int(1));
    assert_eq!(map["b"], StateValue::Float(1.5));
    assert_eq!(map["c"], StateValue::from("s"));
    assert_eq!(
        map["d"],
        StateValue::List(vec![StateValue::Bool(true), StateValue::Null])
    );
    assert_eq!(map["e"], StateValue::Map(StateMap::new()));
}

#[test]
fn json_serialization_is_plain() {
    let json = serde_json::to_string(&sample()).unwrap();
    assert_eq!(
        json,
        r#"{"count":3,"enabled":true,"note":null,"project_id":"7"}"#
    );
}

#[test]
fn serde_json_value_conversion_roundtrip() {
    let raw = serde_json::json!({"id": "7:42", "tags": ["a", "b"], "weight": 0.5, "n": -4});
    let value = StateValue::from(raw.clone());
    let back: serde_json::Value = value.into();
    assert_eq!(back, raw);
}

#[test]
fn non_finite_float_becomes_json_null() {
    let back: serde_json::Value = StateValue::Float(f64::INFINITY).into();
    assert_eq!(back, serde_json::Value::Null);
}

// ── StateMapExt ───────────────────────────────────────────────────

#[test]
fn get_str_present_absent_and_null() {
    let map = sample();
    assert_eq!(map.get_str("project_id").unwrap(), Some("7"));
    assert_eq!(map.get_str("missing").unwrap(), None);
    assert_eq!(map.get_str("note").unwrap(), None);
}

#[test]
fn get_str_wrong_type_is_error() {
    let err = sample().get_str("count").unwrap_err();
    assert_eq!(
        err,
        StateFormatError::WrongType {
            key: "count".into(),
            expected: "string",
            found: "int"
        }
    );
}

#[test]
fn get_int_and_bool() {
    let map = sample();
    assert_eq!(map.get_int("count").unwrap(), Some(3));
    assert_eq!(map.get_bool("enabled").unwrap(), Some(true));
    assert!(map.get_bool("project_id").is_err());
}

#[test]
fn require_rejects_missing_and_null() {
    let map = sample();
    assert_eq!(
        map.require_str("note").unwrap_err(),
        StateFormatError::Missing { key: "note".into() }
    );
    assert!(map.require_int("nope").is_err());
    assert_eq!(map.require_int("count").unwrap(), 3);
}

#[test]
fn take_str_removes_key() {
    let mut map = sample();
    assert_eq!(map.take_str("project_id").unwrap(), "7");
    assert!(!map.contains_key("project_id"));
}

#[test]
fn take_str_wrong_type_leaves_map_unchanged() {
    let mut map = sample();
    let before = map.clone();
    assert!(map.take_str("count").is_err());
    assert_eq!(map, before);
}

#[test]
fn take_str_null_leaves_map_unchanged() {
    let mut map = sample();
    let before = map.clone();
    assert_eq!(
        map.take_str("note").unwrap_err(),
        StateFormatError::Missing { key: "note".into() }
    );
    assert_eq!(map.get("note"), Some(&StateValue::Null));
    assert_eq!(map, before);
}

#[test]
fn rename_key_moves_value() {
    let mut map = sample();
    assert!(map.rename_key("project_id", "project"));
    assert_eq!(map.get_str("project").unwrap(), Some("7"));
    assert!(!map.contains_key("project_id"));
    assert!(!map.rename_key("project_id", "project"));
}

#[test]
fn format_error_messages_name_the_key() {
    let err = StateFormatError::invalid("id", "42", "<project>:<key>");
    let msg = err.to_string();
    assert!(msg.contains("`id`"));
    assert!(msg.contains("\"42\""));
    assert!(msg.contains("<project>:<key>"));
}

// ── state_from_json ───────────────────────────────────────────────

#[test]
fn state_from_json_object() {
    let map = state_from_json(r#"{"project_id":"7","id":"42"}"#).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get_str("id").unwrap(), Some("42"));
}

#[test]
fn state_from_json_rejects_non_object() {
    match state_from_json("[1,2]").unwrap_err() {
        Error::NotAnObject(found) => assert_eq!(found, "list"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn state_from_json_rejects_garbage() {
    assert!(matches!(
        state_from_json("{not json").unwrap_err(),
        Error::Serialization(_)
    ));
}
