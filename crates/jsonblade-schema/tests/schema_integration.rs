//! Schema analysis over realistic template data.

use jsonblade_schema::{analyze, properties_for_path, validate_path, DataStructure};
use serde_json::json;

fn sample() -> serde_json::Value {
    json!({
        "company": {"name": "Acme", "founded": 1999},
        "employees": [
            {"name": "Ann", "skills": ["rust", "sql"], "manager": null},
            {"name": "Bob", "email": "bob@example.com"}
        ],
        "active": true,
        "count": 0
    })
}

#[test]
fn test_completion_candidates() {
    let schema = analyze(&sample());
    assert_eq!(
        properties_for_path("employees", &schema),
        vec!["email", "manager", "name", "skills"]
    );
    assert_eq!(properties_for_path("company", &schema), vec!["founded", "name"]);
}

#[test]
fn test_paths_used_by_templates() {
    let schema = analyze(&sample());
    for path in ["company.name", "employees.name", "employees.email", "active", "count"] {
        assert!(validate_path(path, &schema), "{path} should exist");
    }
    for path in ["company.ceo", "employees.phone", "missing"] {
        assert!(!validate_path(path, &schema), "{path} should not exist");
    }
}

#[test]
fn test_schema_round_trips_through_json() {
    let schema = analyze(&sample());
    let encoded = serde_json::to_string(&schema).unwrap();
    let decoded: DataStructure = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, schema);
    assert_eq!(decoded.fields["count"].kind, "number");
    assert_eq!(decoded.fields["employees"].items.as_ref().unwrap().fields["manager"].kind, "null");
}
