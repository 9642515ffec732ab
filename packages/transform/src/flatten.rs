//! Flattening of nested JSON records into table rows.
//!
//! `{"location": {"street": {"id": 1}}}` becomes the single field
//! `location.street.id = "1"`.

use serde_json::Value;

use crate::table::Cell;

/// Separator placed between nested key names.
pub const KEY_SEPARATOR: char = '.';

/// Flattens one JSON object into `(column, cell)` pairs in key order.
///
/// Returns `None` if `record` is not an object.
#[must_use]
pub fn flatten_record(record: &Value) -> Option<Vec<(String, Cell)>> {
    let Value::Object(map) = record else {
        return None;
    };

    let mut fields = Vec::with_capacity(map.len());
    for (key, value) in map {
        flatten_into(key.clone(), value, &mut fields);
    }
    Some(fields)
}

fn flatten_into(prefix: String, value: &Value, out: &mut Vec<(String, Cell)>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                flatten_into(format!("{prefix}{KEY_SEPARATOR}{key}"), nested, out);
            }
        }
        scalar => out.push((prefix, scalar_cell(scalar))),
    }
}

/// Renders a non-object JSON value as cell text.
fn scalar_cell(value: &Value) -> Cell {
    match value {
        Value::Null => None,
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn flattens_nested_objects_with_dots() {
        let record = json!({
            "category": "burglary",
            "location": {
                "latitude": "51.501",
                "street": { "id": 1_234_567, "name": "On or near Cuba Street" }
            },
            "outcome_status": null,
            "context": ""
        });

        let fields = flatten_record(&record).unwrap();
        let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&"location.street.id"));
        assert!(names.contains(&"location.latitude"));

        let get = |name: &str| fields.iter().find(|(n, _)| n == name).unwrap().1.clone();
        assert_eq!(get("location.street.id"), Some("1234567".to_string()));
        assert_eq!(get("outcome_status"), None);
        assert_eq!(get("context"), Some(String::new()));
    }

    #[test]
    fn empty_objects_add_no_columns() {
        let fields = flatten_record(&json!({"a": 1, "b": {}})).unwrap();
        assert_eq!(fields, vec![("a".to_string(), Some("1".to_string()))]);
    }

    #[test]
    fn renders_arrays_and_booleans() {
        let fields = flatten_record(&json!({"tags": ["x", 1], "ok": true})).unwrap();
        assert!(fields.contains(&("tags".to_string(), Some(r#"["x",1]"#.to_string()))));
        assert!(fields.contains(&("ok".to_string(), Some("True".to_string()))));
    }

    #[test]
    fn rejects_non_objects() {
        assert!(flatten_record(&json!("burglary")).is_none());
        assert!(flatten_record(&json!([1, 2])).is_none());
    }
}
