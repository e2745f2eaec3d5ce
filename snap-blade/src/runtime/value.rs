//! Conversions between template values and site data
//!
//! View data, query items and host answers are JSON; compiled templates
//! work on minijinja values. Everything crossing that boundary goes through
//! here.

use minijinja::value::{Value as TemplateValue, ValueKind};
use serde_json::Value;

/// Site data as a template value
#[must_use]
pub fn to_template(value: &Value) -> TemplateValue {
    TemplateValue::from_serialize(value)
}

/// Template value as site data
///
/// Undefined values and `none` become `null`, as does anything that cannot
/// be serialized (functions, opaque objects).
#[must_use]
pub fn to_json(value: &TemplateValue) -> Value {
    if value.is_undefined() || value.is_none() {
        return Value::Null;
    }
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Whether a template variable holds data a child render should inherit
#[must_use]
pub fn is_data(value: &TemplateValue) -> bool {
    !matches!(value.kind(), ValueKind::Undefined | ValueKind::Plain)
}

/// Truthiness of site data, used for the signed-in user
#[must_use]
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Text of a scalar; strings are taken without quotes
#[must_use]
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Items to iterate over
///
/// Lists yield their elements, maps their values and `null` nothing.
/// Returns `None` for scalars.
#[must_use]
pub fn iterate(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => Some(map.into_iter().map(|(_, v)| v).collect()),
        Value::Null => Some(Vec::new()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthy() {
        assert!(!truthy(&Value::Null));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&json!("0")));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!([])));
        assert!(truthy(&json!("a")));
        assert!(truthy(&json!(0.5)));
        assert!(truthy(&json!({"a": 1})));
    }

    #[test]
    fn test_display() {
        assert_eq!(display(&Value::Null), "");
        assert_eq!(display(&json!("edit")), "edit");
        assert_eq!(display(&json!(3)), "3");
    }

    #[test]
    fn test_iterate() {
        assert_eq!(iterate(json!([1, 2])), Some(vec![json!(1), json!(2)]));
        assert_eq!(iterate(Value::Null), Some(Vec::new()));
        assert_eq!(iterate(json!({"a": 1})), Some(vec![json!(1)]));
        assert_eq!(iterate(json!("nope")), None);
    }

    #[test]
    fn test_round_trip_through_template_values() {
        let post = json!({"title": "Hello", "tags": ["a", "b"], "views": 3});
        assert_eq!(to_json(&to_template(&post)), post);
        assert_eq!(to_json(&TemplateValue::UNDEFINED), Value::Null);
        assert_eq!(to_json(&TemplateValue::from(())), Value::Null);
    }

    #[test]
    fn test_functions_are_not_data() {
        assert!(is_data(&to_template(&json!({"a": 1}))));
        assert!(is_data(&TemplateValue::from("text")));
        assert!(!is_data(&TemplateValue::UNDEFINED));
    }
}
