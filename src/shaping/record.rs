//! Flat tabular records.

use serde_json::{Map, Value};

/// One row: field name to value, in column order.
pub type Record = Map<String, Value>;

/// Build a record from `(name, value)` pairs.
pub fn record<I, K>(fields: I) -> Record
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    fields.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Render a scalar the way it is compared against request parameters.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_keeps_column_order() {
        let r = record([("b", json!(1)), ("a", json!(2))]);
        let keys: Vec<&String> = r.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(&json!("x")), "x");
        assert_eq!(value_text(&json!(42)), "42");
        assert_eq!(value_text(&json!(true)), "true");
        assert_eq!(value_text(&Value::Null), "null");
    }
}
