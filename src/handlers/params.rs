//! Request parameter merging.
//!
//! # Responsibilities
//! - Merge query string, route values and JSON body into one map
//! - Recognise quest filters in declared query parameters
//! - Reject JSON-looking query values when the definition forbids them
//!
//! # Design Decisions
//! - Keys are lower-cased; later sources override earlier ones
//!   (query, then route, then body)

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::definition::Definition;
use crate::http::request::RequestContext;
use crate::shaping::{value_text, Record};

/// Why a request's inputs were rejected. Always a client error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("request body is not a JSON object: {0}")]
    MalformedBody(String),

    #[error("query parameter `{0}` carries JSON but is not a quest parameter")]
    JsonInQuery(String),

    #[error("quest parameter `{name}` is not a JSON object: {reason}")]
    InvalidQuest { name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Json(Value),
    Quest(QuestFilter),
}

impl ParamValue {
    /// The value as JSON, for binding to backend parameters.
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Text(s) => Value::String(s.clone()),
            ParamValue::Json(v) => v.clone(),
            ParamValue::Quest(q) => Value::Object(q.0.clone()),
        }
    }

    /// The value as text, for substitution into templates.
    pub fn to_text(&self) -> String {
        match self {
            ParamValue::Text(s) => s.clone(),
            other => value_text(&other.to_json()),
        }
    }
}

/// Column to expected value. An array expects any of its elements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuestFilter(pub Map<String, Value>);

impl QuestFilter {
    pub fn matches(&self, record: &Record) -> bool {
        self.0.iter().all(|(column, expected)| {
            match field_ignore_case(record, column) {
                Some(actual) => match expected {
                    Value::Array(options) => options.iter().any(|o| values_equal(o, actual)),
                    single => values_equal(single, actual),
                },
                None => false,
            }
        })
    }
}

/// Look up a record field by case-insensitive name.
pub fn field_ignore_case<'r>(record: &'r Record, name: &str) -> Option<&'r Value> {
    record
        .get(name)
        .or_else(|| {
            record
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
}

/// Loose equality: numbers by value, strings against anything by text.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(_), _) | (_, Value::String(_)) => value_text(a) == value_text(b),
        _ => a == b,
    }
}

/// Merged request parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    values: BTreeMap<String, ParamValue>,
}

impl Parameters {
    pub fn insert(&mut self, name: &str, value: ParamValue) {
        self.values.insert(name.to_ascii_lowercase(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn quest_filters(&self) -> impl Iterator<Item = &QuestFilter> {
        self.values.values().filter_map(|v| match v {
            ParamValue::Quest(q) => Some(q),
            _ => None,
        })
    }

    /// Merge query, route values and (when `use_body`) the JSON body.
    pub fn merge(
        definition: &Definition,
        request: &RequestContext,
        use_body: bool,
    ) -> Result<Self, RequestError> {
        let mut params = Parameters::default();

        for (name, raw) in &request.query {
            let value = if looks_like_json(raw) {
                if definition.is_quest_parameter(name) {
                    let filter = serde_json::from_str::<Map<String, Value>>(raw.trim()).map_err(|e| {
                        RequestError::InvalidQuest {
                            name: name.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                    ParamValue::Quest(QuestFilter(filter))
                } else if definition.restrict_json_in_query_string {
                    return Err(RequestError::JsonInQuery(name.clone()));
                } else {
                    ParamValue::Text(raw.clone())
                }
            } else {
                ParamValue::Text(raw.clone())
            };
            params.insert(name, value);
        }

        for (name, value) in &request.route_values {
            params.insert(name, ParamValue::Text(value.clone()));
        }

        if use_body && request.has_json_body() && !request.body.is_empty() {
            let body: Value = serde_json::from_slice(&request.body)
                .map_err(|e| RequestError::MalformedBody(e.to_string()))?;
            let Value::Object(fields) = body else {
                return Err(RequestError::MalformedBody("expected an object".to_string()));
            };
            for (name, value) in fields {
                let value = match value {
                    Value::String(s) => ParamValue::Text(s),
                    other => ParamValue::Json(other),
                };
                params.insert(&name, value);
            }
        }

        Ok(params)
    }
}

fn looks_like_json(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.starts_with('{') && trimmed.ends_with('}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::DefinitionParser;
    use crate::shaping::record;
    use axum::http::Method;
    use serde_json::json;

    fn definition(extra: &str) -> Definition {
        DefinitionParser::new()
            .parse_str(&format!("create a/{{id}}\nmethod GET\n{extra}\ndata-source broker\nend"))
            .unwrap()
    }

    #[test]
    fn test_later_sources_override() {
        let request = RequestContext::new(Method::POST, "/a/7")
            .with_query_string("ID=1&Name=q")
            .with_route_values(vec![("id".into(), "7".into())])
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"body","count":3}"#);

        let params = Parameters::merge(&definition(""), &request, true).unwrap();
        assert_eq!(params.get("id"), Some(&ParamValue::Text("7".into())));
        assert_eq!(params.get("NAME"), Some(&ParamValue::Text("body".into())));
        assert_eq!(params.get("count"), Some(&ParamValue::Json(json!(3))));
    }

    #[test]
    fn test_body_ignored_without_use_body() {
        let request = RequestContext::new(Method::POST, "/a")
            .with_header("content-type", "application/json")
            .with_body("not json");
        let params = Parameters::merge(&definition(""), &request, false).unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn test_malformed_body() {
        let request = RequestContext::new(Method::POST, "/a")
            .with_header("content-type", "application/json")
            .with_body("[1,2]");
        let err = Parameters::merge(&definition(""), &request, true).unwrap_err();
        assert!(matches!(err, RequestError::MalformedBody(_)));
    }

    #[test]
    fn test_quest_and_restricted_json() {
        let def = definition("use quest filter\nuse restrict-json-in-query-string");

        let quest = RequestContext::new(Method::GET, "/a").with_query_string(r#"filter={"city":["Oslo","Rome"]}"#);
        let params = Parameters::merge(&def, &quest, false).unwrap();
        assert_eq!(params.quest_filters().count(), 1);

        let smuggled = RequestContext::new(Method::GET, "/a").with_query_string(r#"other={"x":1}"#);
        assert_eq!(
            Parameters::merge(&def, &smuggled, false).unwrap_err(),
            RequestError::JsonInQuery("other".into())
        );

        let relaxed = definition("");
        let params = Parameters::merge(&relaxed, &smuggled, false).unwrap();
        assert_eq!(params.get("other"), Some(&ParamValue::Text(r#"{"x":1}"#.into())));
    }

    #[test]
    fn test_quest_filter_matching() {
        let filter = QuestFilter(
            json!({"City": ["Oslo", "Rome"], "age": 30})
                .as_object()
                .unwrap()
                .clone(),
        );
        assert!(filter.matches(&record([("city", json!("Rome")), ("Age", json!(30.0))])));
        assert!(!filter.matches(&record([("city", json!("Paris")), ("age", json!(30))])));
        assert!(!filter.matches(&record([("city", json!("Oslo"))])));
    }
}
