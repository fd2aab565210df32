//! Success and error envelopes.
//!
//! Unwrapped success is the payload itself. Wrapped responses carry
//! `Status`, `Timestamp` and `Response`; `camelcase` lower-cases the first
//! letter of those envelope keys and nothing else.

use axum::http::StatusCode;
use chrono::{SecondsFormat, Utc};
use heck::ToLowerCamelCase;
use serde_json::{Map, Value};

use crate::definition::Definition;
use crate::http::response::GatewayResponse;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Envelope {
    pub wrapped: bool,
    pub camel_case: bool,
}

impl Envelope {
    pub fn for_definition(definition: &Definition) -> Self {
        Self {
            wrapped: definition.wrapped,
            camel_case: definition.camel_case,
        }
    }

    pub fn success(&self, payload: Value) -> GatewayResponse {
        let status = StatusCode::OK;
        let body = if self.wrapped {
            self.wrap(status, payload)
        } else {
            payload
        };
        GatewayResponse::json(status, body)
    }

    /// `{"Error": <reason>, "TrackingCode": <id>}`; the tracking code is
    /// omitted when `tracking` is `None`.
    pub fn error(&self, status: StatusCode, tracking: Option<&str>) -> GatewayResponse {
        let mut error = Map::new();
        error.insert(
            self.key("Error"),
            Value::String(status.canonical_reason().unwrap_or("Error").to_string()),
        );
        if let Some(id) = tracking {
            error.insert(self.key("TrackingCode"), Value::String(id.to_string()));
        }

        let body = if self.wrapped {
            self.wrap(status, Value::Object(error))
        } else {
            Value::Object(error)
        };
        GatewayResponse::json(status, body)
    }

    fn wrap(&self, status: StatusCode, payload: Value) -> Value {
        let mut envelope = Map::new();
        envelope.insert(self.key("Status"), Value::from(status.as_u16()));
        envelope.insert(
            self.key("Timestamp"),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        envelope.insert(self.key("Response"), payload);
        Value::Object(envelope)
    }

    fn key(&self, name: &str) -> String {
        if self.camel_case {
            name.to_lower_camel_case()
        } else {
            name.to_string()
        }
    }
}
