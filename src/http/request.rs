//! Incoming request as seen by endpoint handlers.
//!
//! # Responsibilities
//! - Carry the request id assigned at the edge
//! - Hold the decoded query pairs, captured route values, headers and the
//!   buffered body
//!
//! # Design Decisions
//! - The body is buffered once at the edge; handlers never stream
//! - Query pairs keep their order and duplicates; merging is a handler concern

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};

/// Header carrying the request id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// One request routed to a definition handler.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub route_values: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            method,
            path: path.into(),
            query: Vec::new(),
            route_values: Vec::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    /// Decode a raw `a=1&b=2` query string.
    pub fn with_query_string(mut self, raw: &str) -> Self {
        self.query = url::form_urlencoded::parse(raw.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        self
    }

    pub fn with_route_values(mut self, values: Vec<(String, String)>) -> Self {
        self.route_values = values;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Add one header; invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Whether the body is declared as JSON.
    pub fn has_json_body(&self) -> bool {
        self.header(header::CONTENT_TYPE.as_str())
            .map(|ct| ct.to_ascii_lowercase().starts_with("application/json"))
            .unwrap_or(false)
    }

    /// Whether the client accepts a JSON response.
    pub fn accepts_json(&self) -> bool {
        self.headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.to_ascii_lowercase().contains("application/json"))
    }
}
