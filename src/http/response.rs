//! Handler responses.
//!
//! # Responsibilities
//! - Represent a handler result independently of axum
//! - Convert into an axum response at the edge
//!
//! # Design Decisions
//! - JSON bodies stay as `serde_json::Value` until the edge, so tests can
//!   inspect them without reparsing
//! - Raw bodies (outbound pass-through) keep the upstream content type

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    Json(Value),
    Raw {
        content_type: Option<String>,
        bytes: Bytes,
    },
}

/// Result of one handler invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub body: ResponseBody,
}

impl GatewayResponse {
    pub fn json(status: StatusCode, value: Value) -> Self {
        Self {
            status,
            body: ResponseBody::Json(value),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: ResponseBody::Empty,
        }
    }

    pub fn raw(status: StatusCode, content_type: Option<String>, bytes: Bytes) -> Self {
        Self {
            status,
            body: ResponseBody::Raw {
                content_type,
                bytes,
            },
        }
    }

    /// The JSON body, if any.
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl IntoResponse for GatewayResponse {
    fn into_response(self) -> Response {
        match self.body {
            ResponseBody::Empty => self.status.into_response(),
            ResponseBody::Json(value) => (self.status, axum::Json(value)).into_response(),
            ResponseBody::Raw {
                content_type,
                bytes,
            } => {
                let mut response = (self.status, Body::from(bytes)).into_response();
                if let Some(ct) = content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
                    response.headers_mut().insert(header::CONTENT_TYPE, ct);
                }
                response
            }
        }
    }
}
