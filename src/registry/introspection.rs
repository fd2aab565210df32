//! Synthetic route listing every published definition route.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use serde_json::{json, Value};

use crate::handlers::{BuildResult, Envelope, Handler};
use crate::http::request::RequestContext;
use crate::http::response::GatewayResponse;
use crate::registry::table::{RouteEntry, RouteTemplate};

/// Serves a fixed listing captured when its table was published.
pub struct IntrospectionHandler {
    routes: Value,
}

impl IntrospectionHandler {
    pub fn new<'a>(entries: impl IntoIterator<Item = &'a Arc<RouteEntry>>) -> Self {
        let routes = entries
            .into_iter()
            .map(|e| json!({ "template": e.template.as_str(), "method": e.method.as_str() }))
            .collect();
        Self {
            routes: Value::Array(routes),
        }
    }
}

#[async_trait]
impl Handler for IntrospectionHandler {
    async fn handle(&self, _request: RequestContext) -> GatewayResponse {
        Envelope {
            wrapped: true,
            camel_case: true,
        }
        .success(self.routes.clone())
    }
}

/// The `GET <route>` entry listing `entries`.
pub fn introspection_entry<'a>(
    route: &str,
    entries: impl IntoIterator<Item = &'a Arc<RouteEntry>>,
) -> BuildResult<Arc<RouteEntry>> {
    Ok(Arc::new(RouteEntry {
        source: None,
        template: RouteTemplate::parse(route)?,
        method: Method::GET,
        handler: Arc::new(IntrospectionHandler::new(entries)),
    }))
}
