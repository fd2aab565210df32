//! HTTP server setup and dispatch.
//!
//! # Responsibilities
//! - Create the axum Router with one catch-all route
//! - Wire up middleware (request id, trace, timeout)
//! - Match each request against the current route table snapshot
//! - Buffer the body and hand a [`RequestContext`] to the handler
//!
//! # Design Decisions
//! - The table snapshot is taken once per request; a reload during the
//!   request does not affect it
//! - Unmatched requests never read the body

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ListenerConfig, TimeoutConfig};
use crate::http::request::{RequestContext, X_REQUEST_ID};
use crate::observability::metrics;
use crate::registry::RouteRegistry;

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RouteRegistry>,
    pub max_body_bytes: usize,
}

/// HTTP front end for the route registry.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    pub fn new(registry: Arc<RouteRegistry>, listener: &ListenerConfig, timeouts: &TimeoutConfig) -> Self {
        let state = AppState {
            registry,
            max_body_bytes: listener.max_body_bytes,
        };
        Self {
            router: Self::build_router(state, Duration::from_secs(timeouts.request_secs)),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(request_timeout)),
            )
    }

    /// The configured router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` resolves, then drain.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let started = Instant::now();
    let (parts, body) = request.into_parts();
    let method = parts.method.clone();
    let path = parts.uri.path().to_string();
    let request_id = parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let table = state.registry.snapshot();
    let Some(matched) = table.find(&method, &path) else {
        tracing::debug!(method = %method, path = %path, "No route matched");
        metrics::record_request(method.as_str(), 404, "none", started);
        return (StatusCode::NOT_FOUND, axum::Json(json!({ "Error": "Not Found" }))).into_response();
    };
    let route = matched.entry.template.as_str().to_string();

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Request body rejected");
            metrics::record_request(method.as_str(), 413, &route, started);
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                axum::Json(json!({ "Error": "Payload Too Large" })),
            )
                .into_response();
        }
    };

    let mut context = RequestContext::new(method.clone(), path)
        .with_query_string(parts.uri.query().unwrap_or_default())
        .with_route_values(matched.route_values)
        .with_headers(parts.headers)
        .with_body(body);
    if let Some(id) = request_id {
        context = context.with_request_id(id);
    }

    let response = matched.entry.handler.handle(context).await;
    metrics::record_request(method.as_str(), response.status.as_u16(), &route, started);
    response.into_response()
}
