//! `data-source route` endpoints: forward to an upstream HTTP service.

use axum::http::StatusCode;
use async_trait::async_trait;
use serde_json::Value;

use crate::collaborators::{GatewayContext, OutboundRequest};
use crate::definition::OutboundProvider;
use crate::handlers::endpoint::Endpoint;
use crate::handlers::params::Parameters;
use crate::handlers::template::{substitute, Quoting};
use crate::handlers::Handler;
use crate::http::request::RequestContext;
use crate::http::response::GatewayResponse;

/// Request headers never forwarded upstream.
const DROPPED_HEADERS: [&str; 3] = ["host", "accept-encoding", "content-length"];

pub struct OutboundHandler {
    endpoint: Endpoint,
    provider: OutboundProvider,
    method: axum::http::Method,
    context: GatewayContext,
}

impl OutboundHandler {
    pub fn new(
        endpoint: Endpoint,
        provider: OutboundProvider,
        method: axum::http::Method,
        context: GatewayContext,
    ) -> Self {
        Self {
            endpoint,
            provider,
            method,
            context,
        }
    }

    fn build_request(&self, request: &RequestContext, params: &Parameters) -> OutboundRequest {
        let mut headers: Vec<(String, String)> = request
            .headers
            .iter()
            .filter(|(name, _)| !DROPPED_HEADERS.contains(&name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        for (name, value) in &self.provider.headers {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }

        let body = match &self.provider.body_template {
            Some(template) => Some(substitute(template, params, Quoting::Raw).into()),
            None if self.provider.use_body && !request.body.is_empty() => Some(request.body.clone()),
            None => None,
        };

        OutboundRequest {
            method: self.method.clone(),
            url: substitute(&self.provider.url, params, Quoting::Raw),
            headers,
            body,
        }
    }
}

#[async_trait]
impl Handler for OutboundHandler {
    async fn handle(&self, request: RequestContext) -> GatewayResponse {
        if let Err(response) = self.endpoint.authorize(&request).await {
            return response;
        }
        let params = match self.endpoint.parameters(&request, self.provider.use_body) {
            Ok(p) => p,
            Err(response) => return response,
        };

        let upstream = match self.context.outbound.send(self.build_request(&request, &params)).await {
            Ok(response) => response,
            Err(e) => {
                return self
                    .endpoint
                    .backend_failure_with_status(&request, &e, StatusCode::BAD_GATEWAY)
            }
        };

        let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
        if !status.is_success() {
            tracing::warn!(
                request_id = %request.request_id,
                url = %self.provider.url,
                status = upstream.status,
                "Upstream returned an error status"
            );
            return self.endpoint.failure(status, &request);
        }

        if request.accepts_json() {
            match serde_json::from_slice::<Value>(&upstream.body) {
                Ok(value) => return self.endpoint.post_processed(value),
                Err(e) => {
                    tracing::debug!(error = %e, "Upstream body is not JSON; passing through");
                }
            }
        }
        GatewayResponse::raw(
            status,
            upstream.content_type().map(str::to_string),
            upstream.body,
        )
    }
}
