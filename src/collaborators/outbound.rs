//! reqwest-backed outbound executor.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::collaborators::backends::{OutboundExecutor, OutboundRequest, OutboundResponse};
use crate::collaborators::error::{BackendError, BackendResult};

/// Sends `route` provider calls with a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpOutbound {
    client: reqwest::Client,
}

impl HttpOutbound {
    pub fn new(timeout: Duration) -> BackendResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl OutboundExecutor for HttpOutbound {
    async fn send(&self, request: OutboundRequest) -> BackendResult<OutboundResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body.to_vec());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(OutboundResponse {
            status,
            headers,
            body: axum::body::Bytes::from(body.to_vec()),
        })
    }
}
