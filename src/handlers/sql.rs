//! `data-source mssql` endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::collaborators::{GatewayContext, SqlExecutor, SqlRequest};
use crate::definition::SqlProvider;
use crate::handlers::endpoint::Endpoint;
use crate::handlers::params::Parameters;
use crate::handlers::Handler;
use crate::http::request::RequestContext;
use crate::http::response::GatewayResponse;

pub struct SqlHandler {
    endpoint: Endpoint,
    provider: SqlProvider,
    executor: Arc<dyn SqlExecutor>,
    context: GatewayContext,
}

impl SqlHandler {
    pub fn new(
        endpoint: Endpoint,
        provider: SqlProvider,
        executor: Arc<dyn SqlExecutor>,
        context: GatewayContext,
    ) -> Self {
        Self {
            endpoint,
            provider,
            executor,
            context,
        }
    }
}

/// Bind each `param name=source` to the merged parameter `source`. Sources
/// absent from the request are left unbound.
pub fn bind(provider: &SqlProvider, params: &Parameters) -> Vec<(String, serde_json::Value)> {
    provider
        .parameters
        .iter()
        .filter_map(|(name, source)| params.get(source).map(|v| (name.clone(), v.to_json())))
        .collect()
}

#[async_trait]
impl Handler for SqlHandler {
    async fn handle(&self, request: RequestContext) -> GatewayResponse {
        if let Err(response) = self.endpoint.authorize(&request).await {
            return response;
        }
        let params = match self.endpoint.parameters(&request, self.provider.use_body) {
            Ok(p) => p,
            Err(response) => return response,
        };

        let connection_string = match self.context.connection(&self.provider.connection) {
            Ok(c) => c,
            Err(e) => return self.endpoint.backend_failure(&request, &e),
        };

        let sql = SqlRequest {
            connection_string,
            command: self.provider.command.clone(),
            command_type: self.provider.command_type,
            parameters: bind(&self.provider, &params),
        };

        match self.executor.execute(sql).await {
            Ok(rows) if rows.is_empty() => self.endpoint.empty(StatusCode::NOT_FOUND),
            Ok(rows) => self.endpoint.shape(&request, rows),
            Err(e) => self.endpoint.backend_failure(&request, &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::params::ParamValue;
    use serde_json::json;

    #[test]
    fn test_bind_skips_absent_sources() {
        let provider = SqlProvider {
            parameters: vec![
                ("@id".into(), "customerId".into()),
                ("@limit".into(), "limit".into()),
            ],
            ..SqlProvider::default()
        };
        let mut params = Parameters::default();
        params.insert("CustomerId", ParamValue::Text("9".into()));

        assert_eq!(bind(&provider, &params), vec![("@id".to_string(), json!("9"))]);
    }
}
