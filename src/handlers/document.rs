//! `data-source mongodb` endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::collaborators::{BackendError, DocumentExecutor, DocumentRequest, GatewayContext};
use crate::definition::DocumentProvider;
use crate::handlers::endpoint::Endpoint;
use crate::handlers::params::Parameters;
use crate::handlers::template::{substitute, Quoting};
use crate::handlers::Handler;
use crate::http::request::RequestContext;
use crate::http::response::GatewayResponse;

pub struct DocumentHandler {
    endpoint: Endpoint,
    provider: DocumentProvider,
    executor: Arc<dyn DocumentExecutor>,
    context: GatewayContext,
}

impl DocumentHandler {
    pub fn new(
        endpoint: Endpoint,
        provider: DocumentProvider,
        executor: Arc<dyn DocumentExecutor>,
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

/// Substitute parameters into the query and prepend the `_id` projection.
pub fn pipeline(query: &str, params: &Parameters) -> Result<Vec<Value>, BackendError> {
    let text = substitute(query, params, Quoting::Json);
    let stages: Vec<Value> = if text.trim().is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(&text).map_err(|e| BackendError::InvalidQuery(e.to_string()))?
    };

    let mut pipeline = Vec::with_capacity(stages.len() + 1);
    pipeline.push(json!({ "$project": { "_id": 0 } }));
    pipeline.extend(stages);
    Ok(pipeline)
}

#[async_trait]
impl Handler for DocumentHandler {
    async fn handle(&self, request: RequestContext) -> GatewayResponse {
        if let Err(response) = self.endpoint.authorize(&request).await {
            return response;
        }
        let params = match self.endpoint.parameters(&request, self.provider.use_body) {
            Ok(p) => p,
            Err(response) => return response,
        };

        let prepared = pipeline(&self.provider.query, &params).and_then(|pipeline| {
            Ok(DocumentRequest {
                connection_string: self.context.connection(&self.provider.connection)?,
                database: self.provider.database.clone(),
                collection: self.provider.collection.clone(),
                pipeline,
            })
        });
        let aggregate = match prepared {
            Ok(a) => a,
            Err(e) => return self.endpoint.backend_failure(&request, &e),
        };

        match self.executor.aggregate(aggregate).await {
            Ok(documents) if documents.is_empty() => self.endpoint.empty(StatusCode::NOT_FOUND),
            Ok(documents) if self.endpoint.definition().output.groups.is_empty() => {
                self.endpoint.post_processed(Value::Array(documents))
            }
            Ok(documents) => {
                let records = documents
                    .into_iter()
                    .map(|d| match d {
                        Value::Object(fields) => Ok(fields),
                        other => Err(other),
                    })
                    .collect::<Result<Vec<_>, _>>();
                match records {
                    Ok(records) => self.endpoint.shape(&request, records),
                    Err(_) => {
                        let e = BackendError::Execution("grouping needs object documents".to_string());
                        self.endpoint.backend_failure(&request, &e)
                    }
                }
            }
            Err(e) => self.endpoint.backend_failure(&request, &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::params::ParamValue;

    #[test]
    fn test_pipeline_prepends_projection() {
        let mut params = Parameters::default();
        params.insert("city", ParamValue::Text("Oslo".into()));

        let stages = pipeline(r#"[{"$match":{"city":@city}}]"#, &params).unwrap();
        assert_eq!(
            stages,
            vec![
                json!({"$project": {"_id": 0}}),
                json!({"$match": {"city": "Oslo"}})
            ]
        );
    }

    #[test]
    fn test_pipeline_rejects_non_array() {
        let err = pipeline(r#"{"$match":{}}"#, &Parameters::default()).unwrap_err();
        assert!(matches!(err, BackendError::InvalidQuery(_)));
    }
}
