//! Builds live handlers from definitions.

use std::sync::Arc;

use axum::http::Method;

use crate::collaborators::GatewayContext;
use crate::definition::{Definition, Provider};
use crate::handlers::cache::CacheHandler;
use crate::handlers::document::DocumentHandler;
use crate::handlers::endpoint::Endpoint;
use crate::handlers::error::{BuildError, BuildResult};
use crate::handlers::outbound::OutboundHandler;
use crate::handlers::sql::SqlHandler;
use crate::handlers::{Handler, HandlerFactory};

/// Parse a definition's method text.
pub fn parse_method(text: &str) -> BuildResult<Method> {
    Method::from_bytes(text.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| BuildError::InvalidMethod(text.to_string()))
}

/// Resolves each definition against a [`GatewayContext`] and dispatches on
/// the provider variant.
pub struct DefinitionHandlerFactory {
    context: GatewayContext,
}

impl DefinitionHandlerFactory {
    pub fn new(context: GatewayContext) -> Self {
        Self { context }
    }
}

impl HandlerFactory for DefinitionHandlerFactory {
    fn build(&self, definition: Arc<Definition>) -> BuildResult<Arc<dyn Handler>> {
        let context = self.context.clone();

        let handler: Arc<dyn Handler> = match &definition.provider {
            Provider::Sql(sql) => {
                let executor = context.sql.clone().ok_or(BuildError::MissingExecutor("sql"))?;
                let provider = sql.clone();
                Arc::new(SqlHandler::new(
                    Endpoint::new(definition, &context)?,
                    provider,
                    executor,
                    context,
                ))
            }
            Provider::Document(document) => {
                let executor = context
                    .documents
                    .clone()
                    .ok_or(BuildError::MissingExecutor("document"))?;
                let provider = document.clone();
                Arc::new(DocumentHandler::new(
                    Endpoint::new(definition, &context)?,
                    provider,
                    executor,
                    context,
                ))
            }
            Provider::Cache(cache) => {
                let provider = cache.clone();
                let endpoint = Endpoint::new(definition, &context)?;
                Arc::new(CacheHandler::new(endpoint, provider, context)?)
            }
            Provider::Outbound(outbound) => {
                let provider = outbound.clone();
                let method = parse_method(&provider.method)?;
                Arc::new(OutboundHandler::new(
                    Endpoint::new(definition, &context)?,
                    provider,
                    method,
                    context,
                ))
            }
            Provider::Broker(_) => return Err(BuildError::UnsupportedProvider("broker")),
        };
        Ok(handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{BackendResult, OutboundExecutor, OutboundRequest, OutboundResponse};
    use crate::definition::DefinitionParser;
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl OutboundExecutor for Unreachable {
        async fn send(&self, _request: OutboundRequest) -> BackendResult<OutboundResponse> {
            Err(crate::collaborators::BackendError::Transport("unreachable".into()))
        }
    }

    fn build(text: &str) -> BuildResult<Arc<dyn Handler>> {
        let factory = DefinitionHandlerFactory::new(GatewayContext::new(Arc::new(Unreachable)));
        let definition = DefinitionParser::new().parse_str(text).unwrap();
        factory.build(Arc::new(definition))
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!(parse_method("get").unwrap(), Method::GET);
        assert!(parse_method("NOT A METHOD").is_err());
    }

    #[test]
    fn test_missing_collaborators() {
        let sql = "create a\nmethod GET\ndata-source mssql\nconnection main\ncommand select 1\nend";
        assert_eq!(build(sql).err(), Some(BuildError::MissingExecutor("sql")));

        let auth = "create a\nmethod GET\nauthentication partners\ndata-source route\nurl http://x\nmethod GET\nend";
        assert_eq!(
            build(auth).err(),
            Some(BuildError::UnknownAuthenticator("partners".into()))
        );

        let broker = "create a\nmethod GET\ndata-source broker\nend";
        assert_eq!(build(broker).err(), Some(BuildError::UnsupportedProvider("broker")));
    }

    #[test]
    fn test_route_definition_builds() {
        let text = "create a\nmethod GET\ndata-source route\nurl http://x/@id\nmethod post\nend";
        assert!(build(text).is_ok());
    }
}
