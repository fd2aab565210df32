//! Authentication providers.
//!
//! # Responsibilities
//! - Define the [`Authenticator`] seam used by endpoint handlers
//! - Provide a static bearer-token authenticator configured from TOML

use std::collections::HashSet;

use async_trait::async_trait;

use crate::collaborators::error::BackendResult;
use crate::http::request::RequestContext;

/// Result of one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub authenticated: bool,
    pub message: String,
}

impl AuthOutcome {
    pub fn accepted() -> Self {
        Self {
            authenticated: true,
            message: String::new(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// `Err` means the provider itself failed, not that the caller was
    /// rejected.
    async fn authenticate(&self, request: &RequestContext) -> BackendResult<AuthOutcome>;
}

/// Accepts `Bearer <token>` for any configured token.
#[derive(Debug, Clone)]
pub struct StaticTokenAuthenticator {
    header: String,
    tokens: HashSet<String>,
}

impl StaticTokenAuthenticator {
    pub fn new(header: impl Into<String>, tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            header: header.into(),
            tokens: tokens.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, request: &RequestContext) -> BackendResult<AuthOutcome> {
        let Some(value) = request.header(&self.header) else {
            return Ok(AuthOutcome::rejected(format!("missing {} header", self.header)));
        };

        let token = value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))
            .unwrap_or(value)
            .trim();

        if self.tokens.contains(token) {
            Ok(AuthOutcome::accepted())
        } else {
            Ok(AuthOutcome::rejected("unknown token"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    #[tokio::test]
    async fn test_static_tokens() {
        let auth = StaticTokenAuthenticator::new("authorization", vec!["s3cret".to_string()]);

        let ok = RequestContext::new(Method::GET, "/").with_header("Authorization", "Bearer s3cret");
        assert!(auth.authenticate(&ok).await.unwrap().authenticated);

        let wrong = RequestContext::new(Method::GET, "/").with_header("Authorization", "Bearer nope");
        assert!(!auth.authenticate(&wrong).await.unwrap().authenticated);

        let missing = RequestContext::new(Method::GET, "/");
        let outcome = auth.authenticate(&missing).await.unwrap();
        assert!(!outcome.authenticated);
        assert_eq!(outcome.message, "missing authorization header");
    }
}
