//! Endpoint handlers.
//!
//! # Data Flow
//! ```text
//! Definition
//!     → factory.rs (resolve collaborators, pick handler by provider)
//!     → sql.rs / document.rs / cache.rs / outbound.rs
//!
//! Per request:
//!     endpoint.rs (auth, parameters, envelopes)
//!     → template.rs (@name substitution)
//!     → backend collaborator
//!     → shaping (group, render) → envelope.rs
//! ```
//!
//! # Design Decisions
//! - Handlers never panic or propagate errors: every outcome is a response
//! - `suspend` releases background work before a handler is dropped

pub mod cache;
pub mod document;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod factory;
pub mod outbound;
pub mod params;
pub mod snapshot;
pub mod sql;
pub mod template;

use std::sync::Arc;

use async_trait::async_trait;

use crate::definition::Definition;
use crate::http::request::RequestContext;
use crate::http::response::GatewayResponse;

pub use envelope::Envelope;
pub use error::{BuildError, BuildResult};
pub use factory::DefinitionHandlerFactory;

/// A compiled endpoint.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: RequestContext) -> GatewayResponse;

    /// Release background resources. Called once before the handler is
    /// replaced or removed.
    fn suspend(&self) {}
}

/// Turns definitions into handlers.
pub trait HandlerFactory: Send + Sync {
    fn build(&self, definition: Arc<Definition>) -> BuildResult<Arc<dyn Handler>>;
}
