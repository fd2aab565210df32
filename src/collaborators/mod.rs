//! External collaborators consumed by endpoint handlers.
//!
//! # Data Flow
//! ```text
//! GatewayConfig
//!     → GatewayContext::from_config (connections, authenticators, loggers,
//!       cache, outbound client, scheduler)
//!     → embedder adds SQL / document executors
//!     → DefinitionHandlerFactory resolves names against the context
//! ```
//!
//! # Design Decisions
//! - No global registries: everything a handler needs is passed in here
//! - Each seam is a trait object so tests swap in fakes

pub mod auth;
pub mod backends;
pub mod connections;
pub mod error;
pub mod logger;
pub mod outbound;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GatewayConfig;
use crate::lifecycle::scheduler::{Scheduler, TokioScheduler};

pub use auth::{AuthOutcome, Authenticator, StaticTokenAuthenticator};
pub use backends::{
    CacheStore, DocumentExecutor, DocumentRequest, InMemoryCache, OutboundExecutor,
    OutboundRequest, OutboundResponse, SqlExecutor, SqlRequest,
};
pub use connections::{ConnectionRegistry, StaticConnections};
pub use error::{BackendError, BackendResult};
pub use logger::{EndpointLogger, TracingLogger};
pub use outbound::HttpOutbound;

/// Everything handlers may call out to.
#[derive(Clone)]
pub struct GatewayContext {
    pub connections: Arc<dyn ConnectionRegistry>,
    pub authenticators: HashMap<String, Arc<dyn Authenticator>>,
    pub loggers: HashMap<String, Arc<dyn EndpointLogger>>,
    pub sql: Option<Arc<dyn SqlExecutor>>,
    pub documents: Option<Arc<dyn DocumentExecutor>>,
    pub cache: Arc<dyn CacheStore>,
    pub outbound: Arc<dyn OutboundExecutor>,
    pub scheduler: Arc<dyn Scheduler>,
}

impl GatewayContext {
    /// Context with no connections, authenticators or loggers.
    pub fn new(outbound: Arc<dyn OutboundExecutor>) -> Self {
        Self {
            connections: Arc::new(StaticConnections::default()),
            authenticators: HashMap::new(),
            loggers: HashMap::new(),
            sql: None,
            documents: None,
            cache: Arc::new(InMemoryCache::new()),
            outbound,
            scheduler: Arc::new(TokioScheduler),
        }
    }

    /// Built-in collaborators wired from configuration.
    pub fn from_config(config: &GatewayConfig) -> BackendResult<Self> {
        let outbound = HttpOutbound::new(Duration::from_secs(config.timeouts.outbound_secs))?;
        let mut context = Self::new(Arc::new(outbound))
            .with_connections(Arc::new(StaticConnections::new(config.connections.clone())));

        for (name, auth) in &config.authenticators {
            context = context.with_authenticator(
                name,
                Arc::new(StaticTokenAuthenticator::new(&auth.header, auth.tokens.clone())),
            );
        }
        for name in &config.loggers {
            context = context.with_logger(name, Arc::new(TracingLogger::new(name)));
        }
        Ok(context)
    }

    pub fn with_connections(mut self, connections: Arc<dyn ConnectionRegistry>) -> Self {
        self.connections = connections;
        self
    }

    pub fn with_authenticator(mut self, name: &str, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticators.insert(name.to_string(), authenticator);
        self
    }

    pub fn with_logger(mut self, name: &str, logger: Arc<dyn EndpointLogger>) -> Self {
        self.loggers.insert(name.to_string(), logger);
        self
    }

    pub fn with_sql(mut self, executor: Arc<dyn SqlExecutor>) -> Self {
        self.sql = Some(executor);
        self
    }

    pub fn with_documents(mut self, executor: Arc<dyn DocumentExecutor>) -> Self {
        self.documents = Some(executor);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Resolve a connection name or fail the request.
    pub fn connection(&self, name: &str) -> BackendResult<String> {
        self.connections
            .resolve(name)
            .ok_or_else(|| BackendError::UnknownConnection(name.to_string()))
    }
}
