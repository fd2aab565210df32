//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the handler factory and route registry from configuration
//! - Perform the initial definition load
//! - Start the directory watcher and the event pump
//! - Serve until shutdown, then release handler resources
//!
//! # Design Decisions
//! - Fail fast: an unreadable definitions root or a watcher that cannot
//!   start is fatal; a single bad definition file is not
//! - Listeners start last (traffic only when routes are loaded)

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use notify::RecommendedWatcher;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::collaborators::GatewayContext;
use crate::config::{DefinitionWatcher, GatewayConfig, WatchError};
use crate::handlers::DefinitionHandlerFactory;
use crate::http::GatewayServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::registry::{ContentProvider, FsContentProvider, RegistryOptions, RouteRegistry};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load definitions from {path}: {source}")]
    Definitions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Watch(#[from] WatchError),
}

/// A loaded gateway, ready to serve.
pub struct Gateway {
    registry: Arc<RouteRegistry>,
    server: GatewayServer,
    watcher: Option<RecommendedWatcher>,
    pump: Option<JoinHandle<()>>,
}

impl Gateway {
    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    pub fn server(&self) -> &GatewayServer {
        &self.server
    }

    /// Serve until `shutdown` fires, then stop the watcher and suspend
    /// every handler.
    pub async fn serve(self, listener: TcpListener, shutdown: &Shutdown) -> io::Result<()> {
        let result = self.server.run(listener, shutdown.notified()).await;

        shutdown.trigger();
        drop(self.watcher);
        if let Some(pump) = self.pump {
            let _ = pump.await;
        }
        self.registry.suspend_all().await;
        result
    }
}

/// Load definitions from the configured directory and wire the server.
pub async fn start(
    config: &GatewayConfig,
    context: GatewayContext,
    shutdown: &Shutdown,
) -> Result<Gateway, StartupError> {
    start_with_content(config, context, Arc::new(FsContentProvider), shutdown).await
}

pub async fn start_with_content(
    config: &GatewayConfig,
    context: GatewayContext,
    content: Arc<dyn ContentProvider>,
    shutdown: &Shutdown,
) -> Result<Gateway, StartupError> {
    let root = config.definitions.directory.clone();
    let registry = Arc::new(RouteRegistry::new(
        Arc::new(DefinitionHandlerFactory::new(context)),
        content,
        RegistryOptions::from_config(&config.definitions),
    ));

    let loaded = registry
        .load_all(&root)
        .await
        .map_err(|source| StartupError::Definitions {
            path: root.clone(),
            source,
        })?;
    tracing::info!(definitions = loaded, "Route registry ready");

    let (watcher, pump) = if config.definitions.watch {
        let (watcher, events) = DefinitionWatcher::new(&root, &config.definitions.extension);
        let watcher = watcher.run()?;
        let pump = tokio::spawn(Arc::clone(&registry).run(events, shutdown.subscribe()));
        tracing::info!(root = %root.display(), "Watching definitions for changes");
        (Some(watcher), Some(pump))
    } else {
        (None, None)
    };

    let server = GatewayServer::new(Arc::clone(&registry), &config.listener, &config.timeouts);

    Ok(Gateway {
        registry,
        server,
        watcher,
        pump,
    })
}
