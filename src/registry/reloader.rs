//! The live route registry.
//!
//! # Responsibilities
//! - Initial load of every definition under the root
//! - Apply file events: register, replace, remove, skip
//! - A removed directory takes every definition under it along
//! - Publish a fresh [`RouteTable`] after every mutation
//!
//! # Design Decisions
//! - One async mutex serializes all mutation, including the file read, so
//!   events for the same path are applied in arrival order
//! - Dispatch reads the table through `ArcSwap` and never takes the lock
//! - An old handler is suspended before the table without it is published
//! - A registered file that stops parsing is removed, not kept stale

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, Mutex};

use crate::config::watcher::has_extension;
use crate::config::{DefinitionsConfig, FileEvent};
use crate::definition::{DefinitionParser, ParseError};
use crate::handlers::factory::parse_method;
use crate::handlers::{BuildError, HandlerFactory};
use crate::observability::metrics;
use crate::registry::content::{ContentProvider, RetryPolicy};
use crate::registry::introspection::introspection_entry;
use crate::registry::table::{RouteEntry, RouteTable, RouteTemplate};

/// Why one definition file could not be registered.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("failed to read definition: {0}")]
    Read(#[from] io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// What a file event did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    Registered,
    Replaced,
    Removed,
    /// The file could not be registered and was not registered before.
    Skipped,
    /// Not a definition file, or deleted without ever being registered.
    Ignored,
}

impl ReloadOutcome {
    pub fn label(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Replaced => "replaced",
            Self::Removed => "removed",
            Self::Skipped => "skipped",
            Self::Ignored => "ignored",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegistryOptions {
    pub extension: String,
    /// `None` disables the introspection route.
    pub introspection_route: Option<String>,
    pub retry: RetryPolicy,
}

impl RegistryOptions {
    pub fn from_config(config: &DefinitionsConfig) -> Self {
        Self {
            extension: config.extension.clone(),
            introspection_route: Some(config.introspection_route.clone())
                .filter(|r| !r.trim().is_empty()),
            retry: RetryPolicy {
                attempts: config.reload_attempts.max(1),
                delay: Duration::from_millis(config.reload_delay_ms),
            },
        }
    }
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self::from_config(&DefinitionsConfig::default())
    }
}

pub struct RouteRegistry {
    table: ArcSwap<RouteTable>,
    /// Registered entries by source file.
    state: Mutex<BTreeMap<PathBuf, Arc<RouteEntry>>>,
    parser: DefinitionParser,
    factory: Arc<dyn HandlerFactory>,
    content: Arc<dyn ContentProvider>,
    options: RegistryOptions,
}

impl RouteRegistry {
    pub fn new(
        factory: Arc<dyn HandlerFactory>,
        content: Arc<dyn ContentProvider>,
        options: RegistryOptions,
    ) -> Self {
        Self {
            table: ArcSwap::from_pointee(RouteTable::default()),
            state: Mutex::new(BTreeMap::new()),
            parser: DefinitionParser::new(),
            factory,
            content,
            options,
        }
    }

    /// The table current at the time of the call.
    pub fn snapshot(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    /// Register every definition under `root` and publish them as one
    /// table. Returns the number of registered files.
    pub async fn load_all(&self, root: &Path) -> io::Result<usize> {
        let files = self.content.list(root, &self.options.extension).await?;
        let mut state = self.state.lock().await;

        for path in files {
            match self.build_entry(&path).await {
                Ok(entry) => {
                    log_registered(&path, &entry, "Registered definition");
                    metrics::record_reload(ReloadOutcome::Registered.label());
                    if let Some(old) = state.insert(path, entry) {
                        old.handler.suspend();
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipped definition");
                    metrics::record_reload(ReloadOutcome::Skipped.label());
                }
            }
        }

        self.publish(&state);
        tracing::info!(
            root = %root.display(),
            definitions = state.len(),
            "Initial definition load complete"
        );
        Ok(state.len())
    }

    /// Apply one watcher event.
    pub async fn apply(&self, event: FileEvent) -> ReloadOutcome {
        match event {
            FileEvent::Modified(path) => self.on_modified(&path).await,
            FileEvent::Deleted(path) => self.on_deleted(&path).await,
            FileEvent::DirectoryDeleted(path) => self.on_directory_deleted(&path).await,
        }
    }

    pub async fn on_modified(&self, path: &Path) -> ReloadOutcome {
        if !has_extension(path, &self.options.extension) {
            return ReloadOutcome::Ignored;
        }
        let mut state = self.state.lock().await;

        let outcome = match self.build_entry(path).await {
            Ok(entry) => {
                let replaced = state.insert(path.to_path_buf(), Arc::clone(&entry));
                match replaced {
                    Some(old) => {
                        old.handler.suspend();
                        log_registered(path, &entry, "Re-registered definition");
                        ReloadOutcome::Replaced
                    }
                    None => {
                        log_registered(path, &entry, "Registered definition");
                        ReloadOutcome::Registered
                    }
                }
            }
            Err(e) => match state.remove(path) {
                Some(old) => {
                    old.handler.suspend();
                    tracing::warn!(
                        path = %path.display(),
                        route = %old.template.as_str(),
                        method = %old.method,
                        error = %e,
                        "Definition no longer valid, removed"
                    );
                    ReloadOutcome::Removed
                }
                None => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipped definition");
                    ReloadOutcome::Skipped
                }
            },
        };

        if outcome != ReloadOutcome::Skipped {
            self.publish(&state);
        }
        metrics::record_reload(outcome.label());
        outcome
    }

    pub async fn on_deleted(&self, path: &Path) -> ReloadOutcome {
        let mut state = self.state.lock().await;
        let Some(old) = state.remove(path) else {
            return ReloadOutcome::Ignored;
        };

        old.handler.suspend();
        self.publish(&state);
        tracing::info!(
            path = %path.display(),
            route = %old.template.as_str(),
            method = %old.method,
            "Removed definition"
        );
        metrics::record_reload(ReloadOutcome::Removed.label());
        ReloadOutcome::Removed
    }

    /// Remove every definition registered from under `dir`.
    pub async fn on_directory_deleted(&self, dir: &Path) -> ReloadOutcome {
        let mut state = self.state.lock().await;
        let gone: Vec<PathBuf> = state
            .keys()
            .filter(|source| source.starts_with(dir))
            .cloned()
            .collect();
        if gone.is_empty() {
            return ReloadOutcome::Ignored;
        }

        for path in &gone {
            if let Some(old) = state.remove(path) {
                old.handler.suspend();
                tracing::info!(
                    path = %path.display(),
                    route = %old.template.as_str(),
                    method = %old.method,
                    "Removed definition"
                );
            }
        }
        self.publish(&state);
        tracing::info!(dir = %dir.display(), removed = gone.len(), "Definition directory removed");
        metrics::record_reload(ReloadOutcome::Removed.label());
        ReloadOutcome::Removed
    }

    /// Apply watcher events one at a time until the channel closes or
    /// shutdown fires.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::UnboundedReceiver<FileEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                event = events.recv() => match event {
                    Some(event) => {
                        self.apply(event).await;
                    }
                    None => break,
                },
            }
        }
        tracing::debug!("Definition event pump stopped");
    }

    /// Suspend every registered handler. The published table is left as is.
    pub async fn suspend_all(&self) {
        let state = self.state.lock().await;
        for entry in state.values() {
            entry.handler.suspend();
        }
    }

    async fn build_entry(&self, path: &Path) -> Result<Arc<RouteEntry>, RegistrationError> {
        let text = self.options.retry.read(self.content.as_ref(), path).await?;
        let definition = self.parser.parse_str(&text)?;
        let method = parse_method(&definition.method)?;
        let template = RouteTemplate::parse(&definition.route_template)?;
        // Built last: a handler may own a running job.
        let handler = self.factory.build(Arc::new(definition))?;

        Ok(Arc::new(RouteEntry {
            source: Some(path.to_path_buf()),
            template,
            method,
            handler,
        }))
    }

    /// Swap in a table holding `state` plus the introspection route.
    fn publish(&self, state: &BTreeMap<PathBuf, Arc<RouteEntry>>) {
        let mut entries: Vec<Arc<RouteEntry>> = state.values().cloned().collect();

        if let Some(route) = &self.options.introspection_route {
            match introspection_entry(route, state.values()) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::error!(route = %route, error = %e, "Invalid introspection route"),
            }
        }

        let count = entries.len();
        self.table.store(Arc::new(RouteTable::new(entries)));
        metrics::set_routes_published(count);
    }
}

fn log_registered(path: &Path, entry: &RouteEntry, message: &str) {
    tracing::info!(
        path = %path.display(),
        route = %entry.template.as_str(),
        method = %entry.method,
        "{}",
        message
    );
}
