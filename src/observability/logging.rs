//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the process-wide `tracing` subscriber
//! - Gate per-definition log calls on the definition's severity threshold
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - JSON format for production, pretty format for development
//! - Per-definition logging is separate from process logging: it goes to a
//!   named [`EndpointLogger`] and is silent unless a threshold is configured

use std::sync::Arc;

use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::collaborators::EndpointLogger;
use crate::config::ObservabilityConfig;
use crate::definition::Severity;

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_tracing(config: &ObservabilityConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// The logger a definition names, plus its threshold.
#[derive(Clone, Default)]
pub struct DefinitionLogger {
    logger: Option<Arc<dyn EndpointLogger>>,
    threshold: Option<Severity>,
}

impl DefinitionLogger {
    pub fn new(logger: Option<Arc<dyn EndpointLogger>>, threshold: Option<Severity>) -> Self {
        Self { logger, threshold }
    }

    /// Whether a call at `severity` would be emitted.
    pub fn permits(&self, severity: Severity) -> bool {
        self.logger.is_some() && Severity::permits(self.threshold, severity)
    }

    pub fn log(&self, severity: Severity, message: &str, payload: &Value) {
        if !self.permits(severity) {
            return;
        }
        if let Some(logger) = &self.logger {
            logger.log(severity, message, payload);
        }
    }
}

impl std::fmt::Debug for DefinitionLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinitionLogger")
            .field("enabled", &self.logger.is_some())
            .field("threshold", &self.threshold)
            .finish()
    }
}
