//! Named endpoint loggers.

use serde_json::Value;

use crate::definition::Severity;

/// Log sink a definition names with `logs <name>`.
pub trait EndpointLogger: Send + Sync {
    fn log(&self, severity: Severity, message: &str, payload: &Value);

    fn verbose(&self, message: &str, payload: &Value) {
        self.log(Severity::Verbose, message, payload);
    }

    fn debug(&self, message: &str, payload: &Value) {
        self.log(Severity::Debug, message, payload);
    }

    fn information(&self, message: &str, payload: &Value) {
        self.log(Severity::Information, message, payload);
    }

    fn warning(&self, message: &str, payload: &Value) {
        self.log(Severity::Warning, message, payload);
    }

    fn error(&self, message: &str, payload: &Value) {
        self.log(Severity::Exception, message, payload);
    }
}

/// Forwards endpoint log calls to `tracing`.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    name: String,
}

impl TracingLogger {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl EndpointLogger for TracingLogger {
    fn log(&self, severity: Severity, message: &str, payload: &Value) {
        let logger = self.name.as_str();
        match severity {
            Severity::Verbose => tracing::trace!(logger, %payload, "{message}"),
            Severity::Debug => tracing::debug!(logger, %payload, "{message}"),
            Severity::Information => tracing::info!(logger, %payload, "{message}"),
            Severity::Warning => tracing::warn!(logger, %payload, "{message}"),
            Severity::Exception => tracing::error!(logger, %payload, "{message}"),
        }
    }
}
