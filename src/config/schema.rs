//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Where endpoint definitions live and how they reload.
    pub definitions: DefinitionsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Connection name to connection string.
    pub connections: HashMap<String, String>,

    /// Static bearer-token authenticators by name.
    pub authenticators: HashMap<String, AuthenticatorConfig>,

    /// Logger names definitions may refer to.
    pub loggers: Vec<String>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest request body buffered for a handler.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Definition directory settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DefinitionsConfig {
    /// Root directory, searched recursively.
    pub directory: PathBuf,

    /// File extension without the dot.
    pub extension: String,

    /// Watch the directory and hot-reload changes.
    pub watch: bool,

    /// Read attempts for a changed file still held by its writer.
    pub reload_attempts: u32,

    /// Delay between read attempts in milliseconds.
    pub reload_delay_ms: u64,

    /// Template of the synthetic route listing all routes.
    pub introspection_route: String,
}

impl Default for DefinitionsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./definitions"),
            extension: "api".to_string(),
            watch: true,
            reload_attempts: 10,
            reload_delay_ms: 1000,
            introspection_route: "help".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Timeout for `route` provider upstream calls in seconds.
    pub outbound_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            outbound_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Emit JSON log lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "definition_gateway=info,tower_http=info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// One static bearer-token authenticator.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthenticatorConfig {
    pub tokens: Vec<String>,

    /// Header carrying the token.
    pub header: String,
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self {
            tokens: Vec::new(),
            header: "authorization".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.definitions.extension, "api");
        assert_eq!(config.definitions.reload_attempts, 10);
        assert_eq!(config.definitions.introspection_route, "help");
        assert!(config.connections.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config: GatewayConfig = toml::from_str(
            r#"
            loggers = ["audit"]

            [listener]
            bind_address = "127.0.0.1:9000"

            [definitions]
            directory = "/srv/definitions"
            watch = false

            [connections]
            main = "Server=db;Database=shop"

            [authenticators.partners]
            tokens = ["abc", "def"]
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.definitions.directory, PathBuf::from("/srv/definitions"));
        assert!(!config.definitions.watch);
        assert_eq!(config.connections["main"], "Server=db;Database=shop");
        assert_eq!(config.authenticators["partners"].tokens, vec!["abc", "def"]);
        assert_eq!(config.authenticators["partners"].header, "authorization");
        assert_eq!(config.loggers, vec!["audit"]);
    }
}
