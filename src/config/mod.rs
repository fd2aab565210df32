//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gateway.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!
//! Definition directory:
//!     watcher.rs detects file changes
//!     → FileEvent (Modified / Deleted) over mpsc
//!     → RouteRegistry reconciles the route table
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only definitions hot-reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthenticatorConfig, DefinitionsConfig, GatewayConfig, ListenerConfig, ObservabilityConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::{DefinitionWatcher, FileEvent, WatchError};
