//! Declarative API gateway library.

// Definition language and compiled endpoints
pub mod definition;
pub mod handlers;
pub mod shaping;

// Route registry and HTTP edge
pub mod http;
pub mod registry;

// Cross-cutting concerns
pub mod collaborators;
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::schema::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use registry::RouteRegistry;
