//! HTTP edge.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum catch-all, request id, trace, timeout)
//!     → RouteTable snapshot lookup
//!     → request.rs (RequestContext: query, route values, headers, body)
//!     → endpoint handler
//!     → response.rs (GatewayResponse → axum Response)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestContext, X_REQUEST_ID};
pub use response::{GatewayResponse, ResponseBody};
pub use server::{AppState, GatewayServer};
