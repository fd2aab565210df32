//! Route registry and hot reload.
//!
//! # Data Flow
//! ```text
//! definition files (content.rs, bounded read retry)
//!     → DefinitionParser → HandlerFactory
//!     → reloader.rs (serialized mutation, suspend old handlers)
//!     → table.rs (immutable RouteTable, swapped atomically)
//!     → http server dispatch (lock-free snapshot reads)
//! ```

pub mod content;
pub mod introspection;
pub mod reloader;
pub mod table;

pub use content::{ContentProvider, FsContentProvider, RetryPolicy};
pub use reloader::{RegistrationError, RegistryOptions, ReloadOutcome, RouteRegistry};
pub use table::{RouteEntry, RouteMatch, RouteTable, RouteTemplate};
