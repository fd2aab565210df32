//! Endpoint definition language.
//!
//! # Data Flow
//! ```text
//! definition file lines
//!     → cursor.rs (shared position, block boundaries)
//!     → parser.rs (top-level directives)
//!     → provider.rs (data-source blocks, output rules)
//!     → Definition (immutable)
//! ```
//!
//! # Design Decisions
//! - Nested blocks share one cursor; each block consumes through its own `end`
//! - Providers are a tagged union, dispatched on the variant
//! - A failed parse rejects the whole file and nothing else

pub mod cursor;
pub mod error;
pub mod parser;
pub mod provider;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use parser::DefinitionParser;
pub use provider::ProviderBuilder;
pub use types::{
    Authentication, BrokerProvider, CacheProvider, CommandType, Definition, DocumentProvider,
    GroupLevel, LogTarget, OutboundProvider, OutputRules, Provider, RefreshTask, Severity,
    SqlProvider,
};
