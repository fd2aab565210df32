//! Result shaping.
//!
//! # Data Flow
//! ```text
//! flat records (backend)
//!     → group.rs (GroupNode tree, one level per `group` entry)
//!     → render.rs (Shaped tree, rename/exclude, wire JSON)
//! ```

pub mod error;
pub mod group;
pub mod record;
pub mod render;

pub use error::{ShapingError, ShapingResult};
pub use group::{group_levels, Bucket, GroupKey, GroupNode};
pub use record::{record, value_text, Record};
pub use render::{ResponseShaper, Shaped, ShapedGroup};
