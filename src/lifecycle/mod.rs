//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Build registry → Load definitions → Start watcher → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain → Suspend handlers → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!
//! Scheduler (scheduler.rs):
//!     Periodic background jobs (cache refresh), stopped on suspend
//! ```

pub mod scheduler;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use scheduler::{Job, JobHandle, Scheduler, TokioScheduler};
pub use shutdown::Shutdown;
pub use startup::{start, Gateway, StartupError};
