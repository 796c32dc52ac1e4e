//! Per-task coordination shared by every step of one run.

pub mod cache;
pub mod progress;
pub mod step_handler;

pub use cache::{fingerprint, CacheError, CacheStats, CachedRow, InMemoryCache, ResultCache};
pub use progress::StepProgress;
pub use step_handler::{LogEntry, StepHandler};
