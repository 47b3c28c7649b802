//! Usage accounting: live session counters and the persisted query history.

pub mod logger;
pub mod reporter;
pub mod tracker;

pub use logger::{QueryLog, QueryLogEntry};
pub use tracker::{UsageStats, UsageTracker};
