pub mod correlation;
pub mod hook;
pub mod notify;
pub mod platform;
pub mod records;
pub mod stats;
pub mod usage;

pub use correlation::CorrelationStore;
pub use hook::{Degradation, HookOutcome, UsageHook};
pub use stats::StatsStore;
