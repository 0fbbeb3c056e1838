//! Per-site timer records and the timer state machine.

pub mod record;
pub mod state;

pub use record::{CompletionLogEntry, Purpose, TimerRecord, TimerStatus};
pub use state::{SiteTimer, Transition, SNOOZE_EXTRA_MINUTES};

/// Wall clock in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
