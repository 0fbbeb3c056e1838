//! Timer records and derived status.
//!
//! A `TimerRecord` exists for a site iff a timer is active (or expired but not
//! yet reconciled) for that site; absence means idle. Field names mirror the
//! persisted layout (`startTime`, `mins`) so existing store files keep working.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the user said the visit is for. Work visits award points at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    Work,
    Fun,
}

/// One active timer, keyed by hostname in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRecord {
    /// Epoch milliseconds when the current run began.
    #[serde(rename = "startTime")]
    pub start_time: u64,
    /// Minutes allotted for this run. Snooze mutates this in place.
    pub mins: u64,
    pub purpose: Purpose,
}

impl TimerRecord {
    pub fn new(purpose: Purpose, mins: u64, now: u64) -> Self {
        Self {
            start_time: now,
            mins,
            purpose,
        }
    }

    /// Allotted window in milliseconds. Saturating to tolerate absurd inputs.
    pub fn total_ms(&self) -> u64 {
        self.mins.saturating_mul(60).saturating_mul(1000)
    }

    pub fn deadline_ms(&self) -> u64 {
        self.start_time.saturating_add(self.total_ms())
    }

    pub fn elapsed_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.start_time)
    }

    pub fn remaining_ms(&self, now: u64) -> u64 {
        self.deadline_ms().saturating_sub(now)
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.deadline_ms()
    }
}

/// Append-only record of one completed (naturally expired) timer.
/// Stopped timers are never logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionLogEntry {
    pub site: String,
    pub purpose: Purpose,
    pub mins: u64,
    pub timestamp: DateTime<Utc>,
}

impl CompletionLogEntry {
    pub fn new(site: &str, record: &TimerRecord) -> Self {
        Self {
            site: site.to_string(),
            purpose: record.purpose,
            mins: record.mins,
            timestamp: Utc::now(),
        }
    }
}

/// The `check_timer` answer: what a widget or popup should display.
///
/// An expired-but-not-yet-reconciled record reads as inactive; cleaning it up
/// is the coordinator's job, not the querying caller's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStatus {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl TimerStatus {
    pub fn inactive() -> Self {
        Self {
            active: false,
            remaining: None,
            total: None,
        }
    }

    pub fn of(record: &TimerRecord, now: u64) -> Self {
        if record.is_expired(now) {
            return Self::inactive();
        }
        Self {
            active: true,
            remaining: Some(record.remaining_ms(now)),
            total: Some(record.total_ms()),
        }
    }
}
