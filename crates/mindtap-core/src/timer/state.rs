//! The per-site timer state machine.
//!
//! ```text
//! Idle --start--> Running --stop--------> Idle   (no log entry)
//!                 Running --snooze------> Running (window restarts in full)
//!                 Running --expiry------> Idle   (Completed transition, logged)
//! ```
//!
//! The state is an explicit sum type so a half-initialized timer (a start time
//! with no duration, say) cannot exist. Completion and stop are reported as
//! [`Transition`]s carrying the final record; the resulting state is always
//! `Idle` because cleanup happens immediately.
//!
//! All operations take `now` as a parameter; nothing here reads the clock.

use serde::{Deserialize, Serialize};

use super::record::{Purpose, TimerRecord, TimerStatus};

/// Minutes added by a snooze.
pub const SNOOZE_EXTRA_MINUTES: u64 = 5;

/// Timer state for one site. Maps 1:1 onto the store: `Running` iff a record
/// is present under the site's key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteTimer {
    Idle,
    Running(TimerRecord),
}

/// What a state-machine operation did. Consumers use this to decide which
/// side effects to run (persist, log, notify).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Started(TimerRecord),
    Snoozed(TimerRecord),
    Stopped(TimerRecord),
    Completed(TimerRecord),
    Noop,
}

impl SiteTimer {
    pub fn from_record(record: Option<TimerRecord>) -> Self {
        match record {
            Some(r) => SiteTimer::Running(r),
            None => SiteTimer::Idle,
        }
    }

    pub fn record(&self) -> Option<&TimerRecord> {
        match self {
            SiteTimer::Running(r) => Some(r),
            SiteTimer::Idle => None,
        }
    }

    pub fn into_record(self) -> Option<TimerRecord> {
        match self {
            SiteTimer::Running(r) => Some(r),
            SiteTimer::Idle => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SiteTimer::Idle)
    }

    /// Start a timer, replacing any current run.
    pub fn start(self, purpose: Purpose, mins: u64, now: u64) -> (Self, Transition) {
        let record = TimerRecord::new(purpose, mins, now);
        (SiteTimer::Running(record), Transition::Started(record))
    }

    /// Extend the run by `extra_mins` and restart the full window from `now`.
    /// This is deliberate: a snooze grants the whole new duration from the
    /// moment of snoozing, not merely a later deadline.
    pub fn snooze(self, extra_mins: u64, now: u64) -> (Self, Transition) {
        match self {
            SiteTimer::Running(mut record) => {
                record.mins = record.mins.saturating_add(extra_mins);
                record.start_time = now;
                (SiteTimer::Running(record), Transition::Snoozed(record))
            }
            SiteTimer::Idle => (SiteTimer::Idle, Transition::Noop),
        }
    }

    /// User-initiated stop. Idempotent: stopping an idle site is a no-op.
    pub fn stop(self) -> (Self, Transition) {
        match self {
            SiteTimer::Running(record) => (SiteTimer::Idle, Transition::Stopped(record)),
            SiteTimer::Idle => (SiteTimer::Idle, Transition::Noop),
        }
    }

    /// Natural expiry check. A record whose deadline has passed completes
    /// immediately; reconcilers must never schedule a negative delay.
    pub fn check_expiry(self, now: u64) -> (Self, Transition) {
        match self {
            SiteTimer::Running(record) if record.is_expired(now) => {
                (SiteTimer::Idle, Transition::Completed(record))
            }
            other => (other, Transition::Noop),
        }
    }

    pub fn status(&self, now: u64) -> TimerStatus {
        match self {
            SiteTimer::Running(record) => TimerStatus::of(record, now),
            SiteTimer::Idle => TimerStatus::inactive(),
        }
    }
}
