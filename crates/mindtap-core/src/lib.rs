//! # MindTap Core Library
//!
//! Core logic for MindTap, a nudge tool that runs a per-site countdown timer
//! while you browse distracting sites. The original surfaces (on-page widget,
//! popup) are thin presentation layers over this library; the CLI binary and
//! the coordinator daemon exercise the same paths through the same store.
//!
//! ## Architecture
//!
//! - **Timer state machine**: an explicit `Idle`/`Running` sum type operating
//!   on wall-clock epoch milliseconds, with `now` passed in by the caller
//! - **Store**: shared key-value state (timers, completion log, points) with
//!   last-write-wins semantics and a broadcast change feed
//! - **Coordinator**: a single cooperative task owning all scheduled wake-ups,
//!   reconciling them against the persisted timer map on every change
//! - **Sync protocol**: single-shot request/response plus fire-and-forget
//!   pushes to widget tabs; the widget's own poll loop is the fallback
//!
//! ## Key Components
//!
//! - [`SiteTimer`]: timer state machine
//! - [`Store`]: persistence and change feed
//! - [`Coordinator`]: scheduling and side effects
//! - [`SiteClassifier`]: distracting-site pattern matching

pub mod classifier;
pub mod coordinator;
pub mod error;
pub mod platform;
pub mod protocol;
pub mod storage;
pub mod timer;

pub use classifier::SiteClassifier;
pub use coordinator::{Coordinator, ReminderPolicy};
pub use error::{ConfigError, CoreError, StoreError};
pub use platform::{Notification, NotificationAction, Notifier, Tab, TabEvent, TabHost};
pub use protocol::{CoordinatorClient, Envelope, Request, Response, WidgetPush};
pub use storage::{Config, Store, StoreChange, WidgetPosition};
pub use timer::{
    now_ms, CompletionLogEntry, Purpose, SiteTimer, TimerRecord, TimerStatus, Transition,
};
