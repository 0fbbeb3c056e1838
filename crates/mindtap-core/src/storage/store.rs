//! Shared key-value store with a change feed.
//!
//! Holds the timer map, the append-only completion log, the points counter,
//! and per-site widget positions under their original key names. Semantics
//! are last-write-wins with no cross-context locking: the timer map is keyed
//! by site, so writes for different sites never conflict, and same-site
//! concurrent writes are an accepted race (single user, low write rate).
//!
//! Every write to the timer map -- including the coordinator's own -- emits a
//! [`StoreChange::Timers`] on the broadcast feed, which is what drives the
//! coordinator's reconciliation. Read paths never fail: absent or malformed
//! values read as empty/zero.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::timer::{CompletionLogEntry, Purpose, SiteTimer, TimerRecord, Transition};

/// Persisted key layout. Kept verbatim from the original extension so
/// existing data files remain readable.
pub mod keys {
    pub const TIMERS: &str = "mindtap";
    pub const LOGS: &str = "mindtap_logs";
    pub const POINTS: &str = "mindtap_points";
    pub const POSITION_PREFIX: &str = "mindtap_position_";
}

/// Change notifications, one per committed write.
#[derive(Debug, Clone)]
pub enum StoreChange {
    /// The timer map was written; carries the new map. Reconcilers should
    /// still re-read the store -- queued events may be stale snapshots.
    Timers(HashMap<String, TimerRecord>),
    LogAppended(CompletionLogEntry),
    Points(u64),
    Position(String),
}

/// Widget placement, presentation-only. Persisted per hostname; core timer
/// writes must never clobber these keys.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WidgetPosition {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub minimized: bool,
}

const CHANGE_FEED_CAPACITY: usize = 64;

/// The shared store. Cloning yields another handle to the same state.
#[derive(Debug, Clone)]
pub struct Store {
    inner: Arc<Mutex<HashMap<String, Value>>>,
    changes: broadcast::Sender<StoreChange>,
    backing: Option<PathBuf>,
}

impl Store {
    /// A store with no backing file (tests, ephemeral daemons).
    pub fn in_memory() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            changes,
            backing: None,
        }
    }

    /// Open a JSON-backed store, loading existing contents if present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let map = if path.exists() {
            let text =
                std::fs::read_to_string(&path).map_err(|source| StoreError::ReadFailed {
                    path: path.clone(),
                    source,
                })?;
            serde_json::from_str(&text)?
        } else {
            HashMap::new()
        };
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Ok(Self {
            inner: Arc::new(Mutex::new(map)),
            changes,
            backing: Some(path),
        })
    }

    /// Subscribe to the change feed.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    /// Re-read the backing file, replacing in-memory state. Emits a timer
    /// change if the timer map differs. This is the daemon's stand-in for the
    /// browser's storage change feed when another process wrote the file.
    /// Returns whether the timer map changed.
    pub fn reload(&self) -> Result<bool, StoreError> {
        let Some(path) = &self.backing else {
            return Ok(false);
        };
        if !path.exists() {
            return Ok(false);
        }
        let text = std::fs::read_to_string(path).map_err(|source| StoreError::ReadFailed {
            path: path.clone(),
            source,
        })?;
        let fresh: HashMap<String, Value> = serde_json::from_str(&text)?;

        let changed = {
            let mut map = self.lock();
            let changed = map.get(keys::TIMERS) != fresh.get(keys::TIMERS);
            *map = fresh;
            changed
        };
        if changed {
            let _ = self.changes.send(StoreChange::Timers(self.timers()));
        }
        Ok(changed)
    }

    // ── Timers ───────────────────────────────────────────────────────

    /// The current timer map. Absent or malformed reads as empty.
    pub fn timers(&self) -> HashMap<String, TimerRecord> {
        let map = self.lock();
        map.get(keys::TIMERS)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    pub fn timer(&self, site: &str) -> Option<TimerRecord> {
        self.timers().get(site).copied()
    }

    pub fn timer_state(&self, site: &str) -> SiteTimer {
        SiteTimer::from_record(self.timer(site))
    }

    /// Start (or replace) a timer. Work timers award `mins` points eagerly at
    /// start; stopping early keeps them. Both writes commit together.
    pub fn start_timer(
        &self,
        site: &str,
        purpose: Purpose,
        mins: u64,
        now: u64,
    ) -> Result<TimerRecord, StoreError> {
        // Start replaces any current run regardless of prior state.
        let record = TimerRecord::new(purpose, mins, now);

        let (timers, points) = {
            let mut map = self.lock();
            let mut timers = read_timers(&map);
            timers.insert(site.to_string(), record);
            map.insert(keys::TIMERS.into(), serde_json::to_value(&timers)?);

            let points = if purpose == Purpose::Work {
                let total = read_points(&map).saturating_add(mins);
                map.insert(keys::POINTS.into(), Value::from(total));
                Some(total)
            } else {
                None
            };

            self.persist(&map)?;
            (timers, points)
        };

        let _ = self.changes.send(StoreChange::Timers(timers));
        if let Some(total) = points {
            let _ = self.changes.send(StoreChange::Points(total));
        }
        Ok(record)
    }

    /// Snooze: +`extra_mins`, window restarted from `now`. `None` when the
    /// site is idle (nothing to snooze).
    pub fn snooze_timer(
        &self,
        site: &str,
        extra_mins: u64,
        now: u64,
    ) -> Result<Option<TimerRecord>, StoreError> {
        let (_, transition) = self.timer_state(site).snooze(extra_mins, now);
        let Transition::Snoozed(record) = transition else {
            return Ok(None);
        };

        let timers = {
            let mut map = self.lock();
            let mut timers = read_timers(&map);
            timers.insert(site.to_string(), record);
            map.insert(keys::TIMERS.into(), serde_json::to_value(&timers)?);
            self.persist(&map)?;
            timers
        };
        let _ = self.changes.send(StoreChange::Timers(timers));
        Ok(Some(record))
    }

    /// Delete a site's record. Idempotent; returns whether one existed.
    /// Used for user stops and for completion cleanup -- neither leaves a
    /// record behind, only completion also appends a log entry.
    pub fn stop_timer(&self, site: &str) -> Result<bool, StoreError> {
        let (_, transition) = self.timer_state(site).stop();
        if transition == Transition::Noop {
            return Ok(false);
        }

        let timers = {
            let mut map = self.lock();
            let mut timers = read_timers(&map);
            timers.remove(site);
            map.insert(keys::TIMERS.into(), serde_json::to_value(&timers)?);
            self.persist(&map)?;
            timers
        };
        let _ = self.changes.send(StoreChange::Timers(timers));
        Ok(true)
    }

    // ── Completion log ───────────────────────────────────────────────

    /// Append one completion entry. The log is append-only and unbounded;
    /// entries are never mutated or deleted.
    pub fn append_completion(&self, entry: CompletionLogEntry) -> Result<(), StoreError> {
        {
            let mut map = self.lock();
            let mut logs = read_logs(&map);
            logs.push(entry.clone());
            map.insert(keys::LOGS.into(), serde_json::to_value(&logs)?);
            self.persist(&map)?;
        }
        let _ = self.changes.send(StoreChange::LogAppended(entry));
        Ok(())
    }

    pub fn completions(&self) -> Vec<CompletionLogEntry> {
        let map = self.lock();
        read_logs(&map)
    }

    // ── Points ───────────────────────────────────────────────────────

    pub fn points(&self) -> u64 {
        let map = self.lock();
        read_points(&map)
    }

    // ── Widget positions (presentation state, pass-through only) ────

    pub fn widget_position(&self, site: &str) -> Option<WidgetPosition> {
        let map = self.lock();
        map.get(&position_key(site))
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn set_widget_position(
        &self,
        site: &str,
        position: WidgetPosition,
    ) -> Result<(), StoreError> {
        {
            let mut map = self.lock();
            map.insert(position_key(site), serde_json::to_value(position)?);
            self.persist(&map)?;
        }
        let _ = self.changes.send(StoreChange::Position(site.to_string()));
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        // A poisoned lock only means another handle panicked mid-write;
        // the map itself is still a valid snapshot.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, map: &HashMap<String, Value>) -> Result<(), StoreError> {
        let Some(path) = &self.backing else {
            return Ok(());
        };
        let text = serde_json::to_string_pretty(map)?;
        std::fs::write(path, text).map_err(|source| StoreError::WriteFailed {
            path: path.clone(),
            source,
        })
    }
}

fn position_key(site: &str) -> String {
    format!("{}{site}", keys::POSITION_PREFIX)
}

fn read_timers(map: &HashMap<String, Value>) -> HashMap<String, TimerRecord> {
    map.get(keys::TIMERS)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn read_logs(map: &HashMap<String, Value>) -> Vec<CompletionLogEntry> {
    map.get(keys::LOGS)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn read_points(map: &HashMap<String, Value>) -> u64 {
    map.get(keys::POINTS).and_then(Value::as_u64).unwrap_or(0)
}
