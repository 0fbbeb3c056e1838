//! Background timer coordinator.
//!
//! One cooperative `select!` loop per process. The coordinator exclusively
//! owns every scheduled wake-up: no other context may create or cancel one.
//! Its in-memory registry mirrors the persisted timer map and is rebuilt
//! (cancel-then-recreate, at most one live handle per site) on every change
//! the store reports, whoever wrote it.
//!
//! Handlers are short-lived and independent; a failure in one is printed as a
//! warning and never takes the loop down.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::classifier::{hostname, site_pattern, SiteClassifier};
use crate::platform::{Notification, NotificationAction, Notifier, TabEvent, TabHost};
use crate::protocol::{Envelope, Request, Response, WidgetPush};
use crate::storage::{Config, Store, StoreChange};
use crate::timer::{now_ms, CompletionLogEntry, Purpose, TimerRecord};

const EXPIRY_QUEUE_DEPTH: usize = 32;

/// Reminder and snooze policy, derived from [`Config`].
#[derive(Debug, Clone, Copy)]
pub struct ReminderPolicy {
    pub snooze_minutes: u64,
    /// Elapsed time before the first reminder.
    pub after_ms: u64,
    /// Quiet period before a reminded timer reminds again.
    pub cooldown_ms: u64,
    /// Lazy re-check cadence for elapsed-time thresholds.
    pub check_interval: Duration,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ReminderPolicy {
    fn from(config: &Config) -> Self {
        Self {
            snooze_minutes: config.timer.snooze_minutes,
            after_ms: config.timer.reminder_after_minutes * 60_000,
            cooldown_ms: config.timer.reminder_cooldown_minutes * 60_000,
            check_interval: Duration::from_secs(config.timer.reminder_check_secs.max(1)),
        }
    }
}

/// One scheduled wake-up, owned by the coordinator. Dropped and recreated
/// whenever the underlying record is reconciled, so a stale callback can
/// never fire against an outdated deadline.
struct ScheduledTimer {
    deadline_ms: u64,
    wake: JoinHandle<()>,
    /// Last reminder timestamp; the latch that stops a reminder from firing
    /// twice in one window. Self-clears via the cooldown comparison.
    last_reminder_ms: Option<u64>,
}

impl ScheduledTimer {
    fn cancel(self) {
        self.wake.abort();
    }
}

/// The background coordinator. Construct, then hand the receivers to
/// [`Coordinator::run`] on a tokio runtime.
pub struct Coordinator {
    store: Store,
    classifier: SiteClassifier,
    tabs: Arc<dyn TabHost>,
    notifier: Arc<dyn Notifier>,
    policy: ReminderPolicy,
    handles: HashMap<String, ScheduledTimer>,
    expiry_tx: mpsc::Sender<String>,
    expiry_rx: Option<mpsc::Receiver<String>>,
}

impl Coordinator {
    pub fn new(
        store: Store,
        classifier: SiteClassifier,
        tabs: Arc<dyn TabHost>,
        notifier: Arc<dyn Notifier>,
        policy: ReminderPolicy,
    ) -> Self {
        let (expiry_tx, expiry_rx) = mpsc::channel(EXPIRY_QUEUE_DEPTH);
        Self {
            store,
            classifier,
            tabs,
            notifier,
            policy,
            handles: HashMap::new(),
            expiry_tx,
            expiry_rx: Some(expiry_rx),
        }
    }

    /// Drive the coordinator until the request channel closes.
    pub async fn run(
        mut self,
        mut requests: mpsc::Receiver<Envelope>,
        mut tab_events: mpsc::Receiver<TabEvent>,
        mut actions: mpsc::Receiver<NotificationAction>,
    ) {
        let Some(mut expiry_rx) = self.expiry_rx.take() else {
            return; // run() consumed twice
        };
        let mut changes = self.store.subscribe();

        let mut reminder_tick = tokio::time::interval(self.policy.check_interval);
        reminder_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Startup reconciliation: records persisted before this process
        // existed still get handles (or immediate completion).
        self.reconcile();

        loop {
            tokio::select! {
                envelope = requests.recv() => match envelope {
                    Some(envelope) => self.handle_request(envelope),
                    None => break,
                },
                Some(event) = tab_events.recv() => self.handle_tab_event(event),
                Some(action) = actions.recv() => self.handle_notification_action(action),
                Some(site) = expiry_rx.recv() => self.handle_expiry(&site),
                change = changes.recv() => match change {
                    Ok(StoreChange::Timers(_)) => self.reconcile(),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => self.reconcile(),
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = reminder_tick.tick() => self.check_reminders(),
            }
        }

        for (_, handle) in self.handles.drain() {
            handle.cancel();
        }
    }

    // ── Message handling ─────────────────────────────────────────────

    fn handle_request(&mut self, envelope: Envelope) {
        let response = match envelope.request {
            Request::CheckTimer { url } => {
                let site = self.site_of(&url);
                Response::from(self.store.timer_state(&site).status(now_ms()))
            }
            Request::OpenPopup { url: _ } => {
                self.open_control_surface();
                Response::Ack
            }
            Request::SnoozeTimer { url } => {
                let site = self.site_of(&url);
                self.snooze(&site);
                Response::Ack
            }
            Request::StopTimer { url } => {
                let site = self.site_of(&url);
                Response::Stopped {
                    success: self.stop(&site),
                }
            }
            Request::GetPoints => Response::Points {
                points: self.store.points(),
            },
        };
        // The requester may have navigated away; nobody retries.
        let _ = envelope.reply.send(response);
    }

    fn handle_tab_event(&mut self, event: TabEvent) {
        match event {
            TabEvent::Closed { url } => {
                // Cancel the schedule only. The record is keyed by site, not
                // by tab: another tab on the same site may still be open, and
                // reconciliation will recreate the handle if so.
                let site = self.site_of(&url);
                if let Some(handle) = self.handles.remove(&site) {
                    handle.cancel();
                }
            }
            TabEvent::NavigationComplete { url } => {
                if self.classifier.is_distracting(&url) {
                    self.open_control_surface();
                }
            }
        }
    }

    fn handle_notification_action(&mut self, action: NotificationAction) {
        match action {
            NotificationAction::Open => self.open_control_surface(),
            NotificationAction::Snooze => {
                // Picks the first site found with an active record. With
                // several timers running at once this is ambiguous; known
                // limitation, kept as-is.
                let site = self.store.timers().keys().next().cloned();
                if let Some(site) = site {
                    self.snooze(&site);
                }
            }
        }
    }

    // ── Operations ───────────────────────────────────────────────────

    fn snooze(&mut self, site: &str) {
        match self
            .store
            .snooze_timer(site, self.policy.snooze_minutes, now_ms())
        {
            // Rescheduling rides on the store change feed; the push below
            // keeps open widgets consistent without waiting for their poll.
            Ok(Some(record)) => self.push_to_site(
                site,
                WidgetPush::TimerUpdated {
                    url: site.to_string(),
                    remaining: record.total_ms(),
                    total: record.total_ms(),
                },
            ),
            Ok(None) => {}
            Err(e) => eprintln!("warning: snooze for {site} failed: {e}"),
        }
    }

    fn stop(&mut self, site: &str) -> bool {
        match self.store.stop_timer(site) {
            Ok(removed) => {
                if let Some(handle) = self.handles.remove(site) {
                    handle.cancel();
                }
                if removed {
                    self.push_to_site(
                        site,
                        WidgetPush::StopTimer {
                            url: site.to_string(),
                        },
                    );
                }
                // Stopping an already-idle site is a success, not an error.
                true
            }
            Err(e) => {
                eprintln!("warning: stop for {site} failed: {e}");
                false
            }
        }
    }

    /// Rebuild the schedule registry from the persisted timer map. Expired
    /// records complete synchronously; never schedule a negative delay.
    ///
    /// Reads the store directly instead of trusting a change payload: queued
    /// feed events can carry snapshots older than a completion that already
    /// deleted the record.
    fn reconcile(&mut self) {
        let now = now_ms();
        let timers = self.store.timers();

        let gone: Vec<String> = self
            .handles
            .keys()
            .filter(|site| !timers.contains_key(*site))
            .cloned()
            .collect();
        for site in gone {
            if let Some(handle) = self.handles.remove(&site) {
                handle.cancel();
            }
        }

        for (site, record) in timers {
            if record.is_expired(now) {
                self.complete(&site, &record);
            } else {
                self.schedule(&site, &record, now);
            }
        }
    }

    /// Cancel-then-recreate the wake-up for one site. The reminder latch
    /// carries over only while the deadline is unchanged; a snooze moves the
    /// deadline and legitimately resets reminder eligibility.
    fn schedule(&mut self, site: &str, record: &TimerRecord, now: u64) {
        let deadline_ms = record.deadline_ms();
        let carried = match self.handles.remove(site) {
            Some(previous) => {
                let latch = (previous.deadline_ms == deadline_ms)
                    .then_some(previous.last_reminder_ms)
                    .flatten();
                previous.cancel();
                latch
            }
            None => None,
        };

        let delay = Duration::from_millis(deadline_ms.saturating_sub(now));
        let expiry_tx = self.expiry_tx.clone();
        let wake_site = site.to_string();
        let wake = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = expiry_tx.send(wake_site).await;
        });

        self.handles.insert(
            site.to_string(),
            ScheduledTimer {
                deadline_ms,
                wake,
                last_reminder_ms: carried,
            },
        );
    }

    /// A wake-up fired. Re-read the record: a snooze may have raced the
    /// sleep, in which case the wake-up moves out instead of completing.
    fn handle_expiry(&mut self, site: &str) {
        let now = now_ms();
        match self.store.timer(site) {
            Some(record) if record.is_expired(now) => self.complete(site, &record),
            Some(record) => self.schedule(site, &record, now),
            None => {
                if let Some(handle) = self.handles.remove(site) {
                    handle.cancel();
                }
            }
        }
    }

    /// The completion side-effect bundle. Order matters for testability, but
    /// the steps are isolated: a failed one is reported and the rest still
    /// run.
    fn complete(&mut self, site: &str, record: &TimerRecord) {
        self.notifier
            .notify(completion_notification(site, record.purpose));

        if let Err(e) = self
            .store
            .append_completion(CompletionLogEntry::new(site, record))
        {
            eprintln!("warning: completion log for {site} failed: {e}");
        }

        if let Err(e) = self.store.stop_timer(site) {
            eprintln!("warning: clearing completed timer for {site} failed: {e}");
        }

        self.push_to_site(
            site,
            WidgetPush::TriggerPopup {
                url: site.to_string(),
            },
        );

        if let Some(handle) = self.handles.remove(site) {
            handle.cancel();
        }
    }

    /// Evaluate elapsed-time thresholds across all running timers. At most
    /// one reminder per site per tick; the latch plus cooldown lets a
    /// long-running timer remind again later.
    fn check_reminders(&mut self) {
        let now = now_ms();
        let timers = self.store.timers();
        for (site, handle) in self.handles.iter_mut() {
            let Some(record) = timers.get(site) else {
                continue;
            };
            if record.elapsed_ms(now) < self.policy.after_ms {
                continue;
            }
            let eligible = handle
                .last_reminder_ms
                .map_or(true, |last| now.saturating_sub(last) >= self.policy.cooldown_ms);
            if eligible {
                self.notifier
                    .notify(reminder_notification(site, record.elapsed_ms(now) / 60_000));
                handle.last_reminder_ms = Some(now);
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────

    /// Broadcast a push to every tab on a site. Send failures are ignored;
    /// the widget's poll loop catches up.
    fn push_to_site(&self, site: &str, push: WidgetPush) {
        for tab in self.tabs.tabs_matching(&site_pattern(site)) {
            let _ = self.tabs.send(tab.id, push.clone());
        }
    }

    /// Focus the last-focused window's active distracting tab and reveal the
    /// control surface. Missing window or tab is a no-op.
    fn open_control_surface(&self) {
        let Some((window_id, tabs)) = self.tabs.last_focused() else {
            return;
        };
        let Some(tab) = tabs
            .iter()
            .find(|t| t.active && self.classifier.is_distracting(&t.url))
        else {
            return;
        };
        self.tabs.focus(window_id, tab.id);
        self.tabs.open_control_surface();
    }

    /// Requests may carry a full URL or a bare hostname; either becomes the
    /// site key.
    fn site_of(&self, url: &str) -> String {
        hostname(url).unwrap_or_else(|| url.to_string())
    }
}

fn completion_notification(site: &str, purpose: Purpose) -> Notification {
    let message = match purpose {
        Purpose::Work => format!("Time's up! You said this was for work on {site}. You sure?"),
        Purpose::Fun => "Hey, you! Ready to get back to your grind or what?".to_string(),
    };
    Notification {
        title: "MindTap Nudge".to_string(),
        message,
        buttons: ["Open MindTap".to_string(), "Snooze 5 min".to_string()],
    }
}

fn reminder_notification(site: &str, elapsed_min: u64) -> Notification {
    Notification {
        title: "MindTap Reminder".to_string(),
        message: format!("You've been on {site} for {elapsed_min} mins. Time to wrap up?"),
        buttons: ["Open MindTap".to_string(), "Snooze 5 min".to_string()],
    }
}
