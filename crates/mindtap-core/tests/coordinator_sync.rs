//! Coordinator integration tests.
//!
//! Drive the sync protocol end to end against fake tab and notification
//! hosts: request/response handling, reconciliation, the completion bundle,
//! push fan-out, and notification actions.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use mindtap_core::classifier::pattern_matches;
use mindtap_core::protocol::request_channel;
use mindtap_core::{
    now_ms, Coordinator, CoordinatorClient, Notification, NotificationAction, Notifier, Purpose,
    ReminderPolicy, Request, Response, SiteClassifier, Store, Tab, TabEvent, TabHost, WidgetPush,
};

const SITE: &str = "www.youtube.com";
const MIN: u64 = 60_000;

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}

#[derive(Default)]
struct FakeTabs {
    tabs: Mutex<Vec<Tab>>,
    pushes: Mutex<Vec<(u64, WidgetPush)>>,
    focused: Mutex<Vec<(u64, u64)>>,
    surface_opens: Mutex<usize>,
}

impl FakeTabs {
    fn add_tab(&self, id: u64, url: &str, active: bool) {
        self.tabs.lock().unwrap().push(Tab {
            id,
            url: url.to_string(),
            active,
        });
    }

    fn pushes(&self) -> Vec<(u64, WidgetPush)> {
        self.pushes.lock().unwrap().clone()
    }

    fn surface_opens(&self) -> usize {
        *self.surface_opens.lock().unwrap()
    }
}

impl TabHost for FakeTabs {
    fn tabs_matching(&self, pattern: &str) -> Vec<Tab> {
        self.tabs
            .lock()
            .unwrap()
            .iter()
            .filter(|t| pattern_matches(pattern, &t.url))
            .cloned()
            .collect()
    }

    fn send(&self, tab_id: u64, push: WidgetPush) -> bool {
        let exists = self.tabs.lock().unwrap().iter().any(|t| t.id == tab_id);
        if exists {
            self.pushes.lock().unwrap().push((tab_id, push));
        }
        exists
    }

    fn last_focused(&self) -> Option<(u64, Vec<Tab>)> {
        Some((1, self.tabs.lock().unwrap().clone()))
    }

    fn focus(&self, window_id: u64, tab_id: u64) {
        self.focused.lock().unwrap().push((window_id, tab_id));
    }

    fn open_control_surface(&self) {
        *self.surface_opens.lock().unwrap() += 1;
    }
}

struct Harness {
    store: Store,
    client: CoordinatorClient,
    tabs: Arc<FakeTabs>,
    notifier: Arc<RecordingNotifier>,
    tab_tx: mpsc::Sender<TabEvent>,
    action_tx: mpsc::Sender<NotificationAction>,
}

fn spawn_coordinator() -> Harness {
    spawn_coordinator_with_policy(ReminderPolicy::default())
}

fn spawn_coordinator_with_policy(policy: ReminderPolicy) -> Harness {
    let store = Store::in_memory();
    let tabs = Arc::new(FakeTabs::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let (client, requests) = request_channel(8);
    let (tab_tx, tab_rx) = mpsc::channel(8);
    let (action_tx, action_rx) = mpsc::channel(8);

    let coordinator = Coordinator::new(
        store.clone(),
        SiteClassifier::default(),
        tabs.clone(),
        notifier.clone(),
        policy,
    );
    tokio::spawn(coordinator.run(requests, tab_rx, action_rx));

    Harness {
        store,
        client,
        tabs,
        notifier,
        tab_tx,
        action_tx,
    }
}

/// Poll until `condition` holds; the coordinator loop runs concurrently.
async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within timeout");
}

#[tokio::test]
async fn check_timer_is_inactive_without_a_record() {
    let h = spawn_coordinator();
    let response = h
        .client
        .request(Request::CheckTimer { url: SITE.into() })
        .await
        .unwrap();
    assert_eq!(
        response,
        Response::TimerStatus {
            active: false,
            remaining: None,
            total: None,
        }
    );
}

#[tokio::test]
async fn started_timer_reports_full_window() {
    // Scenario A: start 5 fun minutes, then query through the protocol with
    // a full URL instead of a bare hostname.
    let h = spawn_coordinator();
    h.store.start_timer(SITE, Purpose::Fun, 5, now_ms()).unwrap();

    let response = h
        .client
        .request(Request::CheckTimer {
            url: "https://www.youtube.com/watch?v=abc".into(),
        })
        .await
        .unwrap();
    match response {
        Response::TimerStatus {
            active,
            remaining,
            total,
        } => {
            assert!(active);
            assert_eq!(total, Some(5 * MIN));
            let remaining = remaining.unwrap();
            assert!(remaining > 5 * MIN - 2_000 && remaining <= 5 * MIN);
        }
        other => panic!("expected TimerStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn snooze_pushes_identical_updates_to_every_tab() {
    // Scenario E: two widgets on the same site, one snooze.
    let h = spawn_coordinator();
    h.tabs.add_tab(10, "https://www.youtube.com/watch?v=a", true);
    h.tabs.add_tab(11, "https://www.youtube.com/feed", false);
    h.tabs.add_tab(12, "https://docs.rs/tokio", false);
    h.store.start_timer(SITE, Purpose::Fun, 5, now_ms()).unwrap();

    let response = h
        .client
        .request(Request::SnoozeTimer { url: SITE.into() })
        .await
        .unwrap();
    assert_eq!(response, Response::Ack);

    let updates: Vec<(u64, WidgetPush)> = h
        .tabs
        .pushes()
        .into_iter()
        .filter(|(_, p)| matches!(p, WidgetPush::TimerUpdated { .. }))
        .collect();
    assert_eq!(updates.len(), 2);
    assert!(updates.iter().any(|(id, _)| *id == 10));
    assert!(updates.iter().any(|(id, _)| *id == 11));
    for (_, push) in &updates {
        assert_eq!(
            push,
            &WidgetPush::TimerUpdated {
                url: SITE.into(),
                remaining: 10 * MIN,
                total: 10 * MIN,
            }
        );
    }

    let record = h.store.timer(SITE).unwrap();
    assert_eq!(record.mins, 10);
}

#[tokio::test]
async fn expired_record_completes_exactly_once() {
    // Scenario C: a 1-minute timer written 2 minutes ago completes on
    // reconciliation; one log entry, record gone, notification fired.
    let h = spawn_coordinator();
    h.tabs.add_tab(20, "https://www.youtube.com/", true);
    h.store
        .start_timer(SITE, Purpose::Work, 1, now_ms() - 2 * MIN)
        .unwrap();

    let store = h.store.clone();
    wait_for(move || !store.completions().is_empty()).await;

    let logs = h.store.completions();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].site, SITE);
    assert_eq!(logs[0].mins, 1);
    assert_eq!(logs[0].purpose, Purpose::Work);
    assert!(h.store.timer(SITE).is_none());

    assert_eq!(h.notifier.count(), 1);
    let pushes = h.tabs.pushes();
    assert!(pushes
        .iter()
        .any(|(id, p)| *id == 20 && matches!(p, WidgetPush::TriggerPopup { .. })));

    // Settle any queued change events; still exactly one log entry.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.store.completions().len(), 1);
}

#[tokio::test]
async fn stop_on_idle_site_succeeds_without_side_effects() {
    // Scenario D.
    let h = spawn_coordinator();
    let response = h
        .client
        .request(Request::StopTimer { url: SITE.into() })
        .await
        .unwrap();
    assert_eq!(response, Response::Stopped { success: true });
    assert!(h.store.completions().is_empty());
    assert!(h.tabs.pushes().is_empty());
}

#[tokio::test]
async fn stop_removes_record_and_tells_widgets() {
    let h = spawn_coordinator();
    h.tabs.add_tab(30, "https://www.youtube.com/", true);
    h.store.start_timer(SITE, Purpose::Fun, 5, now_ms()).unwrap();

    let response = h
        .client
        .request(Request::StopTimer { url: SITE.into() })
        .await
        .unwrap();
    assert_eq!(response, Response::Stopped { success: true });
    assert!(h.store.timer(SITE).is_none());
    // Stopped, not completed: no log entry.
    assert!(h.store.completions().is_empty());
    assert!(h
        .tabs
        .pushes()
        .iter()
        .any(|(_, p)| matches!(p, WidgetPush::StopTimer { .. })));
}

#[tokio::test]
async fn closing_a_tab_keeps_the_persisted_record() {
    let h = spawn_coordinator();
    h.store.start_timer(SITE, Purpose::Fun, 5, now_ms()).unwrap();

    h.tab_tx
        .send(TabEvent::Closed {
            url: format!("https://{SITE}/watch"),
        })
        .await
        .unwrap();

    // The schedule is cancelled, the record is not: other tabs on the same
    // site may still be open.
    let response = h
        .client
        .request(Request::CheckTimer { url: SITE.into() })
        .await
        .unwrap();
    match response {
        Response::TimerStatus { active, .. } => assert!(active),
        other => panic!("expected TimerStatus, got {other:?}"),
    }
    assert!(h.store.timer(SITE).is_some());
}

#[tokio::test]
async fn points_flow_through_the_protocol() {
    let h = spawn_coordinator();
    h.store
        .start_timer(SITE, Purpose::Work, 15, now_ms())
        .unwrap();
    let response = h.client.request(Request::GetPoints).await.unwrap();
    assert_eq!(response, Response::Points { points: 15 });
}

#[tokio::test]
async fn notification_snooze_extends_the_active_timer() {
    let h = spawn_coordinator();
    h.store.start_timer(SITE, Purpose::Fun, 5, now_ms()).unwrap();

    h.action_tx.send(NotificationAction::Snooze).await.unwrap();

    let store = h.store.clone();
    wait_for(move || store.timer(SITE).map(|r| r.mins) == Some(10)).await;
}

#[tokio::test]
async fn reminder_fires_once_per_cooldown_window() {
    // Millisecond-scale thresholds so elapsed wall time crosses them quickly.
    let h = spawn_coordinator_with_policy(ReminderPolicy {
        snooze_minutes: 5,
        after_ms: 30,
        cooldown_ms: 60_000,
        check_interval: Duration::from_millis(10),
    });
    h.store
        .start_timer(SITE, Purpose::Fun, 60, now_ms())
        .unwrap();

    let notifier = h.notifier.clone();
    wait_for(move || notifier.count() == 1).await;
    let sent = h.notifier.sent.lock().unwrap().clone();
    assert_eq!(sent[0].title, "MindTap Reminder");
    assert!(sent[0].message.contains(SITE));

    // Many more ticks pass inside the cooldown; the latch holds.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.notifier.count(), 1);
}

#[tokio::test]
async fn reminder_becomes_eligible_again_after_cooldown() {
    let h = spawn_coordinator_with_policy(ReminderPolicy {
        snooze_minutes: 5,
        after_ms: 20,
        cooldown_ms: 80,
        check_interval: Duration::from_millis(10),
    });
    h.store
        .start_timer(SITE, Purpose::Fun, 60, now_ms())
        .unwrap();

    let notifier = h.notifier.clone();
    wait_for(move || notifier.count() >= 2).await;
}

#[tokio::test]
async fn snooze_resets_the_reminder_latch() {
    // Cooldown is an hour: a second reminder can only come from the snooze
    // moving the deadline, which drops the latch on reschedule.
    let h = spawn_coordinator_with_policy(ReminderPolicy {
        snooze_minutes: 5,
        after_ms: 0,
        cooldown_ms: 3_600_000,
        check_interval: Duration::from_millis(10),
    });
    h.store
        .start_timer(SITE, Purpose::Fun, 60, now_ms())
        .unwrap();

    let notifier = h.notifier.clone();
    wait_for(move || notifier.count() == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.notifier.count(), 1);

    let response = h
        .client
        .request(Request::SnoozeTimer { url: SITE.into() })
        .await
        .unwrap();
    assert_eq!(response, Response::Ack);

    let notifier = h.notifier.clone();
    wait_for(move || notifier.count() == 2).await;
}

#[tokio::test]
async fn completed_navigation_to_distracting_site_opens_control_surface() {
    let h = spawn_coordinator();
    h.tabs.add_tab(40, "https://www.youtube.com/", true);

    h.tab_tx
        .send(TabEvent::NavigationComplete {
            url: "https://www.youtube.com/".into(),
        })
        .await
        .unwrap();

    let tabs = h.tabs.clone();
    wait_for(move || tabs.surface_opens() == 1).await;
    assert_eq!(h.tabs.focused.lock().unwrap().as_slice(), &[(1, 40)]);
}

#[tokio::test]
async fn navigation_to_ordinary_site_is_ignored() {
    let h = spawn_coordinator();
    h.tabs.add_tab(50, "https://docs.rs/", true);

    h.tab_tx
        .send(TabEvent::NavigationComplete {
            url: "https://docs.rs/".into(),
        })
        .await
        .unwrap();
    // Give the loop a moment; nothing should open.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.tabs.surface_opens(), 0);
}
