//! Foreground coordinator daemon.
//!
//! Runs the coordinator over the file-backed store with console
//! notifications. Other `mindtap-cli` invocations write the same file; a
//! periodic reload feeds their edits into the store's change feed, standing
//! in for the browser's storage change notifications.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use mindtap_core::error::Result;
use mindtap_core::protocol::request_channel;
use mindtap_core::{
    Config, Coordinator, Notification, Notifier, ReminderPolicy, Tab, TabHost, WidgetPush,
};

const RELOAD_INTERVAL: Duration = Duration::from_secs(1);

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, n: Notification) {
        println!("\n== {} ==", n.title);
        println!("{}", n.message);
        println!("  [0] {}   [1] {}", n.buttons[0], n.buttons[1]);
    }
}

/// No browser attached: no tabs to push to, no window to focus.
struct HeadlessTabs;

impl TabHost for HeadlessTabs {
    fn tabs_matching(&self, _pattern: &str) -> Vec<Tab> {
        Vec::new()
    }

    fn send(&self, _tab_id: u64, _push: WidgetPush) -> bool {
        false
    }

    fn last_focused(&self) -> Option<(u64, Vec<Tab>)> {
        None
    }

    fn focus(&self, _window_id: u64, _tab_id: u64) {}

    fn open_control_surface(&self) {}
}

pub fn run() -> Result<()> {
    let store = super::open_store()?;
    let config = Config::load()?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let (client, requests) = request_channel(8);
        let (_tab_tx, tab_rx) = mpsc::channel(8);
        let (_action_tx, action_rx) = mpsc::channel(8);

        let coordinator = Coordinator::new(
            store.clone(),
            config.classifier(),
            Arc::new(HeadlessTabs),
            Arc::new(ConsoleNotifier),
            ReminderPolicy::from(&config),
        );
        let worker = tokio::spawn(coordinator.run(requests, tab_rx, action_rx));

        println!("mindtap coordinator running; press Ctrl-C to stop");
        let mut reload = tokio::time::interval(RELOAD_INTERVAL);
        loop {
            tokio::select! {
                _ = reload.tick() => {
                    if let Err(e) = store.reload() {
                        eprintln!("warning: store reload failed: {e}");
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        // Closing the request channel shuts the coordinator down.
        drop(client);
        let _ = worker.await;
        Ok(())
    })
}
