//! External collaborator seams: desktop notifications and the tab/window
//! surface. The coordinator talks to the host browser only through these
//! traits; tests and the CLI daemon supply their own implementations.

use crate::protocol::WidgetPush;

/// A user-facing notification. Always exactly two action buttons:
/// index 0 opens the control surface, index 1 snoozes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub buttons: [String; 2],
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// A browser tab as the coordinator sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub id: u64,
    pub url: String,
    pub active: bool,
}

/// Tab and window query surface.
pub trait TabHost: Send + Sync {
    /// Tabs whose URL matches a glob pattern (`*://site/*`).
    fn tabs_matching(&self, pattern: &str) -> Vec<Tab>;

    /// Best-effort message delivery. Returns false when the tab is gone;
    /// callers ignore the result -- the widget poll loop is the safety net.
    fn send(&self, tab_id: u64, push: WidgetPush) -> bool;

    /// The last-focused window id together with its tabs.
    fn last_focused(&self) -> Option<(u64, Vec<Tab>)>;

    /// Bring a window and one of its tabs to the front.
    fn focus(&self, window_id: u64, tab_id: u64);

    /// Reveal the control surface (the extension popup in the original).
    fn open_control_surface(&self);
}

/// Tab lifecycle events the coordinator subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEvent {
    /// A tab closed. Cancels that site's scheduled handle only; the persisted
    /// record stays because other tabs on the same site may still be open.
    Closed { url: String },
    /// A navigation finished loading. Distracting URLs trigger the auto-open
    /// interception, once per completed navigation.
    NavigationComplete { url: String },
}

/// A click on one of the two notification buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    Open,
    Snooze,
}

impl NotificationAction {
    /// Map a button index to an action. Only indices 0 and 1 exist.
    pub fn from_button_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(NotificationAction::Open),
            1 => Some(NotificationAction::Snooze),
            _ => None,
        }
    }
}
