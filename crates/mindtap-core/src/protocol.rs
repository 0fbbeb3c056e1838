//! Cross-context sync protocol.
//!
//! Three kinds of traffic, matching the wire contract of the original
//! extension:
//!
//! - [`Request`]/[`Response`]: single-shot request/response pairs from a
//!   widget or popup to the coordinator (at most one in flight per call site)
//! - [`WidgetPush`]: fire-and-forget pushes from the coordinator to every tab
//!   on a site, best-effort -- a tab that navigated away drops the message
//!
//! Delivery is at-most-once with no retries. That is sufficient because the
//! widget's own 1-2s poll loop is the fallback source of truth: a poll answer
//! and a racing push carry the same eventually-consistent data, so receivers
//! treat both as idempotent state-setters and last-applied wins.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::timer::TimerStatus;

/// Widget/popup -> coordinator. The `url` field carries a full URL or a bare
/// hostname; the coordinator normalizes to a site key either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    /// Polled every 1-2s by the widget.
    CheckTimer { url: String },
    /// Focus the distracting tab and reveal the control surface.
    OpenPopup { url: String },
    SnoozeTimer { url: String },
    StopTimer { url: String },
    GetPoints,
}

/// Coordinator -> requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    TimerStatus {
        active: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        remaining: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        total: Option<u64>,
    },
    Points {
        points: u64,
    },
    Stopped {
        success: bool,
    },
    Ack,
}

impl From<TimerStatus> for Response {
    fn from(status: TimerStatus) -> Self {
        Response::TimerStatus {
            active: status.active,
            remaining: status.remaining,
            total: status.total,
        }
    }
}

/// Coordinator -> widget tabs, fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WidgetPush {
    /// Pushed after a snooze so the displayed countdown never shows a stale
    /// expired value while waiting for the next poll.
    TimerUpdated {
        url: String,
        remaining: u64,
        total: u64,
    },
    /// Pushed on completion; the widget shows its own completion UI.
    TriggerPopup { url: String },
    /// Pushed after a stop; the widget removes itself.
    StopTimer { url: String },
}

/// One request with its single-shot reply slot.
#[derive(Debug)]
pub struct Envelope {
    pub request: Request,
    pub reply: oneshot::Sender<Response>,
}

/// Handle for sending requests to a running coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorClient {
    tx: mpsc::Sender<Envelope>,
}

impl CoordinatorClient {
    /// Send a request and await the reply. `None` if the coordinator is gone.
    pub async fn request(&self, request: Request) -> Option<Response> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Envelope { request, reply }).await.ok()?;
        rx.await.ok()
    }
}

/// Create the request channel: a client handle plus the receiver the
/// coordinator's run loop consumes.
pub fn request_channel(buffer: usize) -> (CoordinatorClient, mpsc::Receiver<Envelope>) {
    let (tx, rx) = mpsc::channel(buffer);
    (CoordinatorClient { tx }, rx)
}
