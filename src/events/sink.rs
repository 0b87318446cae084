//! Real-time event sink. Grounded in `original_source/src/api/ws.py`
//! (`set_loop`/`send_to_user`, a thread-safe bridge from the synchronous
//! simulation thread to the asyncio loop owning WebSocket connections) and
//! in the teacher's `web_api_server/mod.rs::background_task`, which drains
//! an `mpsc::Receiver<Event>` on the async side and fans events out to
//! connected sockets.
//!
//! Unlike the teacher, which broadcasts every event to every connected
//! socketio client, delivery here is per-user (spec.md §4.14): each
//! connected WebSocket holds a sender registered under its authenticated
//! user id, and `send` only reaches that user's own connections.

use axum::extract::ws::Message;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::OnceCell;

pub type UserId = i64;

#[derive(Default)]
pub struct EventSink {
    connections: DashMap<UserId, Vec<UnboundedSender<Message>>>,
    loop_handle: OnceCell<tokio::runtime::Handle>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the running Tokio handle so that `send` can be called from
    /// any thread, including the synchronous simulation thread. Analogous to
    /// `ws.set_loop`.
    pub fn set_handle(&self, handle: tokio::runtime::Handle) {
        let _ = self.loop_handle.set(handle);
    }

    pub fn register(&self, user_id: UserId, sender: UnboundedSender<Message>) {
        self.connections.entry(user_id).or_default().push(sender);
    }

    pub fn unregister_closed(&self, user_id: UserId) {
        if let Some(mut entry) = self.connections.get_mut(&user_id) {
            entry.retain(|tx| !tx.is_closed());
        }
    }

    /// Thread-safe fire-and-forget send. If the loop has not been captured
    /// yet, the message is dropped silently, matching the original's
    /// best-effort semantics when `_loop is None`.
    pub fn send(&self, user_id: UserId, message: Value) {
        let Some(handle) = self.loop_handle.get() else {
            return;
        };
        let Some(mut conns) = self.connections.get_mut(&user_id) else {
            return;
        };
        let text = message.to_string();
        conns.retain(|tx| tx.send(Message::Text(text.clone().into())).is_ok());
        let _ = handle; // scheduling happens via the unbounded channel itself
    }

    pub fn connection_count(&self, user_id: UserId) -> usize {
        self.connections
            .get(&user_id)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}
