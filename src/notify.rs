//! In-memory notification ring buffer. Grounded in
//! `original_source/src/core/notifications.py`: a bounded (100-per-user)
//! in-memory store, with durable persistence left to an external collaborator
//! (spec.md §1 explicitly scopes notification storage out of the core; the
//! core only emits through this well-defined sink).

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};

const MAX_PER_USER: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
    pub priority: String,
    pub created_at: DateTime<Utc>,
}

/// Anything that durably stores notifications implements this; the core
/// ships only the in-memory ring buffer below, matching spec.md's
/// "Deliberately out of scope: notification storage" line.
pub trait Notifier: Send + Sync {
    fn notify(&self, user_id: i64, kind: &str, payload: Value, priority: &str);

    /// Listing/dismissal are only meaningful for the in-memory store; other
    /// implementations (e.g. a durable collaborator) may leave these at
    /// their default no-op behavior.
    fn list(&self, _user_id: i64) -> Vec<Notification> {
        Vec::new()
    }

    fn dismiss(&self, _user_id: i64, _notification_id: i64) -> bool {
        false
    }
}

#[derive(Default)]
pub struct InMemoryNotifier {
    by_user: DashMap<i64, Vec<Notification>>,
    next_id: AtomicI64,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self, user_id: i64) -> Vec<Notification> {
        self.by_user.get(&user_id).map(|v| v.clone()).unwrap_or_default()
    }

    pub fn clear(&self, user_id: i64) {
        self.by_user.remove(&user_id);
    }

    /// Removes a single notification by id, matching the original's
    /// `DELETE /notifications/{id}`. Returns whether it was present.
    pub fn dismiss(&self, user_id: i64, notification_id: i64) -> bool {
        let Some(mut entry) = self.by_user.get_mut(&user_id) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|n| n.id != notification_id);
        entry.len() != before
    }
}

impl Notifier for InMemoryNotifier {
    fn list(&self, user_id: i64) -> Vec<Notification> {
        InMemoryNotifier::list(self, user_id)
    }

    fn dismiss(&self, user_id: i64, notification_id: i64) -> bool {
        InMemoryNotifier::dismiss(self, user_id, notification_id)
    }

    fn notify(&self, user_id: i64, kind: &str, payload: Value, priority: &str) {
        let mut entry = self.by_user.entry(user_id).or_default();
        entry.push(Notification {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id,
            kind: kind.to_string(),
            payload,
            priority: priority.to_string(),
            created_at: Utc::now(),
        });
        if entry.len() > MAX_PER_USER {
            let excess = entry.len() - MAX_PER_USER;
            entry.drain(0..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_ring_buffer() {
        let n = InMemoryNotifier::new();
        for i in 0..150 {
            n.notify(1, "test", serde_json::json!({ "i": i }), "info");
        }
        assert_eq!(n.list(1).len(), MAX_PER_USER);
        assert_eq!(n.list(1).first().unwrap().payload["i"], 50);
    }
}
