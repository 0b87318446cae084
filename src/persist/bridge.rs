//! Thread-safe submission primitives from the synchronous simulation thread
//! onto the async runtime that owns the database pool. Grounded in
//! `original_source/src/core/sync.py`'s `_submit`/`_submit_and_wait`
//! (schedule a coroutine on a captured loop, fire-and-forget or bounded-wait)
//! translated to a captured `tokio::runtime::Handle` plus a oneshot-style
//! `std::sync::mpsc` channel for the bounded-wait case, following the
//! teacher's `src/broker.rs` channel-plumbing idiom.
//!
//! Per spec.md §5, the simulation thread never awaits: `submit` schedules
//! and returns immediately; `submit_and_wait` blocks the *calling* thread
//! (acceptable only for hydration/admin reads, never inside a hot tick path)
//! up to a short timeout, falling back to a caller-supplied default.

use crate::db::DbClient;
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crate::ecs::components::EntityId;

/// Default bound for `submit_and_wait`, matching spec.md §5's "~2s" figure.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Default)]
pub struct Bridge {
    handle: OnceLock<tokio::runtime::Handle>,
    db: OnceLock<Arc<DbClient>>,
    last_planet_write: DashMap<EntityId, Instant>,
    saving: AtomicBool,
}

impl Bridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the running Tokio handle, analogous to
    /// `set_persistence_loop`. Idempotent: only the first call sticks.
    pub fn set_handle(&self, handle: tokio::runtime::Handle) {
        let _ = self.handle.set(handle);
    }

    pub fn set_db(&self, db: Arc<DbClient>) {
        let _ = self.db.set(db);
    }

    pub fn db(&self) -> Option<Arc<DbClient>> {
        self.db.get().cloned()
    }

    /// Fire-and-forget: if the loop hasn't been captured yet, the write is
    /// silently dropped (best-effort persistence, spec.md §4.12).
    pub fn submit<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Some(handle) = self.handle.get() else {
            return;
        };
        handle.spawn(fut);
    }

    /// Bounded wait: schedules `make_future` on the captured loop and blocks
    /// the caller up to `timeout`, returning `default` if the loop is absent
    /// or the timeout elapses. The spawned task keeps running to completion
    /// even after a timed-out caller gives up (matching "fire and forget
    /// with a deadline" rather than true cancellation, since a cancelled
    /// write mid-flight would be worse than a late one).
    pub fn submit_and_wait<T, F, Fut>(&self, timeout: Duration, default: T, make_future: F) -> T
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let Some(handle) = self.handle.get() else {
            return default;
        };
        let (tx, rx) = std::sync::mpsc::channel();
        handle.spawn(async move {
            let result = make_future().await;
            let _ = tx.send(result);
        });
        rx.recv_timeout(timeout).unwrap_or(default)
    }

    /// Per-planet write throttle (`PERSIST_INTERVAL_SECONDS`): returns
    /// `true` at most once per `interval` for a given entity.
    pub fn should_persist_planet(&self, entity: EntityId, interval: Duration) -> bool {
        let now = Instant::now();
        let mut should = true;
        self.last_planet_write
            .entry(entity)
            .and_modify(|last| {
                if now.duration_since(*last) < interval {
                    should = false;
                } else {
                    *last = now;
                }
            })
            .or_insert(now);
        should
    }

    /// Non-blocking trylock guarding the periodic snapshot; an
    /// already-in-flight save causes the caller to skip this round, matching
    /// `_save_lock.acquire(blocking=False)`.
    pub fn try_begin_save(&self) -> bool {
        self.saving
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn end_save(&self) {
        self.saving.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_handle_drops_submit_and_returns_default() {
        let bridge = Bridge::new();
        bridge.submit(async {});
        let result = bridge.submit_and_wait(Duration::from_millis(10), 42, || async { 7 });
        assert_eq!(result, 42);
    }

    #[test]
    fn persist_throttle_fires_once_per_interval() {
        let bridge = Bridge::new();
        assert!(bridge.should_persist_planet(1, Duration::from_secs(60)));
        assert!(!bridge.should_persist_planet(1, Duration::from_secs(60)));
    }

    #[test]
    fn save_trylock_excludes_overlap() {
        let bridge = Bridge::new();
        assert!(bridge.try_begin_save());
        assert!(!bridge.try_begin_save());
        bridge.end_save();
        assert!(bridge.try_begin_save());
    }
}
