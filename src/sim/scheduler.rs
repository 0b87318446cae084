//! The fixed-rate tick scheduler (spec.md §4.2/§4.3). Grounded in
//! `original_source/src/core/game.py`'s `_game_loop`: a dedicated thread
//! sleeping against a monotonic clock, running the systems in a fixed
//! order, and piggybacking periodic persistence and a once-daily cleanup
//! job onto the same cadence. Runs on its own `std::thread`, never on the
//! tokio runtime, so a slow system never starves async I/O.

use crate::config::CONFIG;
use crate::metrics;
use crate::sim::Simulation;
use crate::systems;
use chrono::{Datelike, Utc};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Runs every system exactly once, in the order spec.md §4.3 names them.
/// Player activity has no system of its own (updates happen inline on
/// command application), so step 3 is a no-op here.
pub fn run_systems_once(sim: &mut Simulation, now: chrono::DateTime<Utc>) {
    systems::resource_production::run(sim, now);
    systems::building_construction::run(sim, now);
    systems::research::run(sim, now);
    systems::shipyard::run(sim, now);
    systems::fleet_movement::run(sim, now);
    systems::battle::run(sim, now);
}

/// Drives `run_systems_once` at `CONFIG.tick_rate` Hz on the calling thread,
/// plus the periodic snapshot and once-daily inactivity cleanup. Intended to
/// be the body of the dedicated simulation thread spawned at startup; never
/// returns while `running` stays true.
pub struct Scheduler {
    last_save: Instant,
    last_cleanup_day: Option<u32>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            last_save: Instant::now(),
            last_cleanup_day: None,
        }
    }

    /// Runs the tick loop forever. `running` is checked once per tick so a
    /// caller can request shutdown from another thread.
    pub fn run(&mut self, sim: &mut Simulation, running: &std::sync::atomic::AtomicBool) {
        use std::sync::atomic::Ordering;

        let period = Duration::from_secs_f64(CONFIG.tick_rate.max(0.001));
        let mut next_tick = Instant::now();

        while running.load(Ordering::Relaxed) {
            let planned_start = next_tick;
            let actual_start = Instant::now();
            let jitter = actual_start.saturating_duration_since(planned_start);

            sim.drain_commands();
            sim.drain_queries();
            let now = Utc::now();
            run_systems_once(sim, now);

            if self.last_save.elapsed() >= Duration::from_secs(CONFIG.save_interval_seconds.max(1) as u64) {
                crate::persist::sync_ops::snapshot_all(sim);
                self.last_save = Instant::now();
            }

            let today = now.ordinal();
            if self.last_cleanup_day != Some(today) {
                let cutoff = now - chrono::Duration::days(CONFIG.cleanup_days.max(1));
                let evicted = crate::persist::sync_ops::cleanup_inactive_users(sim, cutoff);
                if !evicted.is_empty() {
                    debug!(count = evicted.len(), "daily inactivity cleanup evicted users");
                }
                self.last_cleanup_day = Some(today);
            }

            let elapsed = actual_start.elapsed();
            metrics::record_tick(elapsed, jitter);
            if elapsed > period {
                warn!(?elapsed, ?period, "tick overran its period");
            }

            next_tick = planned_start + period;
            let sleep_for = next_tick.saturating_duration_since(Instant::now());
            if sleep_for > Duration::ZERO {
                std::thread::sleep(sleep_for);
            } else {
                next_tick = Instant::now();
            }
        }

        debug!("simulation thread stopping; attempting a final persistence snapshot");
        crate::persist::sync_ops::snapshot_all(sim);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventSink;
    use crate::notify::InMemoryNotifier;
    use crate::persist::Bridge;
    use std::sync::Arc;

    fn fresh_sim() -> Simulation {
        let (_tx, rx) = std::sync::mpsc::channel();
        Simulation::new(
            Arc::new(InMemoryNotifier::new()),
            Arc::new(EventSink::new()),
            Arc::new(Bridge::new()),
            rx,
        )
    }

    #[test]
    fn run_systems_once_does_not_panic_on_empty_world() {
        let mut sim = fresh_sim();
        run_systems_once(&mut sim, Utc::now());
    }

    #[test]
    fn scheduler_stops_immediately_when_running_is_false() {
        let mut sim = fresh_sim();
        let running = std::sync::atomic::AtomicBool::new(false);
        let mut scheduler = Scheduler::new();
        scheduler.run(&mut sim, &running);
    }
}
