//! Research queue completion (spec.md §4.6). Grounded in
//! `original_source/src/systems/research.py` (queue completion, analogous to
//! building construction) and `game.py`'s `_handle_start_research`
//! (submission-time cost/duration/prerequisite logic, reused from
//! `sim::commands`).

use crate::config::{BASE_RESEARCH_COSTS, BASE_RESEARCH_TIMES, CONFIG, RESEARCH_PREREQUISITES};
use crate::ecs::components::*;
use crate::persist::sync_ops;
use crate::sim::Simulation;
use chrono::{DateTime, Utc};

pub fn cost_at_level(research_type: &str, current_level: i64) -> (i64, i64, i64) {
    let base = BASE_RESEARCH_COSTS.get(research_type).copied().unwrap_or((0, 0, 0));
    let multiplier = 1.6_f64.powi(current_level as i32);
    (
        (base.0 as f64 * multiplier) as i64,
        (base.1 as f64 * multiplier) as i64,
        (base.2 as f64 * multiplier) as i64,
    )
}

pub fn duration_seconds(research_type: &str, current_level: i64, research_lab_level: i64) -> i64 {
    let base = *BASE_RESEARCH_TIMES.get(research_type).unwrap_or(&120);
    let raw = base as f64 * 1.25_f64.powi(current_level as i32);
    let factor = (1.0 - CONFIG.research_lab_time_reduction_per_level * research_lab_level as f64)
        .max(CONFIG.min_research_time_factor);
    (raw * factor).max(1.0) as i64
}

pub fn prerequisites_met(research_type: &str, research: &Research) -> bool {
    match RESEARCH_PREREQUISITES.get(research_type) {
        Some(reqs) => reqs.iter().all(|(req, min_level)| research.get(req) >= *min_level),
        None => true,
    }
}

pub fn run(sim: &mut Simulation, now: DateTime<Utc>) {
    let entities = sim.world.query2::<ResearchQueue, Research>();
    for entity in entities {
        step_one(sim, entity, now);
    }
}

/// Inspects only the queue head, per spec.md §4.6 ("analogous to §4.5") —
/// a tick completes at most one research level, never the whole backlog
/// of overdue items at once.
fn step_one(sim: &mut Simulation, entity: EntityId, now: DateTime<Utc>) {
    let head = {
        let queue = sim.world.get::<ResearchQueue>(entity).unwrap();
        queue.items.first().cloned()
    };
    let Some(item) = head else { return };

    let Some(completion_time) = item.completion_time else {
        sim.world.get_mut::<ResearchQueue>(entity).unwrap().items.remove(0);
        return;
    };
    if now < completion_time {
        return;
    }

    let new_level = {
        let research = sim.world.get_mut::<Research>(entity).unwrap();
        let level = research.get(&item.research_type) + 1;
        research.set(&item.research_type, level);
        level
    };
    sim.world.get_mut::<ResearchQueue>(entity).unwrap().items.remove(0);

    if let Some(user_id) = sim.world.get::<Player>(entity).map(|p| p.user_id) {
        sync_ops::persist_research_level(sim, user_id, &item.research_type, new_level);
        sync_ops::persist_research_complete(sim, user_id, &item.research_type);
        let payload = serde_json::json!({
            "type": "research_complete",
            "research_type": item.research_type,
            "level": new_level,
        });
        sim.notifier.notify(user_id, "research_complete", payload.clone(), "info");
        sim.events.send(user_id, payload);
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
    fn completes_due_item() {
        let mut sim = fresh_sim();
        let entity = sim.world.create_entity();
        sim.world.add_component(entity, Research::default());
        sim.world.add_component(
            entity,
            ResearchQueue {
                items: vec![ResearchQueueItem {
                    research_type: "energy".into(),
                    completion_time: Some(Utc::now() - chrono::Duration::seconds(1)),
                    cost: (100, 50, 0),
                    queued_at: Utc::now(),
                }],
            },
        );
        run(&mut sim, Utc::now());
        assert_eq!(sim.world.get::<Research>(entity).unwrap().energy, 1);
    }

    #[test]
    fn ion_requires_laser_four() {
        let mut research = Research::default();
        research.laser = 3;
        assert!(!prerequisites_met("ion", &research));
        research.laser = 4;
        assert!(prerequisites_met("ion", &research));
    }
}
