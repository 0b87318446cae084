//! Building construction queue + demolition/cancellation helpers (spec.md
//! §4.5). Grounded in `original_source/src/systems/building_construction.py`
//! (queue completion) and `src/core/game.py`'s `_handle_build_building` /
//! `_handle_demolish_building` / `_handle_cancel_build_queue` (submission-time
//! cost/duration/prerequisite logic, reused from `sim::commands`).

use crate::config::{BASE_BUILDING_COSTS, BASE_BUILD_TIMES, BUILDING_PREREQUISITES, CONFIG};
use crate::ecs::components::*;
use crate::persist::sync_ops;
use crate::sim::Simulation;
use chrono::{DateTime, Utc};

/// Cost to bring `building_type` from `current_level` to `current_level + 1`.
pub fn cost_at_level(building_type: &str, current_level: i64) -> (i64, i64, i64) {
    let base = BASE_BUILDING_COSTS.get(building_type).copied().unwrap_or((0, 0, 0));
    let multiplier = 1.5_f64.powi(current_level as i32);
    (
        (base.0 as f64 * multiplier) as i64,
        (base.1 as f64 * multiplier) as i64,
        (base.2 as f64 * multiplier) as i64,
    )
}

pub fn duration_seconds(building_type: &str, current_level: i64, hyperspace_level: i64, robot_factory_level: i64) -> i64 {
    let base = *BASE_BUILD_TIMES.get(building_type).unwrap_or(&60);
    let raw = base as f64 * 1.2_f64.powi(current_level as i32);
    let factor = (1.0 - CONFIG.build_time_reduction_per_hyperspace_level * hyperspace_level as f64)
        * (1.0 - CONFIG.robot_factory_build_time_reduction_per_level * robot_factory_level as f64);
    let factor = factor.max(CONFIG.min_build_time_factor);
    (raw * factor).max(1.0) as i64
}

pub fn prerequisites_met(building_type: &str, buildings: &Buildings) -> bool {
    match BUILDING_PREREQUISITES.get(building_type) {
        Some((req, min_level)) => buildings.get(req) >= *min_level,
        None => true,
    }
}

/// Would demolishing `building_type` by one level break another building's
/// prerequisite? (e.g. shipyard requires robot_factory >= 2; demolishing
/// robot_factory from 2 to 1 while a shipyard exists is refused.)
pub fn demolition_breaks_prerequisite(building_type: &str, new_level: i64, buildings: &Buildings) -> bool {
    BUILDING_PREREQUISITES.iter().any(|(target, (req, min_level))| {
        req == &building_type && buildings.get(target) > 0 && new_level < *min_level
    })
}

pub fn run(sim: &mut Simulation, now: DateTime<Utc>) {
    let entities = sim.world.query2::<BuildQueue, Buildings>();
    for entity in entities {
        step_one(sim, entity, now);
    }
}

/// Inspects only the queue head, per spec.md §4.5 — a tick completes at
/// most one building, never the whole backlog of overdue items at once.
fn step_one(sim: &mut Simulation, entity: EntityId, now: DateTime<Utc>) {
    let head = {
        let queue = sim.world.get::<BuildQueue>(entity).unwrap();
        queue.items.first().cloned()
    };
    let Some(item) = head else { return };

    let Some(completion_time) = item.completion_time else {
        sim.world.get_mut::<BuildQueue>(entity).unwrap().items.remove(0);
        return;
    };
    if now < completion_time {
        return;
    }

    let new_level = {
        let buildings = sim.world.get_mut::<Buildings>(entity).unwrap();
        let level = buildings.get(&item.building_type) + 1;
        buildings.set(&item.building_type, level);
        level
    };
    sim.world.get_mut::<BuildQueue>(entity).unwrap().items.remove(0);

    sync_ops::persist_building_level(sim, entity, &item.building_type, new_level);
    sync_ops::persist_building_complete(sim, entity, &item.building_type);

    if let Some(user_id) = sim.world.get::<Player>(entity).map(|p| p.user_id) {
        let payload = serde_json::json!({
            "type": "building_complete",
            "building_type": item.building_type,
            "level": new_level,
        });
        sim.notifier.notify(user_id, "building_complete", payload.clone(), "info");
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
    fn scenario_3_completion_applies_before_next_production_read() {
        let mut sim = fresh_sim();
        let entity = sim.world.create_entity();
        sim.world.add_component(
            entity,
            Player {
                name: "p".into(),
                user_id: 1,
                last_active: Utc::now(),
            },
        );
        let mut buildings = Buildings::default();
        buildings.metal_mine = 1;
        sim.world.add_component(entity, buildings);
        sim.world.add_component(
            entity,
            BuildQueue {
                items: vec![BuildQueueItem {
                    building_type: "metal_mine".into(),
                    completion_time: Some(Utc::now() - chrono::Duration::seconds(1)),
                    cost: (60, 15, 0),
                    queued_at: Utc::now(),
                    expected_duration_s: 66.0,
                }],
            },
        );
        run(&mut sim, Utc::now());
        assert_eq!(sim.world.get::<Buildings>(entity).unwrap().metal_mine, 2);
        assert!(sim.world.get::<BuildQueue>(entity).unwrap().items.is_empty());
    }

    #[test]
    fn malformed_head_is_dropped() {
        let mut sim = fresh_sim();
        let entity = sim.world.create_entity();
        sim.world.add_component(entity, Buildings::default());
        sim.world.add_component(
            entity,
            BuildQueue {
                items: vec![BuildQueueItem {
                    building_type: "metal_mine".into(),
                    completion_time: None,
                    cost: (0, 0, 0),
                    queued_at: Utc::now(),
                    expected_duration_s: 0.0,
                }],
            },
        );
        run(&mut sim, Utc::now());
        assert!(sim.world.get::<BuildQueue>(entity).unwrap().items.is_empty());
        assert_eq!(sim.world.get::<Buildings>(entity).unwrap().metal_mine, 0);
    }

    #[test]
    fn shipyard_demolition_refused_when_robot_factory_drops_below_prereq() {
        let mut buildings = Buildings::default();
        buildings.robot_factory = 2;
        buildings.shipyard = 1;
        assert!(demolition_breaks_prerequisite("robot_factory", 1, &buildings));
    }
}
