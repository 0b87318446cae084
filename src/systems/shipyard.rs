//! Ship construction queue (spec.md §4.7). Grounded in
//! `original_source/src/systems/shipyard.py` (batched per-tick completion)
//! and `game.py`'s `_handle_build_ships` (submission-time cost/duration/cap
//! checks, reused from `sim::commands`).

use crate::config::{BASE_SHIP_COSTS, BASE_SHIP_TIMES, CONFIG};
use crate::ecs::components::*;
use crate::persist::sync_ops;
use crate::sim::Simulation;
use chrono::{DateTime, Utc};

pub fn cost_for(ship_type: &str, quantity: i64) -> (i64, i64, i64) {
    let unit = BASE_SHIP_COSTS.get(ship_type).copied().unwrap_or((0, 0, 0));
    (unit.0 * quantity, unit.1 * quantity, unit.2 * quantity)
}

pub fn duration_seconds(
    ship_type: &str,
    quantity: i64,
    hyperspace_level: i64,
    shipyard_level: i64,
    robot_factory_level: i64,
) -> i64 {
    let per_unit = *BASE_SHIP_TIMES.get(ship_type).unwrap_or(&60);
    let raw = per_unit as f64 * quantity as f64;
    let hyper_factor = (1.0 - CONFIG.build_time_reduction_per_hyperspace_level * hyperspace_level as f64).max(0.0);
    let shipyard_factor = (1.0 - CONFIG.shipyard_build_time_reduction_per_level * shipyard_level as f64).max(0.0);
    let robot_factor = (1.0 - CONFIG.robot_factory_build_time_reduction_per_level * robot_factory_level as f64).max(0.0);
    let combined = (hyper_factor * shipyard_factor * robot_factor).max(CONFIG.min_build_time_factor);
    (raw * combined).max(1.0) as i64
}

pub fn queue_limit(shipyard_level: i64) -> i64 {
    CONFIG.shipyard_queue_base_limit + CONFIG.shipyard_queue_per_level * shipyard_level.max(0)
}

pub fn max_fleet_size(computer_level: i64) -> i64 {
    CONFIG.base_max_fleet_size + CONFIG.fleet_size_per_computer_level * computer_level.max(0)
}

pub fn run(sim: &mut Simulation, now: DateTime<Utc>) {
    let entities = sim.world.query2::<ShipBuildQueue, Fleet>();
    for entity in entities {
        step_one(sim, entity, now);
    }
}

fn step_one(sim: &mut Simulation, entity: EntityId, now: DateTime<Utc>) {
    let mut completed: Vec<ShipBuildQueueItem> = Vec::new();
    loop {
        let head = {
            let queue = sim.world.get::<ShipBuildQueue>(entity).unwrap();
            queue.items.first().cloned()
        };
        let Some(item) = head else { break };

        let Some(completion_time) = item.completion_time else {
            sim.world.get_mut::<ShipBuildQueue>(entity).unwrap().items.remove(0);
            continue;
        };
        if now < completion_time {
            break;
        }

        {
            let fleet = sim.world.get_mut::<Fleet>(entity).unwrap();
            let updated = fleet.get(&item.ship_type) + item.count.max(0);
            fleet.set(&item.ship_type, updated);
        }
        sim.world.get_mut::<ShipBuildQueue>(entity).unwrap().items.remove(0);
        sync_ops::persist_ship_build_complete(sim, entity, &item.ship_type);
        completed.push(item);
    }

    if completed.is_empty() {
        return;
    }

    if let Some(fleet) = sim.world.get::<Fleet>(entity) {
        sync_ops::persist_fleet(sim, entity, fleet);
    }

    if let Some(user_id) = sim.world.get::<Player>(entity).map(|p| p.user_id) {
        let items: Vec<_> = completed
            .iter()
            .map(|i| serde_json::json!({ "type": i.ship_type, "count": i.count }))
            .collect();
        let payload = serde_json::json!({
            "type": "ship_build_complete_batch",
            "items": items,
        });
        sim.notifier.notify(user_id, "ship_build_complete", payload.clone(), "info");
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
    fn batches_multiple_due_items_in_one_tick() {
        let mut sim = fresh_sim();
        let entity = sim.world.create_entity();
        sim.world.add_component(entity, Fleet::default());
        sim.world.add_component(
            entity,
            ShipBuildQueue {
                items: vec![
                    ShipBuildQueueItem {
                        ship_type: "light_fighter".into(),
                        count: 2,
                        completion_time: Some(Utc::now() - chrono::Duration::seconds(5)),
                        cost: (600, 300, 0),
                        queued_at: Utc::now(),
                    },
                    ShipBuildQueueItem {
                        ship_type: "light_fighter".into(),
                        count: 3,
                        completion_time: Some(Utc::now() - chrono::Duration::seconds(1)),
                        cost: (900, 450, 0),
                        queued_at: Utc::now(),
                    },
                ],
            },
        );
        run(&mut sim, Utc::now());
        assert_eq!(sim.world.get::<Fleet>(entity).unwrap().light_fighter, 5);
        assert!(sim.world.get::<ShipBuildQueue>(entity).unwrap().items.is_empty());
    }

    #[test]
    fn fleet_cap_scenario_5() {
        assert_eq!(max_fleet_size(0), 50);
        assert!(49 + 2 > max_fleet_size(0));
        assert!(48 + 2 <= max_fleet_size(0));
    }
}
