//! Fleet movement system (spec.md §4.8). Grounded in
//! `original_source/src/systems/fleet_movement.py` (arrival finalization,
//! two-phase colonize, espionage snapshot) and `src/core/game.py`'s
//! `_handle_fleet_dispatch`/`_handle_fleet_recall` (travel-time formula and
//! recall, reused from `sim::commands`).

use crate::config::CONFIG;
use crate::ecs::components::*;
use crate::errors::CommandError;
use crate::persist::sync_ops;
use crate::sim::Simulation;
use chrono::{DateTime, Duration, Utc};

/// Straight-line distance in abstract units, linearized across
/// galaxy/system/planet, matching `_handle_fleet_dispatch`.
pub fn distance_units(origin: Coords, target: Coords) -> i64 {
    let dg = (target.galaxy - origin.galaxy).abs();
    let ds = (target.system - origin.system).abs();
    let dp = (target.planet - origin.planet).abs();
    dg * CONFIG.systems_per_galaxy * CONFIG.positions_per_system + ds * CONFIG.positions_per_system + dp
}

pub fn travel_seconds(origin: Coords, target: Coords, speed: f64) -> i64 {
    let dist = distance_units(origin, target) as f64;
    let speed = speed.max(1.0);
    ((dist / speed) * 3600.0).round().max(1.0) as i64
}

pub fn run(sim: &mut Simulation, now: DateTime<Utc>) {
    let entities = sim.world.query2::<Fleet, FleetMovement>();
    for entity in entities {
        step_one(sim, entity, now);
    }
}

fn step_one(sim: &mut Simulation, entity: EntityId, now: DateTime<Utc>) {
    let arrival = sim.world.get::<FleetMovement>(entity).unwrap().arrival_time;
    if now < arrival {
        return;
    }

    let mission = sim.world.get::<FleetMovement>(entity).unwrap().mission.to_lowercase();
    let recalled = sim.world.get::<FleetMovement>(entity).unwrap().recalled;

    if mission == "colonize" && !recalled {
        step_colonize(sim, entity, now);
        return;
    }

    let target = sim.world.get::<FleetMovement>(entity).unwrap().target;
    sim.world.add_component(
        entity,
        Position {
            galaxy: target.galaxy,
            system: target.system,
            planet: target.planet,
        },
    );

    if mission == "espionage" {
        emit_espionage_report(sim, entity, target, now);
    }

    sim.world.remove_component::<FleetMovement>(entity);
    if let Some(user_id) = sim.world.get::<Player>(entity).map(|p| p.user_id) {
        sync_ops::persist_fleet_mission_delete(sim, user_id);
    }
}

fn step_colonize(sim: &mut Simulation, entity: EntityId, now: DateTime<Utc>) {
    let colonizing_until = sim.world.get::<FleetMovement>(entity).unwrap().colonizing_until;

    if colonizing_until.is_none() {
        let has_colony_ship = sim.world.get::<Fleet>(entity).map(|f| f.colony_ship > 0).unwrap_or(false);
        if !has_colony_ship {
            abort_colonize(sim, entity);
            return;
        }
        let base = sim.world.get::<FleetMovement>(entity).unwrap().arrival_time;
        let until = base + Duration::seconds(CONFIG.colonization_time_seconds);
        {
            let movement = sim.world.get_mut::<FleetMovement>(entity).unwrap();
            movement.colonizing_until = Some(until);
            movement.arrival_time = until;
        }
        if now < until {
            return;
        }
    }

    finalize_colonize(sim, entity, now);
}

fn abort_colonize(sim: &mut Simulation, entity: EntityId) {
    sim.world.remove_component::<FleetMovement>(entity);
    if let Some(user_id) = sim.world.get::<Player>(entity).map(|p| p.user_id) {
        sync_ops::persist_fleet_mission_delete(sim, user_id);
        let payload = serde_json::json!({ "type": "colonize_aborted_no_ship" });
        sim.notifier.notify(user_id, "colonize_aborted_no_ship", payload.clone(), "warning");
        sim.events.send(user_id, payload);
    }
}

fn finalize_colonize(sim: &mut Simulation, entity: EntityId, now: DateTime<Utc>) {
    let target = sim.world.get::<FleetMovement>(entity).unwrap().target;
    let occupied = sim.world.positions.values().any(|p| p.coords() == target);

    let success = !occupied;
    if success {
        if let Some(fleet) = sim.world.get_mut::<Fleet>(entity) {
            fleet.colony_ship = (fleet.colony_ship - 1).max(0);
        }
        if let Some(fleet) = sim.world.get::<Fleet>(entity) {
            sync_ops::persist_fleet(sim, entity, fleet);
        }
    }

    sim.world.remove_component::<FleetMovement>(entity);
    if let Some(user_id) = sim.world.get::<Player>(entity).map(|p| p.user_id) {
        sync_ops::persist_fleet_mission_delete(sim, user_id);
        let payload = serde_json::json!({
            "type": "colonize_complete",
            "success": success,
            "target": { "galaxy": target.galaxy, "system": target.system, "planet": target.planet },
        });
        sim.notifier.notify(user_id, "colonize_complete", payload.clone(), "info");
        sim.events.send(user_id, payload);
    }
    let _ = now;
}

fn emit_espionage_report(sim: &mut Simulation, entity: EntityId, target: Coords, now: DateTime<Utc>) {
    let attacker_user_id = sim.world.get::<Player>(entity).map(|p| p.user_id).unwrap_or(0);

    let defender_entity = sim.world.positions.iter().find_map(|(ent, pos)| {
        if pos.coords() != target || *ent == entity {
            return None;
        }
        let is_player = sim.world.get::<Player>(*ent).map(|p| p.user_id != attacker_user_id).unwrap_or(false);
        is_player.then_some(*ent)
    });

    let Some(defender_entity) = defender_entity else { return };
    let defender_user_id = sim.world.get::<Player>(defender_entity).map(|p| p.user_id);

    let snapshot = EspionageSnapshot {
        planet: sim.world.get::<Planet>(defender_entity).cloned().unwrap_or_default(),
        resources: sim.world.get::<Resources>(defender_entity).copied().unwrap_or_default(),
        buildings: sim.world.get::<Buildings>(defender_entity).cloned().unwrap_or_default(),
        fleet: sim.world.get::<Fleet>(defender_entity).cloned().unwrap_or_default(),
    };

    let report = EspionageReport {
        id: sim.ids.next_espionage_report(),
        attacker_user_id,
        defender_user_id,
        location: target,
        snapshot,
        created_at: now,
    };
    sim.espionage_reports.push(report.clone());
    sync_ops::persist_espionage_report(sim, &report);

    sim.events.send(attacker_user_id, serde_json::json!({ "type": "espionage_report", "report": report }));
    sim.notifier.notify(
        attacker_user_id,
        "espionage_report",
        serde_json::json!({ "type": "espionage_report", "report_id": report.id }),
        "info",
    );
}

/// Recall an in-flight fleet: flips target/origin and restarts the ETA from
/// elapsed travel time, matching `_handle_fleet_recall`. Idempotent when
/// already recalled; rejected once arrived.
pub fn recall(sim: &mut Simulation, entity: EntityId, now: DateTime<Utc>) -> Result<(), CommandError> {
    let movement = sim.world.get::<FleetMovement>(entity).ok_or(CommandError::RecallRejected)?;
    if now >= movement.arrival_time {
        return Err(CommandError::RecallRejected);
    }
    if movement.recalled {
        return Ok(());
    }

    let elapsed = now.signed_duration_since(movement.departure_time);
    let (origin, target) = (movement.origin, movement.target);

    {
        let movement = sim.world.get_mut::<FleetMovement>(entity).unwrap();
        movement.target = origin;
        movement.origin = target;
        movement.recalled = true;
        movement.departure_time = now;
        movement.arrival_time = now + elapsed;
    }

    if let Some(user_id) = sim.world.get::<Player>(entity).map(|p| p.user_id) {
        let movement = sim.world.get::<FleetMovement>(entity).unwrap();
        sync_ops::persist_fleet_mission_upsert(sim, user_id, movement);
    }
    Ok(())
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

    fn coords(g: i64, s: i64, p: i64) -> Coords {
        Coords { galaxy: g, system: s, planet: p }
    }

    fn seed_mover(sim: &mut Simulation, mission: &str, arrival_ago_secs: i64, colony_ship: i64) -> EntityId {
        let entity = sim.world.create_entity();
        sim.world.add_component(
            entity,
            Player { name: "p".into(), user_id: entity as i64, last_active: Utc::now() },
        );
        let mut fleet = Fleet::default();
        fleet.colony_ship = colony_ship;
        sim.world.add_component(entity, fleet);
        sim.world.add_component(
            entity,
            FleetMovement {
                origin: coords(1, 1, 1),
                target: coords(1, 1, 2),
                departure_time: Utc::now() - Duration::seconds(arrival_ago_secs + 10),
                arrival_time: Utc::now() - Duration::seconds(arrival_ago_secs),
                speed: 5000.0,
                mission: mission.to_string(),
                owner_id: entity as i64,
                recalled: false,
                colonizing_until: None,
            },
        );
        entity
    }

    #[test]
    fn transfer_mission_updates_position_and_detaches() {
        let mut sim = fresh_sim();
        let entity = seed_mover(&mut sim, "transfer", 1, 0);
        run(&mut sim, Utc::now());
        assert!(!sim.world.has::<FleetMovement>(entity));
        assert_eq!(sim.world.get::<Position>(entity).unwrap().coords(), coords(1, 1, 2));
    }

    #[test]
    fn colonize_without_ship_aborts() {
        let mut sim = fresh_sim();
        let entity = seed_mover(&mut sim, "colonize", 1, 0);
        run(&mut sim, Utc::now());
        assert!(!sim.world.has::<FleetMovement>(entity));
    }

    #[test]
    fn colonize_with_ship_starts_second_phase() {
        let mut sim = fresh_sim();
        let entity = seed_mover(&mut sim, "colonize", 1, 1);
        run(&mut sim, Utc::now());
        assert!(sim.world.has::<FleetMovement>(entity));
        assert!(sim.world.get::<FleetMovement>(entity).unwrap().colonizing_until.is_some());
    }

    #[test]
    fn recall_flips_target_and_origin() {
        let mut sim = fresh_sim();
        let entity = sim.world.create_entity();
        sim.world.add_component(
            entity,
            Player { name: "p".into(), user_id: 1, last_active: Utc::now() },
        );
        sim.world.add_component(
            entity,
            FleetMovement {
                origin: coords(1, 1, 1),
                target: coords(1, 1, 5),
                departure_time: Utc::now() - Duration::seconds(30),
                arrival_time: Utc::now() + Duration::seconds(30),
                speed: 5000.0,
                mission: "transfer".into(),
                owner_id: 1,
                recalled: false,
                colonizing_until: None,
            },
        );
        recall(&mut sim, entity, Utc::now()).unwrap();
        let movement = sim.world.get::<FleetMovement>(entity).unwrap();
        assert!(movement.recalled);
        assert_eq!(movement.target, coords(1, 1, 1));
    }

    #[test]
    fn recall_after_arrival_rejected() {
        let mut sim = fresh_sim();
        let entity = seed_mover(&mut sim, "transfer", 5, 0);
        let result = recall(&mut sim, entity, Utc::now());
        assert!(matches!(result, Err(CommandError::RecallRejected)));
    }
}
