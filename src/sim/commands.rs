//! Command application (spec.md §4.11). Grounded in `original_source/src/
//! core/game.py`'s `_handle_*` methods: per-command validation, resource
//! spend, queue enqueue, and best-effort persistence. Errors are logged and
//! swallowed here — never propagated to the caller, per spec.md §7.

use crate::ecs::components::*;
use crate::ecs::Command;
use crate::errors::CommandError;
use crate::persist::sync_ops;
use crate::sim::market;
use crate::systems::{building_construction, fleet_movement, research, shipyard};
use crate::sim::Simulation;
use chrono::{DateTime, Duration, Utc};

/// Applies one queued command to the simulation. Failures are logged at
/// `info`/`warn` and dropped; nothing here ever panics or bubbles up.
pub fn apply(sim: &mut Simulation, command: Command, now: DateTime<Utc>) {
    let result = match &command {
        Command::BuildBuilding { user_id, building_type } => build_building(sim, *user_id, building_type, now),
        Command::DemolishBuilding { user_id, building_type } => demolish_building(sim, *user_id, building_type),
        Command::CancelBuildQueue { user_id, index } => cancel_build_queue(sim, *user_id, *index),
        Command::UpdatePlayerActivity { user_id } => update_player_activity(sim, *user_id, now),
        Command::StartResearch { user_id, research_type } => start_research(sim, *user_id, research_type, now),
        Command::BuildShips { user_id, ship_type, quantity } => build_ships(sim, *user_id, ship_type, *quantity, now),
        Command::Colonize { user_id, galaxy, system, position, planet_name } => {
            colonize(sim, *user_id, *galaxy, *system, *position, planet_name.as_deref())
        }
        Command::FleetDispatch { user_id, galaxy, system, position, mission, speed, ships } => {
            fleet_dispatch(sim, *user_id, *galaxy, *system, *position, mission.as_deref(), *speed, ships.as_ref(), now)
        }
        Command::FleetRecall { user_id, .. } => fleet_recall(sim, *user_id, now),
        Command::TradeCreateOffer { user_id, offered_resource, offered_amount, requested_resource, requested_amount } => {
            trade_create_offer(sim, *user_id, offered_resource.as_deref(), *offered_amount, requested_resource.as_deref(), *requested_amount)
                .map(|_| ())
        }
        Command::TradeAcceptOffer { user_id, offer_id } => trade_accept_offer(sim, *user_id, *offer_id),
    };

    if let Err(e) = result {
        tracing::info!(user_id = command.user_id(), error = %e, "command rejected");
    }

    if !matches!(command, Command::UpdatePlayerActivity { .. }) {
        let _ = update_player_activity(sim, command.user_id(), now);
    }
}

fn find_entity(sim: &Simulation, user_id: i64) -> Option<EntityId> {
    sim.world.players.iter().find(|(_, p)| p.user_id == user_id).map(|(entity, _)| *entity)
}

fn update_player_activity(sim: &mut Simulation, user_id: i64, now: DateTime<Utc>) -> Result<(), CommandError> {
    let entity = find_entity(sim, user_id).ok_or(CommandError::UnknownPlayer)?;
    let player = sim.world.get_mut::<Player>(entity).ok_or(CommandError::UnknownPlayer)?;
    player.last_active = now;
    Ok(())
}

fn build_building(sim: &mut Simulation, user_id: i64, building_type: &str, now: DateTime<Utc>) -> Result<(), CommandError> {
    let entity = find_entity(sim, user_id).ok_or(CommandError::UnknownPlayer)?;
    if !Buildings::is_known(building_type) {
        return Err(CommandError::UnknownType { kind: "building", value: building_type.to_string() });
    }

    let buildings = sim.world.get::<Buildings>(entity).ok_or(CommandError::UnknownPlayer)?.clone();
    if !building_construction::prerequisites_met(building_type, &buildings) {
        return Err(CommandError::PrerequisiteUnmet(building_type.to_string()));
    }

    let current_level = buildings.get(building_type);
    let cost = building_construction::cost_at_level(building_type, current_level);
    let hyper_level = sim.world.get::<Research>(entity).map(|r| r.hyperspace).unwrap_or(0);
    let duration = building_construction::duration_seconds(building_type, current_level, hyper_level, buildings.robot_factory);

    let resources = sim.world.get::<Resources>(entity).ok_or(CommandError::UnknownPlayer)?;
    if resources.metal < cost.0 || resources.crystal < cost.1 || resources.deuterium < cost.2 {
        return Err(CommandError::InsufficientResources);
    }

    {
        let resources = sim.world.get_mut::<Resources>(entity).unwrap();
        resources.metal -= cost.0;
        resources.crystal -= cost.1;
        resources.deuterium -= cost.2;
    }

    let completion_time = now + Duration::seconds(duration);
    if !sim.world.has::<BuildQueue>(entity) {
        sim.world.add_component(entity, BuildQueue::default());
    }
    let queue = sim.world.get_mut::<BuildQueue>(entity).ok_or(CommandError::UnknownPlayer)?;
    queue.items.push(BuildQueueItem {
        building_type: building_type.to_string(),
        completion_time: Some(completion_time),
        cost,
        queued_at: now,
        expected_duration_s: duration as f64,
    });

    crate::metrics::record_timer("queue.build.planned_s", std::time::Duration::from_secs(duration.max(0) as u64));
    sync_ops::persist_building_enqueue(sim, entity, building_type, current_level + 1, now, completion_time);
    Ok(())
}

fn demolish_building(sim: &mut Simulation, user_id: i64, building_type: &str) -> Result<(), CommandError> {
    let entity = find_entity(sim, user_id).ok_or(CommandError::UnknownPlayer)?;
    if !Buildings::is_known(building_type) {
        return Err(CommandError::UnknownType { kind: "building", value: building_type.to_string() });
    }

    let buildings = sim.world.get::<Buildings>(entity).ok_or(CommandError::UnknownPlayer)?.clone();
    let current_level = buildings.get(building_type);
    if current_level <= 0 {
        return Err(CommandError::PrerequisiteUnmet(building_type.to_string()));
    }
    let new_level = current_level - 1;
    if building_construction::demolition_breaks_prerequisite(building_type, new_level, &buildings) {
        return Err(CommandError::PrerequisiteUnmet(format!("demolishing {building_type} would break a dependent building")));
    }

    sim.world.get_mut::<Buildings>(entity).unwrap().set(building_type, new_level);

    let refund = building_construction::cost_at_level(building_type, new_level);
    let resources = sim.world.get_mut::<Resources>(entity).unwrap();
    resources.metal += (refund.0 as f64 * 0.3) as i64;
    resources.crystal += (refund.1 as f64 * 0.3) as i64;
    resources.deuterium += (refund.2 as f64 * 0.3) as i64;

    sync_ops::persist_building_level(sim, entity, building_type, new_level);
    Ok(())
}

fn cancel_build_queue(sim: &mut Simulation, user_id: i64, index: Option<usize>) -> Result<(), CommandError> {
    let index = index.ok_or(CommandError::UnknownType { kind: "index", value: "missing".to_string() })?;
    let entity = find_entity(sim, user_id).ok_or(CommandError::UnknownPlayer)?;
    let queue = sim.world.get_mut::<BuildQueue>(entity).ok_or(CommandError::UnknownPlayer)?;
    if index >= queue.items.len() {
        return Err(CommandError::UnknownType { kind: "queue index", value: index.to_string() });
    }
    let item = queue.items.remove(index);

    let resources = sim.world.get_mut::<Resources>(entity).unwrap();
    resources.metal += (item.cost.0 as f64 * 0.5) as i64;
    resources.crystal += (item.cost.1 as f64 * 0.5) as i64;
    resources.deuterium += (item.cost.2 as f64 * 0.5) as i64;
    Ok(())
}

fn start_research(sim: &mut Simulation, user_id: i64, research_type: &str, now: DateTime<Utc>) -> Result<(), CommandError> {
    let entity = find_entity(sim, user_id).ok_or(CommandError::UnknownPlayer)?;
    if !Research::is_known(research_type) {
        return Err(CommandError::UnknownType { kind: "research", value: research_type.to_string() });
    }

    let research_comp = sim.world.get::<Research>(entity).ok_or(CommandError::UnknownPlayer)?.clone();
    if !research::prerequisites_met(research_type, &research_comp) {
        return Err(CommandError::PrerequisiteUnmet(research_type.to_string()));
    }

    let current_level = research_comp.get(research_type);
    let cost = research::cost_at_level(research_type, current_level);
    let lab_level = sim.world.get::<Buildings>(entity).map(|b| b.research_lab).unwrap_or(0);
    let duration = research::duration_seconds(research_type, current_level, lab_level);

    let resources = sim.world.get::<Resources>(entity).ok_or(CommandError::UnknownPlayer)?;
    if resources.metal < cost.0 || resources.crystal < cost.1 || resources.deuterium < cost.2 {
        return Err(CommandError::InsufficientResources);
    }
    {
        let resources = sim.world.get_mut::<Resources>(entity).unwrap();
        resources.metal -= cost.0;
        resources.crystal -= cost.1;
        resources.deuterium -= cost.2;
    }

    let completion_time = now + Duration::seconds(duration);
    if !sim.world.has::<ResearchQueue>(entity) {
        sim.world.add_component(entity, ResearchQueue::default());
    }
    let queue = sim.world.get_mut::<ResearchQueue>(entity).ok_or(CommandError::UnknownPlayer)?;
    queue.items.push(ResearchQueueItem {
        research_type: research_type.to_string(),
        completion_time: Some(completion_time),
        cost,
        queued_at: now,
    });

    crate::metrics::record_timer("queue.research.planned_s", std::time::Duration::from_secs(duration.max(0) as u64));
    sync_ops::persist_research_enqueue(sim, user_id, research_type, current_level + 1, now, completion_time);
    Ok(())
}

fn build_ships(sim: &mut Simulation, user_id: i64, ship_type: &str, quantity: i64, now: DateTime<Utc>) -> Result<(), CommandError> {
    let entity = find_entity(sim, user_id).ok_or(CommandError::UnknownPlayer)?;
    if !Fleet::is_known(ship_type) {
        return Err(CommandError::UnknownType { kind: "ship", value: ship_type.to_string() });
    }
    let quantity = quantity.max(1);

    let buildings = sim.world.get::<Buildings>(entity).ok_or(CommandError::UnknownPlayer)?.clone();
    if buildings.shipyard <= 0 {
        return Err(CommandError::PrerequisiteUnmet("shipyard".to_string()));
    }

    let fleet = sim.world.get::<Fleet>(entity).ok_or(CommandError::UnknownPlayer)?.clone();
    let queued: i64 = sim.world.get::<ShipBuildQueue>(entity).map(|q| q.items.iter().map(|i| i.count).sum()).unwrap_or(0);
    let computer_level = sim.world.get::<Research>(entity).map(|r| r.computer).unwrap_or(0);
    let max_allowed = shipyard::max_fleet_size(computer_level);
    if fleet.total() + queued + quantity > max_allowed {
        return Err(CommandError::FleetCapExceeded {
            current: fleet.total() + queued,
            requested: quantity,
            max: max_allowed,
        });
    }

    let queue_limit = shipyard::queue_limit(buildings.shipyard);
    let queue_len = sim.world.get::<ShipBuildQueue>(entity).map(|q| q.items.len()).unwrap_or(0);
    if queue_len as i64 >= queue_limit {
        return Err(CommandError::QueueFull(queue_limit as usize));
    }

    let cost = shipyard::cost_for(ship_type, quantity);
    let hyper_level = sim.world.get::<Research>(entity).map(|r| r.hyperspace).unwrap_or(0);
    let duration = shipyard::duration_seconds(ship_type, quantity, hyper_level, buildings.shipyard, buildings.robot_factory);

    let resources = sim.world.get::<Resources>(entity).ok_or(CommandError::UnknownPlayer)?;
    if resources.metal < cost.0 || resources.crystal < cost.1 || resources.deuterium < cost.2 {
        return Err(CommandError::InsufficientResources);
    }
    {
        let resources = sim.world.get_mut::<Resources>(entity).unwrap();
        resources.metal -= cost.0;
        resources.crystal -= cost.1;
        resources.deuterium -= cost.2;
    }

    let completion_time = now + Duration::seconds(duration);
    if !sim.world.has::<ShipBuildQueue>(entity) {
        sim.world.add_component(entity, ShipBuildQueue::default());
    }
    let queue = sim.world.get_mut::<ShipBuildQueue>(entity).ok_or(CommandError::UnknownPlayer)?;
    queue.items.push(ShipBuildQueueItem {
        ship_type: ship_type.to_string(),
        count: quantity,
        completion_time: Some(completion_time),
        cost,
        queued_at: now,
    });

    sync_ops::persist_ship_build_enqueue(sim, entity, ship_type, quantity, completion_time);
    Ok(())
}

/// Immediate colonization using a stationed colony ship, distinct from
/// dispatching a fleet with mission `colonize` (spec.md §4.8's two-phase
/// travel path). Matches `_handle_colonize`'s direct-grant semantics.
fn colonize(sim: &mut Simulation, user_id: i64, galaxy: i64, system: i64, position: i64, _planet_name: Option<&str>) -> Result<(), CommandError> {
    if galaxy <= 0 || system <= 0 || position <= 0 {
        return Err(CommandError::UnknownType { kind: "coordinates", value: format!("{galaxy}:{system}:{position}") });
    }
    let entity = find_entity(sim, user_id).ok_or(CommandError::UnknownPlayer)?;
    let colony_ships = sim.world.get::<Fleet>(entity).map(|f| f.colony_ship).unwrap_or(0);
    if colony_ships <= 0 {
        return Err(CommandError::PrerequisiteUnmet("colony_ship".to_string()));
    }
    let target = Coords { galaxy, system, planet: position };
    let occupied = sim.world.positions.values().any(|p| p.coords() == target);
    if occupied {
        return Err(CommandError::CoordinatesOccupied);
    }

    sim.world.get_mut::<Fleet>(entity).unwrap().colony_ship = colony_ships - 1;
    if let Some(fleet) = sim.world.get::<Fleet>(entity) {
        sync_ops::persist_fleet(sim, entity, fleet);
    }
    Ok(())
}

fn fleet_dispatch(
    sim: &mut Simulation,
    user_id: i64,
    galaxy: i64,
    system: i64,
    position: i64,
    mission: Option<&str>,
    speed: Option<f64>,
    ships: Option<&std::collections::HashMap<String, i64>>,
    now: DateTime<Utc>,
) -> Result<(), CommandError> {
    if galaxy <= 0 || system <= 0 || position <= 0 {
        return Err(CommandError::UnknownType { kind: "coordinates", value: format!("{galaxy}:{system}:{position}") });
    }
    let mission = mission.unwrap_or("transfer").to_string();
    let entity = find_entity(sim, user_id).ok_or(CommandError::UnknownPlayer)?;
    if sim.world.has::<FleetMovement>(entity) {
        return Err(CommandError::PrerequisiteUnmet("fleet already in flight".to_string()));
    }

    let origin = sim.world.get::<Position>(entity).ok_or(CommandError::UnknownPlayer)?.coords();
    let target = Coords { galaxy, system, planet: position };

    let research_comp = sim.world.get::<Research>(entity).cloned().unwrap_or_default();
    let fleet = sim.world.get::<Fleet>(entity).ok_or(CommandError::UnknownPlayer)?.clone();
    let effective_speed = effective_fleet_speed(&fleet, ships, &research_comp);
    let mut user_factor = speed.unwrap_or(1.0);
    if user_factor <= 0.0 || user_factor > 1.0 {
        user_factor = 1.0;
    }
    let speed_value = (effective_speed * user_factor).max(1.0);

    let duration = fleet_movement::travel_seconds(origin, target, speed_value);
    let movement = FleetMovement {
        origin,
        target,
        departure_time: now,
        arrival_time: now + Duration::seconds(duration),
        speed: speed_value,
        mission: mission.clone(),
        owner_id: user_id,
        recalled: false,
        colonizing_until: None,
    };
    sim.world.add_component(entity, movement.clone());
    sync_ops::persist_fleet_mission_upsert(sim, user_id, &movement);

    if mission.eq_ignore_ascii_case("attack") {
        if let Some((defender_entity, _)) = sim.world.positions.iter().find(|(_, p)| p.coords() == target) {
            if let Some(defender_id) = sim.world.get::<Player>(*defender_entity).map(|p| p.user_id) {
                let payload = serde_json::json!({
                    "type": "incoming_attack",
                    "attacker_user_id": user_id,
                    "origin": { "galaxy": origin.galaxy, "system": origin.system, "planet": origin.planet },
                    "target": { "galaxy": galaxy, "system": system, "planet": position },
                    "eta": movement.arrival_time,
                });
                sim.events.send(defender_id, payload.clone());
                sim.notifier.notify(defender_id, "incoming_attack", payload, "critical");
            }
        }
    }
    Ok(())
}

fn effective_fleet_speed(fleet: &Fleet, ships: Option<&std::collections::HashMap<String, i64>>, research: &Research) -> f64 {
    use crate::config::{BASE_SHIP_STATS, HYPERSPACE_SPEED_PER_LEVEL};
    let speed_for = |kind: &str| -> f64 {
        let base = BASE_SHIP_STATS.get(kind).map(|s| s.2).unwrap_or(0) as f64;
        base * (1.0 + HYPERSPACE_SPEED_PER_LEVEL * research.hyperspace as f64)
    };

    if let Some(ships) = ships {
        let min = ships
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(kind, _)| speed_for(kind))
            .filter(|s| *s > 0.0)
            .reduce(f64::min);
        if let Some(min) = min {
            return min;
        }
    }

    let max = ["light_fighter", "heavy_fighter", "cruiser", "battleship", "bomber", "colony_ship"]
        .into_iter()
        .filter(|kind| fleet.get(kind) > 0)
        .map(speed_for)
        .filter(|s| *s > 0.0)
        .reduce(f64::max);
    if let Some(max) = max {
        return max;
    }

    speed_for("light_fighter").max(5000.0)
}

fn fleet_recall(sim: &mut Simulation, user_id: i64, now: DateTime<Utc>) -> Result<(), CommandError> {
    let entity = find_entity(sim, user_id).ok_or(CommandError::UnknownPlayer)?;
    fleet_movement::recall(sim, entity, now)
}

fn trade_create_offer(
    sim: &mut Simulation,
    user_id: i64,
    offered_resource: Option<&str>,
    offered_amount: i64,
    requested_resource: Option<&str>,
    requested_amount: i64,
) -> Result<i64, CommandError> {
    let entity = find_entity(sim, user_id).ok_or(CommandError::UnknownPlayer)?;
    let offered_resource = offered_resource.ok_or(CommandError::UnknownType { kind: "resource", value: "missing".to_string() })?;
    let requested_resource = requested_resource.ok_or(CommandError::UnknownType { kind: "resource", value: "missing".to_string() })?;
    market::create_offer(sim, entity, offered_resource, offered_amount, requested_resource, requested_amount)
}

fn trade_accept_offer(sim: &mut Simulation, user_id: i64, offer_id: i64) -> Result<(), CommandError> {
    let entity = find_entity(sim, user_id).ok_or(CommandError::UnknownPlayer)?;
    market::accept_offer(sim, entity, offer_id)
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

    fn seed_full_player(sim: &mut Simulation, user_id: i64) -> EntityId {
        let entity = sim.world.create_entity();
        sim.world.add_component(entity, Player { name: "p".into(), user_id, last_active: Utc::now() });
        sim.world.add_component(entity, Position { galaxy: 1, system: 1, planet: user_id });
        sim.world.add_component(entity, Resources { metal: 100_000, crystal: 100_000, deuterium: 100_000 });
        sim.world.add_component(entity, ResourceProduction { metal_rate: 30.0, crystal_rate: 15.0, deuterium_rate: 10.0, last_update: Utc::now() });
        sim.world.add_component(entity, Buildings::default());
        sim.world.add_component(entity, BuildQueue::default());
        sim.world.add_component(entity, ShipBuildQueue::default());
        sim.world.add_component(entity, Fleet::default());
        sim.world.add_component(entity, Research::default());
        sim.world.add_component(entity, ResearchQueue::default());
        sim.world.add_component(entity, Planet::default());
        entity
    }

    #[test]
    fn build_building_deducts_cost_and_enqueues() {
        let mut sim = fresh_sim();
        seed_full_player(&mut sim, 1);
        build_building(&mut sim, 1, "metal_mine", Utc::now()).unwrap();
        let entity = find_entity(&sim, 1).unwrap();
        assert_eq!(sim.world.get::<BuildQueue>(entity).unwrap().items.len(), 1);
        assert!(sim.world.get::<Resources>(entity).unwrap().metal < 100_000);
    }

    #[test]
    fn build_shipyard_requires_level_one() {
        let mut sim = fresh_sim();
        seed_full_player(&mut sim, 1);
        let result = build_ships(&mut sim, 1, "light_fighter", 1, Utc::now());
        assert!(matches!(result, Err(CommandError::PrerequisiteUnmet(_))));
    }

    #[test]
    fn colonize_requires_colony_ship() {
        let mut sim = fresh_sim();
        seed_full_player(&mut sim, 1);
        let result = colonize(&mut sim, 1, 2, 2, 2, None);
        assert!(matches!(result, Err(CommandError::PrerequisiteUnmet(_))));
    }

    #[test]
    fn start_research_attaches_missing_queue_without_losing_resources() {
        let mut sim = fresh_sim();
        let entity = sim.world.create_entity();
        sim.world.add_component(entity, Player { name: "p".into(), user_id: 1, last_active: Utc::now() });
        sim.world.add_component(entity, Position { galaxy: 1, system: 1, planet: 1 });
        sim.world.add_component(entity, Resources { metal: 100_000, crystal: 100_000, deuterium: 100_000 });
        sim.world.add_component(entity, Buildings::default());
        sim.world.add_component(entity, Research::default());
        assert!(!sim.world.has::<ResearchQueue>(entity));

        start_research(&mut sim, 1, "energy", Utc::now()).unwrap();

        let queue = sim.world.get::<ResearchQueue>(entity).unwrap();
        assert_eq!(queue.items.len(), 1);
        assert!(sim.world.get::<Resources>(entity).unwrap().metal < 100_000);
    }

    #[test]
    fn dispatch_then_recall_round_trips() {
        let mut sim = fresh_sim();
        seed_full_player(&mut sim, 1);
        sim.world.get_mut::<Fleet>(find_entity(&sim, 1).unwrap()).unwrap().light_fighter = 1;
        let now = Utc::now();
        fleet_dispatch(&mut sim, 1, 1, 1, 5, Some("transfer"), None, None, now).unwrap();
        let entity = find_entity(&sim, 1).unwrap();
        assert!(sim.world.has::<FleetMovement>(entity));
        fleet_recall(&mut sim, 1, now).unwrap();
        assert!(sim.world.get::<FleetMovement>(entity).unwrap().recalled);
    }
}
