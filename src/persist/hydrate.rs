//! Startup hydration and offline resource accrual (spec.md §4.13).
//! Grounded in `original_source/src/core/game.py`'s `load_player_data` and
//! `_apply_offline_resource_accrual`.
//!
//! One entity per user, addressed by `user_id` cast to `EntityId` directly
//! (a deliberate simplification over a separate id-allocation table,
//! recorded in DESIGN.md): the spec's per-entity component shapes
//! (`Resources`, `Buildings`, `Fleet`, `Research`, `BuildQueue`, …) model a
//! single *active* planet per player, so each user's home planet (lowest
//! `planets.id` for that `owner_id`) is the one materialized into the
//! entity's components. The entity -> `planets.id` correlation is kept in
//! `Simulation::planet_id_of` purely so the bridge can address planet/
//! building/fleet/ship-queue rows, which are keyed by planet id in the
//! schema (spec.md §6.3).

use crate::config::{BASE_BUILDING_COSTS, BASE_RESEARCH_COSTS, BASE_SHIP_COSTS};
use crate::db::db_models;
use crate::db::DbClient;
use crate::ecs::components::*;
use crate::errors::PersistError;
use crate::sim::Simulation;
use crate::systems;
use chrono::Utc;
use std::collections::HashMap;

pub async fn hydrate(sim: &mut Simulation, db: &DbClient) -> Result<(), PersistError> {
    let users = db.list_users().await?;
    let planet_rows = db.list_planets().await?;
    let building_rows = db.list_all_buildings().await?;
    let fleet_rows = db.list_all_fleets().await?;
    let research_rows = db.list_all_research().await?;
    let build_queue_rows = db.list_pending_building_queue().await?;
    let research_queue_rows = db.list_pending_research_queue().await?;
    let ship_queue_rows = db.list_pending_ship_build_queue().await?;
    let mission_rows = db.list_all_fleet_missions().await?;
    let offer_rows = db.list_open_trade_offers().await?;

    let now = Utc::now();

    // One home planet per owner: the lowest-id planet row.
    let mut home_planet: HashMap<i64, &db_models::PlanetRow> = HashMap::new();
    for row in &planet_rows {
        home_planet
            .entry(row.owner_id)
            .and_modify(|existing| {
                if row.id < existing.id {
                    *existing = row;
                }
            })
            .or_insert(row);
    }

    let mut buildings_by_planet: HashMap<i64, Buildings> = HashMap::new();
    for row in &building_rows {
        let entry = buildings_by_planet.entry(row.planet_id).or_default();
        entry.set(&row.building_type, row.level as i64);
    }

    let mut fleet_by_planet: HashMap<i64, Fleet> = HashMap::new();
    for row in &fleet_rows {
        fleet_by_planet.insert(
            row.planet_id,
            Fleet {
                light_fighter: row.light_fighter,
                heavy_fighter: row.heavy_fighter,
                cruiser: row.cruiser,
                battleship: row.battleship,
                bomber: row.bomber,
                colony_ship: row.colony_ship,
            },
        );
    }

    let mut research_by_user: HashMap<i64, Research> = HashMap::new();
    for row in &research_rows {
        research_by_user.insert(
            row.user_id,
            Research {
                energy: row.energy as i64,
                laser: row.laser as i64,
                ion: row.ion as i64,
                hyperspace: row.hyperspace as i64,
                plasma: row.plasma as i64,
                computer: row.computer as i64,
            },
        );
    }

    for user in &users {
        let entity = user.id as EntityId;
        sim.world.entities.insert(entity);
        sim.world.bump_next_entity(entity + 1);
        sim.world.add_component(
            entity,
            Player {
                name: user.username.clone(),
                user_id: user.id,
                last_active: user.last_login.unwrap_or(user.created_at),
            },
        );

        let Some(planet) = home_planet.get(&user.id) else {
            continue;
        };
        sim.planet_id_of.insert(entity, planet.id);
        sim.world.add_component(
            entity,
            Position {
                galaxy: planet.galaxy as i64,
                system: planet.system as i64,
                planet: planet.position as i64,
            },
        );
        sim.world.add_component(
            entity,
            Planet {
                name: planet.name.clone(),
                owner_id: planet.owner_id,
                temperature: planet.temperature as i64,
                size: planet.size as i64,
            },
        );
        sim.world.add_component(
            entity,
            Resources {
                metal: planet.metal,
                crystal: planet.crystal,
                deuterium: planet.deuterium,
            },
        );
        sim.world.add_component(
            entity,
            ResourceProduction {
                metal_rate: planet.metal_rate,
                crystal_rate: planet.crystal_rate,
                deuterium_rate: planet.deuterium_rate,
                last_update: planet.last_update,
            },
        );
        sim.world
            .add_component(entity, buildings_by_planet.remove(&planet.id).unwrap_or_default());
        sim.world
            .add_component(entity, fleet_by_planet.remove(&planet.id).unwrap_or_default());
        sim.world
            .add_component(entity, research_by_user.remove(&user.id).unwrap_or_default());
    }

    // Rehydrate build/research/ship queues.
    let mut build_queues: HashMap<EntityId, Vec<BuildQueueItem>> = HashMap::new();
    let planet_to_entity: HashMap<i64, EntityId> =
        sim.planet_id_of.iter().map(|(e, p)| (*p, *e)).collect();
    for row in &build_queue_rows {
        let Some(&entity) = planet_to_entity.get(&row.planet_id) else { continue };
        let cost = BASE_BUILDING_COSTS.get(row.building_type.as_str()).copied().unwrap_or((0, 0, 0));
        build_queues.entry(entity).or_default().push(BuildQueueItem {
            building_type: row.building_type.clone(),
            completion_time: Some(row.complete_at),
            cost,
            queued_at: row.enqueued_at,
            expected_duration_s: (row.complete_at - row.enqueued_at).num_seconds().max(0) as f64,
        });
    }
    for (entity, mut items) in build_queues {
        items.sort_by_key(|i| i.completion_time);
        sim.world.add_component(entity, BuildQueue { items });
    }

    let mut research_queues: HashMap<EntityId, Vec<ResearchQueueItem>> = HashMap::new();
    for row in &research_queue_rows {
        let entity = row.user_id as EntityId;
        let cost = BASE_RESEARCH_COSTS.get(row.research_type.as_str()).copied().unwrap_or((0, 0, 0));
        research_queues.entry(entity).or_default().push(ResearchQueueItem {
            research_type: row.research_type.clone(),
            completion_time: Some(row.complete_at),
            cost,
            queued_at: row.enqueued_at,
        });
    }
    for (entity, mut items) in research_queues {
        items.sort_by_key(|i| i.completion_time);
        sim.world.add_component(entity, ResearchQueue { items });
    }

    let mut ship_queues: HashMap<EntityId, Vec<ShipBuildQueueItem>> = HashMap::new();
    let mut overdue_rows: Vec<(EntityId, i64, String, i64)> = Vec::new();
    for row in &ship_queue_rows {
        let Some(&entity) = planet_to_entity.get(&row.planet_id) else { continue };
        let unit_cost = BASE_SHIP_COSTS.get(row.ship_type.as_str()).copied().unwrap_or((0, 0, 0));
        let cost = (
            unit_cost.0 * row.count as i64,
            unit_cost.1 * row.count as i64,
            unit_cost.2 * row.count as i64,
        );
        ship_queues.entry(entity).or_default().push(ShipBuildQueueItem {
            ship_type: row.ship_type.clone(),
            count: row.count as i64,
            completion_time: Some(row.completion_time),
            cost,
            queued_at: row.completion_time,
        });
        if row.completion_time <= now {
            overdue_rows.push((entity, row.id, row.ship_type.clone(), row.count as i64));
        }
    }
    for (entity, mut items) in ship_queues {
        items.sort_by_key(|i| i.completion_time);
        sim.world.add_component(entity, ShipBuildQueue { items });
    }

    // Apply overdue ship builds immediately, then drop matching head items
    // (spec.md §4.13 step 6).
    for (entity, row_id, ship_type, count) in overdue_rows {
        if let Some(fleet) = sim.world.get_mut::<Fleet>(entity) {
            let updated = fleet.get(&ship_type) + count;
            fleet.set(&ship_type, updated);
        }
        if let Some(queue) = sim.world.get_mut::<ShipBuildQueue>(entity) {
            if let Some(pos) = queue.items.iter().position(|i| i.ship_type == ship_type) {
                queue.items.remove(pos);
            }
        }
        let db = db.clone();
        sim.bridge.submit(async move {
            if let Err(e) = db.complete_ship_build_row(row_id, now).await {
                tracing::warn!(error = %e, row_id, "failed to mark overdue ship build complete");
            }
        });
    }

    // Rehydrate fleet missions.
    for row in &mission_rows {
        let entity = row.user_id as EntityId;
        if !sim.world.entities.contains(&entity) {
            continue;
        }
        let origin = Coords {
            galaxy: row.origin_galaxy as i64,
            system: row.origin_system as i64,
            planet: row.origin_position as i64,
        };
        let target = Coords {
            galaxy: row.target_galaxy as i64,
            system: row.target_system as i64,
            planet: row.target_position as i64,
        };
        if row.arrival_time <= now {
            // Already overdue at startup: snap position, drop the row, no
            // processing charged to the next tick.
            if let Some(position) = sim.world.get_mut::<Position>(entity) {
                position.galaxy = target.galaxy;
                position.system = target.system;
                position.planet = target.planet;
            }
            persist_row_delete(sim, row.user_id);
            continue;
        }
        sim.world.add_component(
            entity,
            FleetMovement {
                origin,
                target,
                departure_time: row.departure_time,
                arrival_time: row.arrival_time,
                speed: row.speed,
                mission: row.mission.clone(),
                owner_id: row.user_id,
                recalled: row.recalled,
                colonizing_until: None,
            },
        );
    }

    // Hydrate open marketplace offers, deduplicated by id.
    let mut seen_offer_ids = std::collections::HashSet::new();
    for row in &offer_rows {
        if !seen_offer_ids.insert(row.id) {
            continue;
        }
        sim.market.push(TradeOffer {
            id: row.id,
            seller_user_id: row.seller_user_id,
            offered_resource: row.offered_resource.clone(),
            offered_amount: row.offered_amount,
            requested_resource: row.requested_resource.clone(),
            requested_amount: row.requested_amount,
            status: row.status.clone(),
            accepted_by: row.accepted_by,
            accepted_at: row.accepted_at,
            created_at: row.created_at,
        });
    }

    // Reconcile monotonic id counters from DB maxima.
    let offer_max = db.max_trade_offer_id().await.unwrap_or(0);
    let event_max = db.max_trade_event_id().await.unwrap_or(0);
    let battle_max = db.max_battle_report_id().await.unwrap_or(0);
    let espionage_max = db.max_espionage_report_id().await.unwrap_or(0);
    sim.ids.reconcile(offer_max, event_max, battle_max, espionage_max);

    // Offline resource accrual: run the production system once over the gap
    // since each entity's own `last_update`, then the first real tick starts
    // clean (no double-counted elapsed time).
    systems::resource_production::run(sim, now);

    sim.loaded = true;
    Ok(())
}

fn persist_row_delete(sim: &Simulation, user_id: i64) {
    crate::persist::sync_ops::persist_fleet_mission_delete(sim, user_id);
}
