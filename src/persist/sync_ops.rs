//! Fire-and-forget write helpers, one per bridge operation named in
//! spec.md §4.12. Each checks whether a DB client has been captured
//! (`ENABLE_DB=false` or not-yet-started means `sim.bridge.db()` is `None`)
//! and otherwise schedules the write via `Bridge::submit`, swallowing and
//! logging any DB error per spec.md §7 — none of this ever propagates to
//! the simulation thread.

use crate::config::CONFIG;
use crate::db::db_models::*;
use crate::ecs::components::*;
use crate::sim::Simulation;
use chrono::{DateTime, Utc};
use std::time::Duration;

pub fn persist_planet_resources(
    sim: &Simulation,
    entity: EntityId,
    resources: &Resources,
    rates: (f64, f64, f64),
    last_update: DateTime<Utc>,
) {
    let Some(db) = sim.bridge.db() else { return };
    let Some(planet_id) = sim.planet_id(entity) else { return };
    let interval = Duration::from_secs(CONFIG.persist_interval_seconds.max(0) as u64);
    if !sim.bridge.should_persist_planet(entity, interval) {
        return;
    }
    let (metal, crystal, deuterium) = (resources.metal, resources.crystal, resources.deuterium);
    sim.bridge.submit(async move {
        if let Err(e) = db
            .upsert_planet_resources(
                planet_id, metal, crystal, deuterium, rates.0, rates.1, rates.2, last_update,
            )
            .await
        {
            tracing::warn!(error = %e, planet_id, "failed to persist planet resources");
        }
    });
}

pub fn persist_building_level(sim: &Simulation, entity: EntityId, building_type: &str, level: i64) {
    let Some(db) = sim.bridge.db() else { return };
    let Some(planet_id) = sim.planet_id(entity) else { return };
    let building_type = building_type.to_string();
    sim.bridge.submit(async move {
        if let Err(e) = db.upsert_building_level(planet_id, &building_type, level as i32).await {
            tracing::warn!(error = %e, planet_id, "failed to persist building level");
        }
    });
}

pub fn persist_building_enqueue(
    sim: &Simulation,
    entity: EntityId,
    building_type: &str,
    level: i64,
    queued_at: DateTime<Utc>,
    complete_at: DateTime<Utc>,
) {
    let Some(db) = sim.bridge.db() else { return };
    let Some(planet_id) = sim.planet_id(entity) else { return };
    let row = NewBuildingQueueRow {
        planet_id,
        building_type: building_type.to_string(),
        level: level as i32,
        enqueued_at: queued_at,
        complete_at,
        status: "pending".to_string(),
    };
    sim.bridge.submit(async move {
        if let Err(e) = db.enqueue_building(row).await {
            tracing::warn!(error = %e, "failed to persist building queue row");
        }
    });
}

pub fn persist_building_complete(sim: &Simulation, entity: EntityId, building_type: &str) {
    let Some(db) = sim.bridge.db() else { return };
    let Some(planet_id) = sim.planet_id(entity) else { return };
    let building_type = building_type.to_string();
    sim.bridge.submit(async move {
        if let Err(e) = db.complete_earliest_building(planet_id, &building_type).await {
            tracing::warn!(error = %e, planet_id, "failed to persist building completion");
        }
    });
}

pub fn persist_research_level(sim: &Simulation, user_id: i64, research_type: &str, level: i64) {
    let Some(db) = sim.bridge.db() else { return };
    let research_type = research_type.to_string();
    sim.bridge.submit(async move {
        if let Err(e) = db.upsert_research_level(user_id, &research_type, level as i32).await {
            tracing::warn!(error = %e, user_id, "failed to persist research level");
        }
    });
}

pub fn persist_research_enqueue(
    sim: &Simulation,
    user_id: i64,
    research_type: &str,
    level: i64,
    queued_at: DateTime<Utc>,
    complete_at: DateTime<Utc>,
) {
    let Some(db) = sim.bridge.db() else { return };
    let row = NewResearchQueueRow {
        user_id,
        research_type: research_type.to_string(),
        level: level as i32,
        enqueued_at: queued_at,
        complete_at,
        status: "pending".to_string(),
    };
    sim.bridge.submit(async move {
        if let Err(e) = db.enqueue_research(row).await {
            tracing::warn!(error = %e, "failed to persist research queue row");
        }
    });
}

pub fn persist_research_complete(sim: &Simulation, user_id: i64, research_type: &str) {
    let Some(db) = sim.bridge.db() else { return };
    let research_type = research_type.to_string();
    sim.bridge.submit(async move {
        if let Err(e) = db.complete_earliest_research(user_id, &research_type).await {
            tracing::warn!(error = %e, user_id, "failed to persist research completion");
        }
    });
}

pub fn persist_ship_build_enqueue(
    sim: &Simulation,
    entity: EntityId,
    ship_type: &str,
    count: i64,
    completion_time: DateTime<Utc>,
) {
    let Some(db) = sim.bridge.db() else { return };
    let Some(planet_id) = sim.planet_id(entity) else { return };
    let row = NewShipBuildQueueRow {
        planet_id,
        ship_type: ship_type.to_string(),
        count: count as i32,
        completion_time,
    };
    sim.bridge.submit(async move {
        if let Err(e) = db.enqueue_ship_build(row).await {
            tracing::warn!(error = %e, "failed to persist ship build queue row");
        }
    });
}

pub fn persist_ship_build_complete(sim: &Simulation, entity: EntityId, ship_type: &str) {
    let Some(db) = sim.bridge.db() else { return };
    let Some(planet_id) = sim.planet_id(entity) else { return };
    let ship_type = ship_type.to_string();
    let now = Utc::now();
    sim.bridge.submit(async move {
        if let Err(e) = db.complete_earliest_ship_build(planet_id, &ship_type, now).await {
            tracing::warn!(error = %e, planet_id, "failed to persist ship build completion");
        }
    });
}

pub fn persist_fleet(sim: &Simulation, entity: EntityId, fleet: &Fleet) {
    let Some(db) = sim.bridge.db() else { return };
    let Some(planet_id) = sim.planet_id(entity) else { return };
    let fleet = fleet.clone();
    sim.bridge.submit(async move {
        if let Err(e) = db.upsert_fleet_counts(planet_id, &fleet).await {
            tracing::warn!(error = %e, planet_id, "failed to persist fleet counts");
        }
    });
}

pub fn persist_fleet_mission_upsert(sim: &Simulation, user_id: i64, movement: &FleetMovement) {
    let Some(db) = sim.bridge.db() else { return };
    let row = NewFleetMissionRow {
        user_id,
        origin_galaxy: movement.origin.galaxy as i32,
        origin_system: movement.origin.system as i32,
        origin_position: movement.origin.planet as i32,
        target_galaxy: movement.target.galaxy as i32,
        target_system: movement.target.system as i32,
        target_position: movement.target.planet as i32,
        mission: movement.mission.clone(),
        speed: movement.speed,
        recalled: movement.recalled,
        departure_time: movement.departure_time,
        arrival_time: movement.arrival_time,
    };
    sim.bridge.submit(async move {
        if let Err(e) = db.upsert_fleet_mission(row).await {
            tracing::warn!(error = %e, user_id, "failed to persist fleet mission");
        }
    });
}

pub fn persist_fleet_mission_delete(sim: &Simulation, user_id: i64) {
    let Some(db) = sim.bridge.db() else { return };
    sim.bridge.submit(async move {
        if let Err(e) = db.delete_fleet_mission(user_id).await {
            tracing::warn!(error = %e, user_id, "failed to delete fleet mission row");
        }
    });
}

pub fn persist_battle_report(sim: &Simulation, report: &BattleReport) {
    let Some(db) = sim.bridge.db() else { return };
    let row = NewBattleReportRow {
        attacker_user_id: report.attacker_user_id,
        defender_user_id: report.defender_user_id,
        location: serde_json::to_value(report.location).unwrap_or_default(),
        outcome: serde_json::to_value(&report.outcome).unwrap_or_default(),
    };
    sim.bridge.submit(async move {
        if let Err(e) = db.insert_battle_report(row).await {
            tracing::warn!(error = %e, "failed to persist battle report");
        }
    });
}

pub fn persist_espionage_report(sim: &Simulation, report: &EspionageReport) {
    let Some(db) = sim.bridge.db() else { return };
    let row = NewEspionageReportRow {
        attacker_user_id: report.attacker_user_id,
        defender_user_id: report.defender_user_id,
        location: serde_json::to_value(report.location).unwrap_or_default(),
        snapshot: serde_json::to_value(&report.snapshot).unwrap_or_default(),
    };
    sim.bridge.submit(async move {
        if let Err(e) = db.insert_espionage_report(row).await {
            tracing::warn!(error = %e, "failed to persist espionage report");
        }
    });
}

pub fn persist_trade_offer(sim: &Simulation, offer: &TradeOffer) {
    let Some(db) = sim.bridge.db() else { return };
    let row = NewTradeOfferRow {
        seller_user_id: offer.seller_user_id,
        offered_resource: offer.offered_resource.clone(),
        offered_amount: offer.offered_amount,
        requested_resource: offer.requested_resource.clone(),
        requested_amount: offer.requested_amount,
        status: offer.status.clone(),
    };
    sim.bridge.submit(async move {
        if let Err(e) = db.insert_trade_offer(row).await {
            tracing::warn!(error = %e, "failed to persist trade offer");
        }
    });
}

pub fn persist_trade_offer_accepted(sim: &Simulation, offer_id: i64, buyer_user_id: i64, at: DateTime<Utc>) {
    let Some(db) = sim.bridge.db() else { return };
    sim.bridge.submit(async move {
        if let Err(e) = db.mark_offer_accepted(offer_id, buyer_user_id, at).await {
            tracing::warn!(error = %e, offer_id, "failed to persist offer acceptance");
        }
    });
}

pub fn persist_trade_event(sim: &Simulation, event: &TradeEvent) {
    let Some(db) = sim.bridge.db() else { return };
    let row = NewTradeEventRow {
        event_type: event.kind.clone(),
        offer_id: event.offer_id,
        seller_user_id: event.seller_user_id,
        buyer_user_id: event.buyer_user_id,
        offered_resource: event.offered_resource.clone(),
        offered_amount: event.offered_amount,
        requested_resource: event.requested_resource.clone(),
        requested_amount: event.requested_amount,
        status: event.status.clone(),
    };
    sim.bridge.submit(async move {
        if let Err(e) = db.insert_trade_event(row).await {
            tracing::warn!(error = %e, "failed to persist trade event");
        }
    });
}

pub fn persist_notification(sim: &Simulation, user_id: i64, kind: &str, payload: serde_json::Value, priority: &str) {
    let Some(db) = sim.bridge.db() else { return };
    let kind = kind.to_string();
    let priority = priority.to_string();
    let now = Utc::now();
    sim.bridge.submit(async move {
        if let Err(e) = db.insert_notification(user_id, &kind, payload, &priority, now).await {
            tracing::warn!(error = %e, user_id, "failed to persist notification");
        }
    });
}

/// Bounded-wait cleanup of inactive users (`last_login < cutoff`, or never
/// logged in and `created_at < cutoff`); run once per UTC day from the
/// scheduler (spec.md §4.2 step 4). Falls back to an empty victim list on
/// timeout or when the DB is disabled.
pub fn cleanup_inactive_users(sim: &Simulation, cutoff: DateTime<Utc>) -> Vec<i64> {
    let Some(db) = sim.bridge.db() else { return Vec::new() };
    sim.bridge.submit_and_wait(
        super::bridge::DEFAULT_WAIT_TIMEOUT,
        Vec::new(),
        move || async move { db.cleanup_inactive_users(cutoff).await.unwrap_or_default() },
    )
}

/// Periodic full snapshot (spec.md §4.12's "Periodic snapshot"): for each
/// loaded player entity, write resources/rates/last_update and every
/// tracked building level. Guarded by the bridge's non-blocking save lock;
/// skipped entirely if a prior run is still in flight.
pub fn snapshot_all(sim: &Simulation) {
    let Some(db) = sim.bridge.db() else { return };
    if !sim.bridge.try_begin_save() {
        tracing::debug!("skipping snapshot: previous save still in flight");
        return;
    }
    let started = std::time::Instant::now();
    let mut writes = 0u64;
    for entity in sim.world.entities.iter().copied() {
        let (Some(resources), Some(prod)) = (
            sim.world.get::<Resources>(entity),
            sim.world.get::<ResourceProduction>(entity),
        ) else {
            continue;
        };
        let Some(planet_id) = sim.planet_id(entity) else { continue };
        let (metal, crystal, deuterium) = (resources.metal, resources.crystal, resources.deuterium);
        let rates = (prod.metal_rate, prod.crystal_rate, prod.deuterium_rate);
        let last_update = prod.last_update;
        let db = db.clone();
        sim.bridge.submit(async move {
            if let Err(e) = db
                .upsert_planet_resources(planet_id, metal, crystal, deuterium, rates.0, rates.1, rates.2, last_update)
                .await
            {
                tracing::warn!(error = %e, planet_id, "snapshot write failed");
            }
        });
        writes += 1;
        if let Some(buildings) = sim.world.get::<Buildings>(entity) {
            for (kind, level) in [
                ("metal_mine", buildings.metal_mine),
                ("crystal_mine", buildings.crystal_mine),
                ("deuterium_synthesizer", buildings.deuterium_synthesizer),
                ("solar_plant", buildings.solar_plant),
                ("fusion_reactor", buildings.fusion_reactor),
                ("robot_factory", buildings.robot_factory),
                ("shipyard", buildings.shipyard),
                ("research_lab", buildings.research_lab),
                ("metal_storage", buildings.metal_storage),
                ("crystal_storage", buildings.crystal_storage),
                ("deuterium_tank", buildings.deuterium_tank),
            ] {
                persist_building_level(sim, entity, kind, level);
            }
        }
    }
    crate::metrics::record_timer("persistence.snapshot", started.elapsed());
    crate::metrics::increment_event_by("persistence.snapshot.writes", writes);
    sim.bridge.end_save();
}
