//! Resource production system (spec.md §4.4). Grounded in
//! `original_source/src/systems/production.py`'s `_calculate_production`/
//! `_calculate_energy_factor` helpers, with the constants carried from
//! `original_source/src/core/config.py` into `crate::config`.

use crate::config::{size_multiplier, temperature_multiplier, CONFIG, ENERGY_CONSUMPTION, PLASMA_PRODUCTION_BONUS};
use crate::ecs::components::*;
use crate::persist::sync_ops;
use crate::sim::Simulation;
use chrono::{DateTime, Utc};

fn storage_capacity(kind: &str, storage_level: i64, size_mult: f64) -> i64 {
    let base = *CONFIG.storage_base_capacity.get(kind).unwrap_or(&0) as f64;
    let growth = *CONFIG.storage_capacity_growth.get(kind).unwrap_or(&2.0);
    (base * growth.powi(storage_level as i32) * size_mult).round() as i64
}

pub fn run(sim: &mut Simulation, now: DateTime<Utc>) {
    let entities = sim.world.query3::<Resources, ResourceProduction, Buildings>();
    for entity in entities {
        step_one(sim, entity, now);
    }
}

fn step_one(sim: &mut Simulation, entity: EntityId, now: DateTime<Utc>) {
    let (h, solar_level, fusion_level) = {
        let prod = sim.world.get::<ResourceProduction>(entity).unwrap();
        let elapsed = now.signed_duration_since(prod.last_update);
        let h = elapsed.num_milliseconds() as f64 / 1000.0 / 3600.0;
        if h <= 0.0 {
            return;
        }
        let buildings = sim.world.get::<Buildings>(entity).unwrap();
        (h, buildings.solar_plant, buildings.fusion_reactor)
    };

    let energy_level = sim.world.get::<Research>(entity).map(|r| r.energy).unwrap_or(0);
    let plasma_level = sim.world.get::<Research>(entity).map(|r| r.plasma).unwrap_or(0);
    let (temperature, size) = sim
        .world
        .get::<Planet>(entity)
        .map(|p| (p.temperature, p.size))
        .unwrap_or((25, 163));
    let buildings = sim.world.get::<Buildings>(entity).unwrap().clone();

    let energy_produced = (CONFIG.energy_solar_base
        * solar_level as f64
        * CONFIG.energy_solar_growth.powi((solar_level - 1).max(0) as i32)
        + CONFIG.fusion_energy_base
            * fusion_level as f64
            * CONFIG.fusion_energy_growth.powi((fusion_level - 1).max(0) as i32))
        * (1.0 + CONFIG.energy_tech_energy_bonus_per_level * energy_level as f64);

    let energy_required: f64 = [
        ("metal_mine", buildings.metal_mine),
        ("crystal_mine", buildings.crystal_mine),
        ("deuterium_synthesizer", buildings.deuterium_synthesizer),
    ]
    .iter()
    .map(|(kind, level)| {
        let base = *ENERGY_CONSUMPTION.get(kind).unwrap_or(&0.0);
        if *level <= 0 {
            0.0
        } else {
            base * *level as f64 * CONFIG.energy_consumption_growth.powi((*level - 1) as i32)
        }
    })
    .sum();

    let raw_factor = if energy_required <= 0.0 {
        1.0
    } else if energy_produced <= 0.0 {
        0.0
    } else {
        (energy_produced / energy_required).min(1.0)
    };
    let factor = if raw_factor <= 0.0 {
        0.0
    } else {
        raw_factor.max(CONFIG.energy_deficit_soft_floor)
    };

    if raw_factor <= CONFIG.energy_deficit_notify_threshold {
        maybe_notify_energy_deficit(sim, entity, now, raw_factor);
    }

    let size_mult = size_multiplier(size);
    let temp_mult = temperature_multiplier(temperature);

    let prod = *sim.world.get::<ResourceProduction>(entity).unwrap();
    let mut deltas = [0i64; 3];
    let specs: [(&str, f64, i64, bool); 3] = [
        ("metal", prod.metal_rate, buildings.metal_mine, false),
        ("crystal", prod.crystal_rate, buildings.crystal_mine, false),
        ("deuterium", prod.deuterium_rate, buildings.deuterium_synthesizer, true),
    ];
    let resources = sim.world.get_mut::<Resources>(entity).unwrap();
    for (i, (kind, rate, level, apply_temp)) in specs.into_iter().enumerate() {
        let mut amount = rate * 1.1_f64.powi(level as i32) * h * factor * size_mult;
        if apply_temp {
            amount *= temp_mult;
        }
        let plasma_bonus = *PLASMA_PRODUCTION_BONUS.get(kind).unwrap_or(&0.0);
        amount *= 1.0 + plasma_bonus * plasma_level as f64;
        let mut delta = amount.round() as i64;

        let storage_level = match kind {
            "metal" => buildings.metal_storage,
            "crystal" => buildings.crystal_storage,
            _ => buildings.deuterium_tank,
        };
        let capacity = storage_capacity(kind, storage_level, size_mult);
        let current = resources.get(kind);
        if current + delta > capacity {
            delta = (capacity - current).max(0);
        }
        resources.set(kind, current + delta);
        deltas[i] = delta;
    }

    // Fusion reactor deuterium consumption, floored at 0.
    if buildings.fusion_reactor > 0 {
        let consumption =
            (CONFIG.fusion_deuterium_consumption_per_level * fusion_level as f64 * h).round() as i64;
        let current = resources.deuterium;
        resources.deuterium = (current - consumption).max(0);
    }

    let new_totals = *resources;
    sim.world.get_mut::<ResourceProduction>(entity).unwrap().last_update = now;

    if let Some(user_id) = sim.world.get::<Player>(entity).map(|p| p.user_id) {
        sim.events.send(
            user_id,
            serde_json::json!({
                "type": "resource_update",
                "deltas": { "metal": deltas[0], "crystal": deltas[1], "deuterium": deltas[2] },
                "totals": { "metal": new_totals.metal, "crystal": new_totals.crystal, "deuterium": new_totals.deuterium },
            }),
        );
    }

    let rates = (prod.metal_rate, prod.crystal_rate, prod.deuterium_rate);
    sync_ops::persist_planet_resources(sim, entity, &new_totals, rates, now);
}

fn maybe_notify_energy_deficit(sim: &mut Simulation, entity: EntityId, now: DateTime<Utc>, raw_factor: f64) {
    let cooldown = chrono::Duration::seconds(CONFIG.energy_deficit_notification_cooldown_seconds);
    if let Some(last) = sim.energy_deficit_cooldown.get(&entity) {
        if now.signed_duration_since(*last) < cooldown {
            return;
        }
    }
    sim.energy_deficit_cooldown.insert(entity, now);
    let Some(user_id) = sim.world.get::<Player>(entity).map(|p| p.user_id) else {
        return;
    };
    let payload = serde_json::json!({ "type": "energy_deficit", "factor": raw_factor });
    sim.notifier.notify(user_id, "energy_deficit", payload.clone(), "warning");
    sim.events.send(user_id, payload);
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

    fn seed(
        sim: &mut Simulation,
        rate: (f64, f64, f64),
        levels: (i64, i64, i64),
        solar: i64,
        last_update_hours_ago: i64,
    ) -> EntityId {
        let entity = sim.world.create_entity();
        sim.world.add_component(
            entity,
            Player {
                name: "p".into(),
                user_id: entity as i64,
                last_active: Utc::now(),
            },
        );
        sim.world.add_component(
            entity,
            Resources {
                metal: 0,
                crystal: 0,
                deuterium: 0,
            },
        );
        sim.world.add_component(
            entity,
            ResourceProduction {
                metal_rate: rate.0,
                crystal_rate: rate.1,
                deuterium_rate: rate.2,
                last_update: Utc::now() - chrono::Duration::hours(last_update_hours_ago),
            },
        );
        let mut buildings = Buildings::default();
        buildings.metal_mine = levels.0;
        buildings.crystal_mine = levels.1;
        buildings.deuterium_synthesizer = levels.2;
        buildings.solar_plant = solar;
        sim.world.add_component(entity, buildings);
        sim.world.add_component(entity, Planet::default());
        entity
    }

    #[test]
    fn scenario_1_saturated_energy_one_hour() {
        let mut sim = fresh_sim();
        let entity = seed(&mut sim, (60.0, 30.0, 15.0), (1, 1, 1), 100, 1);
        run(&mut sim, Utc::now());
        let r = sim.world.get::<Resources>(entity).unwrap();
        assert_eq!(r.metal, 66);
        assert_eq!(r.crystal, 33);
        assert_eq!(r.deuterium, 17);
    }

    #[test]
    fn scenario_2_partial_energy_factor_half() {
        let mut sim = fresh_sim();
        let entity = seed(&mut sim, (60.0, 0.0, 0.0), (8, 4, 4), 1, 1);
        run(&mut sim, Utc::now());
        let r = sim.world.get::<Resources>(entity).unwrap();
        assert_eq!(r.metal, 64);
    }

    #[test]
    fn boundary_zero_solar_zero_production() {
        let mut sim = fresh_sim();
        let entity = seed(&mut sim, (60.0, 30.0, 15.0), (1, 1, 1), 0, 1);
        run(&mut sim, Utc::now());
        let r = sim.world.get::<Resources>(entity).unwrap();
        assert_eq!(r.metal, 0);
        assert_eq!(r.crystal, 0);
        assert_eq!(r.deuterium, 0);
    }
}
