//! Battle resolution (spec.md §4.9). Grounded in
//! `original_source/src/systems/battle.py`: single-round deterministic
//! resolution using `BASE_SHIP_STATS`/`BASE_SHIP_COSTS`.

use crate::config::{BASE_SHIP_COSTS, BASE_SHIP_STATS};
use crate::ecs::components::*;
use crate::persist::sync_ops;
use crate::sim::Simulation;
use chrono::{DateTime, Utc};

fn fleet_pairs(fleet: &Fleet) -> [(&'static str, i64); 6] {
    [
        ("light_fighter", fleet.light_fighter),
        ("heavy_fighter", fleet.heavy_fighter),
        ("cruiser", fleet.cruiser),
        ("battleship", fleet.battleship),
        ("bomber", fleet.bomber),
        ("colony_ship", fleet.colony_ship),
    ]
}

fn total_attack(fleet: &Fleet) -> i64 {
    fleet_pairs(fleet)
        .into_iter()
        .map(|(kind, count)| count * BASE_SHIP_STATS.get(kind).map(|s| s.0).unwrap_or(0))
        .sum()
}

fn total_shield(fleet: &Fleet) -> i64 {
    fleet_pairs(fleet)
        .into_iter()
        .map(|(kind, count)| count * BASE_SHIP_STATS.get(kind).map(|s| s.1).unwrap_or(0))
        .sum()
}

fn structure_points(kind: &str) -> f64 {
    let cost = BASE_SHIP_COSTS.get(kind).copied().unwrap_or((0, 0, 0));
    (cost.0 + cost.1) as f64 / 10.0
}

fn total_structure(fleet: &Fleet) -> f64 {
    fleet_pairs(fleet).into_iter().map(|(kind, count)| count as f64 * structure_points(kind)).sum()
}

fn apply_losses(fleet: &Fleet, fraction: f64) -> (Fleet, Fleet) {
    let fraction = fraction.clamp(0.0, 1.0);
    let mut losses = Fleet::default();
    let mut remaining = Fleet::default();
    for (kind, count) in fleet_pairs(fleet) {
        let destroyed = ((count as f64) * fraction).floor() as i64;
        let destroyed = destroyed.min(count);
        losses.set(kind, destroyed);
        remaining.set(kind, count - destroyed);
    }
    (losses, remaining)
}

pub fn run(sim: &mut Simulation, now: DateTime<Utc>) {
    let due: Vec<EntityId> = sim
        .world
        .battles
        .iter()
        .filter(|(_, b)| !b.resolved && b.scheduled_time <= now)
        .map(|(entity, _)| *entity)
        .collect();
    for entity in due {
        resolve_one(sim, entity, now);
    }
}

fn resolve_one(sim: &mut Simulation, entity: EntityId, now: DateTime<Utc>) {
    let battle = sim.world.get::<Battle>(entity).unwrap().clone();

    let atk_power = total_attack(&battle.attacker_ships);
    let def_power = total_attack(&battle.defender_ships);
    let atk_attack = atk_power;
    let def_attack = def_power;
    let atk_shield = total_shield(&battle.attacker_ships);
    let def_shield = total_shield(&battle.defender_ships);
    let atk_struct = total_structure(&battle.attacker_ships);
    let def_struct = total_structure(&battle.defender_ships);

    let damage_to_def = (atk_attack - def_shield).max(0) as f64;
    let damage_to_atk = (def_attack - atk_shield).max(0) as f64;

    let def_loss_frac = if def_struct > 0.0 { (damage_to_def / def_struct).min(1.0) } else { 0.0 };
    let atk_loss_frac = if atk_struct > 0.0 { (damage_to_atk / atk_struct).min(1.0) } else { 0.0 };

    let (attacker_losses, attacker_remaining) = apply_losses(&battle.attacker_ships, atk_loss_frac);
    let (defender_losses, defender_remaining) = apply_losses(&battle.defender_ships, def_loss_frac);

    let atk_remaining_power = total_attack(&attacker_remaining);
    let def_remaining_power = total_attack(&defender_remaining);

    let winner = if atk_remaining_power > def_remaining_power {
        "attacker"
    } else if def_remaining_power > atk_remaining_power {
        "defender"
    } else if atk_power > def_power {
        "attacker"
    } else if def_power > atk_power {
        "defender"
    } else {
        "draw"
    };

    let outcome = BattleOutcome {
        winner: winner.to_string(),
        attacker_power: atk_power as f64,
        defender_power: def_power as f64,
        attacker_losses,
        defender_losses,
        attacker_remaining,
        defender_remaining,
    };

    {
        let b = sim.world.get_mut::<Battle>(entity).unwrap();
        b.outcome = Some(outcome.clone());
        b.resolved = true;
    }

    let report = BattleReport {
        id: sim.ids.next_battle_report(),
        attacker_user_id: battle.attacker_id,
        defender_user_id: battle.defender_id,
        location: battle.location,
        outcome,
        created_at: now,
    };
    sim.battle_reports.push(report.clone());
    sync_ops::persist_battle_report(sim, &report);

    for user_id in [report.attacker_user_id, report.defender_user_id] {
        let payload = serde_json::json!({ "type": "battle_report", "report": report });
        sim.notifier.notify(user_id, "battle_report", payload.clone(), "critical");
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
    fn stronger_attacker_wins_and_suffers_no_losses() {
        let mut sim = fresh_sim();
        let entity = sim.world.create_entity();
        let mut attacker = Fleet::default();
        attacker.cruiser = 10;
        let mut defender = Fleet::default();
        defender.light_fighter = 5;
        sim.world.add_component(
            entity,
            Battle {
                attacker_id: 1,
                defender_id: 2,
                location: Coords { galaxy: 1, system: 1, planet: 1 },
                scheduled_time: Utc::now() - chrono::Duration::seconds(1),
                attacker_ships: attacker,
                defender_ships: defender,
                resolved: false,
                outcome: None,
            },
        );
        run(&mut sim, Utc::now());
        let battle = sim.world.get::<Battle>(entity).unwrap();
        assert!(battle.resolved);
        assert_eq!(battle.outcome.as_ref().unwrap().winner, "attacker");
    }

    #[test]
    fn equal_forces_draw() {
        let mut sim = fresh_sim();
        let entity = sim.world.create_entity();
        let mut attacker = Fleet::default();
        attacker.light_fighter = 10;
        let mut defender = Fleet::default();
        defender.light_fighter = 10;
        sim.world.add_component(
            entity,
            Battle {
                attacker_id: 1,
                defender_id: 2,
                location: Coords { galaxy: 1, system: 1, planet: 1 },
                scheduled_time: Utc::now() - chrono::Duration::seconds(1),
                attacker_ships: attacker,
                defender_ships: defender,
                resolved: false,
                outcome: None,
            },
        );
        run(&mut sim, Utc::now());
        let battle = sim.world.get::<Battle>(entity).unwrap();
        assert_eq!(battle.outcome.as_ref().unwrap().winner, "draw");
    }

    #[test]
    fn already_resolved_battle_is_skipped() {
        let mut sim = fresh_sim();
        let entity = sim.world.create_entity();
        sim.world.add_component(
            entity,
            Battle {
                attacker_id: 1,
                defender_id: 2,
                location: Coords { galaxy: 1, system: 1, planet: 1 },
                scheduled_time: Utc::now() - chrono::Duration::seconds(1),
                attacker_ships: Fleet::default(),
                defender_ships: Fleet::default(),
                resolved: true,
                outcome: None,
            },
        );
        run(&mut sim, Utc::now());
        assert!(sim.world.get::<Battle>(entity).unwrap().outcome.is_none());
    }
}
