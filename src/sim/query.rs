//! Read-path snapshot queries. Per the resolved "module-global singleton
//! world" question in `DESIGN.md`, `World` stays exclusively owned by the
//! simulation thread; HTTP read routes reach it only by sending a `Query`
//! plus a oneshot reply sender through the same `mpsc::Sender` the command
//! queue uses for writes, drained once per tick right after commands. This
//! mirrors the `Bridge::submit_and_wait` pattern already used for the
//! opposite direction (sim thread -> async persistence).

use crate::ecs::components::*;
use crate::sim::Simulation;
use serde_json::{json, Value};
use tokio::sync::oneshot;

pub enum Query {
    Player { user_id: i64 },
    Fleet { user_id: i64 },
    Research { user_id: i64 },
    TradeOffers { status: Option<String>, limit: usize, offset: usize },
    TradeHistory { user_id: i64, limit: usize, offset: usize },
    Notifications { user_id: i64 },
    BattleReports { user_id: i64, limit: usize, offset: usize },
    EspionageReports { user_id: i64, limit: usize, offset: usize },
}

pub struct QueryRequest {
    pub query: Query,
    pub reply: oneshot::Sender<Value>,
}

fn find_entity(sim: &Simulation, user_id: i64) -> Option<EntityId> {
    sim.world.players.iter().find(|(_, p)| p.user_id == user_id).map(|(entity, _)| *entity)
}

/// Builds the JSON answer for one query against the current tick's state.
/// Never panics: missing players/components answer with `null`/empty lists
/// rather than erroring, since a read racing a not-yet-hydrated player is an
/// ordinary outcome, not a bug.
pub fn answer(sim: &Simulation, query: Query) -> Value {
    match query {
        Query::Player { user_id } => {
            let Some(entity) = find_entity(sim, user_id) else { return Value::Null };
            json!({
                "user_id": user_id,
                "player": sim.world.get::<Player>(entity),
                "position": sim.world.get::<Position>(entity),
                "resources": sim.world.get::<Resources>(entity),
                "buildings": sim.world.get::<Buildings>(entity),
                "build_queue": sim.world.get::<BuildQueue>(entity),
                "planet": sim.world.get::<Planet>(entity),
            })
        }
        Query::Fleet { user_id } => {
            let Some(entity) = find_entity(sim, user_id) else { return Value::Null };
            json!({
                "user_id": user_id,
                "fleet": sim.world.get::<Fleet>(entity),
                "ship_build_queue": sim.world.get::<ShipBuildQueue>(entity),
                "movement": sim.world.get::<FleetMovement>(entity),
            })
        }
        Query::Research { user_id } => {
            let Some(entity) = find_entity(sim, user_id) else { return Value::Null };
            json!({
                "user_id": user_id,
                "research": sim.world.get::<Research>(entity),
                "research_queue": sim.world.get::<ResearchQueue>(entity),
            })
        }
        Query::TradeOffers { status, limit, offset } => {
            let offers = super::market::list_offers(sim, status.as_deref(), limit, offset);
            json!({ "offers": offers })
        }
        Query::TradeHistory { user_id, limit, offset } => {
            let events = super::market::trade_history_for_user(sim, user_id, limit, offset);
            json!({ "history": events })
        }
        Query::Notifications { user_id } => {
            json!({ "notifications": sim.notifier.list(user_id) })
        }
        Query::BattleReports { user_id, limit, offset } => {
            let mut reports: Vec<&BattleReport> = sim
                .battle_reports
                .iter()
                .filter(|r| r.attacker_user_id == user_id || r.defender_user_id == user_id)
                .collect();
            reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            json!({ "reports": reports.into_iter().skip(offset).take(limit).collect::<Vec<_>>() })
        }
        Query::EspionageReports { user_id, limit, offset } => {
            let mut reports: Vec<&EspionageReport> = sim
                .espionage_reports
                .iter()
                .filter(|r| r.attacker_user_id == user_id)
                .collect();
            reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            json!({ "reports": reports.into_iter().skip(offset).take(limit).collect::<Vec<_>>() })
        }
    }
}
