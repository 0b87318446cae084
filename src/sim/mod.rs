//! The authoritative simulation: entity store plus everything that isn't a
//! component but still needs to live next to it for one tick at a time
//! (marketplace offers, monotonic id counters, notification/event sinks,
//! the persistence bridge handle). Owned exclusively by the dedicated
//! simulation thread per spec.md §5 — nothing here is `Arc<Mutex<_>>`
//! shared; the only cross-thread handles are the command queue receiver
//! and the `Bridge`/`EventSink`, both already internally thread-safe.

pub mod commands;
pub mod market;
pub mod query;
pub mod scheduler;

use crate::ecs::components::{BattleReport, EntityId, EspionageReport, TradeEvent, TradeOffer};
use crate::ecs::World;
use crate::events::EventSink;
use crate::notify::Notifier;
use crate::persist::Bridge;
use chrono::{DateTime, Utc};
use query::QueryRequest;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{mpsc::Receiver, Arc};

/// Monotonic id counters for marketplace offers/events and battle/espionage
/// reports, reconciled against DB maxima at startup hydration (spec.md
/// §4.10/§4.13) to avoid collisions across restarts.
#[derive(Default)]
pub struct IdCounters {
    trade_offer: AtomicI64,
    trade_event: AtomicI64,
    battle_report: AtomicI64,
    espionage_report: AtomicI64,
}

impl IdCounters {
    pub fn reconcile(&self, offer_max: i64, event_max: i64, battle_max: i64, espionage_max: i64) {
        self.trade_offer.store(offer_max, Ordering::SeqCst);
        self.trade_event.store(event_max, Ordering::SeqCst);
        self.battle_report.store(battle_max, Ordering::SeqCst);
        self.espionage_report.store(espionage_max, Ordering::SeqCst);
    }

    pub fn next_trade_offer(&self) -> i64 {
        self.trade_offer.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn next_trade_event(&self) -> i64 {
        self.trade_event.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn next_battle_report(&self) -> i64 {
        self.battle_report.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn next_espionage_report(&self) -> i64 {
        self.espionage_report.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// The authoritative simulation state. `World` (spec.md §4.1) holds the
/// per-entity components; everything else here is connective tissue the
/// spec's systems and persistence bridge need: marketplace offers/history,
/// id counters, the entity->planet_id correlation used only to address DB
/// rows (planets/buildings/fleets/ship_build_queue are keyed by planet id,
/// not user id), and per-planet energy-deficit notification cooldowns.
pub struct Simulation {
    pub world: World,
    pub planet_id_of: HashMap<EntityId, i64>,
    pub market: Vec<TradeOffer>,
    pub trade_history: Vec<TradeEvent>,
    pub battle_reports: Vec<BattleReport>,
    pub espionage_reports: Vec<EspionageReport>,
    pub ids: IdCounters,
    pub notifier: Arc<dyn Notifier>,
    pub events: Arc<EventSink>,
    pub bridge: Arc<Bridge>,
    pub energy_deficit_cooldown: HashMap<EntityId, DateTime<Utc>>,
    pub commands: Receiver<crate::ecs::Command>,
    pub queries: Option<Receiver<QueryRequest>>,
    pub loaded: bool,
}

impl Simulation {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        events: Arc<EventSink>,
        bridge: Arc<Bridge>,
        commands: Receiver<crate::ecs::Command>,
    ) -> Self {
        Simulation {
            world: World::new(),
            planet_id_of: HashMap::new(),
            market: Vec::new(),
            trade_history: Vec::new(),
            battle_reports: Vec::new(),
            espionage_reports: Vec::new(),
            ids: IdCounters::default(),
            notifier,
            events,
            bridge,
            energy_deficit_cooldown: HashMap::new(),
            commands,
            queries: None,
            loaded: false,
        }
    }

    pub fn planet_id(&self, entity: EntityId) -> Option<i64> {
        self.planet_id_of.get(&entity).copied()
    }

    /// Wires the read-path snapshot-query channel; called once at startup by
    /// the binary that also wires the HTTP router's sender half. Tests that
    /// never exercise the HTTP seam can leave this unset.
    pub fn set_queries(&mut self, rx: Receiver<QueryRequest>) {
        self.queries = Some(rx);
    }

    /// Opportunistically drains pending commands and runs one tick;
    /// read paths call this to settle due completions deterministically
    /// (spec.md §4.11) without the scheduler's background cadence.
    pub fn settle(&mut self, now: DateTime<Utc>) {
        self.drain_commands();
        self.drain_queries();
        scheduler::run_systems_once(self, now);
    }

    pub fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            commands::apply(self, command, Utc::now());
        }
    }

    /// Drains and answers every snapshot query queued since the last tick.
    pub fn drain_queries(&mut self) {
        let Some(rx) = self.queries.take() else { return };
        while let Ok(request) = rx.try_recv() {
            let value = query::answer(self, request.query);
            let _ = request.reply.send(value);
        }
        self.queries = Some(rx);
    }
}
