//! Component shapes. Grounded in
//! `original_source/src/models/components.py`, translated from dataclasses
//! to plain structs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type EntityId = u64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub user_id: i64,
    pub last_active: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coords {
    pub galaxy: i64,
    pub system: i64,
    pub planet: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    pub galaxy: i64,
    pub system: i64,
    pub planet: i64,
}

impl Position {
    pub fn coords(&self) -> Coords {
        Coords {
            galaxy: self.galaxy,
            system: self.system,
            planet: self.planet,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Resources {
    pub metal: i64,
    pub crystal: i64,
    pub deuterium: i64,
}

impl Resources {
    pub fn get(&self, kind: &str) -> i64 {
        match kind {
            "metal" => self.metal,
            "crystal" => self.crystal,
            "deuterium" => self.deuterium,
            _ => 0,
        }
    }

    pub fn set(&mut self, kind: &str, value: i64) {
        match kind {
            "metal" => self.metal = value,
            "crystal" => self.crystal = value,
            "deuterium" => self.deuterium = value,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResourceProduction {
    pub metal_rate: f64,
    pub crystal_rate: f64,
    pub deuterium_rate: f64,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Buildings {
    pub metal_mine: i64,
    pub crystal_mine: i64,
    pub deuterium_synthesizer: i64,
    pub solar_plant: i64,
    pub fusion_reactor: i64,
    pub robot_factory: i64,
    pub shipyard: i64,
    pub research_lab: i64,
    pub metal_storage: i64,
    pub crystal_storage: i64,
    pub deuterium_tank: i64,
}

impl Buildings {
    pub fn get(&self, kind: &str) -> i64 {
        match kind {
            "metal_mine" => self.metal_mine,
            "crystal_mine" => self.crystal_mine,
            "deuterium_synthesizer" => self.deuterium_synthesizer,
            "solar_plant" => self.solar_plant,
            "fusion_reactor" => self.fusion_reactor,
            "robot_factory" => self.robot_factory,
            "shipyard" => self.shipyard,
            "research_lab" => self.research_lab,
            "metal_storage" => self.metal_storage,
            "crystal_storage" => self.crystal_storage,
            "deuterium_tank" => self.deuterium_tank,
            _ => 0,
        }
    }

    pub fn set(&mut self, kind: &str, value: i64) {
        match kind {
            "metal_mine" => self.metal_mine = value,
            "crystal_mine" => self.crystal_mine = value,
            "deuterium_synthesizer" => self.deuterium_synthesizer = value,
            "solar_plant" => self.solar_plant = value,
            "fusion_reactor" => self.fusion_reactor = value,
            "robot_factory" => self.robot_factory = value,
            "shipyard" => self.shipyard = value,
            "research_lab" => self.research_lab = value,
            "metal_storage" => self.metal_storage = value,
            "crystal_storage" => self.crystal_storage = value,
            "deuterium_tank" => self.deuterium_tank = value,
            _ => {}
        }
    }

    pub fn is_known(kind: &str) -> bool {
        matches!(
            kind,
            "metal_mine"
                | "crystal_mine"
                | "deuterium_synthesizer"
                | "solar_plant"
                | "fusion_reactor"
                | "robot_factory"
                | "shipyard"
                | "research_lab"
                | "metal_storage"
                | "crystal_storage"
                | "deuterium_tank"
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildQueueItem {
    #[serde(rename = "type")]
    pub building_type: String,
    pub completion_time: Option<DateTime<Utc>>,
    pub cost: (i64, i64, i64),
    pub queued_at: DateTime<Utc>,
    pub expected_duration_s: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildQueue {
    pub items: Vec<BuildQueueItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipBuildQueueItem {
    #[serde(rename = "type")]
    pub ship_type: String,
    pub count: i64,
    pub completion_time: Option<DateTime<Utc>>,
    pub cost: (i64, i64, i64),
    pub queued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipBuildQueue {
    pub items: Vec<ShipBuildQueueItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fleet {
    pub light_fighter: i64,
    pub heavy_fighter: i64,
    pub cruiser: i64,
    pub battleship: i64,
    pub bomber: i64,
    pub colony_ship: i64,
}

impl Fleet {
    pub fn get(&self, kind: &str) -> i64 {
        match kind {
            "light_fighter" => self.light_fighter,
            "heavy_fighter" => self.heavy_fighter,
            "cruiser" => self.cruiser,
            "battleship" => self.battleship,
            "bomber" => self.bomber,
            "colony_ship" => self.colony_ship,
            _ => 0,
        }
    }

    pub fn set(&mut self, kind: &str, value: i64) {
        match kind {
            "light_fighter" => self.light_fighter = value,
            "heavy_fighter" => self.heavy_fighter = value,
            "cruiser" => self.cruiser = value,
            "battleship" => self.battleship = value,
            "bomber" => self.bomber = value,
            "colony_ship" => self.colony_ship = value,
            _ => {}
        }
    }

    pub fn total(&self) -> i64 {
        self.light_fighter
            + self.heavy_fighter
            + self.cruiser
            + self.battleship
            + self.bomber
            + self.colony_ship
    }

    pub fn is_known(kind: &str) -> bool {
        matches!(
            kind,
            "light_fighter"
                | "heavy_fighter"
                | "cruiser"
                | "battleship"
                | "bomber"
                | "colony_ship"
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetMovement {
    pub origin: Coords,
    pub target: Coords,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub speed: f64,
    pub mission: String,
    pub owner_id: i64,
    pub recalled: bool,
    pub colonizing_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Research {
    pub energy: i64,
    pub laser: i64,
    pub ion: i64,
    pub hyperspace: i64,
    pub plasma: i64,
    pub computer: i64,
}

impl Research {
    pub fn get(&self, kind: &str) -> i64 {
        match kind {
            "energy" => self.energy,
            "laser" => self.laser,
            "ion" => self.ion,
            "hyperspace" => self.hyperspace,
            "plasma" => self.plasma,
            "computer" => self.computer,
            _ => 0,
        }
    }

    pub fn set(&mut self, kind: &str, value: i64) {
        match kind {
            "energy" => self.energy = value,
            "laser" => self.laser = value,
            "ion" => self.ion = value,
            "hyperspace" => self.hyperspace = value,
            "plasma" => self.plasma = value,
            "computer" => self.computer = value,
            _ => {}
        }
    }

    pub fn is_known(kind: &str) -> bool {
        matches!(
            kind,
            "energy" | "laser" | "ion" | "hyperspace" | "plasma" | "computer"
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchQueueItem {
    #[serde(rename = "type")]
    pub research_type: String,
    pub completion_time: Option<DateTime<Utc>>,
    pub cost: (i64, i64, i64),
    pub queued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchQueue {
    pub items: Vec<ResearchQueueItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Planet {
    pub name: String,
    pub owner_id: i64,
    pub temperature: i64,
    pub size: i64,
}

impl Default for Planet {
    fn default() -> Self {
        Planet {
            name: "Homeworld".to_string(),
            owner_id: 0,
            temperature: 25,
            size: 163,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleOutcome {
    pub winner: String,
    pub attacker_power: f64,
    pub defender_power: f64,
    pub attacker_losses: Fleet,
    pub defender_losses: Fleet,
    pub attacker_remaining: Fleet,
    pub defender_remaining: Fleet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battle {
    pub attacker_id: i64,
    pub defender_id: i64,
    pub location: Coords,
    pub scheduled_time: DateTime<Utc>,
    pub attacker_ships: Fleet,
    pub defender_ships: Fleet,
    pub resolved: bool,
    pub outcome: Option<BattleOutcome>,
}

/// Not an ECS component — the world's marketplace offer list, per
/// `original_source`'s `_market_offers`. Kept as a plain struct alongside
/// the components since spec.md §6.3 gives it its own table shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOffer {
    pub id: i64,
    pub seller_user_id: i64,
    pub offered_resource: String,
    pub offered_amount: i64,
    pub requested_resource: String,
    pub requested_amount: i64,
    pub status: String,
    pub accepted_by: Option<i64>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub offer_id: i64,
    pub seller_user_id: i64,
    pub buyer_user_id: Option<i64>,
    pub offered_resource: String,
    pub offered_amount: i64,
    pub requested_resource: String,
    pub requested_amount: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleReport {
    pub id: i64,
    pub attacker_user_id: i64,
    pub defender_user_id: i64,
    pub location: Coords,
    pub outcome: BattleOutcome,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EspionageSnapshot {
    pub planet: Planet,
    pub resources: Resources,
    pub buildings: Buildings,
    pub fleet: Fleet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EspionageReport {
    pub id: i64,
    pub attacker_user_id: i64,
    pub defender_user_id: Option<i64>,
    pub location: Coords,
    pub snapshot: EspionageSnapshot,
    pub created_at: DateTime<Utc>,
}
