//! Command ingress types. Grounded in
//! `original_source/src/core/commands.py`: typed command shapes plus the
//! normalization rules used when parsing raw inbound JSON (coordinates
//! default to 1 when missing or zero; quantities default to 1).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    BuildBuilding {
        user_id: i64,
        building_type: String,
    },
    DemolishBuilding {
        user_id: i64,
        building_type: String,
    },
    CancelBuildQueue {
        user_id: i64,
        index: Option<usize>,
    },
    UpdatePlayerActivity {
        user_id: i64,
    },
    StartResearch {
        user_id: i64,
        research_type: String,
    },
    BuildShips {
        user_id: i64,
        ship_type: String,
        #[serde(default = "default_quantity")]
        quantity: i64,
    },
    Colonize {
        user_id: i64,
        #[serde(default)]
        galaxy: i64,
        #[serde(default)]
        system: i64,
        #[serde(default)]
        position: i64,
        #[serde(default)]
        planet_name: Option<String>,
    },
    FleetDispatch {
        user_id: i64,
        #[serde(default)]
        galaxy: i64,
        #[serde(default)]
        system: i64,
        #[serde(default)]
        position: i64,
        #[serde(default)]
        mission: Option<String>,
        #[serde(default)]
        speed: Option<f64>,
        #[serde(default)]
        ships: Option<std::collections::HashMap<String, i64>>,
    },
    FleetRecall {
        user_id: i64,
        fleet_id: Option<i64>,
    },
    TradeCreateOffer {
        user_id: i64,
        offered_resource: Option<String>,
        #[serde(default)]
        offered_amount: i64,
        requested_resource: Option<String>,
        #[serde(default)]
        requested_amount: i64,
    },
    TradeAcceptOffer {
        user_id: i64,
        offer_id: i64,
    },
}

fn default_quantity() -> i64 {
    1
}

/// Coordinates default to 1 when missing or falsy (including 0), matching
/// `_get_coord` in the original.
pub fn normalize_coord(v: i64) -> i64 {
    if v == 0 {
        1
    } else {
        v
    }
}

impl Command {
    pub fn user_id(&self) -> i64 {
        match self {
            Command::BuildBuilding { user_id, .. }
            | Command::DemolishBuilding { user_id, .. }
            | Command::CancelBuildQueue { user_id, .. }
            | Command::UpdatePlayerActivity { user_id }
            | Command::StartResearch { user_id, .. }
            | Command::BuildShips { user_id, .. }
            | Command::Colonize { user_id, .. }
            | Command::FleetDispatch { user_id, .. }
            | Command::FleetRecall { user_id, .. }
            | Command::TradeCreateOffer { user_id, .. }
            | Command::TradeAcceptOffer { user_id, .. } => *user_id,
        }
    }

    /// Best-effort parse of a loosely-typed JSON command, used at the
    /// request-adapter seam. Unknown/malformed commands are rejected with
    /// a log line rather than propagated, per spec.md §7.
    pub fn from_json(value: &Value) -> Option<Command> {
        serde_json::from_value(value.clone()).ok()
    }
}
