//! Row types for the persisted tables in `crate::schema`, in the teacher's
//! `Insertable`/`Queryable`/`Selectable` style (see the original
//! `src/db/db_models.rs`'s `NewSystem`/`System` pair).

use chrono::{DateTime, Utc};
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde_json::Value;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::planets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PlanetRow {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub galaxy: i32,
    pub system: i32,
    pub position: i32,
    pub temperature: i32,
    pub size: i32,
    pub metal: i64,
    pub crystal: i64,
    pub deuterium: i64,
    pub metal_rate: f64,
    pub crystal_rate: f64,
    pub deuterium_rate: f64,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::planets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPlanet {
    pub name: String,
    pub owner_id: i64,
    pub galaxy: i32,
    pub system: i32,
    pub position: i32,
    pub temperature: i32,
    pub size: i32,
    pub metal: i64,
    pub crystal: i64,
    pub deuterium: i64,
    pub metal_rate: f64,
    pub crystal_rate: f64,
    pub deuterium_rate: f64,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::buildings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BuildingRow {
    pub id: i64,
    pub planet_id: i64,
    #[diesel(column_name = type_)]
    pub building_type: String,
    pub level: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::fleets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FleetRow {
    pub id: i64,
    pub planet_id: i64,
    pub light_fighter: i64,
    pub heavy_fighter: i64,
    pub cruiser: i64,
    pub battleship: i64,
    pub bomber: i64,
    pub colony_ship: i64,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::research)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ResearchRow {
    pub id: i64,
    pub user_id: i64,
    pub energy: i32,
    pub laser: i32,
    pub ion: i32,
    pub hyperspace: i32,
    pub plasma: i32,
    pub computer: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::building_queue)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BuildingQueueRow {
    pub id: i64,
    pub planet_id: i64,
    pub building_type: String,
    pub level: i32,
    pub enqueued_at: DateTime<Utc>,
    pub complete_at: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::building_queue)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewBuildingQueueRow {
    pub planet_id: i64,
    pub building_type: String,
    pub level: i32,
    pub enqueued_at: DateTime<Utc>,
    pub complete_at: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::research_queue)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ResearchQueueRow {
    pub id: i64,
    pub user_id: i64,
    pub research_type: String,
    pub level: i32,
    pub enqueued_at: DateTime<Utc>,
    pub complete_at: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::research_queue)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewResearchQueueRow {
    pub user_id: i64,
    pub research_type: String,
    pub level: i32,
    pub enqueued_at: DateTime<Utc>,
    pub complete_at: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::ship_build_queue)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ShipBuildQueueRow {
    pub id: i64,
    pub planet_id: i64,
    pub ship_type: String,
    pub count: i32,
    pub completion_time: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::ship_build_queue)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewShipBuildQueueRow {
    pub planet_id: i64,
    pub ship_type: String,
    pub count: i32,
    pub completion_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::fleet_missions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FleetMissionRow {
    pub id: i64,
    pub user_id: i64,
    pub origin_galaxy: i32,
    pub origin_system: i32,
    pub origin_position: i32,
    pub target_galaxy: i32,
    pub target_system: i32,
    pub target_position: i32,
    pub mission: String,
    pub speed: f64,
    pub recalled: bool,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::fleet_missions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewFleetMissionRow {
    pub user_id: i64,
    pub origin_galaxy: i32,
    pub origin_system: i32,
    pub origin_position: i32,
    pub target_galaxy: i32,
    pub target_system: i32,
    pub target_position: i32,
    pub mission: String,
    pub speed: f64,
    pub recalled: bool,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::battle_reports)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BattleReportRow {
    pub id: i64,
    pub attacker_user_id: i64,
    pub defender_user_id: i64,
    pub location: Value,
    pub outcome: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::battle_reports)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewBattleReportRow {
    pub attacker_user_id: i64,
    pub defender_user_id: i64,
    pub location: Value,
    pub outcome: Value,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::espionage_reports)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EspionageReportRow {
    pub id: i64,
    pub attacker_user_id: i64,
    pub defender_user_id: Option<i64>,
    pub location: Value,
    pub snapshot: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::espionage_reports)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewEspionageReportRow {
    pub attacker_user_id: i64,
    pub defender_user_id: Option<i64>,
    pub location: Value,
    pub snapshot: Value,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::trade_offers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TradeOfferRow {
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

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::trade_offers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewTradeOfferRow {
    pub seller_user_id: i64,
    pub offered_resource: String,
    pub offered_amount: i64,
    pub requested_resource: String,
    pub requested_amount: i64,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::trade_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TradeEventRow {
    pub id: i64,
    #[diesel(column_name = type_)]
    pub event_type: String,
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

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::trade_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewTradeEventRow {
    #[diesel(column_name = type_)]
    pub event_type: String,
    pub offer_id: i64,
    pub seller_user_id: i64,
    pub buyer_user_id: Option<i64>,
    pub offered_resource: String,
    pub offered_amount: i64,
    pub requested_resource: String,
    pub requested_amount: i64,
    pub status: String,
}
