//! Async, connection-pooled database client. Grounded in the teacher's own
//! `src/db/mod.rs` (`DbClient` wrapping a `diesel_async` + `deadpool` pool,
//! a single `conn()` accessor, plain `diesel::insert_into`/`update`/`select`
//! calls per operation) but re-pointed at the tables in `crate::schema`
//! (spec.md §6.3) instead of the teacher's SpaceTraders tables.
//!
//! Every method here is a thin, fallible query; callers (the persistence
//! bridge, `src/persist/hydrate.rs`) are responsible for the
//! log-and-swallow policy of spec.md §7 — this module itself just
//! propagates `PersistError`.

pub mod db_models;

use crate::errors::PersistError;
use crate::schema::*;
use chrono::{DateTime, Utc};
use db_models::*;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::pooled_connection::deadpool::{Object, Pool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde_json::Value;

#[derive(Clone)]
pub struct DbClient {
    pool: Pool<AsyncPgConnection>,
}

impl DbClient {
    pub async fn connect(database_url: &str, pool_size: usize) -> Result<DbClient, PersistError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(manager)
            .max_size(pool_size)
            .build()
            .map_err(|e| PersistError::Pool(e.to_string()))?;
        Ok(DbClient { pool })
    }

    async fn conn(&self) -> Result<Object<AsyncPgConnection>, PersistError> {
        self.pool.get().await.map_err(|e| PersistError::Pool(e.to_string()))
    }

    // ----------------------------------------------------------------- users

    pub async fn list_users(&self) -> Result<Vec<User>, PersistError> {
        Ok(users::table.select(User::as_select()).load(&mut self.conn().await?).await?)
    }

    pub async fn touch_last_login(&self, user_id: i64, at: DateTime<Utc>) -> Result<(), PersistError> {
        diesel::update(users::table.filter(users::id.eq(user_id)))
            .set(users::last_login.eq(at))
            .execute(&mut self.conn().await?)
            .await?;
        Ok(())
    }

    /// `last_login < cutoff` OR never logged in and `created_at < cutoff`.
    pub async fn cleanup_inactive_users(&self, cutoff: DateTime<Utc>) -> Result<Vec<i64>, PersistError> {
        let mut conn = self.conn().await?;
        let victims: Vec<i64> = users::table
            .filter(
                users::last_login
                    .lt(cutoff)
                    .or(users::last_login.is_null().and(users::created_at.lt(cutoff))),
            )
            .select(users::id)
            .load(&mut conn)
            .await?;
        if !victims.is_empty() {
            diesel::delete(users::table.filter(users::id.eq_any(&victims)))
                .execute(&mut conn)
                .await?;
        }
        Ok(victims)
    }

    // --------------------------------------------------------------- planets

    pub async fn list_planets(&self) -> Result<Vec<PlanetRow>, PersistError> {
        Ok(planets::table.select(PlanetRow::as_select()).load(&mut self.conn().await?).await?)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_planet_resources(
        &self,
        planet_id: i64,
        metal: i64,
        crystal: i64,
        deuterium: i64,
        metal_rate: f64,
        crystal_rate: f64,
        deuterium_rate: f64,
        last_update: DateTime<Utc>,
    ) -> Result<(), PersistError> {
        diesel::update(planets::table.filter(planets::id.eq(planet_id)))
            .set((
                planets::metal.eq(metal),
                planets::crystal.eq(crystal),
                planets::deuterium.eq(deuterium),
                planets::metal_rate.eq(metal_rate),
                planets::crystal_rate.eq(crystal_rate),
                planets::deuterium_rate.eq(deuterium_rate),
                planets::last_update.eq(last_update),
            ))
            .execute(&mut self.conn().await?)
            .await?;
        Ok(())
    }

    /// Atomic conditional spend: only commits if the row still has enough of
    /// each resource at the moment of the update, avoiding a check-then-set
    /// race across db workers. Returns `true` if the spend was applied.
    pub async fn spend_resources(
        &self,
        planet_id: i64,
        metal: i64,
        crystal: i64,
        deuterium: i64,
    ) -> Result<bool, PersistError> {
        let rows = diesel::update(
            planets::table
                .filter(planets::id.eq(planet_id))
                .filter(planets::metal.ge(metal))
                .filter(planets::crystal.ge(crystal))
                .filter(planets::deuterium.ge(deuterium)),
        )
        .set((
            planets::metal.eq(planets::metal - metal),
            planets::crystal.eq(planets::crystal - crystal),
            planets::deuterium.eq(planets::deuterium - deuterium),
        ))
        .execute(&mut self.conn().await?)
        .await?;
        Ok(rows > 0)
    }

    /// Atomic check-and-insert on `(owner_id, galaxy, system, position)`;
    /// relies on the table's UNIQUE constraint (spec.md §6.3) to reject a
    /// concurrent double-colonize rather than racing on a prior SELECT.
    pub async fn create_colony(&self, planet: NewPlanet) -> Result<Option<i64>, PersistError> {
        let result = diesel::insert_into(planets::table)
            .values(&planet)
            .on_conflict_do_nothing()
            .get_result::<PlanetRow>(&mut self.conn().await?)
            .await
            .optional()?;
        Ok(result.map(|r| r.id))
    }

    // ------------------------------------------------------------- buildings

    pub async fn list_all_buildings(&self) -> Result<Vec<BuildingRow>, PersistError> {
        Ok(buildings::table.select(BuildingRow::as_select()).load(&mut self.conn().await?).await?)
    }

    pub async fn upsert_building_level(
        &self,
        planet_id: i64,
        building_type: &str,
        level: i32,
    ) -> Result<(), PersistError> {
        diesel::insert_into(buildings::table)
            .values((
                buildings::planet_id.eq(planet_id),
                buildings::type_.eq(building_type),
                buildings::level.eq(level),
            ))
            .on_conflict((buildings::planet_id, buildings::type_))
            .do_update()
            .set(buildings::level.eq(level))
            .execute(&mut self.conn().await?)
            .await?;
        Ok(())
    }

    // ----------------------------------------------------------- build queue

    pub async fn list_pending_building_queue(&self) -> Result<Vec<BuildingQueueRow>, PersistError> {
        Ok(building_queue::table
            .filter(building_queue::status.eq("pending"))
            .select(BuildingQueueRow::as_select())
            .load(&mut self.conn().await?)
            .await?)
    }

    pub async fn enqueue_building(&self, row: NewBuildingQueueRow) -> Result<i64, PersistError> {
        let inserted: BuildingQueueRow = diesel::insert_into(building_queue::table)
            .values(&row)
            .get_result(&mut self.conn().await?)
            .await?;
        Ok(inserted.id)
    }

    /// Marks the earliest still-pending row for `(planet_id, building_type)`
    /// complete, matching "request DB completion of the earliest matching
    /// pending row" (spec.md §4.5).
    pub async fn complete_earliest_building(
        &self,
        planet_id: i64,
        building_type: &str,
    ) -> Result<(), PersistError> {
        let mut conn = self.conn().await?;
        let row_id: Option<i64> = building_queue::table
            .filter(building_queue::planet_id.eq(planet_id))
            .filter(building_queue::building_type.eq(building_type))
            .filter(building_queue::status.eq("pending"))
            .order(building_queue::complete_at.asc())
            .select(building_queue::id)
            .first(&mut conn)
            .await
            .optional()?;
        if let Some(id) = row_id {
            diesel::update(building_queue::table.filter(building_queue::id.eq(id)))
                .set(building_queue::status.eq("complete"))
                .execute(&mut conn)
                .await?;
        }
        Ok(())
    }

    pub async fn cancel_building_queue_row(&self, id: i64) -> Result<(), PersistError> {
        diesel::delete(building_queue::table.filter(building_queue::id.eq(id)))
            .execute(&mut self.conn().await?)
            .await?;
        Ok(())
    }

    // -------------------------------------------------------- research queue

    pub async fn list_pending_research_queue(&self) -> Result<Vec<ResearchQueueRow>, PersistError> {
        Ok(research_queue::table
            .filter(research_queue::status.eq("pending"))
            .select(ResearchQueueRow::as_select())
            .load(&mut self.conn().await?)
            .await?)
    }

    pub async fn enqueue_research(&self, row: NewResearchQueueRow) -> Result<i64, PersistError> {
        let inserted: ResearchQueueRow = diesel::insert_into(research_queue::table)
            .values(&row)
            .get_result(&mut self.conn().await?)
            .await?;
        Ok(inserted.id)
    }

    pub async fn complete_earliest_research(
        &self,
        user_id: i64,
        research_type: &str,
    ) -> Result<(), PersistError> {
        let mut conn = self.conn().await?;
        let row_id: Option<i64> = research_queue::table
            .filter(research_queue::user_id.eq(user_id))
            .filter(research_queue::research_type.eq(research_type))
            .filter(research_queue::status.eq("pending"))
            .order(research_queue::complete_at.asc())
            .select(research_queue::id)
            .first(&mut conn)
            .await
            .optional()?;
        if let Some(id) = row_id {
            diesel::update(research_queue::table.filter(research_queue::id.eq(id)))
                .set(research_queue::status.eq("complete"))
                .execute(&mut conn)
                .await?;
        }
        Ok(())
    }

    pub async fn cancel_research_queue_row(&self, id: i64) -> Result<(), PersistError> {
        diesel::delete(research_queue::table.filter(research_queue::id.eq(id)))
            .execute(&mut self.conn().await?)
            .await?;
        Ok(())
    }

    pub async fn upsert_research_level(
        &self,
        user_id: i64,
        research_type: &str,
        level: i32,
    ) -> Result<(), PersistError> {
        use research::dsl;
        macro_rules! bump {
            ($col:ident) => {{
                diesel::insert_into(research::table)
                    .values((dsl::user_id.eq(user_id), dsl::$col.eq(level)))
                    .on_conflict(dsl::user_id)
                    .do_update()
                    .set(dsl::$col.eq(level))
                    .execute(&mut self.conn().await?)
                    .await?;
            }};
        }
        match research_type {
            "energy" => bump!(energy),
            "laser" => bump!(laser),
            "ion" => bump!(ion),
            "hyperspace" => bump!(hyperspace),
            "plasma" => bump!(plasma),
            "computer" => bump!(computer),
            _ => {}
        }
        Ok(())
    }

    // ------------------------------------------------------- ship build queue

    pub async fn list_pending_ship_build_queue(&self) -> Result<Vec<ShipBuildQueueRow>, PersistError> {
        Ok(ship_build_queue::table
            .filter(ship_build_queue::completed_at.is_null())
            .select(ShipBuildQueueRow::as_select())
            .load(&mut self.conn().await?)
            .await?)
    }

    pub async fn enqueue_ship_build(&self, row: NewShipBuildQueueRow) -> Result<i64, PersistError> {
        let inserted: ShipBuildQueueRow = diesel::insert_into(ship_build_queue::table)
            .values(&row)
            .get_result(&mut self.conn().await?)
            .await?;
        Ok(inserted.id)
    }

    pub async fn complete_ship_build_row(&self, id: i64, at: DateTime<Utc>) -> Result<(), PersistError> {
        diesel::update(ship_build_queue::table.filter(ship_build_queue::id.eq(id)))
            .set(ship_build_queue::completed_at.eq(at))
            .execute(&mut self.conn().await?)
            .await?;
        Ok(())
    }

    /// Marks the earliest still-pending row for `(planet_id, ship_type)`
    /// complete, mirroring `complete_earliest_building`.
    pub async fn complete_earliest_ship_build(
        &self,
        planet_id: i64,
        ship_type: &str,
        at: DateTime<Utc>,
    ) -> Result<(), PersistError> {
        let mut conn = self.conn().await?;
        let row_id: Option<i64> = ship_build_queue::table
            .filter(ship_build_queue::planet_id.eq(planet_id))
            .filter(ship_build_queue::ship_type.eq(ship_type))
            .filter(ship_build_queue::completed_at.is_null())
            .order(ship_build_queue::completion_time.asc())
            .select(ship_build_queue::id)
            .first(&mut conn)
            .await
            .optional()?;
        if let Some(id) = row_id {
            diesel::update(ship_build_queue::table.filter(ship_build_queue::id.eq(id)))
                .set(ship_build_queue::completed_at.eq(at))
                .execute(&mut conn)
                .await?;
        }
        Ok(())
    }

    pub async fn upsert_fleet_counts(&self, planet_id: i64, fleet: &crate::ecs::Fleet) -> Result<(), PersistError> {
        diesel::insert_into(fleets::table)
            .values((
                fleets::planet_id.eq(planet_id),
                fleets::light_fighter.eq(fleet.light_fighter),
                fleets::heavy_fighter.eq(fleet.heavy_fighter),
                fleets::cruiser.eq(fleet.cruiser),
                fleets::battleship.eq(fleet.battleship),
                fleets::bomber.eq(fleet.bomber),
                fleets::colony_ship.eq(fleet.colony_ship),
            ))
            .on_conflict(fleets::planet_id)
            .do_update()
            .set((
                fleets::light_fighter.eq(excluded(fleets::light_fighter)),
                fleets::heavy_fighter.eq(excluded(fleets::heavy_fighter)),
                fleets::cruiser.eq(excluded(fleets::cruiser)),
                fleets::battleship.eq(excluded(fleets::battleship)),
                fleets::bomber.eq(excluded(fleets::bomber)),
                fleets::colony_ship.eq(excluded(fleets::colony_ship)),
            ))
            .execute(&mut self.conn().await?)
            .await?;
        Ok(())
    }

    pub async fn list_all_fleets(&self) -> Result<Vec<FleetRow>, PersistError> {
        Ok(fleets::table.select(FleetRow::as_select()).load(&mut self.conn().await?).await?)
    }

    pub async fn list_all_research(&self) -> Result<Vec<ResearchRow>, PersistError> {
        Ok(research::table.select(ResearchRow::as_select()).load(&mut self.conn().await?).await?)
    }

    // ------------------------------------------------------------ fleet missions

    pub async fn list_all_fleet_missions(&self) -> Result<Vec<FleetMissionRow>, PersistError> {
        Ok(fleet_missions::table
            .select(FleetMissionRow::as_select())
            .load(&mut self.conn().await?)
            .await?)
    }

    pub async fn upsert_fleet_mission(&self, row: NewFleetMissionRow) -> Result<(), PersistError> {
        diesel::insert_into(fleet_missions::table)
            .values(&row)
            .on_conflict(fleet_missions::user_id)
            .do_update()
            .set((
                fleet_missions::origin_galaxy.eq(excluded(fleet_missions::origin_galaxy)),
                fleet_missions::origin_system.eq(excluded(fleet_missions::origin_system)),
                fleet_missions::origin_position.eq(excluded(fleet_missions::origin_position)),
                fleet_missions::target_galaxy.eq(excluded(fleet_missions::target_galaxy)),
                fleet_missions::target_system.eq(excluded(fleet_missions::target_system)),
                fleet_missions::target_position.eq(excluded(fleet_missions::target_position)),
                fleet_missions::mission.eq(excluded(fleet_missions::mission)),
                fleet_missions::speed.eq(excluded(fleet_missions::speed)),
                fleet_missions::recalled.eq(excluded(fleet_missions::recalled)),
                fleet_missions::departure_time.eq(excluded(fleet_missions::departure_time)),
                fleet_missions::arrival_time.eq(excluded(fleet_missions::arrival_time)),
            ))
            .execute(&mut self.conn().await?)
            .await?;
        Ok(())
    }

    pub async fn delete_fleet_mission(&self, user_id: i64) -> Result<(), PersistError> {
        diesel::delete(fleet_missions::table.filter(fleet_missions::user_id.eq(user_id)))
            .execute(&mut self.conn().await?)
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------ reports

    pub async fn insert_battle_report(&self, row: NewBattleReportRow) -> Result<i64, PersistError> {
        let inserted: BattleReportRow = diesel::insert_into(battle_reports::table)
            .values(&row)
            .get_result(&mut self.conn().await?)
            .await?;
        Ok(inserted.id)
    }

    pub async fn list_battle_reports(
        &self,
        participant: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BattleReportRow>, PersistError> {
        Ok(battle_reports::table
            .filter(
                battle_reports::attacker_user_id
                    .eq(participant)
                    .or(battle_reports::defender_user_id.eq(participant)),
            )
            .order(battle_reports::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(BattleReportRow::as_select())
            .load(&mut self.conn().await?)
            .await?)
    }

    pub async fn insert_espionage_report(&self, row: NewEspionageReportRow) -> Result<i64, PersistError> {
        let inserted: EspionageReportRow = diesel::insert_into(espionage_reports::table)
            .values(&row)
            .get_result(&mut self.conn().await?)
            .await?;
        Ok(inserted.id)
    }

    pub async fn list_espionage_reports(
        &self,
        attacker: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EspionageReportRow>, PersistError> {
        Ok(espionage_reports::table
            .filter(espionage_reports::attacker_user_id.eq(attacker))
            .order(espionage_reports::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(EspionageReportRow::as_select())
            .load(&mut self.conn().await?)
            .await?)
    }

    // ------------------------------------------------------------- marketplace

    pub async fn insert_trade_offer(&self, row: NewTradeOfferRow) -> Result<i64, PersistError> {
        let inserted: TradeOfferRow = diesel::insert_into(trade_offers::table)
            .values(&row)
            .get_result(&mut self.conn().await?)
            .await?;
        Ok(inserted.id)
    }

    pub async fn mark_offer_accepted(
        &self,
        offer_id: i64,
        accepted_by: i64,
        accepted_at: DateTime<Utc>,
    ) -> Result<(), PersistError> {
        diesel::update(trade_offers::table.filter(trade_offers::id.eq(offer_id)))
            .set((
                trade_offers::status.eq("accepted"),
                trade_offers::accepted_by.eq(accepted_by),
                trade_offers::accepted_at.eq(accepted_at),
            ))
            .execute(&mut self.conn().await?)
            .await?;
        Ok(())
    }

    pub async fn mark_offer_cancelled(&self, offer_id: i64) -> Result<(), PersistError> {
        diesel::update(trade_offers::table.filter(trade_offers::id.eq(offer_id)))
            .set(trade_offers::status.eq("cancelled"))
            .execute(&mut self.conn().await?)
            .await?;
        Ok(())
    }

    pub async fn list_open_trade_offers(&self) -> Result<Vec<TradeOfferRow>, PersistError> {
        Ok(trade_offers::table
            .filter(trade_offers::status.eq("open"))
            .select(TradeOfferRow::as_select())
            .load(&mut self.conn().await?)
            .await?)
    }

    pub async fn list_trade_offers(
        &self,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TradeOfferRow>, PersistError> {
        let mut query = trade_offers::table.into_boxed();
        if let Some(status) = status {
            query = query.filter(trade_offers::status.eq(status.to_string()));
        }
        Ok(query
            .order(trade_offers::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(TradeOfferRow::as_select())
            .load(&mut self.conn().await?)
            .await?)
    }

    pub async fn list_trade_history(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TradeEventRow>, PersistError> {
        Ok(trade_events::table
            .filter(
                trade_events::seller_user_id
                    .eq(user_id)
                    .or(trade_events::buyer_user_id.eq(user_id)),
            )
            .order(trade_events::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(TradeEventRow::as_select())
            .load(&mut self.conn().await?)
            .await?)
    }

    pub async fn insert_trade_event(&self, row: NewTradeEventRow) -> Result<i64, PersistError> {
        let inserted: TradeEventRow = diesel::insert_into(trade_events::table)
            .values(&row)
            .get_result(&mut self.conn().await?)
            .await?;
        Ok(inserted.id)
    }

    // ------------------------------------------------------- id reconciliation

    pub async fn max_trade_offer_id(&self) -> Result<i64, PersistError> {
        Ok(trade_offers::table
            .select(diesel::dsl::max(trade_offers::id))
            .first::<Option<i64>>(&mut self.conn().await?)
            .await?
            .unwrap_or(0))
    }

    pub async fn max_trade_event_id(&self) -> Result<i64, PersistError> {
        Ok(trade_events::table
            .select(diesel::dsl::max(trade_events::id))
            .first::<Option<i64>>(&mut self.conn().await?)
            .await?
            .unwrap_or(0))
    }

    pub async fn max_battle_report_id(&self) -> Result<i64, PersistError> {
        Ok(battle_reports::table
            .select(diesel::dsl::max(battle_reports::id))
            .first::<Option<i64>>(&mut self.conn().await?)
            .await?
            .unwrap_or(0))
    }

    pub async fn max_espionage_report_id(&self) -> Result<i64, PersistError> {
        Ok(espionage_reports::table
            .select(diesel::dsl::max(espionage_reports::id))
            .first::<Option<i64>>(&mut self.conn().await?)
            .await?
            .unwrap_or(0))
    }

    // ------------------------------------------------------------- notifications

    pub async fn insert_notification(
        &self,
        user_id: i64,
        kind: &str,
        payload: Value,
        priority: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(), PersistError> {
        diesel::insert_into(notifications::table)
            .values((
                notifications::user_id.eq(user_id),
                notifications::type_.eq(kind),
                notifications::payload.eq(payload),
                notifications::priority.eq(priority),
                notifications::created_at.eq(created_at),
            ))
            .execute(&mut self.conn().await?)
            .await?;
        Ok(())
    }

    // --------------------------------------------------------------- admin

    /// Deletes every row from every table, in child-before-parent order.
    /// Dev/test-database maintenance only; grounded in the teacher's
    /// `bin/pg_truncate.rs`, generalized from its per-table `unwrap()` list
    /// to the tables this schema owns.
    pub async fn truncate_all(&self) -> Result<(), PersistError> {
        let mut conn = self.conn().await?;
        diesel::delete(trade_events::table).execute(&mut conn).await?;
        diesel::delete(trade_offers::table).execute(&mut conn).await?;
        diesel::delete(espionage_reports::table).execute(&mut conn).await?;
        diesel::delete(battle_reports::table).execute(&mut conn).await?;
        diesel::delete(fleet_missions::table).execute(&mut conn).await?;
        diesel::delete(ship_build_queue::table).execute(&mut conn).await?;
        diesel::delete(research_queue::table).execute(&mut conn).await?;
        diesel::delete(building_queue::table).execute(&mut conn).await?;
        diesel::delete(notifications::table).execute(&mut conn).await?;
        diesel::delete(research::table).execute(&mut conn).await?;
        diesel::delete(fleets::table).execute(&mut conn).await?;
        diesel::delete(buildings::table).execute(&mut conn).await?;
        diesel::delete(planets::table).execute(&mut conn).await?;
        diesel::delete(users::table).execute(&mut conn).await?;
        Ok(())
    }
}
