//! Marketplace (trade) operations. Grounded in
//! `original_source/src/systems/trade.py` / `src/api/routes.py`'s trade
//! handlers. Per spec.md §4.10 these run *synchronously* inside the
//! simulation thread rather than through the command queue, since they
//! touch multiple `Resources` components atomically relative to ticks —
//! callers (the request adapter, via a direct method call guarded by the
//! simulation owning `&mut Simulation`) get the result immediately instead
//! of discovering it on the next tick.

use crate::config::CONFIG;
use crate::ecs::components::{EntityId, Resources, TradeEvent, TradeOffer};
use crate::errors::CommandError;
use crate::persist::sync_ops;
use crate::sim::Simulation;
use chrono::Utc;

fn is_known_resource(kind: &str) -> bool {
    matches!(kind, "metal" | "crystal" | "deuterium")
}

/// Create an offer: validates resource kinds and positive amounts, checks
/// the seller's balance, deducts into escrow, and allocates a monotonically
/// increasing offer id.
pub fn create_offer(
    sim: &mut Simulation,
    seller_entity: EntityId,
    offered_resource: &str,
    offered_amount: i64,
    requested_resource: &str,
    requested_amount: i64,
) -> Result<i64, CommandError> {
    if !is_known_resource(offered_resource) {
        return Err(CommandError::UnknownType {
            kind: "resource",
            value: offered_resource.to_string(),
        });
    }
    if !is_known_resource(requested_resource) {
        return Err(CommandError::UnknownType {
            kind: "resource",
            value: requested_resource.to_string(),
        });
    }
    if offered_amount <= 0 {
        return Err(CommandError::NonPositiveAmount(offered_amount));
    }
    if requested_amount <= 0 {
        return Err(CommandError::NonPositiveAmount(requested_amount));
    }

    let seller_user_id = {
        let player = sim
            .world
            .get::<crate::ecs::Player>(seller_entity)
            .ok_or(CommandError::UnknownPlayer)?;
        player.user_id
    };

    let resources = sim
        .world
        .get_mut::<Resources>(seller_entity)
        .ok_or(CommandError::UnknownPlayer)?;
    if resources.get(offered_resource) < offered_amount {
        return Err(CommandError::InsufficientResources);
    }
    resources.set(offered_resource, resources.get(offered_resource) - offered_amount);

    let now = Utc::now();
    let id = sim.ids.next_trade_offer();
    let offer = TradeOffer {
        id,
        seller_user_id,
        offered_resource: offered_resource.to_string(),
        offered_amount,
        requested_resource: requested_resource.to_string(),
        requested_amount,
        status: "open".to_string(),
        accepted_by: None,
        accepted_at: None,
        created_at: now,
    };
    sim.market.push(offer.clone());

    let event = TradeEvent {
        id: sim.ids.next_trade_event(),
        kind: "offer_created".to_string(),
        offer_id: id,
        seller_user_id,
        buyer_user_id: None,
        offered_resource: offered_resource.to_string(),
        offered_amount,
        requested_resource: requested_resource.to_string(),
        requested_amount,
        status: "open".to_string(),
        created_at: now,
    };
    sim.trade_history.push(event.clone());

    sync_ops::persist_trade_offer(sim, &offer);
    sync_ops::persist_trade_event(sim, &event);

    Ok(id)
}

/// Accept an offer: must be open, buyer != seller, buyer can afford the
/// requested amount. Transfer is all-or-nothing with respect to tick
/// observation since the whole thing runs inside one synchronous call with
/// no intervening tick.
pub fn accept_offer(
    sim: &mut Simulation,
    buyer_entity: EntityId,
    offer_id: i64,
) -> Result<(), CommandError> {
    let offer_idx = sim
        .market
        .iter()
        .position(|o| o.id == offer_id)
        .ok_or(CommandError::UnknownOffer(offer_id))?;
    if sim.market[offer_idx].status != "open" {
        return Err(CommandError::OfferNotOpen);
    }

    let buyer_user_id = {
        let player = sim
            .world
            .get::<crate::ecs::Player>(buyer_entity)
            .ok_or(CommandError::UnknownPlayer)?;
        player.user_id
    };
    if buyer_user_id == sim.market[offer_idx].seller_user_id {
        return Err(CommandError::SelfTrade);
    }

    let (offered_resource, offered_amount, requested_resource, requested_amount, seller_user_id) = {
        let offer = &sim.market[offer_idx];
        (
            offer.offered_resource.clone(),
            offer.offered_amount,
            offer.requested_resource.clone(),
            offer.requested_amount,
            offer.seller_user_id,
        )
    };

    {
        let buyer_resources = sim
            .world
            .get::<Resources>(buyer_entity)
            .ok_or(CommandError::UnknownPlayer)?;
        if buyer_resources.get(&requested_resource) < requested_amount {
            return Err(CommandError::InsufficientResources);
        }
    }

    let fee = CONFIG.trade_transaction_fee_rate;
    let seller_receives = (requested_amount as f64 * (1.0 - fee)).round() as i64;

    // Buyer pays requested, receives offered.
    {
        let buyer_resources = sim.world.get_mut::<Resources>(buyer_entity).unwrap();
        let balance = buyer_resources.get(&requested_resource) - requested_amount;
        buyer_resources.set(&requested_resource, balance);
        let balance = buyer_resources.get(&offered_resource) + offered_amount;
        buyer_resources.set(&offered_resource, balance);
    }

    // Seller receives requested (minus fee); offered was already escrowed at
    // creation time so no further deduction happens here.
    if let Some(seller_entity) = find_entity_for_user(sim, seller_user_id) {
        let seller_resources = sim.world.get_mut::<Resources>(seller_entity).unwrap();
        let balance = seller_resources.get(&requested_resource) + seller_receives;
        seller_resources.set(&requested_resource, balance);
    }

    let now = Utc::now();
    {
        let offer = &mut sim.market[offer_idx];
        offer.status = "accepted".to_string();
        offer.accepted_by = Some(buyer_user_id);
        offer.accepted_at = Some(now);
    }
    let offer = sim.market[offer_idx].clone();
    sync_ops::persist_trade_offer_accepted(sim, offer_id, buyer_user_id, now);

    let event = TradeEvent {
        id: sim.ids.next_trade_event(),
        kind: "trade_completed".to_string(),
        offer_id,
        seller_user_id,
        buyer_user_id: Some(buyer_user_id),
        offered_resource,
        offered_amount,
        requested_resource,
        requested_amount,
        status: "accepted".to_string(),
        created_at: now,
    };
    sim.trade_history.push(event.clone());
    sync_ops::persist_trade_event(sim, &event);

    sim.events.send(
        buyer_user_id,
        serde_json::json!({ "type": "trade_event", "event": "trade_completed", "offer": offer }),
    );
    sim.events.send(
        seller_user_id,
        serde_json::json!({ "type": "trade_event", "event": "trade_completed", "offer": offer }),
    );

    Ok(())
}

fn find_entity_for_user(sim: &Simulation, user_id: i64) -> Option<EntityId> {
    sim.world
        .players
        .iter()
        .find(|(_, p)| p.user_id == user_id)
        .map(|(entity, _)| *entity)
}

pub fn list_offers(sim: &Simulation, status: Option<&str>, limit: usize, offset: usize) -> Vec<TradeOffer> {
    let mut offers: Vec<&TradeOffer> = sim
        .market
        .iter()
        .filter(|o| status.map(|s| o.status == s).unwrap_or(true))
        .collect();
    offers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    offers
        .into_iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect()
}

pub fn trade_history_for_user(sim: &Simulation, user_id: i64, limit: usize, offset: usize) -> Vec<TradeEvent> {
    let mut events: Vec<&TradeEvent> = sim
        .trade_history
        .iter()
        .filter(|e| e.seller_user_id == user_id || e.buyer_user_id == Some(user_id))
        .collect();
    events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    events.into_iter().skip(offset).take(limit).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::{Buildings, Fleet, Planet, Player, Position, Research};
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

    fn seed_player(sim: &mut Simulation, user_id: i64, metal: i64, crystal: i64) -> EntityId {
        let entity = sim.world.create_entity();
        sim.world.add_component(
            entity,
            Player {
                name: format!("user{user_id}"),
                user_id,
                last_active: Utc::now(),
            },
        );
        sim.world.add_component(
            entity,
            Position {
                galaxy: 1,
                system: 1,
                planet: user_id,
            },
        );
        sim.world.add_component(
            entity,
            Resources {
                metal,
                crystal,
                deuterium: 0,
            },
        );
        sim.world.add_component(entity, Buildings::default());
        sim.world.add_component(entity, Fleet::default());
        sim.world.add_component(entity, Research::default());
        sim.world.add_component(entity, Planet::default());
        entity
    }

    #[test]
    fn accept_offer_transfers_resources_per_scenario_4() {
        let mut sim = fresh_sim();
        let seller = seed_player(&mut sim, 1, 1000, 1000);
        let buyer = seed_player(&mut sim, 2, 1000, 1000);

        let offer_id = create_offer(&mut sim, seller, "metal", 100, "crystal", 50).unwrap();
        assert_eq!(sim.world.get::<Resources>(seller).unwrap().metal, 900);

        accept_offer(&mut sim, buyer, offer_id).unwrap();

        assert_eq!(sim.world.get::<Resources>(seller).unwrap().metal, 900);
        assert_eq!(sim.world.get::<Resources>(seller).unwrap().crystal, 1050);
        assert_eq!(sim.world.get::<Resources>(buyer).unwrap().metal, 1100);
        assert_eq!(sim.world.get::<Resources>(buyer).unwrap().crystal, 950);
        assert_eq!(sim.market[0].status, "accepted");
        assert_eq!(sim.market[0].accepted_by, Some(2));
    }

    #[test]
    fn cannot_accept_own_offer() {
        let mut sim = fresh_sim();
        let seller = seed_player(&mut sim, 1, 1000, 1000);
        let offer_id = create_offer(&mut sim, seller, "metal", 100, "crystal", 50).unwrap();
        let result = accept_offer(&mut sim, seller, offer_id);
        assert!(matches!(result, Err(CommandError::SelfTrade)));
    }

    #[test]
    fn double_accept_rejected() {
        let mut sim = fresh_sim();
        let seller = seed_player(&mut sim, 1, 1000, 1000);
        let buyer = seed_player(&mut sim, 2, 1000, 1000);
        let offer_id = create_offer(&mut sim, seller, "metal", 100, "crystal", 50).unwrap();
        accept_offer(&mut sim, buyer, offer_id).unwrap();
        let result = accept_offer(&mut sim, buyer, offer_id);
        assert!(matches!(result, Err(CommandError::OfferNotOpen)));
    }
}
