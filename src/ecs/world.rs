//! The entity-component store. Grounded in
//! `examples/original_source/esper/__init__.py`, the minimal ECS shim the
//! original game used (`World.create_entity`, `add_component`,
//! `remove_component`, `get_components`, `component_for_entity`). Translated
//! into a typed, archetype-free store: one `HashMap<EntityId, T>` per
//! component type rather than `esper`'s per-entity `Vec<Any>`, since Rust
//! has no dynamic attribute bag as convenient as Python's — this keeps
//! queries allocation-light and lets the compiler catch component-type
//! typos that `esper`'s string-free-but-type-free API could not.
//!
//! Per spec.md §4.1: only the simulation thread touches this store.

use super::components::*;
use crate::errors::EcsError;
use std::collections::HashMap;

macro_rules! world_store {
    ($($field:ident : $ty:ty),+ $(,)?) => {
        #[derive(Default)]
        pub struct World {
            next_entity: EntityId,
            pub entities: std::collections::HashSet<EntityId>,
            $(pub $field: HashMap<EntityId, $ty>),+
        }

        $(
            impl Component for $ty {
                fn store(world: &World) -> &HashMap<EntityId, Self> {
                    &world.$field
                }
                fn store_mut(world: &mut World) -> &mut HashMap<EntityId, Self> {
                    &mut world.$field
                }
            }
        )+
    };
}

pub trait Component: Sized + 'static {
    fn store(world: &World) -> &HashMap<EntityId, Self>;
    fn store_mut(world: &mut World) -> &mut HashMap<EntityId, Self>;
}

world_store! {
    players: Player,
    positions: Position,
    resources: Resources,
    resource_production: ResourceProduction,
    buildings: Buildings,
    build_queue: BuildQueue,
    ship_build_queue: ShipBuildQueue,
    fleets: Fleet,
    fleet_movement: FleetMovement,
    research: Research,
    research_queue: ResearchQueue,
    planets: Planet,
    battles: Battle,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entity id without attaching any components; components are
    /// then attached with `add_component`. Mirrors `esper.create_entity()`
    /// called with zero args followed by individual `add_component` calls,
    /// which is how the original construction/hydration code builds entities
    /// incrementally rather than all-at-once.
    pub fn create_entity(&mut self) -> EntityId {
        self.next_entity += 1;
        let id = self.next_entity;
        self.entities.insert(id);
        id
    }

    pub fn destroy_entity(&mut self, entity: EntityId) {
        self.entities.remove(&entity);
        self.players.remove(&entity);
        self.positions.remove(&entity);
        self.resources.remove(&entity);
        self.resource_production.remove(&entity);
        self.buildings.remove(&entity);
        self.build_queue.remove(&entity);
        self.ship_build_queue.remove(&entity);
        self.fleets.remove(&entity);
        self.fleet_movement.remove(&entity);
        self.research.remove(&entity);
        self.research_queue.remove(&entity);
        self.planets.remove(&entity);
        self.battles.remove(&entity);
    }

    pub fn add_component<C: Component>(&mut self, entity: EntityId, component: C) {
        C::store_mut(self).insert(entity, component);
    }

    /// No-op if the component is absent, matching `esper.World.
    /// remove_component`'s `dict.pop(type_, None)` semantics.
    pub fn remove_component<C: Component>(&mut self, entity: EntityId) -> Option<C> {
        C::store_mut(self).remove(&entity)
    }

    pub fn get<C: Component>(&self, entity: EntityId) -> Option<&C> {
        C::store(self).get(&entity)
    }

    pub fn get_mut<C: Component>(&mut self, entity: EntityId) -> Option<&mut C> {
        C::store_mut(self).get_mut(&entity)
    }

    pub fn has<C: Component>(&self, entity: EntityId) -> bool {
        C::store(self).contains_key(&entity)
    }

    /// Fails when absent, matching `esper.World.component_for_entity`'s
    /// `KeyError`.
    pub fn component_for_entity<C: Component>(&self, entity: EntityId) -> Result<&C, EcsError> {
        self.get::<C>(entity).ok_or(EcsError::MissingComponent(entity))
    }

    pub fn component_for_entity_mut<C: Component>(
        &mut self,
        entity: EntityId,
    ) -> Result<&mut C, EcsError> {
        self.get_mut::<C>(entity).ok_or(EcsError::MissingComponent(entity))
    }

    /// Cross-product query over two component types, in stable (by entity
    /// id) order within a tick. Mirrors `esper.World.get_components(A, B)`.
    pub fn query2<A: Component, B: Component>(&self) -> Vec<EntityId> {
        let a = A::store(self);
        let b = B::store(self);
        let (smaller, larger) = if a.len() <= b.len() {
            (a.keys(), b)
        } else {
            (b.keys(), a)
        };
        let mut out: Vec<EntityId> = smaller
            .copied()
            .filter(|id| larger.contains_key(id))
            .collect();
        out.sort_unstable();
        out
    }

    pub fn query3<A: Component, B: Component, C: Component>(&self) -> Vec<EntityId> {
        let a = A::store(self);
        let b = B::store(self);
        let c = C::store(self);
        let mut out: Vec<EntityId> = a
            .keys()
            .copied()
            .filter(|id| b.contains_key(id) && c.contains_key(id))
            .collect();
        out.sort_unstable();
        out
    }

    pub fn highest_entity(&self) -> EntityId {
        self.next_entity
    }

    /// Used by hydration to keep entity ids monotonic when restoring from a
    /// known maximum (e.g. DB user id), matching the original's
    /// reconciliation of in-memory counters against DB maxima (§4.13).
    pub fn bump_next_entity(&mut self, at_least: EntityId) {
        if at_least > self.next_entity {
            self.next_entity = at_least;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_fetch() {
        let mut w = World::new();
        let e = w.create_entity();
        w.add_component(e, Resources { metal: 5, crystal: 0, deuterium: 0 });
        assert_eq!(w.component_for_entity::<Resources>(e).unwrap().metal, 5);
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut w = World::new();
        let e = w.create_entity();
        assert!(w.remove_component::<Resources>(e).is_none());
    }

    #[test]
    fn query2_cross_product() {
        let mut w = World::new();
        let e1 = w.create_entity();
        let e2 = w.create_entity();
        w.add_component(e1, Resources::default());
        w.add_component(e1, Buildings::default());
        w.add_component(e2, Resources::default());
        let matches = w.query2::<Resources, Buildings>();
        assert_eq!(matches, vec![e1]);
    }
}
