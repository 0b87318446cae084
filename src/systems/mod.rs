//! The fixed tick's systems, run in the order spec.md §4.3 names them.

pub mod battle;
pub mod building_construction;
pub mod fleet_movement;
pub mod research;
pub mod resource_production;
pub mod shipyard;
