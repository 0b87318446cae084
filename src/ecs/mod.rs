pub mod commands;
pub mod components;
pub mod world;

pub use commands::Command;
pub use components::*;
pub use world::World;
