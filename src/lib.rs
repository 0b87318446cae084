pub mod config;
pub mod db;
pub mod ecs;
pub mod errors;
pub mod events;
pub mod metrics;
pub mod notify;
pub mod persist;
pub mod schema;
pub mod sim;
pub mod systems;
pub mod time_util;
pub mod web_api_server;
