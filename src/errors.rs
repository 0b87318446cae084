//! Crate-wide error enums, one per module boundary, in the teacher's style of
//! small `thiserror` enums rather than one monolithic error type.

use thiserror::Error;

/// Errors from the entity-component store.
#[derive(Debug, Error)]
pub enum EcsError {
    #[error("entity {0} has no component of the requested type")]
    MissingComponent(u64),
    #[error("entity {0} does not exist")]
    UnknownEntity(u64),
}

/// Errors surfaced while validating or applying a queued command. These are
/// always non-fatal: the caller logs and moves on, per spec.md §7.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown {kind} type '{value}'")]
    UnknownType { kind: &'static str, value: String },
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(i64),
    #[error("prerequisite not met: {0}")]
    PrerequisiteUnmet(String),
    #[error("fleet cap exceeded: {current} + {requested} > {max}")]
    FleetCapExceeded {
        current: i64,
        requested: i64,
        max: i64,
    },
    #[error("queue is full (limit {0})")]
    QueueFull(usize),
    #[error("target player not found")]
    UnknownPlayer,
    #[error("coordinates already occupied")]
    CoordinatesOccupied,
    #[error("no such offer {0}")]
    UnknownOffer(i64),
    #[error("offer is not open")]
    OfferNotOpen,
    #[error("insufficient resources")]
    InsufficientResources,
    #[error("cannot accept your own offer")]
    SelfTrade,
    #[error("fleet already recalled or arrived")]
    RecallRejected,
}

/// Errors from the async persistence bridge. Per spec.md §4.12/§5, none of
/// these ever propagate into the simulation thread; they are logged and
/// swallowed at the call site. The type exists so that bridge internals
/// still get to use `?`.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("database disabled or pool unavailable")]
    Disabled,
    #[error("bounded wait timed out")]
    TimedOut,
    #[error("database error: {0}")]
    Db(#[from] diesel::result::Error),
    #[error("pool error: {0}")]
    Pool(String),
}
