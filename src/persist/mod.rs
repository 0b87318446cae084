//! The asynchronous persistence bridge (spec.md §4.12) and its startup
//! hydration / offline-accrual counterpart (§4.13). Grounded in
//! `original_source/src/core/sync.py` and `game.py`, and in the teacher's
//! `src/db/mod.rs` pool wrapper.

pub mod bridge;
pub mod hydrate;
pub mod sync_ops;

pub use bridge::Bridge;
pub use hydrate::hydrate;
