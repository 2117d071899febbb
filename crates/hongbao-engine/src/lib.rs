//! # hongbao-engine
//!
//! Pooled-gift distribution and claim engine: a shared coin pool is split
//! into a fixed number of randomly-sized shares, claimed by concurrently
//! racing users with hard conservation and exactly-once-per-user guarantees,
//! plus a time-based expiry/refund path.
//!
//! The engine owns the concurrency-critical claim transaction; transport
//! (HTTP, sockets) and UI belong to the caller. Results are surfaced as
//! typed values, and room-scoped [`PacketEvent`]s are published on a
//! broadcast channel for whatever notification layer sits on top.

pub mod engine;
pub mod events;
pub mod split;

mod error;

pub use engine::{
    ClaimOutcome, CreatePacket, EngineConfig, PacketDetails, PacketEngine, MAX_SLOTS,
};
pub use error::EngineError;
pub use events::{ClaimInfo, PacketEvent};
