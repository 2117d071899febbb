//! # hongbao-store
//!
//! Durable storage for the hongbao gift-packet system, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle wrapping a
//! `rusqlite::Connection`, typed model structs, and per-table helper
//! functions that operate on a plain `&Connection` so they compose inside
//! multi-statement transactions (the claim and sweep flows in
//! `hongbao-engine` rely on this).

pub mod claims;
pub mod database;
pub mod migrations;
pub mod models;
pub mod packets;
pub mod wallets;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
