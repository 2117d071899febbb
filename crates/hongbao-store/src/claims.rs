//! Claim persistence.
//!
//! A claim row is only ever written inside the claim transaction, together
//! with the packet counter update and the claimant's wallet credit. The
//! UNIQUE constraint on `(packet_id, user_id)` is the race-free backstop for
//! the engine's pre-check; a constraint violation surfaces as
//! [`StoreError::DuplicateClaim`].

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Claim;
use crate::packets::parse_timestamp;

/// Insert one claim. Maps the `(packet_id, user_id)` uniqueness violation to
/// [`StoreError::DuplicateClaim`].
pub fn insert_claim(conn: &Connection, claim: &Claim) -> Result<()> {
    conn.execute(
        "INSERT INTO claims (id, packet_id, user_id, username, amount, claimed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            claim.id.to_string(),
            claim.packet_id.to_string(),
            claim.user_id,
            claim.username,
            claim.amount,
            claim.claimed_at.to_rfc3339(),
        ],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            StoreError::DuplicateClaim
        } else {
            StoreError::Sqlite(e)
        }
    })?;
    Ok(())
}

/// Whether `user_id` already holds a claim on `packet_id`.
pub fn has_claimed(conn: &Connection, packet_id: Uuid, user_id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM claims WHERE packet_id = ?1 AND user_id = ?2",
        params![packet_id.to_string(), user_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// All claims on one packet, oldest first.
pub fn claims_for_packet(conn: &Connection, packet_id: Uuid) -> Result<Vec<Claim>> {
    let mut stmt = conn.prepare(
        "SELECT id, packet_id, user_id, username, amount, claimed_at
         FROM claims
         WHERE packet_id = ?1
         ORDER BY claimed_at ASC",
    )?;

    let rows = stmt.query_map(params![packet_id.to_string()], row_to_claim)?;

    let mut claims = Vec::new();
    for row in rows {
        claims.push(row?);
    }
    Ok(claims)
}

impl Database {
    /// All claims on one packet, oldest first.
    pub fn claims_for_packet(&self, packet_id: Uuid) -> Result<Vec<Claim>> {
        claims_for_packet(self.conn(), packet_id)
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn row_to_claim(row: &rusqlite::Row<'_>) -> rusqlite::Result<Claim> {
    let id_str: String = row.get(0)?;
    let packet_id_str: String = row.get(1)?;
    let claimed_str: String = row.get(5)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let packet_id = Uuid::parse_str(&packet_id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Claim {
        id,
        packet_id,
        user_id: row.get(2)?,
        username: row.get(3)?,
        amount: row.get(4)?,
        claimed_at: parse_timestamp(&claimed_str, 5)?,
    })
}
