//! Packet persistence.
//!
//! The write helpers take a plain `&Connection` so the engine can run them
//! inside one transaction together with claim and wallet mutations.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Distribution, Packet, PacketStatus};

const PACKET_COLUMNS: &str = "id, room_id, sender_id, sender_name, total_amount, total_slots, \
     remaining_slots, remaining_amount, message, distribution, expires_at, status, created_at";

/// Insert a freshly created packet.
pub fn insert_packet(conn: &Connection, packet: &Packet) -> Result<()> {
    conn.execute(
        "INSERT INTO packets (id, room_id, sender_id, sender_name, total_amount, total_slots,
                              remaining_slots, remaining_amount, message, distribution,
                              expires_at, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            packet.id.to_string(),
            packet.room_id,
            packet.sender_id,
            packet.sender_name,
            packet.total_amount,
            packet.total_slots,
            packet.remaining_slots,
            packet.remaining_amount,
            packet.message,
            packet.distribution.as_str(),
            packet.expires_at.to_rfc3339(),
            packet.status.as_str(),
            packet.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Fetch one packet by id.
pub fn get_packet(conn: &Connection, id: Uuid) -> Result<Packet> {
    conn.query_row(
        &format!("SELECT {PACKET_COLUMNS} FROM packets WHERE id = ?1"),
        params![id.to_string()],
        row_to_packet,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    })
}

/// Apply the counter updates of one successful claim.
pub fn apply_claim(
    conn: &Connection,
    id: Uuid,
    remaining_slots: u32,
    remaining_amount: i64,
    status: PacketStatus,
) -> Result<()> {
    conn.execute(
        "UPDATE packets
         SET remaining_slots = ?1, remaining_amount = ?2, status = ?3
         WHERE id = ?4",
        params![
            remaining_slots,
            remaining_amount,
            status.as_str(),
            id.to_string()
        ],
    )?;
    Ok(())
}

/// Packets eligible for the expiry sweep: still active, past their deadline,
/// with an unclaimed remainder. Fully-claimed packets transition to
/// `completed` in the claim flow and never enter this set.
pub fn expired_due(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<Packet>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PACKET_COLUMNS} FROM packets
         WHERE status = 'active' AND expires_at < ?1 AND remaining_amount > 0
         ORDER BY expires_at ASC"
    ))?;

    let rows = stmt.query_map(params![now.to_rfc3339()], row_to_packet)?;

    let mut packets = Vec::new();
    for row in rows {
        packets.push(row?);
    }
    Ok(packets)
}

/// Finalize an expired packet. The status guard keeps the transition
/// one-shot even if two sweeps observe the same eligible row.
pub fn mark_expired(conn: &Connection, id: Uuid) -> Result<()> {
    conn.execute(
        "UPDATE packets
         SET status = 'expired', remaining_amount = 0
         WHERE id = ?1 AND status = 'active'",
        params![id.to_string()],
    )?;
    Ok(())
}

impl Database {
    /// Active, not-yet-expired packets in a room, newest first.
    pub fn list_active_packets(&self, room_id: &str, now: DateTime<Utc>) -> Result<Vec<Packet>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {PACKET_COLUMNS} FROM packets
             WHERE room_id = ?1 AND status = 'active' AND expires_at > ?2
             ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map(params![room_id, now.to_rfc3339()], row_to_packet)?;

        let mut packets = Vec::new();
        for row in rows {
            packets.push(row?);
        }
        Ok(packets)
    }
}

fn row_to_packet(row: &rusqlite::Row<'_>) -> rusqlite::Result<Packet> {
    let id_str: String = row.get(0)?;
    let distribution_str: String = row.get(9)?;
    let expires_str: String = row.get(10)?;
    let status_str: String = row.get(11)?;
    let created_str: String = row.get(12)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let distribution = Distribution::parse(&distribution_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            9,
            rusqlite::types::Type::Text,
            format!("unknown distribution: {distribution_str}").into(),
        )
    })?;

    let status = PacketStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            11,
            rusqlite::types::Type::Text,
            format!("unknown status: {status_str}").into(),
        )
    })?;

    Ok(Packet {
        id,
        room_id: row.get(1)?,
        sender_id: row.get(2)?,
        sender_name: row.get(3)?,
        total_amount: row.get(4)?,
        total_slots: row.get(5)?,
        remaining_slots: row.get(6)?,
        remaining_amount: row.get(7)?,
        message: row.get(8)?,
        distribution,
        expires_at: parse_timestamp(&expires_str, 10)?,
        status,
        created_at: parse_timestamp(&created_str, 12)?,
    })
}

pub(crate) fn parse_timestamp(s: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}
