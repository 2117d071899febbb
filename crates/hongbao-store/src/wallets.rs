//! Wallet balances and the append-only ledger.
//!
//! These are the balance primitives the packet flows build on: a guarded
//! debit that cannot overdraw, an upsert credit, and one ledger row per
//! movement written in the same transaction as the movement.

use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{LedgerEntry, LedgerKind};
use crate::packets::parse_timestamp;

/// Current balance of a user, zero if no wallet row exists yet.
pub fn balance_of(conn: &Connection, user_id: &str) -> Result<i64> {
    let balance = conn
        .query_row(
            "SELECT balance FROM wallets WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(0),
            other => Err(other),
        })?;
    Ok(balance)
}

/// Subtract `amount` from a wallet. Fails with
/// [`StoreError::InsufficientFunds`] when the wallet is missing or would go
/// negative; the guard in the UPDATE is what makes the debit race-free.
pub fn debit(conn: &Connection, user_id: &str, amount: i64) -> Result<()> {
    let affected = conn.execute(
        "UPDATE wallets
         SET balance = balance - ?1, updated_at = ?2
         WHERE user_id = ?3 AND balance >= ?1",
        params![amount, Utc::now().to_rfc3339(), user_id],
    )?;
    if affected == 0 {
        return Err(StoreError::InsufficientFunds);
    }
    Ok(())
}

/// Add `amount` to a wallet, creating the wallet row if needed. Returns the
/// new balance.
pub fn credit(conn: &Connection, user_id: &str, amount: i64) -> Result<i64> {
    conn.execute(
        "INSERT INTO wallets (user_id, balance, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET
             balance = balance + excluded.balance,
             updated_at = excluded.updated_at",
        params![user_id, amount, Utc::now().to_rfc3339()],
    )?;
    balance_of(conn, user_id)
}

/// Append one ledger row describing a balance movement.
pub fn record(
    conn: &Connection,
    from_user_id: &str,
    to_user_id: &str,
    amount: i64,
    kind: LedgerKind,
    description: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO ledger (id, from_user_id, to_user_id, amount, kind, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            Uuid::new_v4().to_string(),
            from_user_id,
            to_user_id,
            amount,
            kind.as_str(),
            description,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl Database {
    /// Current balance of a user.
    pub fn balance_of(&self, user_id: &str) -> Result<i64> {
        balance_of(self.conn(), user_id)
    }

    /// Most recent ledger entries credited to a user, newest first.
    pub fn ledger_for_user(&self, user_id: &str, limit: u32) -> Result<Vec<LedgerEntry>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, from_user_id, to_user_id, amount, kind, description, created_at
             FROM ledger
             WHERE to_user_id = ?1
             ORDER BY created_at DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![user_id, limit], row_to_entry)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let id_str: String = row.get(0)?;
    let kind_str: String = row.get(4)?;
    let created_str: String = row.get(6)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let kind = LedgerKind::parse(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown ledger kind: {kind_str}").into(),
        )
    })?;

    Ok(LedgerEntry {
        id,
        from_user_id: row.get(1)?,
        to_user_id: row.get(2)?,
        amount: row.get(3)?,
        kind,
        description: row.get(5)?,
        created_at: parse_timestamp(&created_str, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    #[test]
    fn credit_then_debit() {
        let (db, _dir) = test_db();

        assert_eq!(balance_of(db.conn(), "u1").unwrap(), 0);
        assert_eq!(credit(db.conn(), "u1", 500).unwrap(), 500);
        assert_eq!(credit(db.conn(), "u1", 250).unwrap(), 750);

        debit(db.conn(), "u1", 600).unwrap();
        assert_eq!(db.balance_of("u1").unwrap(), 150);
    }

    #[test]
    fn debit_cannot_overdraw() {
        let (db, _dir) = test_db();

        credit(db.conn(), "u1", 100).unwrap();
        let err = debit(db.conn(), "u1", 101).unwrap_err();
        assert!(matches!(err, StoreError::InsufficientFunds));
        assert_eq!(db.balance_of("u1").unwrap(), 100);

        // A wallet that does not exist cannot be debited either.
        assert!(matches!(
            debit(db.conn(), "ghost", 1),
            Err(StoreError::InsufficientFunds)
        ));
    }

    #[test]
    fn ledger_records_movements() {
        let (db, _dir) = test_db();

        credit(db.conn(), "u2", 40).unwrap();
        record(db.conn(), "u1", "u2", 40, LedgerKind::PacketClaim, "Gift packet from Alice")
            .unwrap();

        let entries = db.ledger_for_user("u2", 10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount, 40);
        assert_eq!(entries[0].kind, LedgerKind::PacketClaim);
        assert_eq!(entries[0].from_user_id, "u1");
    }
}
