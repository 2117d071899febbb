//! v001 -- Initial schema creation.
//!
//! Creates the four core tables: `wallets`, `ledger`, `packets`, and
//! `claims`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Wallets (per-user coin balance)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS wallets (
    user_id    TEXT PRIMARY KEY NOT NULL,   -- opaque caller-supplied id
    balance    INTEGER NOT NULL DEFAULT 0,  -- smallest currency unit
    updated_at TEXT NOT NULL                -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Ledger (append-only, one row per balance movement)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS ledger (
    id           TEXT PRIMARY KEY NOT NULL, -- UUID v4
    from_user_id TEXT NOT NULL,
    to_user_id   TEXT NOT NULL,
    amount       INTEGER NOT NULL,
    kind         TEXT NOT NULL,             -- packet_send | packet_claim | packet_refund | deposit
    description  TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ledger_to_user
    ON ledger(to_user_id, created_at DESC);

-- ----------------------------------------------------------------
-- Packets
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS packets (
    id               TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    room_id          TEXT NOT NULL,
    sender_id        TEXT NOT NULL,
    sender_name      TEXT NOT NULL,
    total_amount     INTEGER NOT NULL,
    total_slots      INTEGER NOT NULL,
    remaining_slots  INTEGER NOT NULL,
    remaining_amount INTEGER NOT NULL,
    message          TEXT,
    distribution     TEXT NOT NULL DEFAULT 'random',
    expires_at       TEXT NOT NULL,
    status           TEXT NOT NULL DEFAULT 'active',
    created_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_packets_room_status
    ON packets(room_id, status);

-- ----------------------------------------------------------------
-- Claims
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS claims (
    id         TEXT PRIMARY KEY NOT NULL,       -- UUID v4
    packet_id  TEXT NOT NULL,                   -- FK -> packets(id)
    user_id    TEXT NOT NULL,
    username   TEXT NOT NULL,
    amount     INTEGER NOT NULL,
    claimed_at TEXT NOT NULL,

    FOREIGN KEY (packet_id) REFERENCES packets(id) ON DELETE CASCADE,
    UNIQUE (packet_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_claims_packet ON claims(packet_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
