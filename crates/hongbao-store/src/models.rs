//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the HTTP layer and to event subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// Lifecycle state of a gift packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketStatus {
    /// Claimable (subject to the expiry window).
    Active,
    /// Every slot has been claimed.
    Completed,
    /// The expiry sweep refunded the unclaimed remainder to the sender.
    Expired,
}

impl PacketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PacketStatus::Active => "active",
            PacketStatus::Completed => "completed",
            PacketStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(PacketStatus::Active),
            "completed" => Some(PacketStatus::Completed),
            "expired" => Some(PacketStatus::Expired),
            _ => None,
        }
    }
}

/// How a packet's pool is divided among its slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    /// Randomly-sized shares, every share at least one coin.
    Random,
}

impl Distribution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Distribution::Random => "random",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "random" => Some(Distribution::Random),
            _ => None,
        }
    }
}

/// A pooled monetary gift attached to a room, split into a fixed number of
/// randomly-sized shares.
///
/// Amounts are in the smallest currency unit. `remaining_slots` and
/// `remaining_amount` start equal to their `total_*` counterparts and only
/// ever decrease; packets are never deleted, they remain as an audit record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Packet {
    /// Unique packet identifier.
    pub id: Uuid,
    /// The room this packet was dropped into.
    pub room_id: String,
    /// Opaque identifier of the sender (caller-authenticated).
    pub sender_id: String,
    /// Display name of the sender, for UI attribution.
    pub sender_name: String,
    /// Total pool, in the smallest currency unit.
    pub total_amount: i64,
    /// Number of claimable shares (1..=50).
    pub total_slots: u32,
    /// Slots not yet claimed.
    pub remaining_slots: u32,
    /// Pool not yet claimed (or refunded).
    pub remaining_amount: i64,
    /// Optional greeting shown with the packet.
    pub message: Option<String>,
    /// Share-sizing mode.
    pub distribution: Distribution,
    /// Absolute deadline after which the packet can no longer be claimed.
    pub expires_at: DateTime<Utc>,
    /// Lifecycle state.
    pub status: PacketStatus,
    /// When the packet was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Claim
// ---------------------------------------------------------------------------

/// One user's share of one packet. At most one claim exists per
/// `(packet_id, user_id)` pair; the table enforces this with a UNIQUE
/// constraint in addition to the engine's pre-check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claim {
    /// Unique claim identifier.
    pub id: Uuid,
    /// The packet this claim belongs to.
    pub packet_id: Uuid,
    /// Opaque identifier of the claimant.
    pub user_id: String,
    /// Display name of the claimant.
    pub username: String,
    /// Claimed share, always at least one coin.
    pub amount: i64,
    /// When the claim was committed.
    pub claimed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Wallet & ledger
// ---------------------------------------------------------------------------

/// A user's coin balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Wallet {
    pub user_id: String,
    pub balance: i64,
    pub updated_at: DateTime<Utc>,
}

/// Category of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// Sender debit when a packet is created.
    PacketSend,
    /// Claimant credit when a share is claimed.
    PacketClaim,
    /// Sender credit when an expired packet's remainder is refunded.
    PacketRefund,
    /// Out-of-band funding (admin action).
    Deposit,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::PacketSend => "packet_send",
            LedgerKind::PacketClaim => "packet_claim",
            LedgerKind::PacketRefund => "packet_refund",
            LedgerKind::Deposit => "deposit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "packet_send" => Some(LedgerKind::PacketSend),
            "packet_claim" => Some(LedgerKind::PacketClaim),
            "packet_refund" => Some(LedgerKind::PacketRefund),
            "deposit" => Some(LedgerKind::Deposit),
            _ => None,
        }
    }
}

/// Append-only record of a single balance movement. Written in the same
/// transaction as the movement itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount: i64,
    pub kind: LedgerKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}
