//! Room-scoped events published by the engine.
//!
//! These are result values, not transport messages: the engine pushes them on
//! a broadcast channel and whatever notification layer sits on top (SSE,
//! sockets, push) decides how to deliver them to room subscribers.

use serde::Serialize;
use uuid::Uuid;

use hongbao_store::{Packet, PacketStatus};

/// The claim embedded in a [`PacketEvent::PacketUpdate`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClaimInfo {
    pub user_id: String,
    pub username: String,
    pub amount: i64,
}

/// Everything room subscribers need to render the packet lifecycle.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PacketEvent {
    /// A new packet was dropped into the room.
    PacketDropped { packet: Packet },

    /// A claim succeeded; carries the updated counters for live display.
    PacketUpdate {
        room_id: String,
        packet_id: Uuid,
        remaining_slots: u32,
        remaining_amount: i64,
        status: PacketStatus,
        claim: ClaimInfo,
    },

    /// The last slot was claimed.
    PacketCompleted { room_id: String, packet_id: Uuid },

    /// The expiry sweep refunded the packet's remainder to its sender.
    PacketExpired { room_id: String, packet_id: Uuid },
}

impl PacketEvent {
    /// The room this event belongs to, for subscriber-side routing.
    pub fn room_id(&self) -> &str {
        match self {
            PacketEvent::PacketDropped { packet } => &packet.room_id,
            PacketEvent::PacketUpdate { room_id, .. } => room_id,
            PacketEvent::PacketCompleted { room_id, .. } => room_id,
            PacketEvent::PacketExpired { room_id, .. } => room_id,
        }
    }

    /// Stable event name, matching the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            PacketEvent::PacketDropped { .. } => "packet-dropped",
            PacketEvent::PacketUpdate { .. } => "packet-update",
            PacketEvent::PacketCompleted { .. } => "packet-completed",
            PacketEvent::PacketExpired { .. } => "packet-expired",
        }
    }
}
