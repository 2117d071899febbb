//! The packet engine: creation, claim, listing, and the expiry sweep.
//!
//! The store handle lives behind a `tokio::sync::Mutex`; every mutating flow
//! acquires it and runs its whole SQLite transaction under it. Claims on the
//! same packet are therefore strictly serialized, and a sweep can never race
//! a claim for the same unit of remaining funds. No transaction is ever held
//! across an await point.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rusqlite::TransactionBehavior;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use hongbao_store::{
    claims, packets, wallets, Claim, Database, Distribution, LedgerKind, Packet, PacketStatus,
    StoreError,
};

use crate::error::EngineError;
use crate::events::{ClaimInfo, PacketEvent};
use crate::split::split;

type Result<T> = std::result::Result<T, EngineError>;

/// Upper bound on a packet's slot count.
pub const MAX_SLOTS: u32 = 50;

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a packet stays claimable after creation.
    pub expiry_window: chrono::Duration,
    /// Bounded wait for the store lock before a claim fails as transient.
    pub lock_timeout: Duration,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            expiry_window: chrono::Duration::minutes(5),
            lock_timeout: Duration::from_secs(5),
            event_capacity: 256,
        }
    }
}

/// A request to drop a new packet into a room. The identity fields are
/// assumed to be authenticated by the caller.
#[derive(Debug, Clone)]
pub struct CreatePacket {
    pub room_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub total_amount: i64,
    pub total_slots: u32,
    pub message: Option<String>,
}

/// What a successful claim returns to the claimant.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub packet_id: Uuid,
    pub amount: i64,
    pub remaining_slots: u32,
    pub remaining_amount: i64,
    pub status: PacketStatus,
    pub sender_name: String,
}

/// A packet together with its claims, oldest claim first.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PacketDetails {
    pub packet: Packet,
    pub claims: Vec<Claim>,
}

/// Pooled-gift distribution and claim engine.
#[derive(Clone)]
pub struct PacketEngine {
    db: Arc<Mutex<Database>>,
    config: EngineConfig,
    events: broadcast::Sender<PacketEvent>,
}

impl PacketEngine {
    pub fn new(db: Database, config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            db: Arc::new(Mutex::new(db)),
            config,
            events,
        }
    }

    /// Subscribe to room-scoped packet events. This is the seam the
    /// notification layer attaches to.
    ///
    /// Events are published under the store lock, so subscribers observe
    /// them in transaction commit order.
    pub fn subscribe(&self) -> broadcast::Receiver<PacketEvent> {
        self.events.subscribe()
    }

    /// Validate a send request, debit the sender, and persist the packet,
    /// all in one transaction. Emits [`PacketEvent::PacketDropped`].
    ///
    /// Bound checks happen before any state is touched; an underfunded
    /// sender rolls back without mutating anything.
    pub async fn create_packet(&self, req: CreatePacket) -> Result<Packet> {
        if req.total_slots < 1 || req.total_slots > MAX_SLOTS {
            return Err(EngineError::InvalidSlots {
                slots: req.total_slots,
            });
        }
        if req.total_amount < i64::from(req.total_slots) {
            return Err(EngineError::InvalidAmount {
                amount: req.total_amount,
                min: i64::from(req.total_slots),
            });
        }

        let now = Utc::now();
        let packet = Packet {
            id: Uuid::new_v4(),
            room_id: req.room_id,
            sender_id: req.sender_id,
            sender_name: req.sender_name,
            total_amount: req.total_amount,
            total_slots: req.total_slots,
            remaining_slots: req.total_slots,
            remaining_amount: req.total_amount,
            message: req.message,
            distribution: Distribution::Random,
            expires_at: now + self.config.expiry_window,
            status: PacketStatus::Active,
            created_at: now,
        };

        let mut db = self.db.lock().await;
        let tx = db
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let balance = wallets::balance_of(&tx, &packet.sender_id)?;
        if balance < packet.total_amount {
            return Err(EngineError::InsufficientBalance);
        }
        wallets::debit(&tx, &packet.sender_id, packet.total_amount)?;
        wallets::record(
            &tx,
            &packet.sender_id,
            &packet.sender_id,
            packet.total_amount,
            LedgerKind::PacketSend,
            &format!(
                "Gift packet: {}",
                packet.message.as_deref().unwrap_or("Lucky money")
            ),
        )?;
        packets::insert_packet(&tx, &packet)?;

        tx.commit()?;

        info!(
            packet_id = %packet.id,
            room = %packet.room_id,
            sender = %packet.sender_name,
            amount = packet.total_amount,
            slots = packet.total_slots,
            "Gift packet created"
        );

        // Still under the store lock: a racing claim cannot publish its
        // update before the drop event.
        let _ = self.events.send(PacketEvent::PacketDropped {
            packet: packet.clone(),
        });
        drop(db);

        Ok(packet)
    }

    /// Claim one share of a packet.
    ///
    /// The whole flow runs inside one IMMEDIATE transaction under the store
    /// lock: state checks, fresh split of the current remainder, claim
    /// insert, counter update, claimant credit, and ledger row either all
    /// commit or none do. Two users claiming the same packet execute this
    /// strictly serialized; the Nth successful claim observes the post-state
    /// of the (N-1)th.
    pub async fn claim(
        &self,
        packet_id: Uuid,
        user_id: &str,
        username: &str,
    ) -> Result<ClaimOutcome> {
        let mut db = match tokio::time::timeout(self.config.lock_timeout, self.db.lock()).await {
            Ok(guard) => guard,
            Err(_) => return Err(EngineError::Contended),
        };

        let now = Utc::now();
        let tx = db
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let packet = match packets::get_packet(&tx, packet_id) {
            Ok(p) => p,
            Err(StoreError::NotFound) => return Err(EngineError::NotFound),
            Err(e) => return Err(e.into()),
        };

        // The sweep owns refunds; an expired packet is read-only here.
        if now > packet.expires_at {
            return Err(EngineError::Expired);
        }
        if claims::has_claimed(&tx, packet_id, user_id)? {
            return Err(EngineError::AlreadyClaimed);
        }
        if packet.remaining_slots == 0 {
            return Err(EngineError::FullyClaimed);
        }

        // Resample the remainder fresh on every claim and hand out the first
        // share of the shuffled partition.
        let shares = split(packet.remaining_amount, packet.remaining_slots);
        let amount = shares[0];

        let claim = Claim {
            id: Uuid::new_v4(),
            packet_id,
            user_id: user_id.to_string(),
            username: username.to_string(),
            amount,
            claimed_at: now,
        };
        // The UNIQUE constraint backstops the pre-check above; a violation
        // surfaces as AlreadyClaimed via the StoreError mapping.
        claims::insert_claim(&tx, &claim)?;

        let remaining_slots = packet.remaining_slots - 1;
        let remaining_amount = packet.remaining_amount - amount;
        let status = if remaining_slots == 0 {
            PacketStatus::Completed
        } else {
            PacketStatus::Active
        };
        packets::apply_claim(&tx, packet_id, remaining_slots, remaining_amount, status)?;

        wallets::credit(&tx, user_id, amount)?;
        wallets::record(
            &tx,
            &packet.sender_id,
            user_id,
            amount,
            LedgerKind::PacketClaim,
            &format!("Gift packet from {}", packet.sender_name),
        )?;

        tx.commit()?;

        info!(
            packet_id = %packet_id,
            user = %username,
            amount,
            remaining_slots,
            "Gift packet share claimed"
        );

        let _ = self.events.send(PacketEvent::PacketUpdate {
            room_id: packet.room_id.clone(),
            packet_id,
            remaining_slots,
            remaining_amount,
            status,
            claim: ClaimInfo {
                user_id: user_id.to_string(),
                username: username.to_string(),
                amount,
            },
        });
        if status == PacketStatus::Completed {
            let _ = self.events.send(PacketEvent::PacketCompleted {
                room_id: packet.room_id.clone(),
                packet_id,
            });
        }
        drop(db);

        Ok(ClaimOutcome {
            packet_id,
            amount,
            remaining_slots,
            remaining_amount,
            status,
            sender_name: packet.sender_name,
        })
    }

    /// Active, not-yet-expired packets in a room, newest first.
    pub async fn list_active(&self, room_id: &str) -> Result<Vec<Packet>> {
        let db = self.db.lock().await;
        Ok(db.list_active_packets(room_id, Utc::now())?)
    }

    /// One packet with its claim history.
    pub async fn packet_details(&self, packet_id: Uuid) -> Result<PacketDetails> {
        let db = self.db.lock().await;
        let packet = packets::get_packet(db.conn(), packet_id)?;
        let claims = claims::claims_for_packet(db.conn(), packet_id)?;
        Ok(PacketDetails { packet, claims })
    }

    /// Refund every expired packet's unclaimed remainder to its sender and
    /// mark it expired, all in one transaction. Returns how many packets
    /// were refunded.
    ///
    /// Idempotent: the eligibility query excludes expired packets, and the
    /// status transition happens in the same atomic unit as the refund, so
    /// an overlapping or repeated sweep cannot double-refund.
    pub async fn sweep_expired(&self) -> Result<usize> {
        let mut db = self.db.lock().await;
        let now = Utc::now();

        let tx = db
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let due = packets::expired_due(&tx, now)?;
        for packet in &due {
            wallets::credit(&tx, &packet.sender_id, packet.remaining_amount)?;
            wallets::record(
                &tx,
                &packet.sender_id,
                &packet.sender_id,
                packet.remaining_amount,
                LedgerKind::PacketRefund,
                "Expired gift packet refund",
            )?;
            packets::mark_expired(&tx, packet.id)?;
        }

        tx.commit()?;

        for packet in &due {
            info!(
                packet_id = %packet.id,
                sender = %packet.sender_id,
                refunded = packet.remaining_amount,
                "Expired gift packet refunded"
            );
            let _ = self.events.send(PacketEvent::PacketExpired {
                room_id: packet.room_id.clone(),
                packet_id: packet.id,
            });
        }
        drop(db);

        if due.is_empty() {
            debug!("Expiry sweep found nothing to refund");
        }

        Ok(due.len())
    }

    /// Current wallet balance of a user.
    pub async fn balance(&self, user_id: &str) -> Result<i64> {
        let db = self.db.lock().await;
        Ok(db.balance_of(user_id)?)
    }

    /// Credit a wallet out-of-band (admin funding path). Writes the matching
    /// ledger row in the same transaction and returns the new balance.
    pub async fn deposit(&self, user_id: &str, amount: i64, description: &str) -> Result<i64> {
        if amount < 1 {
            return Err(EngineError::InvalidAmount { amount, min: 1 });
        }

        let mut db = self.db.lock().await;
        let tx = db
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let balance = wallets::credit(&tx, user_id, amount)?;
        wallets::record(&tx, user_id, user_id, amount, LedgerKind::Deposit, description)?;
        tx.commit()?;

        info!(user = %user_id, amount, balance, "Wallet funded");
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_engine(config: EngineConfig) -> (PacketEngine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (PacketEngine::new(db, config), dir)
    }

    fn send_request(amount: i64, slots: u32) -> CreatePacket {
        CreatePacket {
            room_id: "room-1".to_string(),
            sender_id: "sender-1".to_string(),
            sender_name: "Alice".to_string(),
            total_amount: amount,
            total_slots: slots,
            message: Some("Happy new year".to_string()),
        }
    }

    #[tokio::test]
    async fn sequential_claims_conserve_pool() {
        let (engine, _dir) = test_engine(EngineConfig::default());
        engine.deposit("sender-1", 1000, "test funds").await.unwrap();

        let packet = engine.create_packet(send_request(1000, 5)).await.unwrap();
        assert_eq!(engine.balance("sender-1").await.unwrap(), 0);

        let mut claimed = Vec::new();
        for i in 0..5 {
            let user = format!("u{i}");
            let outcome = engine.claim(packet.id, &user, &user).await.unwrap();
            assert!(outcome.amount >= 1);
            // Counters stay consistent with recorded claims after every step.
            assert_eq!(
                outcome.remaining_amount + claimed.iter().sum::<i64>() + outcome.amount,
                1000
            );
            assert_eq!(outcome.remaining_slots, 4 - i);
            claimed.push(outcome.amount);
            assert_eq!(engine.balance(&user).await.unwrap(), outcome.amount);
        }

        assert_eq!(claimed.iter().sum::<i64>(), 1000);

        let details = engine.packet_details(packet.id).await.unwrap();
        assert_eq!(details.packet.status, PacketStatus::Completed);
        assert_eq!(details.packet.remaining_slots, 0);
        assert_eq!(details.packet.remaining_amount, 0);
        assert_eq!(details.claims.len(), 5);
    }

    #[tokio::test]
    async fn create_rejects_bad_bounds_before_any_mutation() {
        let (engine, _dir) = test_engine(EngineConfig::default());
        engine.deposit("sender-1", 1000, "test funds").await.unwrap();

        // Amount below slot count: every slot must receive at least 1.
        assert!(matches!(
            engine.create_packet(send_request(3, 5)).await,
            Err(EngineError::InvalidAmount { amount: 3, min: 5 })
        ));
        assert!(matches!(
            engine.create_packet(send_request(100, 0)).await,
            Err(EngineError::InvalidSlots { slots: 0 })
        ));
        assert!(matches!(
            engine.create_packet(send_request(100, 51)).await,
            Err(EngineError::InvalidSlots { slots: 51 })
        ));

        // Balance untouched by the rejected requests.
        assert_eq!(engine.balance("sender-1").await.unwrap(), 1000);
    }

    #[tokio::test]
    async fn create_rejects_underfunded_sender() {
        let (engine, _dir) = test_engine(EngineConfig::default());
        engine.deposit("sender-1", 99, "test funds").await.unwrap();

        assert!(matches!(
            engine.create_packet(send_request(100, 5)).await,
            Err(EngineError::InsufficientBalance)
        ));
        assert_eq!(engine.balance("sender-1").await.unwrap(), 99);
        assert!(engine.list_active("room-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_claim_by_same_user_is_rejected() {
        let (engine, _dir) = test_engine(EngineConfig::default());
        engine.deposit("sender-1", 100, "test funds").await.unwrap();
        let packet = engine.create_packet(send_request(100, 5)).await.unwrap();

        let first = engine.claim(packet.id, "u1", "u1").await.unwrap();
        assert!(matches!(
            engine.claim(packet.id, "u1", "u1").await,
            Err(EngineError::AlreadyClaimed)
        ));

        let details = engine.packet_details(packet.id).await.unwrap();
        assert_eq!(details.claims.len(), 1);
        assert_eq!(details.claims[0].amount, first.amount);
        assert_eq!(engine.balance("u1").await.unwrap(), first.amount);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_by_same_user_succeed_exactly_once() {
        let (engine, _dir) = test_engine(EngineConfig::default());
        engine.deposit("sender-1", 500, "test funds").await.unwrap();
        let packet = engine.create_packet(send_request(500, 10)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            let packet_id = packet.id;
            handles.push(tokio::spawn(async move {
                engine.claim(packet_id, "u1", "u1").await
            }));
        }

        let mut successes = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(EngineError::AlreadyClaimed) => rejected += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(rejected, 7);

        let details = engine.packet_details(packet.id).await.unwrap();
        assert_eq!(details.claims.len(), 1);
        assert_eq!(details.packet.remaining_slots, 9);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_distinct_claimers_conserve_pool() {
        let (engine, _dir) = test_engine(EngineConfig::default());
        engine.deposit("sender-1", 1000, "test funds").await.unwrap();
        let packet = engine.create_packet(send_request(1000, 5)).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..5 {
            let engine = engine.clone();
            let packet_id = packet.id;
            handles.push(tokio::spawn(async move {
                let user = format!("u{i}");
                engine.claim(packet_id, &user, &user).await
            }));
        }

        let mut total = 0;
        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            assert!(outcome.amount >= 1);
            total += outcome.amount;
        }
        assert_eq!(total, 1000);

        let details = engine.packet_details(packet.id).await.unwrap();
        assert_eq!(details.packet.status, PacketStatus::Completed);
        assert_eq!(details.packet.remaining_amount, 0);
    }

    #[tokio::test]
    async fn claim_on_missing_packet_is_not_found() {
        let (engine, _dir) = test_engine(EngineConfig::default());
        assert!(matches!(
            engine.claim(Uuid::new_v4(), "u1", "u1").await,
            Err(EngineError::NotFound)
        ));
    }

    #[tokio::test]
    async fn claim_after_slots_run_out_is_fully_claimed() {
        let (engine, _dir) = test_engine(EngineConfig::default());
        engine.deposit("sender-1", 10, "test funds").await.unwrap();
        let packet = engine.create_packet(send_request(10, 2)).await.unwrap();

        engine.claim(packet.id, "u1", "u1").await.unwrap();
        engine.claim(packet.id, "u2", "u2").await.unwrap();
        assert!(matches!(
            engine.claim(packet.id, "u3", "u3").await,
            Err(EngineError::FullyClaimed)
        ));
    }

    #[tokio::test]
    async fn claim_after_expiry_is_rejected_without_mutation() {
        let config = EngineConfig {
            expiry_window: chrono::Duration::milliseconds(50),
            ..EngineConfig::default()
        };
        let (engine, _dir) = test_engine(config);
        engine.deposit("sender-1", 100, "test funds").await.unwrap();
        let packet = engine.create_packet(send_request(100, 5)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        // The claim path never refunds; that belongs to the sweep.
        assert!(matches!(
            engine.claim(packet.id, "u1", "u1").await,
            Err(EngineError::Expired)
        ));
        let details = engine.packet_details(packet.id).await.unwrap();
        assert_eq!(details.packet.remaining_amount, 100);
        assert_eq!(details.packet.status, PacketStatus::Active);
        assert!(details.claims.is_empty());
    }

    #[tokio::test]
    async fn sweep_refunds_remainder_exactly_once() {
        let config = EngineConfig {
            expiry_window: chrono::Duration::milliseconds(200),
            ..EngineConfig::default()
        };
        let (engine, _dir) = test_engine(config);
        engine.deposit("sender-1", 500, "test funds").await.unwrap();
        let packet = engine.create_packet(send_request(500, 10)).await.unwrap();

        let mut claimed = 0;
        for user in ["u1", "u2", "u3"] {
            claimed += engine.claim(packet.id, user, user).await.unwrap().amount;
        }

        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(engine.sweep_expired().await.unwrap(), 1);
        assert_eq!(engine.balance("sender-1").await.unwrap(), 500 - claimed);

        let details = engine.packet_details(packet.id).await.unwrap();
        assert_eq!(details.packet.status, PacketStatus::Expired);
        assert_eq!(details.packet.remaining_amount, 0);

        // Second pass finds nothing and changes nothing.
        assert_eq!(engine.sweep_expired().await.unwrap(), 0);
        assert_eq!(engine.balance("sender-1").await.unwrap(), 500 - claimed);
    }

    #[tokio::test]
    async fn every_balance_movement_writes_a_ledger_row() {
        let config = EngineConfig {
            expiry_window: chrono::Duration::milliseconds(200),
            ..EngineConfig::default()
        };
        let (engine, dir) = test_engine(config);
        engine.deposit("sender-1", 500, "test funds").await.unwrap();
        let packet = engine.create_packet(send_request(500, 10)).await.unwrap();

        let mut claimed = 0;
        for user in ["u1", "u2"] {
            claimed += engine.claim(packet.id, user, user).await.unwrap().amount;
        }

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(engine.sweep_expired().await.unwrap(), 1);

        // Inspect the ledger through a second handle on the same database.
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let sender_entries = db.ledger_for_user("sender-1", 10).unwrap();
        let of_kind = |kind: LedgerKind| -> Vec<i64> {
            sender_entries
                .iter()
                .filter(|e| e.kind == kind)
                .map(|e| e.amount)
                .collect()
        };
        assert_eq!(of_kind(LedgerKind::Deposit), vec![500]);
        assert_eq!(of_kind(LedgerKind::PacketSend), vec![500]);
        assert_eq!(of_kind(LedgerKind::PacketRefund), vec![500 - claimed]);
        assert_eq!(sender_entries.len(), 3);

        let mut recorded = 0;
        for user in ["u1", "u2"] {
            let entries = db.ledger_for_user(user, 10).unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].kind, LedgerKind::PacketClaim);
            assert_eq!(entries[0].from_user_id, "sender-1");
            assert!(entries[0].amount >= 1);
            recorded += entries[0].amount;
        }
        assert_eq!(recorded, claimed);
    }

    #[tokio::test]
    async fn fully_claimed_packets_never_enter_the_sweep() {
        let config = EngineConfig {
            expiry_window: chrono::Duration::milliseconds(100),
            ..EngineConfig::default()
        };
        let (engine, _dir) = test_engine(config);
        engine.deposit("sender-1", 10, "test funds").await.unwrap();
        let packet = engine.create_packet(send_request(10, 1)).await.unwrap();

        engine.claim(packet.id, "u1", "u1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(engine.sweep_expired().await.unwrap(), 0);
        let details = engine.packet_details(packet.id).await.unwrap();
        assert_eq!(details.packet.status, PacketStatus::Completed);
        assert_eq!(engine.balance("sender-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn lifecycle_events_are_broadcast() {
        let (engine, _dir) = test_engine(EngineConfig::default());
        let mut rx = engine.subscribe();

        engine.deposit("sender-1", 100, "test funds").await.unwrap();
        let packet = engine.create_packet(send_request(100, 1)).await.unwrap();
        let outcome = engine.claim(packet.id, "u1", "u1").await.unwrap();

        match rx.recv().await.unwrap() {
            PacketEvent::PacketDropped { packet: dropped } => {
                assert_eq!(dropped.id, packet.id);
                assert_eq!(dropped.room_id, "room-1");
            }
            other => panic!("expected drop event, got {other:?}"),
        }
        match rx.recv().await.unwrap() {
            PacketEvent::PacketUpdate {
                packet_id,
                remaining_slots,
                claim,
                ..
            } => {
                assert_eq!(packet_id, packet.id);
                assert_eq!(remaining_slots, 0);
                assert_eq!(claim.amount, outcome.amount);
                assert_eq!(claim.user_id, "u1");
            }
            other => panic!("expected update event, got {other:?}"),
        }
        match rx.recv().await.unwrap() {
            PacketEvent::PacketCompleted { packet_id, .. } => {
                assert_eq!(packet_id, packet.id);
            }
            other => panic!("expected completed event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn list_active_tracks_lifecycle() {
        let (engine, _dir) = test_engine(EngineConfig::default());
        engine.deposit("sender-1", 200, "test funds").await.unwrap();

        let packet = engine.create_packet(send_request(100, 1)).await.unwrap();
        assert_eq!(engine.list_active("room-1").await.unwrap().len(), 1);
        assert!(engine.list_active("room-2").await.unwrap().is_empty());

        engine.claim(packet.id, "u1", "u1").await.unwrap();
        assert!(engine.list_active("room-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deposit_rejects_non_positive_amounts() {
        let (engine, _dir) = test_engine(EngineConfig::default());
        assert!(matches!(
            engine.deposit("u1", 0, "nope").await,
            Err(EngineError::InvalidAmount { amount: 0, min: 1 })
        ));
        assert!(matches!(
            engine.deposit("u1", -5, "nope").await,
            Err(EngineError::InvalidAmount { amount: -5, min: 1 })
        ));
        assert_eq!(engine.balance("u1").await.unwrap(), 0);
    }
}
