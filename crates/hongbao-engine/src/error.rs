use thiserror::Error;

use hongbao_store::StoreError;

/// Errors produced by the packet engine.
///
/// Everything here is an expected, recoverable condition surfaced as a value:
/// validation failures reject before any mutation, resource-state failures
/// roll the claim transaction back, and [`EngineError::Contended`] is a
/// transient signal that the whole operation is safe to retry from scratch.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The amount is below the minimum for the request (for packet creation,
    /// every slot must be able to receive at least one coin).
    #[error("Invalid amount {amount}: must be at least {min}")]
    InvalidAmount { amount: i64, min: i64 },

    /// The slot count is outside the allowed 1..=50 range.
    #[error("Invalid slot count {slots}: must be between 1 and 50")]
    InvalidSlots { slots: u32 },

    /// The sender's wallet cannot cover the packet's pool.
    #[error("Insufficient balance")]
    InsufficientBalance,

    /// No packet with the given id exists.
    #[error("Gift packet not found")]
    NotFound,

    /// The packet's expiry deadline has passed; the sweep owns the refund.
    #[error("Gift packet expired")]
    Expired,

    /// This user already claimed a share of this packet.
    #[error("Gift packet already claimed by this user")]
    AlreadyClaimed,

    /// Every slot has been claimed.
    #[error("All shares of this gift packet are claimed")]
    FullyClaimed,

    /// Could not acquire the store within the bounded wait, or SQLite
    /// reported lock contention. Nothing committed; retry the operation.
    #[error("Packet store is busy, retry the operation")]
    Contended,

    /// Underlying storage failure.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl EngineError {
    /// Whether the caller may simply retry the whole operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Contended)
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => EngineError::NotFound,
            StoreError::DuplicateClaim => EngineError::AlreadyClaimed,
            StoreError::InsufficientFunds => EngineError::InsufficientBalance,
            other if other.is_busy() => EngineError::Contended,
            other => EngineError::Store(other),
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::from(StoreError::from(err))
    }
}
