//! Audit receipt types for the tradepost transfer trail.
//!
//! Every committed ledger-mutating transition (trade created, completed,
//! rejected, canceled, inventory provisioned) appends a [`TransferReceipt`]
//! to the store's audit log. The receipt carries a SHA-256 digest of its
//! canonical JSON payload so the trail can be verified after the fact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{ReceiptId, TradeId, UserId};

/// The kind of action a receipt records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiptKind {
    /// A trade was posted and its offered side escrowed.
    TradeCreated,
    /// A trade settled; items changed hands.
    TradeCompleted,
    /// The recipient declined; escrow returned to the initiator.
    TradeRejected,
    /// The initiator withdrew; escrow returned to the initiator.
    TradeCanceled,
    /// Inventory was provisioned outside of trading (grants, collection
    /// edits).
    InventoryProvisioned,
}

impl std::fmt::Display for ReceiptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TradeCreated => write!(f, "TRADE_CREATED"),
            Self::TradeCompleted => write!(f, "TRADE_COMPLETED"),
            Self::TradeRejected => write!(f, "TRADE_REJECTED"),
            Self::TradeCanceled => write!(f, "TRADE_CANCELED"),
            Self::InventoryProvisioned => write!(f, "INVENTORY_PROVISIONED"),
        }
    }
}

/// One entry in the append-only audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub id: ReceiptId,
    /// What kind of action this receipt records.
    pub kind: ReceiptKind,
    /// The trade involved, if the action was a trade transition.
    pub trade_id: Option<TradeId>,
    /// The user whose request triggered the action.
    pub actor: UserId,
    /// The other ledger touched, if any.
    pub counterparty: Option<UserId>,
    /// Canonical JSON describing the transfer (item lists, amounts).
    pub payload: String,
    /// Hex-encoded SHA-256 digest of `payload`.
    pub payload_digest: String,
    /// When the action committed.
    pub recorded_at: DateTime<Utc>,
}

impl TransferReceipt {
    /// Build a receipt, digesting the payload.
    #[must_use]
    pub fn record(
        kind: ReceiptKind,
        trade_id: Option<TradeId>,
        actor: UserId,
        counterparty: Option<UserId>,
        payload: String,
    ) -> Self {
        let payload_digest = hex::encode(Sha256::digest(payload.as_bytes()));
        Self {
            id: ReceiptId::new(),
            kind,
            trade_id,
            actor,
            counterparty,
            payload,
            payload_digest,
            recorded_at: Utc::now(),
        }
    }

    /// Re-digest the payload and compare against the stored digest.
    #[must_use]
    pub fn verify_digest(&self) -> bool {
        hex::encode(Sha256::digest(self.payload.as_bytes())) == self.payload_digest
    }
}
