//! # Trade — the offer record and its lifecycle state machine
//!
//! A [`Trade`] holds the escrowed offered items, the requested claim, and
//! the lifecycle status. Once a trade reaches a terminal status it is
//! immutable.
//!
//! ## State Machine
//!
//! ```text
//!                       accept
//!   ┌───────────┐─────────────────────────┐
//!   │ AVAILABLE │ (any non-initiator)     │
//!   └─────┬─────┘                         ▼
//!         │ cancel                 ┌───────────┐
//!         ▼                        │ COMPLETED │
//!   ┌──────────┐                   └───────────┘
//!   │ CANCELED │                          ▲
//!   └──────────┘           accept         │
//!   ┌───────────┐─────────────────────────┘
//!   │  PENDING  │ (designated recipient)
//!   └─────┬─────┘
//!         │ reject (recipient) / cancel (initiator)
//!         ▼
//!   ┌──────────┐   ┌──────────┐
//!   │ REJECTED │   │ CANCELED │
//!   └──────────┘   └──────────┘
//! ```
//!
//! Acceptance is a **single** transition straight to `COMPLETED`; there is
//! no intermediate accepted-but-not-settled status, because settlement runs
//! inside the same unit of work as the status change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{TradeId, TradeItem, UserId, item};

/// Lifecycle status of a trade offer.
///
/// `Rejected`, `Canceled` and `Completed` are terminal — no outgoing
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeStatus {
    /// Open on the market; any user other than the initiator may accept.
    Available,
    /// Directed at one recipient, awaiting their decision.
    Pending,
    /// The recipient declined. Escrow has been returned.
    Rejected,
    /// The initiator withdrew. Escrow has been returned.
    Canceled,
    /// Settled. Items have changed hands.
    Completed,
}

impl TradeStatus {
    /// Can this status transition to the given target?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Available, Self::Completed | Self::Canceled)
                | (Self::Pending, Self::Completed | Self::Rejected | Self::Canceled)
        )
    }

    /// Whether this status is absorbing.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Canceled | Self::Completed)
    }
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "AVAILABLE"),
            Self::Pending => write!(f, "PENDING"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// A trade offer between users.
///
/// The offered items are escrowed value copies debited from the initiator
/// at creation. The requested items are a claim against whoever accepts;
/// requested collection items carry a display snapshot taken at creation
/// and are re-resolved against the acceptor's live ledger at acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    /// The user who posted the offer and whose ledger funded the escrow.
    pub initiator: UserId,
    /// `None` means open market: any user but the initiator may accept.
    /// Set at creation for directed offers and overwritten with the
    /// acceptor's id when an open offer completes.
    pub recipient: Option<UserId>,
    /// Escrowed items, held by the trade until it resolves.
    pub offered: Vec<TradeItem>,
    /// The claim the acceptor must satisfy.
    pub requested: Vec<TradeItem>,
    pub status: TradeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trade {
    /// Whether this trade is an open-market post.
    #[must_use]
    pub fn is_open_market(&self) -> bool {
        self.recipient.is_none()
    }

    /// Whether `user` is allowed to accept this trade in its current
    /// status: never the initiator, and for a directed offer only the
    /// designated recipient.
    #[must_use]
    pub fn may_be_accepted_by(&self, user: UserId) -> bool {
        if user == self.initiator {
            return false;
        }
        match self.status {
            TradeStatus::Available => true,
            TradeStatus::Pending => self.recipient == Some(user),
            _ => false,
        }
    }

    /// Total appraised value of the offered side.
    #[must_use]
    pub fn offered_value(&self) -> u64 {
        item::appraise_items(&self.offered)
    }

    /// Bump the modification timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trade[{}] {} by {} ({} offered, {} requested)",
            self.id,
            self.status,
            self.initiator,
            self.offered.len(),
            self.requested.len(),
        )
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Trade {
    /// A bare trade record for unit tests; item lists start empty.
    #[must_use]
    pub fn dummy(initiator: UserId, recipient: Option<UserId>) -> Self {
        let now = Utc::now();
        Self {
            id: TradeId::new(),
            initiator,
            recipient,
            offered: Vec::new(),
            requested: Vec::new(),
            status: if recipient.is_some() {
                TradeStatus::Pending
            } else {
                TradeStatus::Available
            },
            created_at: now,
            updated_at: now,
        }
    }
}
