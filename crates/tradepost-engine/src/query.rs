//! Read-side queries: market browsing, per-user views, audit lookup.
//!
//! Queries run over a consistent snapshot of the store and return owned
//! copies, so callers never hold the lock while rendering. Display names
//! come from a [`UserDirectory`] implementation supplied by the caller;
//! the engine stores ids only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tradepost_types::{
    ItemKind, Trade, TradeId, TradeStatus, TransferReceipt, UserDirectory, UserId,
};

use crate::desk::TradeDesk;

/// Filter set for browsing open trades. Every field is optional; the
/// default matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeFilters {
    /// Keep trades created at or after this instant.
    pub created_after: Option<DateTime<Utc>>,
    /// Keep trades created at or before this instant.
    pub created_before: Option<DateTime<Utc>>,
    /// Case-insensitive substring match on the initiator's display name.
    /// Trades whose initiator the directory cannot name are dropped.
    pub initiator_name_contains: Option<String>,
    /// Inclusive lower bound on the appraised offered value.
    pub min_value: Option<u64>,
    /// Inclusive upper bound on the appraised offered value.
    pub max_value: Option<u64>,
    /// Keep trades offering at least one item of this kind.
    pub offered_kind: Option<ItemKind>,
}

impl TradeFilters {
    /// Whether `trade` passes every set filter.
    #[must_use]
    pub fn matches(&self, trade: &Trade, directory: &dyn UserDirectory) -> bool {
        if let Some(after) = self.created_after {
            if trade.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if trade.created_at > before {
                return false;
            }
        }
        if let Some(needle) = &self.initiator_name_contains {
            let Some(name) = directory.display_name(trade.initiator) else {
                return false;
            };
            if !name.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        let value = trade.offered_value();
        if self.min_value.is_some_and(|min| value < min) {
            return false;
        }
        if self.max_value.is_some_and(|max| value > max) {
            return false;
        }
        if let Some(kind) = self.offered_kind {
            if !trade.offered.iter().any(|item| item.kind() == kind) {
                return false;
            }
        }
        true
    }
}

impl TradeDesk {
    /// Open-market trades passing `filters`, newest first.
    #[must_use]
    pub fn list_open_trades(
        &self,
        filters: &TradeFilters,
        directory: &dyn UserDirectory,
    ) -> Vec<Trade> {
        let mut trades: Vec<Trade> = self.store().read(|view| {
            view.trades()
                .filter(|trade| trade.status == TradeStatus::Available)
                .filter(|trade| filters.matches(trade, directory))
                .cloned()
                .collect()
        });
        sort_newest_first(&mut trades);
        trades
    }

    /// Trades relevant to one user: everything they initiated, everything
    /// directed at or settled with them, plus the open market. Newest first.
    #[must_use]
    pub fn get_user_trades(&self, user: UserId) -> Vec<Trade> {
        let mut trades: Vec<Trade> = self.store().read(|view| {
            view.trades()
                .filter(|trade| {
                    trade.initiator == user
                        || trade.recipient == Some(user)
                        || trade.status == TradeStatus::Available
                })
                .cloned()
                .collect()
        });
        sort_newest_first(&mut trades);
        trades
    }

    /// One trade by id.
    #[must_use]
    pub fn trade(&self, trade_id: TradeId) -> Option<Trade> {
        self.store().read(|view| view.trade(trade_id).cloned())
    }

    /// Audit receipts recorded for one trade, oldest first.
    #[must_use]
    pub fn receipts_for_trade(&self, trade_id: TradeId) -> Vec<TransferReceipt> {
        self.store().read(|view| {
            view.receipts()
                .filter(|receipt| receipt.trade_id == Some(trade_id))
                .cloned()
                .collect()
        })
    }
}

/// Creation time descending; trade id breaks same-millisecond ties.
fn sort_newest_first(trades: &mut [Trade]) {
    trades.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
