//! # TradeDesk — the trade lifecycle controller
//!
//! The desk is the single entry point for every lifecycle transition.
//! Each operation runs as one store transaction: eligibility checks,
//! validation, escrow movement, the status write, and the audit receipt
//! all land together or not at all.
//!
//! ## Creation
//!
//! ```text
//!   1. resolve the requested side (display snapshots from the
//!      recipient's ledger for directed collection requests)
//!   2. validate the offered side against the initiator's ledger
//!   3. debit the offered items into escrow on the trade record
//!   4. store the trade: AVAILABLE (market) or PENDING (directed)
//! ```
//!
//! ## Acceptance
//!
//! ```text
//!   1. load the trade, check eligibility, record the status guard
//!   2. re-validate the requested claim against the acceptor's ledger
//!      as it stands NOW (creation-time state proves nothing)
//!   3. debit the claim from the acceptor, credit it to the initiator
//!   4. credit the escrowed items to the acceptor
//!   5. write COMPLETED in the same unit of work
//! ```
//!
//! Acceptance settles in one transition; the status guard recorded in
//! step 1 makes the commit a check-and-set, so of two racing acceptors
//! exactly one settles and the other fails with a conflict.
//!
//! Rejection and cancellation return the escrowed items to the
//! initiator. Returned collections are re-minted under fresh ids, same
//! content.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tradepost_ledger::{TradeStore, Txn};
use tradepost_types::{
    ItemSpec, ReceiptKind, Result, Trade, TradeId, TradeItem, TradeStatus, TradepostError,
    TransferReceipt, UserId, constants,
};

use crate::{executor, validate};

/// The lifecycle controller. Cheap to clone via the shared store handle.
#[derive(Debug, Clone)]
pub struct TradeDesk {
    store: Arc<TradeStore>,
}

impl TradeDesk {
    /// A desk over the given store.
    #[must_use]
    pub fn new(store: Arc<TradeStore>) -> Self {
        Self { store }
    }

    /// The underlying store, for provisioning and read-side queries.
    #[must_use]
    pub fn store(&self) -> &TradeStore {
        &self.store
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Post an open-market trade: any user except the initiator may accept.
    ///
    /// Requested collection items are not allowed on market posts, because
    /// a collection id is only meaningful within one specific ledger.
    ///
    /// # Errors
    /// - `UserNotFound` if the initiator is not registered
    /// - `CollectionRequestNeedsRecipient` for a requested collection
    /// - any validation or escrow error for the offered side
    pub fn create_market_trade(
        &self,
        initiator: UserId,
        offered: &[ItemSpec],
        requested: &[ItemSpec],
    ) -> Result<Trade> {
        self.create_trade(initiator, None, offered, requested)
    }

    /// Post a trade directed at one recipient, starting in `PENDING`.
    ///
    /// # Errors
    /// - `SelfDirectedTrade` if the recipient is the initiator
    /// - `UserNotFound` if either party is not registered
    /// - `CollectionNotFound` if a requested collection is not in the
    ///   recipient's ledger
    /// - any validation or escrow error for the offered side
    pub fn create_directed_trade(
        &self,
        initiator: UserId,
        recipient: UserId,
        offered: &[ItemSpec],
        requested: &[ItemSpec],
    ) -> Result<Trade> {
        if recipient == initiator {
            return Err(TradepostError::SelfDirectedTrade);
        }
        self.create_trade(initiator, Some(recipient), offered, requested)
    }

    fn create_trade(
        &self,
        initiator: UserId,
        recipient: Option<UserId>,
        offered: &[ItemSpec],
        requested: &[ItemSpec],
    ) -> Result<Trade> {
        if offered.is_empty() && requested.is_empty() {
            return Err(TradepostError::InvalidItem {
                reason: "a trade must carry at least one item".to_string(),
            });
        }

        let trade = self.store.transact(|txn| {
            txn.ledger(initiator)?;
            if let Some(recipient) = recipient {
                if !txn.user_exists(recipient) {
                    return Err(TradepostError::UserNotFound(recipient));
                }
            }

            let requested_items = resolve_requested(txn, recipient, requested)?;

            validate::validate_items(txn.ledger(initiator)?, offered)?;
            let escrowed = executor::debit_items(txn.ledger_mut(initiator)?, offered)?;

            let now = Utc::now();
            let trade = Trade {
                id: TradeId::new(),
                initiator,
                recipient,
                offered: escrowed,
                requested: requested_items,
                status: if recipient.is_some() {
                    TradeStatus::Pending
                } else {
                    TradeStatus::Available
                },
                created_at: now,
                updated_at: now,
            };

            txn.record_receipt(TransferReceipt::record(
                ReceiptKind::TradeCreated,
                Some(trade.id),
                initiator,
                recipient,
                trade_payload(&trade, None)?,
            ));
            txn.put_trade(trade.clone());
            Ok(trade)
        })?;

        tracing::info!(
            trade = %trade.id,
            initiator = %initiator,
            status = %trade.status,
            offered_value = trade.offered_value(),
            "Posted trade"
        );
        Ok(trade)
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Accept a trade: settle both legs and mark it `COMPLETED`.
    ///
    /// The stored requested side is treated purely as a claim; it is
    /// re-validated against the acceptor's ledger at this moment.
    ///
    /// # Errors
    /// - `TradeNotFound` / `TradeClosed` if the trade is missing or done
    /// - `NotEligibleToAccept` if `acting` may not accept this trade
    /// - any validation or escrow error against the acceptor's ledger
    /// - `StatusConflict` if another transition won the commit race
    pub fn accept_trade(&self, trade_id: TradeId, acting: UserId) -> Result<Trade> {
        let trade = self.store.transact(|txn| {
            let mut trade = txn.trade(trade_id)?.clone();
            if trade.status.is_terminal() {
                return Err(TradepostError::TradeClosed {
                    trade: trade_id,
                    status: trade.status,
                });
            }
            if !trade.may_be_accepted_by(acting) {
                return Err(TradepostError::NotEligibleToAccept {
                    user: acting,
                    trade: trade_id,
                });
            }
            txn.guard_status(trade_id, trade.status);

            let claims: Vec<ItemSpec> = trade.requested.iter().map(TradeItem::to_spec).collect();
            validate::validate_items(txn.ledger(acting)?, &claims)?;

            let settled = executor::debit_items(txn.ledger_mut(acting)?, &claims)?;
            executor::credit_items(txn.ledger_mut(trade.initiator)?, &settled);
            executor::credit_items(txn.ledger_mut(acting)?, &trade.offered);

            trade.status = TradeStatus::Completed;
            trade.recipient = Some(acting);
            trade.touch();

            txn.record_receipt(TransferReceipt::record(
                ReceiptKind::TradeCompleted,
                Some(trade_id),
                acting,
                Some(trade.initiator),
                trade_payload(&trade, Some(&settled))?,
            ));
            txn.put_trade(trade.clone());
            Ok(trade)
        })?;

        tracing::info!(
            trade = %trade_id,
            acceptor = %acting,
            initiator = %trade.initiator,
            "Trade completed"
        );
        Ok(trade)
    }

    /// Decline a directed trade. Only the designated recipient may reject;
    /// the escrowed items return to the initiator.
    ///
    /// # Errors
    /// - `TradeNotFound` / `TradeClosed` if the trade is missing or done
    /// - `NotTheRecipient` if `acting` is not the designated recipient
    /// - `StatusConflict` if another transition won the commit race
    pub fn reject_trade(&self, trade_id: TradeId, acting: UserId) -> Result<Trade> {
        let trade = self.store.transact(|txn| {
            let mut trade = txn.trade(trade_id)?.clone();
            if trade.status.is_terminal() {
                return Err(TradepostError::TradeClosed {
                    trade: trade_id,
                    status: trade.status,
                });
            }
            if trade.recipient != Some(acting) {
                return Err(TradepostError::NotTheRecipient {
                    user: acting,
                    trade: trade_id,
                });
            }
            if !trade.status.can_transition_to(TradeStatus::Rejected) {
                return Err(TradepostError::StatusConflict {
                    trade: trade_id,
                    expected: TradeStatus::Pending,
                    actual: trade.status,
                });
            }
            txn.guard_status(trade_id, trade.status);

            executor::credit_items(txn.ledger_mut(trade.initiator)?, &trade.offered);
            trade.status = TradeStatus::Rejected;
            trade.touch();

            txn.record_receipt(TransferReceipt::record(
                ReceiptKind::TradeRejected,
                Some(trade_id),
                acting,
                Some(trade.initiator),
                trade_payload(&trade, None)?,
            ));
            txn.put_trade(trade.clone());
            Ok(trade)
        })?;

        tracing::info!(
            trade = %trade_id,
            recipient = %acting,
            "Trade rejected, escrow returned"
        );
        Ok(trade)
    }

    /// Withdraw a trade. Only the initiator may cancel, and only while the
    /// trade is still open; the escrowed items return to their ledger.
    ///
    /// # Errors
    /// - `TradeNotFound` / `TradeClosed` if the trade is missing or done
    /// - `NotTheInitiator` if `acting` did not post this trade
    /// - `StatusConflict` if another transition won the commit race
    pub fn cancel_trade(&self, trade_id: TradeId, acting: UserId) -> Result<Trade> {
        let trade = self.store.transact(|txn| {
            let mut trade = txn.trade(trade_id)?.clone();
            if trade.status.is_terminal() {
                return Err(TradepostError::TradeClosed {
                    trade: trade_id,
                    status: trade.status,
                });
            }
            if trade.initiator != acting {
                return Err(TradepostError::NotTheInitiator {
                    user: acting,
                    trade: trade_id,
                });
            }
            txn.guard_status(trade_id, trade.status);

            executor::credit_items(txn.ledger_mut(trade.initiator)?, &trade.offered);
            trade.status = TradeStatus::Canceled;
            trade.touch();

            txn.record_receipt(TransferReceipt::record(
                ReceiptKind::TradeCanceled,
                Some(trade_id),
                acting,
                trade.recipient,
                trade_payload(&trade, None)?,
            ));
            txn.put_trade(trade.clone());
            Ok(trade)
        })?;

        tracing::info!(
            trade = %trade_id,
            initiator = %acting,
            "Trade canceled, escrow returned"
        );
        Ok(trade)
    }
}

/// Resolve the caller's requested specs into stored items.
///
/// Character and currency claims pass through unchanged. A collection
/// claim needs a directed recipient, because the id only means something
/// inside that recipient's ledger; the snapshot taken here is for display
/// and is re-resolved at acceptance.
fn resolve_requested(
    txn: &Txn<'_>,
    recipient: Option<UserId>,
    requested: &[ItemSpec],
) -> Result<Vec<TradeItem>> {
    if requested.len() > constants::MAX_ITEMS_PER_SIDE {
        return Err(TradepostError::InvalidItem {
            reason: format!(
                "at most {} items per trade side, got {}",
                constants::MAX_ITEMS_PER_SIDE,
                requested.len()
            ),
        });
    }
    for spec in requested {
        spec.validate_shape()?;
    }
    validate::collection_refs(requested)?;

    let mut items = Vec::with_capacity(requested.len());
    for spec in requested {
        match spec {
            ItemSpec::Character {
                character_id,
                quantity,
            } => items.push(TradeItem::Character {
                character_id: *character_id,
                quantity: *quantity,
            }),
            ItemSpec::Currency { amount } => items.push(TradeItem::Currency { amount: *amount }),
            ItemSpec::Collection { collection_id } => {
                let Some(recipient) = recipient else {
                    return Err(TradepostError::CollectionRequestNeedsRecipient);
                };
                let collection = txn
                    .ledger(recipient)?
                    .collection(*collection_id)
                    .ok_or(TradepostError::CollectionNotFound(*collection_id))?;
                if collection.heroes.is_empty() {
                    return Err(TradepostError::InvalidItem {
                        reason: format!("collection {collection_id} holds no characters"),
                    });
                }
                items.push(TradeItem::Collection {
                    collection_id: *collection_id,
                    snapshot: collection.snapshot(),
                });
            }
        }
    }
    Ok(items)
}

/// Receipt payload written for every lifecycle event.
#[derive(Serialize)]
struct TradeEventPayload<'a> {
    trade: String,
    status: String,
    offered: &'a [TradeItem],
    requested: &'a [TradeItem],
    /// Items actually debited from the acceptor at settlement. Present on
    /// completion receipts only.
    #[serde(skip_serializing_if = "Option::is_none")]
    settled: Option<&'a [TradeItem]>,
}

fn trade_payload(trade: &Trade, settled: Option<&[TradeItem]>) -> Result<String> {
    serde_json::to_string(&TradeEventPayload {
        trade: trade.id.to_string(),
        status: trade.status.to_string(),
        offered: &trade.offered,
        requested: &trade.requested,
        settled,
    })
    .map_err(|err| TradepostError::Serialization(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradepost_types::CharacterId;

    fn desk_with_users(users: &[UserId]) -> TradeDesk {
        let desk = TradeDesk::new(Arc::new(TradeStore::new()));
        for user in users {
            desk.store().register_user(*user).unwrap();
        }
        desk
    }

    fn chr(id: u32, quantity: u32) -> ItemSpec {
        ItemSpec::Character {
            character_id: CharacterId(id),
            quantity,
        }
    }

    #[test]
    fn market_post_escrows_offer() {
        let alice = UserId::new();
        let desk = desk_with_users(&[alice]);
        desk.store().grant_copies(alice, CharacterId(10), 3).unwrap();

        let trade = desk
            .create_market_trade(alice, &[chr(10, 2)], &[ItemSpec::Currency { amount: 50 }])
            .unwrap();

        assert_eq!(trade.status, TradeStatus::Available);
        assert!(trade.is_open_market());
        let owned = desk
            .store()
            .read(|view| view.ledger(alice).map(|l| l.owned(CharacterId(10))));
        assert_eq!(owned, Some(1), "escrow must leave the ledger at creation");
        desk.store().audit_invariants().unwrap();
    }

    #[test]
    fn directed_post_starts_pending() {
        let (alice, bob) = (UserId::new(), UserId::new());
        let desk = desk_with_users(&[alice, bob]);
        desk.store().grant_currency(alice, 100).unwrap();

        let trade = desk
            .create_directed_trade(alice, bob, &[ItemSpec::Currency { amount: 40 }], &[chr(7, 1)])
            .unwrap();

        assert_eq!(trade.status, TradeStatus::Pending);
        assert_eq!(trade.recipient, Some(bob));
    }

    #[test]
    fn self_directed_trade_rejected() {
        let alice = UserId::new();
        let desk = desk_with_users(&[alice]);
        let err = desk
            .create_directed_trade(alice, alice, &[], &[chr(7, 1)])
            .unwrap_err();
        assert_eq!(err, TradepostError::SelfDirectedTrade);
    }

    #[test]
    fn empty_trade_rejected() {
        let alice = UserId::new();
        let desk = desk_with_users(&[alice]);
        assert!(matches!(
            desk.create_market_trade(alice, &[], &[]),
            Err(TradepostError::InvalidItem { .. })
        ));
    }

    #[test]
    fn unknown_parties_rejected() {
        let alice = UserId::new();
        let desk = desk_with_users(&[alice]);
        let ghost = UserId::new();

        assert!(matches!(
            desk.create_market_trade(ghost, &[], &[chr(7, 1)]),
            Err(TradepostError::UserNotFound(u)) if u == ghost
        ));
        assert!(matches!(
            desk.create_directed_trade(alice, ghost, &[], &[chr(7, 1)]),
            Err(TradepostError::UserNotFound(u)) if u == ghost
        ));
    }

    #[test]
    fn market_post_cannot_request_collection() {
        let alice = UserId::new();
        let desk = desk_with_users(&[alice]);
        let err = desk
            .create_market_trade(
                alice,
                &[],
                &[ItemSpec::Collection {
                    collection_id: tradepost_types::CollectionId::new(),
                }],
            )
            .unwrap_err();
        assert_eq!(err, TradepostError::CollectionRequestNeedsRecipient);
    }

    #[test]
    fn directed_collection_request_snapshots_recipient_state() {
        let (alice, bob) = (UserId::new(), UserId::new());
        let desk = desk_with_users(&[alice, bob]);
        desk.store().grant_copies(bob, CharacterId(20), 1).unwrap();
        let col = desk.store().create_collection(bob, "Keepers", 4).unwrap();
        desk.store()
            .place_hero(bob, col, 0, CharacterId(20))
            .unwrap();

        let trade = desk
            .create_directed_trade(
                alice,
                bob,
                &[],
                &[ItemSpec::Collection { collection_id: col }],
            )
            .unwrap();

        match &trade.requested[0] {
            TradeItem::Collection {
                collection_id,
                snapshot,
            } => {
                assert_eq!(*collection_id, col);
                assert_eq!(snapshot.hero_count(), 1);
            }
            other => panic!("expected collection item, got {other:?}"),
        }
    }

    #[test]
    fn initiator_cannot_accept_own_trade() {
        let (alice, bob) = (UserId::new(), UserId::new());
        let desk = desk_with_users(&[alice, bob]);
        desk.store().grant_currency(alice, 10).unwrap();
        let trade = desk
            .create_market_trade(alice, &[ItemSpec::Currency { amount: 10 }], &[])
            .unwrap();

        let err = desk.accept_trade(trade.id, alice).unwrap_err();
        assert!(matches!(err, TradepostError::NotEligibleToAccept { .. }));
    }

    #[test]
    fn outsider_cannot_accept_directed_trade() {
        let (alice, bob, carol) = (UserId::new(), UserId::new(), UserId::new());
        let desk = desk_with_users(&[alice, bob, carol]);
        desk.store().grant_currency(alice, 10).unwrap();
        let trade = desk
            .create_directed_trade(alice, bob, &[ItemSpec::Currency { amount: 10 }], &[])
            .unwrap();

        let err = desk.accept_trade(trade.id, carol).unwrap_err();
        assert!(matches!(err, TradepostError::NotEligibleToAccept { .. }));
    }

    #[test]
    fn only_recipient_may_reject() {
        let (alice, bob, carol) = (UserId::new(), UserId::new(), UserId::new());
        let desk = desk_with_users(&[alice, bob, carol]);
        desk.store().grant_currency(alice, 10).unwrap();
        let directed = desk
            .create_directed_trade(alice, bob, &[ItemSpec::Currency { amount: 10 }], &[])
            .unwrap();

        assert!(matches!(
            desk.reject_trade(directed.id, carol),
            Err(TradepostError::NotTheRecipient { .. })
        ));

        // Market posts have no recipient to reject them.
        let market = desk.create_market_trade(alice, &[], &[chr(7, 1)]).unwrap();
        assert!(matches!(
            desk.reject_trade(market.id, bob),
            Err(TradepostError::NotTheRecipient { .. })
        ));
    }

    #[test]
    fn only_initiator_may_cancel() {
        let (alice, bob) = (UserId::new(), UserId::new());
        let desk = desk_with_users(&[alice, bob]);
        desk.store().grant_currency(alice, 10).unwrap();
        let trade = desk
            .create_market_trade(alice, &[ItemSpec::Currency { amount: 10 }], &[])
            .unwrap();

        assert!(matches!(
            desk.cancel_trade(trade.id, bob),
            Err(TradepostError::NotTheInitiator { .. })
        ));
        desk.cancel_trade(trade.id, alice).unwrap();
    }

    #[test]
    fn closed_trades_refuse_every_transition() {
        let (alice, bob) = (UserId::new(), UserId::new());
        let desk = desk_with_users(&[alice, bob]);
        desk.store().grant_currency(alice, 10).unwrap();
        let trade = desk
            .create_directed_trade(alice, bob, &[ItemSpec::Currency { amount: 10 }], &[])
            .unwrap();
        desk.reject_trade(trade.id, bob).unwrap();

        assert!(matches!(
            desk.accept_trade(trade.id, bob),
            Err(TradepostError::TradeClosed {
                status: TradeStatus::Rejected,
                ..
            })
        ));
        assert!(matches!(
            desk.reject_trade(trade.id, bob),
            Err(TradepostError::TradeClosed { .. })
        ));
        assert!(matches!(
            desk.cancel_trade(trade.id, alice),
            Err(TradepostError::TradeClosed { .. })
        ));
    }

    #[test]
    fn missing_trade_reported() {
        let alice = UserId::new();
        let desk = desk_with_users(&[alice]);
        assert!(matches!(
            desk.accept_trade(TradeId::new(), alice),
            Err(TradepostError::TradeNotFound(_))
        ));
    }

    #[test]
    fn acceptance_re_validates_current_ledger() {
        let (alice, bob) = (UserId::new(), UserId::new());
        let desk = desk_with_users(&[alice, bob]);
        desk.store().grant_currency(alice, 10).unwrap();
        desk.store().grant_copies(bob, CharacterId(7), 1).unwrap();

        let trade = desk
            .create_directed_trade(alice, bob, &[ItemSpec::Currency { amount: 10 }], &[chr(7, 1)])
            .unwrap();

        // Bob's copy leaves his ledger after creation. The claim was
        // satisfiable then; it is not satisfiable now.
        desk.store()
            .transact(|txn| txn.ledger_mut(bob)?.debit_copies(CharacterId(7), 1))
            .unwrap();

        let err = desk.accept_trade(trade.id, bob).unwrap_err();
        assert!(matches!(err, TradepostError::InsufficientCopies { .. }));

        // Nothing moved and the trade stayed open.
        let status = desk.store().read(|view| view.trade(trade.id).map(|t| t.status));
        assert_eq!(status, Some(TradeStatus::Pending));
        desk.store().audit_invariants().unwrap();
    }

    #[test]
    fn completion_overwrites_recipient_with_acceptor() {
        let (alice, bob) = (UserId::new(), UserId::new());
        let desk = desk_with_users(&[alice, bob]);
        desk.store().grant_currency(alice, 10).unwrap();

        let trade = desk
            .create_market_trade(alice, &[ItemSpec::Currency { amount: 10 }], &[])
            .unwrap();
        assert_eq!(trade.recipient, None);

        let done = desk.accept_trade(trade.id, bob).unwrap();
        assert_eq!(done.status, TradeStatus::Completed);
        assert_eq!(done.recipient, Some(bob));
        assert!(done.updated_at >= done.created_at);
    }
}
