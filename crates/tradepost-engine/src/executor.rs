//! Escrow executor: the only code that moves items between ledgers.
//!
//! Two primitives, one per direction:
//!
//! ```text
//!   debit_items   ledger ──▶ Vec<TradeItem>     (escrow out, fallible)
//!   credit_items  Vec<TradeItem> ──▶ ledger     (deliver, infallible)
//! ```
//!
//! Debiting a collection detaches the live collection **before** its hero
//! copies are debited, so `owned >= locked` holds at every intermediate
//! step. Crediting runs in the mirror order: hero copies land first, then
//! the collection is re-minted under a fresh id and attached.
//!
//! Both primitives run on staged ledger copies inside a store transaction;
//! a debit error aborts the transaction and the staged copy is discarded,
//! so partial mutation never reaches committed state.

use tradepost_types::{Collection, ItemSpec, Result, TradeItem, UserLedger};

/// Remove `items` from `ledger`, returning the stored form of each item.
///
/// Collection specs are resolved against the live ledger: the collection
/// is detached, its heroes are debited one copy each, and the returned
/// item carries a snapshot taken at this moment. Callers must validate
/// first; on error the ledger may be partially debited and must be
/// discarded, not committed.
///
/// # Errors
/// - `LedgerUnderflow` / `InsufficientCurrency` if a claim exceeds holdings
/// - `CollectionNotFound` if a claimed collection is not in the ledger
pub fn debit_items(ledger: &mut UserLedger, items: &[ItemSpec]) -> Result<Vec<TradeItem>> {
    let mut moved = Vec::with_capacity(items.len());
    for item in items {
        match item {
            ItemSpec::Character {
                character_id,
                quantity,
            } => {
                ledger.debit_copies(*character_id, *quantity)?;
                moved.push(TradeItem::Character {
                    character_id: *character_id,
                    quantity: *quantity,
                });
            }
            ItemSpec::Currency { amount } => {
                ledger.debit_currency(*amount)?;
                moved.push(TradeItem::Currency { amount: *amount });
            }
            ItemSpec::Collection { collection_id } => {
                // Detach first: the heroes stop being locked before their
                // owned copies leave, never the other way around.
                let collection = ledger.take_collection(*collection_id)?;
                for hero in collection.heroes.iter().copied() {
                    ledger.debit_copies(hero, 1)?;
                }
                moved.push(TradeItem::Collection {
                    collection_id: *collection_id,
                    snapshot: collection.snapshot(),
                });
            }
        }
    }
    Ok(moved)
}

/// Deliver `items` into `ledger`.
///
/// Collections are re-minted from their snapshot under a fresh id; the id
/// recorded on the item refers to the source ledger and is never reused.
pub fn credit_items(ledger: &mut UserLedger, items: &[TradeItem]) {
    for item in items {
        match item {
            TradeItem::Character {
                character_id,
                quantity,
            } => {
                ledger.credit_copies(*character_id, *quantity);
            }
            TradeItem::Currency { amount } => {
                ledger.credit_currency(*amount);
            }
            TradeItem::Collection {
                collection_id,
                snapshot,
            } => {
                // Hero copies land before the collection that locks them.
                for hero in snapshot.heroes.iter().copied() {
                    ledger.credit_copies(hero, 1);
                }
                let reminted = Collection::from_snapshot(snapshot);
                tracing::debug!(
                    source = %collection_id,
                    reminted = %reminted.id,
                    heroes = reminted.hero_count(),
                    "Re-minted collection for new owner"
                );
                ledger.insert_collection(reminted);
            }
        }
    }
}
