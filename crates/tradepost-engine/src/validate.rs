//! Trade validation: the pure check pass that precedes every escrow debit.
//!
//! Validation walks one side of a trade against one user's live ledger and
//! answers a single question: can every item be satisfied simultaneously?
//! Nothing is mutated; the executor runs only after the whole pass
//! succeeds, so a rejected request leaves no trace.
//!
//! The pass is **fail-closed and sequential**: items consume from a running
//! committed tally, so two items claiming the same character compete for
//! the same copies. Collections claim one copy of every hero they hold,
//! and the exclusion set keeps a collection from counting as "locking" the
//! very characters it is about to release:
//!
//! ```text
//!   available(id) = owned(id)
//!                 - locked(id, excluding collections in this request)
//!                 - committed earlier in this request
//! ```

use std::collections::{BTreeMap, BTreeSet};

use tradepost_types::{
    CharacterId, CollectionId, ItemSpec, Result, TradepostError, UserLedger, constants,
};

/// Validate that `items` can all be satisfied from `ledger`.
///
/// # Errors
/// - `InvalidItem` / `ZeroQuantity` / `ZeroAmount` for malformed items
/// - `DuplicateCollectionRef` if one collection is claimed twice
/// - `CollectionNotFound` if a claimed collection is not in the ledger
/// - `InsufficientCopies` / `InsufficientCurrency` with full shortage
///   accounting when the ledger cannot cover the claims
pub fn validate_items(ledger: &UserLedger, items: &[ItemSpec]) -> Result<()> {
    if items.len() > constants::MAX_ITEMS_PER_SIDE {
        return Err(TradepostError::InvalidItem {
            reason: format!(
                "at most {} items per trade side, got {}",
                constants::MAX_ITEMS_PER_SIDE,
                items.len()
            ),
        });
    }

    for item in items {
        item.validate_shape()?;
    }

    let exclude = collection_refs(items)?;

    let mut committed: BTreeMap<CharacterId, u32> = BTreeMap::new();
    let mut committed_currency: u64 = 0;

    for item in items {
        match item {
            ItemSpec::Character {
                character_id,
                quantity,
            } => {
                commit_copies(ledger, &exclude, &mut committed, *character_id, *quantity)?;
            }
            ItemSpec::Currency { amount } => {
                committed_currency = committed_currency.saturating_add(*amount);
                if committed_currency > ledger.currency() {
                    return Err(TradepostError::InsufficientCurrency {
                        requested: committed_currency,
                        balance: ledger.currency(),
                    });
                }
            }
            ItemSpec::Collection { collection_id } => {
                let collection = ledger
                    .collection(*collection_id)
                    .ok_or(TradepostError::CollectionNotFound(*collection_id))?;
                if collection.heroes.is_empty() {
                    return Err(TradepostError::InvalidItem {
                        reason: format!("collection {collection_id} holds no characters"),
                    });
                }
                for hero in collection.heroes.iter().copied() {
                    commit_copies(ledger, &exclude, &mut committed, hero, 1)?;
                }
            }
        }
    }

    Ok(())
}

/// Collect the collection ids referenced by `items`, rejecting duplicates.
///
/// # Errors
/// Returns `DuplicateCollectionRef` if one id appears twice.
pub fn collection_refs(items: &[ItemSpec]) -> Result<BTreeSet<CollectionId>> {
    let mut refs = BTreeSet::new();
    for id in items.iter().filter_map(ItemSpec::collection_id) {
        if !refs.insert(id) {
            return Err(TradepostError::DuplicateCollectionRef(id));
        }
    }
    Ok(refs)
}

/// Claim `quantity` copies of `character_id` against the running tally.
fn commit_copies(
    ledger: &UserLedger,
    exclude: &BTreeSet<CollectionId>,
    committed: &mut BTreeMap<CharacterId, u32>,
    character_id: CharacterId,
    quantity: u32,
) -> Result<()> {
    let owned = ledger.owned(character_id);
    let locked = ledger.locked_excluding(character_id, exclude);
    let already = committed.get(&character_id).copied().unwrap_or(0);
    let available = owned.saturating_sub(locked).saturating_sub(already);
    if quantity > available {
        return Err(TradepostError::InsufficientCopies {
            character_id,
            requested: quantity,
            available,
            owned,
            locked,
        });
    }
    *committed.entry(character_id).or_insert(0) += quantity;
    Ok(())
}
