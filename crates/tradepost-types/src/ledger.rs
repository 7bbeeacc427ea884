//! # UserLedger — per-user inventory state and lock accounting
//!
//! One ledger per registered user, holding the three asset kinds:
//!
//! - a currency balance,
//! - a map of character id → owned copy count (zero entries are removed at
//!   write time, never stored),
//! - the user's live collections.
//!
//! ## Lock accounting
//!
//! A character copy is **locked** while some collection's hero set contains
//! its id; each collection contributes at most one lock per character. The
//! core correctness property, for every user and character id:
//!
//! ```text
//!   owned(id) >= locked(id)
//!   available(id) = owned(id) - locked(id)
//! ```
//!
//! The lock calculator takes an optional exclusion set of collection ids:
//! while validating a single trade offer that contains both collections and
//! loose copies, each collection being traded must not count as locking the
//! very characters it is about to release.
//!
//! All mutators are atomic at the ledger level: either the full operation
//! succeeds or the ledger is unchanged.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{CharacterId, Collection, CollectionId, Result, TradepostError};

/// Per-user inventory: currency, character copies, and collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLedger {
    currency: u64,
    characters: BTreeMap<CharacterId, u32>,
    collections: Vec<Collection>,
}

impl UserLedger {
    /// An empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------
    // Currency
    // -----------------------------------------------------------------

    /// Current currency balance.
    #[must_use]
    pub fn currency(&self) -> u64 {
        self.currency
    }

    /// Add currency to the balance.
    pub fn credit_currency(&mut self, amount: u64) {
        self.currency = self.currency.saturating_add(amount);
    }

    /// Remove currency from the balance.
    ///
    /// # Errors
    /// Returns `InsufficientCurrency` if the balance is too small; the
    /// balance is unchanged on failure.
    pub fn debit_currency(&mut self, amount: u64) -> Result<()> {
        if self.currency < amount {
            return Err(TradepostError::InsufficientCurrency {
                requested: amount,
                balance: self.currency,
            });
        }
        self.currency -= amount;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Character copies
    // -----------------------------------------------------------------

    /// Owned copy count for a character (0 if absent).
    #[must_use]
    pub fn owned(&self, character_id: CharacterId) -> u32 {
        self.characters.get(&character_id).copied().unwrap_or(0)
    }

    /// The full character → quantity map. Zero entries never appear.
    #[must_use]
    pub fn characters(&self) -> &BTreeMap<CharacterId, u32> {
        &self.characters
    }

    /// Add copies of a character.
    pub fn credit_copies(&mut self, character_id: CharacterId, quantity: u32) {
        if quantity == 0 {
            return;
        }
        *self.characters.entry(character_id).or_insert(0) += quantity;
    }

    /// Remove copies of a character, dropping the entry when it reaches zero.
    ///
    /// # Errors
    /// Returns `LedgerUnderflow` if fewer copies are owned than requested;
    /// the ledger is unchanged on failure. Callers are expected to have run
    /// availability validation first — underflow here means a guard was
    /// bypassed.
    pub fn debit_copies(&mut self, character_id: CharacterId, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Ok(());
        }
        let owned = self.owned(character_id);
        if owned < quantity {
            return Err(TradepostError::LedgerUnderflow { character_id });
        }
        if owned == quantity {
            self.characters.remove(&character_id);
        } else {
            self.characters.insert(character_id, owned - quantity);
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Collections
    // -----------------------------------------------------------------

    /// The user's live collections.
    #[must_use]
    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    /// Look up a collection by id.
    #[must_use]
    pub fn collection(&self, id: CollectionId) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id == id)
    }

    /// Mutable lookup, for slot editing under the owner's ledger.
    pub fn collection_mut(&mut self, id: CollectionId) -> Option<&mut Collection> {
        self.collections.iter_mut().find(|c| c.id == id)
    }

    /// Attach a collection to this ledger.
    pub fn insert_collection(&mut self, collection: Collection) {
        self.collections.push(collection);
    }

    /// Detach a collection by id, returning it.
    ///
    /// # Errors
    /// Returns `CollectionNotFound` if no collection has this id.
    pub fn take_collection(&mut self, id: CollectionId) -> Result<Collection> {
        let pos = self
            .collections
            .iter()
            .position(|c| c.id == id)
            .ok_or(TradepostError::CollectionNotFound(id))?;
        Ok(self.collections.remove(pos))
    }

    // -----------------------------------------------------------------
    // Lock calculator
    // -----------------------------------------------------------------

    /// Copies of `character_id` locked inside this user's collections.
    /// Each collection contributes at most one lock per character.
    #[must_use]
    pub fn locked(&self, character_id: CharacterId) -> u32 {
        self.locked_excluding(character_id, &BTreeSet::new())
    }

    /// Locked count, skipping collections whose id is in `exclude`.
    ///
    /// Deterministic and side-effect free; safe to call repeatedly inside
    /// one validation pass.
    #[must_use]
    pub fn locked_excluding(
        &self,
        character_id: CharacterId,
        exclude: &BTreeSet<CollectionId>,
    ) -> u32 {
        let count = self
            .collections
            .iter()
            .filter(|c| !exclude.contains(&c.id))
            .filter(|c| c.contains(character_id))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Copies free for independent trading: owned minus locked.
    #[must_use]
    pub fn available(&self, character_id: CharacterId) -> u32 {
        self.owned(character_id)
            .saturating_sub(self.locked(character_id))
    }

    /// Available count under an exclusion set.
    #[must_use]
    pub fn available_excluding(
        &self,
        character_id: CharacterId,
        exclude: &BTreeSet<CollectionId>,
    ) -> u32 {
        self.owned(character_id)
            .saturating_sub(self.locked_excluding(character_id, exclude))
    }

    // -----------------------------------------------------------------
    // Invariant audit
    // -----------------------------------------------------------------

    /// Verify the ledger's structural invariants:
    ///
    /// - `owned(id) >= locked(id)` for every character held by a collection
    /// - no zero entries in the character map
    /// - every collection's slots agree with its hero set
    ///
    /// # Errors
    /// Returns `InvariantViolation` naming the first violation found.
    pub fn check_invariant(&self) -> Result<()> {
        for (id, qty) in &self.characters {
            if *qty == 0 {
                return Err(TradepostError::InvariantViolation {
                    reason: format!("zero-quantity entry stored for {id}"),
                });
            }
        }
        for collection in &self.collections {
            if !collection.slots_agree_with_heroes() {
                return Err(TradepostError::InvariantViolation {
                    reason: format!("collection {} slots disagree with heroes", collection.id),
                });
            }
            for hero in &collection.heroes {
                let owned = self.owned(*hero);
                let locked = self.locked(*hero);
                if owned < locked {
                    return Err(TradepostError::InvariantViolation {
                        reason: format!(
                            "{hero}: owned {owned} < locked {locked} (collection {})",
                            collection.id
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Pre-populated ledgers for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl UserLedger {
    /// Build a ledger with a currency balance and flat character grants.
    #[must_use]
    pub fn dummy_with(currency: u64, copies: &[(u32, u32)]) -> Self {
        let mut ledger = Self::new();
        ledger.credit_currency(currency);
        for (id, qty) in copies {
            ledger.credit_copies(CharacterId(*id), *qty);
        }
        ledger
    }
}
