//! Inventory provisioning: registration, grants, and collection editing.
//!
//! These are the out-of-band mutations that produce the inventory the
//! trading core reconciles — currency/copy grants from acquisition flows,
//! and owner-side collection editing. They run through the same
//! transactional store as trading and obey the same lock accounting:
//! placing a character into a collection consumes one **available** copy,
//! clearing a slot releases the lock, and disbanding a collection unlocks
//! every character it held while the copies stay owned.

use tradepost_types::{
    CharacterId, Collection, CollectionId, ReceiptKind, Result, TradepostError, TransferReceipt,
    UserId,
};

use crate::store::TradeStore;

impl TradeStore {
    /// Register a user, creating their empty ledger.
    ///
    /// # Errors
    /// Returns `UserAlreadyRegistered` if the user already has a ledger.
    pub fn register_user(&self, user: UserId) -> Result<()> {
        self.transact(|txn| txn.register_ledger(user))?;
        tracing::info!(user = %user, "User registered");
        Ok(())
    }

    /// Grant currency to a registered user.
    ///
    /// # Errors
    /// Returns `UserNotFound` if the user has no ledger.
    pub fn grant_currency(&self, user: UserId, amount: u64) -> Result<()> {
        self.transact(|txn| {
            txn.ledger_mut(user)?.credit_currency(amount);
            txn.record_receipt(TransferReceipt::record(
                ReceiptKind::InventoryProvisioned,
                None,
                user,
                None,
                serde_json::json!({ "op": "grant_currency", "amount": amount }).to_string(),
            ));
            Ok(())
        })?;
        tracing::debug!(user = %user, amount, "Currency granted");
        Ok(())
    }

    /// Grant copies of a character to a registered user.
    ///
    /// # Errors
    /// Returns `UserNotFound` if the user has no ledger.
    pub fn grant_copies(&self, user: UserId, character_id: CharacterId, quantity: u32) -> Result<()> {
        self.transact(|txn| {
            txn.ledger_mut(user)?.credit_copies(character_id, quantity);
            txn.record_receipt(TransferReceipt::record(
                ReceiptKind::InventoryProvisioned,
                None,
                user,
                None,
                serde_json::json!({
                    "op": "grant_copies",
                    "character": character_id.to_string(),
                    "quantity": quantity,
                })
                .to_string(),
            ));
            Ok(())
        })?;
        tracing::debug!(user = %user, character = %character_id, quantity, "Copies granted");
        Ok(())
    }

    /// Create an empty collection in the user's ledger.
    ///
    /// # Errors
    /// - `UserNotFound` if the user has no ledger
    /// - `InvalidCollection` if the name or slot capacity is out of bounds
    pub fn create_collection(
        &self,
        user: UserId,
        name: &str,
        max_slots: usize,
    ) -> Result<CollectionId> {
        let id = self.transact(|txn| {
            let collection = Collection::new(name, max_slots)?;
            let id = collection.id;
            txn.ledger_mut(user)?.insert_collection(collection);
            txn.record_receipt(TransferReceipt::record(
                ReceiptKind::InventoryProvisioned,
                None,
                user,
                None,
                serde_json::json!({ "op": "create_collection", "collection": id.to_string() })
                    .to_string(),
            ));
            Ok(id)
        })?;
        tracing::info!(user = %user, collection = %id, name, "Collection created");
        Ok(id)
    }

    /// Place a character into a collection slot, locking one copy.
    ///
    /// The user must own at least one copy that is not already locked by
    /// some collection.
    ///
    /// # Errors
    /// - `UserNotFound` / `CollectionNotFound` for missing entities
    /// - `InsufficientCopies` if every owned copy is already locked
    /// - `SlotOutOfRange` / `HeroAlreadyPlaced` / `InvalidCollection` from
    ///   the slot rules
    pub fn place_hero(
        &self,
        user: UserId,
        collection_id: CollectionId,
        slot: usize,
        character_id: CharacterId,
    ) -> Result<()> {
        self.transact(|txn| {
            let ledger = txn.ledger_mut(user)?;
            if ledger.collection(collection_id).is_none() {
                return Err(TradepostError::CollectionNotFound(collection_id));
            }
            let owned = ledger.owned(character_id);
            let locked = ledger.locked(character_id);
            let available = owned.saturating_sub(locked);
            if available < 1 {
                return Err(TradepostError::InsufficientCopies {
                    character_id,
                    requested: 1,
                    available,
                    owned,
                    locked,
                });
            }
            match ledger.collection_mut(collection_id) {
                Some(collection) => collection.place(slot, character_id),
                None => Err(TradepostError::CollectionNotFound(collection_id)),
            }
        })
    }

    /// Clear a collection slot, releasing the lock on the character that
    /// occupied it. Returns the released character, if the slot was filled.
    ///
    /// # Errors
    /// - `UserNotFound` / `CollectionNotFound` for missing entities
    /// - `SlotOutOfRange` if the slot index is past the capacity
    pub fn clear_slot(
        &self,
        user: UserId,
        collection_id: CollectionId,
        slot: usize,
    ) -> Result<Option<CharacterId>> {
        self.transact(|txn| {
            match txn.ledger_mut(user)?.collection_mut(collection_id) {
                Some(collection) => collection.clear(slot),
                None => Err(TradepostError::CollectionNotFound(collection_id)),
            }
        })
    }

    /// Remove a collection from the user's ledger. The copies it held stay
    /// owned and become unlocked.
    ///
    /// # Errors
    /// Returns `UserNotFound` / `CollectionNotFound` for missing entities.
    pub fn disband_collection(&self, user: UserId, collection_id: CollectionId) -> Result<()> {
        self.transact(|txn| {
            let removed = txn.ledger_mut(user)?.take_collection(collection_id)?;
            txn.record_receipt(TransferReceipt::record(
                ReceiptKind::InventoryProvisioned,
                None,
                user,
                None,
                serde_json::json!({
                    "op": "disband_collection",
                    "collection": collection_id.to_string(),
                    "released": removed.hero_count(),
                })
                .to_string(),
            ));
            Ok(())
        })?;
        tracing::info!(user = %user, collection = %collection_id, "Collection disbanded");
        Ok(())
    }
}
