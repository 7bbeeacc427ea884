//! # Collection — a named, capacity-bounded grouping of character copies
//!
//! A collection is the composite asset kind: it owns an ordered slot
//! arrangement (slot 0 is the cover) and a hero set, and every character
//! it holds is **locked** — unavailable for independent trading — until it
//! leaves the collection.
//!
//! ## Identity lifecycle
//!
//! ```text
//!   ┌──────────────┐   snapshot()    ┌────────────────────┐
//!   │ Collection   ├────────────────▶│ CollectionSnapshot │
//!   │ (live, owned)│                 │ (immutable value)  │
//!   └──────────────┘                 └─────────┬──────────┘
//!                                              │ from_snapshot()
//!                                              ▼
//!                                    ┌──────────────┐
//!                                    │ Collection   │  fresh CollectionId,
//!                                    │ (new owner)  │  same content
//!                                    └──────────────┘
//! ```
//!
//! Identity is destroyed and re-minted on every ownership change: the
//! snapshot carries content only, and `from_snapshot` always allocates a
//! fresh id. A snapshot is never a live reference back to the original
//! owner's mutable collection.
//!
//! ## Shape invariants
//!
//! - `slots.len() == max_slots`; empty positions are `None`
//! - `heroes` equals the set of non-empty slot entries at all times
//! - each character id appears at most once per collection

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{CharacterId, CollectionId, Result, TradepostError, constants};

/// A live, owned collection. Mutated only through the guarded methods,
/// which keep `slots` and `heroes` in agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Identity of this collection under its current owner.
    pub id: CollectionId,
    /// Display name.
    pub name: String,
    /// Slot capacity. Fixed at creation.
    pub max_slots: usize,
    /// Ordered arrangement; index 0 is the cover character.
    pub slots: Vec<Option<CharacterId>>,
    /// Set of characters held. Every member is locked for its owner.
    pub heroes: BTreeSet<CharacterId>,
    /// Free-form labels.
    pub tags: BTreeSet<String>,
}

impl Collection {
    /// Create an empty collection.
    ///
    /// # Errors
    /// - `InvalidCollection` if the name is empty or too long, or the slot
    ///   capacity is zero or above [`constants::MAX_COLLECTION_SLOTS`].
    pub fn new(name: impl Into<String>, max_slots: usize) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(TradepostError::InvalidCollection {
                reason: "name must not be empty".to_string(),
            });
        }
        if name.len() > constants::MAX_COLLECTION_NAME_LEN {
            return Err(TradepostError::InvalidCollection {
                reason: format!(
                    "name exceeds {} bytes",
                    constants::MAX_COLLECTION_NAME_LEN
                ),
            });
        }
        if max_slots == 0 || max_slots > constants::MAX_COLLECTION_SLOTS {
            return Err(TradepostError::InvalidCollection {
                reason: format!(
                    "slot capacity must be 1..={}, got {max_slots}",
                    constants::MAX_COLLECTION_SLOTS
                ),
            });
        }
        Ok(Self {
            id: CollectionId::new(),
            name,
            max_slots,
            slots: vec![None; max_slots],
            heroes: BTreeSet::new(),
            tags: BTreeSet::new(),
        })
    }

    /// Place a character into a slot.
    ///
    /// # Errors
    /// - `SlotOutOfRange` if `slot >= max_slots`
    /// - `HeroAlreadyPlaced` if the character is already in this collection
    /// - `InvalidCollection` if the slot is occupied (clear it first)
    pub fn place(&mut self, slot: usize, character_id: CharacterId) -> Result<()> {
        if slot >= self.max_slots {
            return Err(TradepostError::SlotOutOfRange {
                slot,
                max_slots: self.max_slots,
            });
        }
        if self.heroes.contains(&character_id) {
            return Err(TradepostError::HeroAlreadyPlaced { character_id });
        }
        if self.slots[slot].is_some() {
            return Err(TradepostError::InvalidCollection {
                reason: format!("slot {slot} is occupied"),
            });
        }
        self.slots[slot] = Some(character_id);
        self.heroes.insert(character_id);
        Ok(())
    }

    /// Clear a slot, returning the character that occupied it (if any).
    ///
    /// # Errors
    /// Returns `SlotOutOfRange` if `slot >= max_slots`.
    pub fn clear(&mut self, slot: usize) -> Result<Option<CharacterId>> {
        if slot >= self.max_slots {
            return Err(TradepostError::SlotOutOfRange {
                slot,
                max_slots: self.max_slots,
            });
        }
        let removed = self.slots[slot].take();
        if let Some(id) = removed {
            self.heroes.remove(&id);
        }
        Ok(removed)
    }

    /// The cover character (slot 0), if set.
    #[must_use]
    pub fn cover(&self) -> Option<CharacterId> {
        self.slots.first().copied().flatten()
    }

    /// Number of characters held.
    #[must_use]
    pub fn hero_count(&self) -> usize {
        self.heroes.len()
    }

    /// Whether this collection holds the given character.
    #[must_use]
    pub fn contains(&self, character_id: CharacterId) -> bool {
        self.heroes.contains(&character_id)
    }

    /// Whether `heroes` is exactly the set of non-empty slot entries and no
    /// character occupies two slots. Used by the store's invariant audit.
    #[must_use]
    pub fn slots_agree_with_heroes(&self) -> bool {
        if self.slots.len() != self.max_slots {
            return false;
        }
        let mut seen = BTreeSet::new();
        for id in self.slots.iter().flatten() {
            if !seen.insert(*id) {
                return false;
            }
        }
        seen == self.heroes
    }

    /// Take an immutable value copy of this collection's content.
    #[must_use]
    pub fn snapshot(&self) -> CollectionSnapshot {
        CollectionSnapshot {
            source_id: self.id,
            name: self.name.clone(),
            max_slots: self.max_slots,
            slots: self.slots.clone(),
            heroes: self.heroes.clone(),
            tags: self.tags.clone(),
        }
    }

    /// Re-mint a live collection from a snapshot under a **fresh id**.
    ///
    /// This is the only way a collection crosses an ownership boundary;
    /// the source id recorded on the snapshot is deliberately not reused.
    #[must_use]
    pub fn from_snapshot(snapshot: &CollectionSnapshot) -> Self {
        Self {
            id: CollectionId::new(),
            name: snapshot.name.clone(),
            max_slots: snapshot.max_slots,
            slots: snapshot.slots.clone(),
            heroes: snapshot.heroes.clone(),
            tags: snapshot.tags.clone(),
        }
    }
}

/// Immutable value copy of a collection, as stored inside a trade item.
///
/// Distinct from [`Collection`] on purpose: a snapshot has no independent
/// identity (only the `source_id` it was taken from) and no mutators, so
/// escrowed content can never alias the original owner's live state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    /// Id of the live collection this was taken from. Dangling once the
    /// source is detached; retained for display and audit only.
    pub source_id: CollectionId,
    pub name: String,
    pub max_slots: usize,
    pub slots: Vec<Option<CharacterId>>,
    pub heroes: BTreeSet<CharacterId>,
    pub tags: BTreeSet<String>,
}

impl CollectionSnapshot {
    /// Number of characters the snapshot holds.
    #[must_use]
    pub fn hero_count(&self) -> usize {
        self.heroes.len()
    }

    /// Content equality with another snapshot, ignoring the source id.
    /// Escrow-return tests use this: the returned collection has a new
    /// identity but must carry identical content.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.name == other.name
            && self.max_slots == other.max_slots
            && self.slots == other.slots
            && self.heroes == other.heroes
            && self.tags == other.tags
    }
}

/// Dummy collections for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Collection {
    /// Build a collection holding `heroes` in consecutive slots from 0.
    ///
    /// # Panics
    /// Panics if the shape rules are violated; tests construct valid input.
    #[must_use]
    pub fn dummy(name: &str, heroes: &[u32]) -> Self {
        let mut col = Self::new(name, constants::DEFAULT_COLLECTION_SLOTS).unwrap();
        for (slot, id) in heroes.iter().enumerate() {
            col.place(slot, CharacterId(*id)).unwrap();
        }
        col
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_collection_is_empty() {
        let col = Collection::new("Starters", 4).unwrap();
        assert_eq!(col.hero_count(), 0);
        assert_eq!(col.slots.len(), 4);
        assert!(col.cover().is_none());
        assert!(col.slots_agree_with_heroes());
    }

    #[test]
    fn new_rejects_empty_name() {
        assert!(Collection::new("", 4).is_err());
    }

    #[test]
    fn new_rejects_zero_capacity() {
        assert!(Collection::new("x", 0).is_err());
    }

    #[test]
    fn new_rejects_oversized_capacity() {
        assert!(Collection::new("x", constants::MAX_COLLECTION_SLOTS + 1).is_err());
    }

    #[test]
    fn place_and_cover() {
        let mut col = Collection::new("Starters", 4).unwrap();
        col.place(0, CharacterId(10)).unwrap();
        col.place(2, CharacterId(11)).unwrap();
        assert_eq!(col.cover(), Some(CharacterId(10)));
        assert_eq!(col.hero_count(), 2);
        assert!(col.contains(CharacterId(11)));
        assert!(col.slots_agree_with_heroes());
    }

    #[test]
    fn place_rejects_duplicate_hero() {
        let mut col = Collection::new("Starters", 4).unwrap();
        col.place(0, CharacterId(10)).unwrap();
        let err = col.place(1, CharacterId(10)).unwrap_err();
        assert!(matches!(err, TradepostError::HeroAlreadyPlaced { .. }));
        assert_eq!(col.hero_count(), 1);
    }

    #[test]
    fn place_rejects_occupied_slot() {
        let mut col = Collection::new("Starters", 4).unwrap();
        col.place(0, CharacterId(10)).unwrap();
        assert!(col.place(0, CharacterId(11)).is_err());
    }

    #[test]
    fn place_rejects_out_of_range() {
        let mut col = Collection::new("Starters", 4).unwrap();
        let err = col.place(4, CharacterId(10)).unwrap_err();
        assert!(matches!(err, TradepostError::SlotOutOfRange { .. }));
    }

    #[test]
    fn clear_releases_hero() {
        let mut col = Collection::new("Starters", 4).unwrap();
        col.place(1, CharacterId(10)).unwrap();
        let removed = col.clear(1).unwrap();
        assert_eq!(removed, Some(CharacterId(10)));
        assert!(!col.contains(CharacterId(10)));
        assert!(col.slots_agree_with_heroes());
    }

    #[test]
    fn clear_empty_slot_is_noop() {
        let mut col = Collection::new("Starters", 4).unwrap();
        assert_eq!(col.clear(3).unwrap(), None);
    }

    #[test]
    fn snapshot_then_remint_changes_id_keeps_content() {
        let col = Collection::dummy("Starters", &[10, 11, 12]);
        let snap = col.snapshot();
        assert_eq!(snap.source_id, col.id);
        assert_eq!(snap.hero_count(), 3);

        let reminted = Collection::from_snapshot(&snap);
        assert_ne!(reminted.id, col.id, "re-mint must allocate a fresh id");
        assert_eq!(reminted.name, col.name);
        assert_eq!(reminted.slots, col.slots);
        assert_eq!(reminted.heroes, col.heroes);
        assert!(reminted.slots_agree_with_heroes());
    }

    #[test]
    fn snapshot_is_detached_from_live_state() {
        let mut col = Collection::dummy("Starters", &[10]);
        let snap = col.snapshot();
        col.clear(0).unwrap();
        assert_eq!(snap.hero_count(), 1, "snapshot must not track live edits");
        assert_eq!(col.hero_count(), 0);
    }

    #[test]
    fn same_content_ignores_source_id() {
        let col = Collection::dummy("Starters", &[10, 11]);
        let snap = col.snapshot();
        let reminted = Collection::from_snapshot(&snap);
        assert!(snap.same_content(&reminted.snapshot()));
    }

    #[test]
    fn serde_roundtrip() {
        let col = Collection::dummy("Starters", &[10, 11]);
        let json = serde_json::to_string(&col).unwrap();
        let back: Collection = serde_json::from_str(&json).unwrap();
        assert_eq!(col, back);
    }
}
