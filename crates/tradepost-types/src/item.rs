//! Trade item types: the tagged union carried on both sides of a trade.
//!
//! Items on the **offered** side are escrowed out of the initiator's ledger
//! at creation; items on the **requested** side are a claim re-validated
//! against the acceptor's live ledger at acceptance. Collection items carry
//! an immutable [`CollectionSnapshot`], never a live reference.

use serde::{Deserialize, Serialize};

use crate::{CharacterId, CollectionId, CollectionSnapshot, Result, TradepostError, constants};

/// The three asset kinds a trade side may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum ItemKind {
    Character,
    Currency,
    Collection,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Character => write!(f, "CHARACTER"),
            Self::Currency => write!(f, "CURRENCY"),
            Self::Collection => write!(f, "COLLECTION"),
        }
    }
}

/// An item as submitted by a caller: the claim shape without any snapshot.
///
/// Callers never supply snapshots — the engine takes them from the owning
/// ledger at the moment the item is committed to a trade. Validation also
/// runs on specs, because it recurses into **live** collection state, not
/// into snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemSpec {
    Character {
        character_id: CharacterId,
        quantity: u32,
    },
    Currency {
        amount: u64,
    },
    Collection {
        collection_id: CollectionId,
    },
}

impl ItemSpec {
    /// Which asset kind this spec claims.
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Character { .. } => ItemKind::Character,
            Self::Currency { .. } => ItemKind::Currency,
            Self::Collection { .. } => ItemKind::Collection,
        }
    }

    /// Structural validation: positive quantities and amounts.
    ///
    /// # Errors
    /// Returns `ZeroQuantity` / `ZeroAmount` for non-positive magnitudes.
    pub fn validate_shape(&self) -> Result<()> {
        match self {
            Self::Character { quantity, .. } => {
                if *quantity == 0 {
                    return Err(TradepostError::ZeroQuantity);
                }
            }
            Self::Currency { amount } => {
                if *amount == 0 {
                    return Err(TradepostError::ZeroAmount);
                }
            }
            Self::Collection { .. } => {}
        }
        Ok(())
    }

    /// The collection id claimed by this spec, if it is a collection spec.
    #[must_use]
    pub fn collection_id(&self) -> Option<CollectionId> {
        match self {
            Self::Collection { collection_id } => Some(*collection_id),
            _ => None,
        }
    }
}

/// One entry in a trade's offered or requested list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeItem {
    /// A quantity of fungible copies of one character.
    Character {
        character_id: CharacterId,
        quantity: u32,
    },
    /// A currency amount.
    Currency { amount: u64 },
    /// A collection, identified by the id it had in its source ledger plus
    /// the value copy taken when the item was committed to the trade.
    Collection {
        collection_id: CollectionId,
        snapshot: CollectionSnapshot,
    },
}

impl TradeItem {
    /// Which asset kind this item carries.
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Character { .. } => ItemKind::Character,
            Self::Currency { .. } => ItemKind::Currency,
            Self::Collection { .. } => ItemKind::Collection,
        }
    }

    /// Structural validation: positive quantities, non-empty snapshots,
    /// snapshot id agreeing with the reference id.
    ///
    /// # Errors
    /// - `ZeroQuantity` / `ZeroAmount` for non-positive magnitudes
    /// - `InvalidItem` for snapshot shape mismatches
    pub fn validate_shape(&self) -> Result<()> {
        match self {
            Self::Character { quantity, .. } => {
                if *quantity == 0 {
                    return Err(TradepostError::ZeroQuantity);
                }
            }
            Self::Currency { amount } => {
                if *amount == 0 {
                    return Err(TradepostError::ZeroAmount);
                }
            }
            Self::Collection {
                collection_id,
                snapshot,
            } => {
                if snapshot.heroes.is_empty() {
                    return Err(TradepostError::InvalidItem {
                        reason: "collection item must hold at least one character".to_string(),
                    });
                }
                if snapshot.source_id != *collection_id {
                    return Err(TradepostError::InvalidItem {
                        reason: format!(
                            "snapshot source {} does not match reference {collection_id}",
                            snapshot.source_id
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Appraised market value of this item under the fixed scoring rule:
    /// a character item scores a flat premium, currency scores its face
    /// amount, a collection scores per hero held.
    #[must_use]
    pub fn appraised_value(&self) -> u64 {
        match self {
            Self::Character { .. } => constants::CHARACTER_ITEM_VALUE,
            Self::Currency { amount } => *amount,
            Self::Collection { snapshot, .. } => {
                constants::COLLECTION_VALUE_PER_HERO * snapshot.hero_count() as u64
            }
        }
    }

    /// The collection id referenced by this item, if it is a collection item.
    #[must_use]
    pub fn collection_id(&self) -> Option<CollectionId> {
        match self {
            Self::Collection { collection_id, .. } => Some(*collection_id),
            _ => None,
        }
    }

    /// The claim shape of this item, dropping any snapshot. Used when a
    /// stored requested side is re-validated against a live ledger.
    #[must_use]
    pub fn to_spec(&self) -> ItemSpec {
        match self {
            Self::Character {
                character_id,
                quantity,
            } => ItemSpec::Character {
                character_id: *character_id,
                quantity: *quantity,
            },
            Self::Currency { amount } => ItemSpec::Currency { amount: *amount },
            Self::Collection { collection_id, .. } => ItemSpec::Collection {
                collection_id: *collection_id,
            },
        }
    }
}

/// Total appraised value of an item list.
#[must_use]
pub fn appraise_items(items: &[TradeItem]) -> u64 {
    items.iter().map(TradeItem::appraised_value).sum()
}
