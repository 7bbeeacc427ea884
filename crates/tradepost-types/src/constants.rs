//! System-wide constants for the tradepost reconciliation engine.

/// Appraised value contributed by a character item, regardless of quantity.
pub const CHARACTER_ITEM_VALUE: u64 = 150;

/// Appraised value contributed per hero held by a collection item.
pub const COLLECTION_VALUE_PER_HERO: u64 = 50;

/// Default slot capacity for a newly created collection.
pub const DEFAULT_COLLECTION_SLOTS: usize = 8;

/// Hard upper bound on a collection's slot capacity.
pub const MAX_COLLECTION_SLOTS: usize = 32;

/// Maximum length of a collection name.
pub const MAX_COLLECTION_NAME_LEN: usize = 64;

/// Maximum number of items on one side of a trade.
pub const MAX_ITEMS_PER_SIDE: usize = 32;

/// Maximum receipts retained in the audit log before pruning oldest.
pub const MAX_AUDIT_RECEIPTS: usize = 100_000;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "tradepost";
