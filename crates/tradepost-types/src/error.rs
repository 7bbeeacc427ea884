//! Error types for the tradepost reconciliation engine.
//!
//! All errors use the `TP_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by family:
//! - 1xx: Validation errors (malformed items, shape violations)
//! - 2xx: Insufficient-resource errors (shortage accounting)
//! - 3xx: Not-found errors
//! - 4xx: Authorization errors
//! - 5xx: Conflict errors (lost races, stale state)
//! - 9xx: General / internal errors
//!
//! The 2xx messages carry the full shortage accounting — requested, owned,
//! locked, available — because the caller surfaces them verbatim
//! ("You have N available (M owned, L locked)"). The numbers are part of
//! the contract, not incidental logging.

use thiserror::Error;

use crate::{CharacterId, CollectionId, TradeId, TradeStatus, UserId};

/// Central error enum for all tradepost operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TradepostError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// A trade item failed structural validation.
    #[error("TP_ERR_100: Invalid trade item: {reason}")]
    InvalidItem { reason: String },

    /// A character item carried a zero quantity.
    #[error("TP_ERR_101: Character quantity must be at least 1")]
    ZeroQuantity,

    /// A currency item carried a zero amount.
    #[error("TP_ERR_102: Currency amount must be at least 1")]
    ZeroAmount,

    /// The same collection was referenced more than once in one item list.
    #[error("TP_ERR_103: Collection referenced twice in one trade side: {0}")]
    DuplicateCollectionRef(CollectionId),

    /// An open-market post requested a specific collection; there is no
    /// recipient ledger to resolve it against.
    #[error("TP_ERR_104: Requesting a collection requires a designated recipient")]
    CollectionRequestNeedsRecipient,

    /// A collection operation violated the slot/hero shape rules.
    #[error("TP_ERR_105: Invalid collection shape: {reason}")]
    InvalidCollection { reason: String },

    /// A slot index was outside the collection's capacity.
    #[error("TP_ERR_106: Slot {slot} out of range (collection has {max_slots} slots)")]
    SlotOutOfRange { slot: usize, max_slots: usize },

    /// The character is already placed in this collection.
    #[error("TP_ERR_107: Character {character_id} already present in collection")]
    HeroAlreadyPlaced { character_id: CharacterId },

    /// A directed trade named its own initiator as recipient.
    #[error("TP_ERR_108: A directed trade cannot target its own initiator")]
    SelfDirectedTrade,

    // =================================================================
    // Insufficient-Resource Errors (2xx)
    // =================================================================
    /// Not enough unlocked copies of a character to satisfy the request.
    #[error(
        "TP_ERR_200: Insufficient copies of {character_id}: requested {requested}, \
         you have {available} available ({owned} owned, {locked} locked)"
    )]
    InsufficientCopies {
        character_id: CharacterId,
        requested: u32,
        available: u32,
        owned: u32,
        locked: u32,
    },

    /// Not enough currency balance to satisfy the request.
    #[error("TP_ERR_201: Insufficient currency: requested {requested}, balance {balance}")]
    InsufficientCurrency { requested: u64, balance: u64 },

    /// A ledger mutation would produce a negative quantity.
    #[error("TP_ERR_202: Ledger underflow for {character_id}")]
    LedgerUnderflow { character_id: CharacterId },

    // =================================================================
    // Not-Found Errors (3xx)
    // =================================================================
    /// The user has no registered ledger.
    #[error("TP_ERR_300: User not found: {0}")]
    UserNotFound(UserId),

    /// The trade does not exist.
    #[error("TP_ERR_301: Trade not found: {0}")]
    TradeNotFound(TradeId),

    /// The collection does not exist in the owner's ledger.
    #[error("TP_ERR_302: Collection not found: {0}")]
    CollectionNotFound(CollectionId),

    // =================================================================
    // Authorization Errors (4xx)
    // =================================================================
    /// The acting user may not accept this trade (initiator self-accept,
    /// or a directed trade addressed to someone else).
    #[error("TP_ERR_400: User {user} may not accept trade {trade}")]
    NotEligibleToAccept { user: UserId, trade: TradeId },

    /// Only the designated recipient may reject a directed trade.
    #[error("TP_ERR_401: User {user} is not the recipient of trade {trade}")]
    NotTheRecipient { user: UserId, trade: TradeId },

    /// Only the initiator may cancel a trade.
    #[error("TP_ERR_402: User {user} is not the initiator of trade {trade}")]
    NotTheInitiator { user: UserId, trade: TradeId },

    // =================================================================
    // Conflict Errors (5xx)
    // =================================================================
    /// The trade left the expected status before commit — lost the race.
    #[error("TP_ERR_500: Trade {trade} is {actual}, expected {expected}")]
    StatusConflict {
        trade: TradeId,
        expected: TradeStatus,
        actual: TradeStatus,
    },

    /// The trade has already reached a terminal state.
    #[error("TP_ERR_501: Trade {trade} is closed ({status})")]
    TradeClosed { trade: TradeId, status: TradeStatus },

    /// A ledger already exists for this user.
    #[error("TP_ERR_502: User already registered: {0}")]
    UserAlreadyRegistered(UserId),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("TP_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("TP_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Ledger invariant violated — critical safety alert.
    #[error("TP_ERR_902: Ledger invariant violation: {reason}")]
    InvariantViolation { reason: String },
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, TradepostError>;
