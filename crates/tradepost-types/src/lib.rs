//! # tradepost-types
//!
//! Shared types, errors, and constants for the **tradepost** trade &
//! inventory reconciliation engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`UserId`], [`TradeId`], [`CollectionId`], [`CharacterId`], [`ReceiptId`]
//! - **Inventory model**: [`UserLedger`] with its lock calculator
//! - **Collection model**: [`Collection`], [`CollectionSnapshot`]
//! - **Trade model**: [`Trade`], [`TradeStatus`], [`TradeItem`], [`ItemKind`]
//! - **Audit model**: [`TransferReceipt`], [`ReceiptKind`]
//! - **Collaborator traits**: [`UserDirectory`], [`CharacterCatalog`]
//! - **Errors**: [`TradepostError`] with `TP_ERR_` prefix codes
//! - **Constants**: appraisal scoring and system-wide limits

pub mod catalog;
pub mod collection;
pub mod constants;
pub mod error;
pub mod ids;
pub mod item;
pub mod ledger;
pub mod receipt;
pub mod trade;

// Re-export all primary types at crate root for ergonomic imports:
//   use tradepost_types::{Trade, TradeItem, UserLedger, Collection, ...};

pub use catalog::*;
pub use collection::*;
pub use error::*;
pub use ids::*;
pub use item::*;
pub use ledger::*;
pub use receipt::*;
pub use trade::*;

// Constants are accessed via `tradepost_types::constants::FOO`
// (not re-exported to avoid name collisions).
