//! # tradepost-ledger
//!
//! **Data plane**: the shared store, its atomic unit of work, and the
//! inventory provisioning operations.
//!
//! ## Architecture
//!
//! Every mutating operation — provisioning grants, collection editing, and
//! all trade lifecycle transitions — runs through [`TradeStore::transact`]:
//!
//! 1. The unit of work reads live state overlaid with its own staged writes
//! 2. Mutations land in staged copies (clone-on-first-write ledgers)
//! 3. Status guards record the trade statuses the transition depends on
//! 4. Commit re-checks every guard against live state (check-and-set) and
//!    applies everything or nothing
//!
//! Reads never observe an in-flight transaction; failed transactions leave
//! no trace. The engine crate builds the trade lifecycle on top of this.

pub mod provision;
pub mod store;

pub use store::{StoreView, TradeStore, Txn};
