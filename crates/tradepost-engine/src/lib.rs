//! # tradepost-engine
//!
//! The control plane of the trading system: validation, escrow movement,
//! and the trade lifecycle, on top of the `tradepost-ledger` store.
//!
//! ```text
//!                        ┌───────────────┐
//!        create/accept   │   TradeDesk   │   list/filter
//!        reject/cancel ─▶│  (lifecycle)  │◀─ queries
//!                        └───┬───────┬───┘
//!                            │       │
//!                   ┌────────▼──┐ ┌──▼────────┐
//!                   │ validate  │ │ executor  │
//!                   │ (pure     │ │ (escrow   │
//!                   │  checks)  │ │  moves)   │
//!                   └────────┬──┘ └──┬────────┘
//!                            │       │
//!                        ┌───▼───────▼───┐
//!                        │  TradeStore   │
//!                        │ (transactions)│
//!                        └───────────────┘
//! ```
//!
//! Every lifecycle operation is one store transaction: checks, escrow
//! movement, the status write and the audit receipt commit together or
//! not at all. Validation never mutates; the executor is the only code
//! that moves items between ledgers.

pub mod desk;
pub mod executor;
pub mod query;
pub mod validate;

pub use desk::TradeDesk;
pub use query::TradeFilters;
