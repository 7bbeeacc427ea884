//! # TradeStore — the shared data store and its atomic unit of work
//!
//! All ledgers, trades, and audit receipts live behind one lock. Every
//! mutating operation runs through [`TradeStore::transact`], which gives the
//! closure a [`Txn`]: reads come from live state overlaid with the
//! transaction's own staged writes, mutations land in staged copies, and
//! nothing touches live state until commit.
//!
//! ## Transaction flow
//!
//! ```text
//!   transact(f)
//!      │  lock store
//!      ▼
//!   ┌──────────────────────────────┐
//!   │ Txn                          │
//!   │  staged ledgers (clone-on-   │   f() reads through the overlay,
//!   │    first-write)              │◀─ mutates staged copies, records
//!   │  staged trades               │   status guards for every trade
//!   │  status guards               │   it intends to transition
//!   │  staged receipts             │
//!   └──────────────┬───────────────┘
//!                  │ f() returned Ok        f() returned Err
//!                  ▼                            │
//!   re-check every status guard                 ▼
//!   against live state                     drop staged state,
//!      │ all hold      │ guard failed      nothing applied
//!      ▼               ▼
//!   apply staged     ConflictError,
//!   writes           nothing applied
//! ```
//!
//! The status guard is the check-and-set on trade status: a transition
//! commits only if the trade still holds the status it had when the
//! transaction loaded it. Two racing acceptors both pass eligibility checks
//! against their own view; the commit re-check lets exactly one through and
//! fails the other with a conflict, never a blind overwrite.

use std::collections::{HashMap, VecDeque, hash_map::Entry};

use parking_lot::Mutex;
use tradepost_types::{
    Result, Trade, TradeId, TradeStatus, TradepostError, TransferReceipt, UserId, UserLedger,
    constants,
};

/// Live store content. Only reachable through [`TradeStore`].
#[derive(Debug, Default)]
struct StoreInner {
    ledgers: HashMap<UserId, UserLedger>,
    trades: HashMap<TradeId, Trade>,
    /// Append-only audit trail, pruned oldest-first past the cap.
    receipts: VecDeque<TransferReceipt>,
}

/// Expected-status record taken when a transaction loads a trade it
/// intends to transition.
#[derive(Debug, Clone, Copy)]
struct StatusGuard {
    trade: TradeId,
    expected: TradeStatus,
}

/// The shared data store.
#[derive(Debug, Default)]
pub struct TradeStore {
    inner: Mutex<StoreInner>,
}

impl TradeStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a mutating unit of work.
    ///
    /// The closure stages its writes on the [`Txn`]; they become visible
    /// only if the closure returns `Ok` **and** every recorded status guard
    /// still holds against live state at commit. On any error nothing is
    /// applied.
    ///
    /// # Errors
    /// Propagates the closure's error, or `StatusConflict` /
    /// `TradeNotFound` when a status guard fails the commit re-check.
    pub fn transact<T>(&self, f: impl FnOnce(&mut Txn<'_>) -> Result<T>) -> Result<T> {
        let mut inner = self.inner.lock();
        let mut txn = Txn::new(&inner);
        let out = f(&mut txn)?;
        let staged = txn.into_staged();

        for guard in &staged.guards {
            match inner.trades.get(&guard.trade).map(|t| t.status) {
                None => return Err(TradepostError::TradeNotFound(guard.trade)),
                Some(actual) if actual != guard.expected => {
                    tracing::warn!(
                        trade = %guard.trade,
                        expected = %guard.expected,
                        actual = %actual,
                        "Status check-and-set failed at commit"
                    );
                    return Err(TradepostError::StatusConflict {
                        trade: guard.trade,
                        expected: guard.expected,
                        actual,
                    });
                }
                Some(_) => {}
            }
        }

        for (user, ledger) in staged.ledgers {
            inner.ledgers.insert(user, ledger);
        }
        for (trade_id, trade) in staged.trades {
            inner.trades.insert(trade_id, trade);
        }
        for receipt in staged.receipts {
            inner.receipts.push_back(receipt);
            if inner.receipts.len() > constants::MAX_AUDIT_RECEIPTS {
                inner.receipts.pop_front();
            }
        }
        Ok(out)
    }

    /// Run a read-only view over consistent live state.
    pub fn read<T>(&self, f: impl FnOnce(StoreView<'_>) -> T) -> T {
        let inner = self.inner.lock();
        f(StoreView { inner: &inner })
    }

    /// Audit every ledger's structural invariants.
    ///
    /// # Errors
    /// Returns the first `InvariantViolation` found, prefixed with the
    /// owning user.
    pub fn audit_invariants(&self) -> Result<()> {
        let inner = self.inner.lock();
        for (user, ledger) in &inner.ledgers {
            ledger.check_invariant().map_err(|err| match err {
                TradepostError::InvariantViolation { reason } => {
                    TradepostError::InvariantViolation {
                        reason: format!("user {user}: {reason}"),
                    }
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

/// Staged output of a transaction, detached from the borrow of live state.
struct Staged {
    ledgers: HashMap<UserId, UserLedger>,
    trades: HashMap<TradeId, Trade>,
    guards: Vec<StatusGuard>,
    receipts: Vec<TransferReceipt>,
}

/// A mutating unit of work over the store.
///
/// Reads see live state overlaid with this transaction's staged writes;
/// mutations go to staged copies only.
pub struct Txn<'a> {
    base: &'a StoreInner,
    staged_ledgers: HashMap<UserId, UserLedger>,
    staged_trades: HashMap<TradeId, Trade>,
    status_guards: Vec<StatusGuard>,
    staged_receipts: Vec<TransferReceipt>,
}

impl<'a> Txn<'a> {
    fn new(base: &'a StoreInner) -> Self {
        Self {
            base,
            staged_ledgers: HashMap::new(),
            staged_trades: HashMap::new(),
            status_guards: Vec::new(),
            staged_receipts: Vec::new(),
        }
    }

    fn into_staged(self) -> Staged {
        Staged {
            ledgers: self.staged_ledgers,
            trades: self.staged_trades,
            guards: self.status_guards,
            receipts: self.staged_receipts,
        }
    }

    /// Whether a ledger exists for this user (staged or live).
    #[must_use]
    pub fn user_exists(&self, user: UserId) -> bool {
        self.staged_ledgers.contains_key(&user) || self.base.ledgers.contains_key(&user)
    }

    /// Stage an empty ledger for a new user.
    ///
    /// # Errors
    /// Returns `UserAlreadyRegistered` if the user already has a ledger.
    pub fn register_ledger(&mut self, user: UserId) -> Result<()> {
        if self.user_exists(user) {
            return Err(TradepostError::UserAlreadyRegistered(user));
        }
        self.staged_ledgers.insert(user, UserLedger::new());
        Ok(())
    }

    /// Read a user's ledger through the overlay.
    ///
    /// # Errors
    /// Returns `UserNotFound` if the user has no ledger.
    pub fn ledger(&self, user: UserId) -> Result<&UserLedger> {
        if let Some(ledger) = self.staged_ledgers.get(&user) {
            return Ok(ledger);
        }
        self.base
            .ledgers
            .get(&user)
            .ok_or(TradepostError::UserNotFound(user))
    }

    /// Mutable access to a user's ledger, cloning it into the staging
    /// overlay on first write.
    ///
    /// # Errors
    /// Returns `UserNotFound` if the user has no ledger.
    pub fn ledger_mut(&mut self, user: UserId) -> Result<&mut UserLedger> {
        match self.staged_ledgers.entry(user) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let live = self
                    .base
                    .ledgers
                    .get(&user)
                    .ok_or(TradepostError::UserNotFound(user))?;
                Ok(entry.insert(live.clone()))
            }
        }
    }

    /// Read a trade through the overlay.
    ///
    /// # Errors
    /// Returns `TradeNotFound` if no trade has this id.
    pub fn trade(&self, trade_id: TradeId) -> Result<&Trade> {
        if let Some(trade) = self.staged_trades.get(&trade_id) {
            return Ok(trade);
        }
        self.base
            .trades
            .get(&trade_id)
            .ok_or(TradepostError::TradeNotFound(trade_id))
    }

    /// Stage a trade upsert.
    pub fn put_trade(&mut self, trade: Trade) {
        self.staged_trades.insert(trade.id, trade);
    }

    /// Record a status guard: commit will fail with `StatusConflict` unless
    /// the trade still holds `expected` in live state.
    pub fn guard_status(&mut self, trade_id: TradeId, expected: TradeStatus) {
        self.status_guards.push(StatusGuard {
            trade: trade_id,
            expected,
        });
    }

    /// Stage an audit receipt, appended on commit.
    pub fn record_receipt(&mut self, receipt: TransferReceipt) {
        self.staged_receipts.push(receipt);
    }
}

/// Consistent read-only view of live store state.
pub struct StoreView<'a> {
    inner: &'a StoreInner,
}

impl StoreView<'_> {
    /// A user's ledger, if registered.
    #[must_use]
    pub fn ledger(&self, user: UserId) -> Option<&UserLedger> {
        self.inner.ledgers.get(&user)
    }

    /// A trade by id.
    #[must_use]
    pub fn trade(&self, trade_id: TradeId) -> Option<&Trade> {
        self.inner.trades.get(&trade_id)
    }

    /// All trades, in storage order.
    pub fn trades(&self) -> impl Iterator<Item = &Trade> + '_ {
        self.inner.trades.values()
    }

    /// The audit trail, oldest first.
    pub fn receipts(&self) -> impl Iterator<Item = &TransferReceipt> + '_ {
        self.inner.receipts.iter()
    }

    /// Number of registered users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.inner.ledgers.len()
    }

    /// Number of stored trades (any status).
    #[must_use]
    pub fn trade_count(&self) -> usize {
        self.inner.trades.len()
    }
}
