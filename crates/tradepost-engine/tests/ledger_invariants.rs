//! Property-based tests for ledger invariants under random trade histories
//!
//! These tests drive the full stack (provisioning, trading, lifecycle
//! transitions) with randomly generated operation sequences and verify the
//! properties that must survive ANY history:
//!
//! - `owned >= locked` for every user and character after every operation
//! - assets are conserved: everything ever granted is either in a ledger
//!   or escrowed inside an open trade, never duplicated or destroyed
//! - failed operations leave committed state byte-for-byte untouched
//!
//! Operations are allowed to fail mid-history (insufficient funds, locked
//! characters, ineligible actors); the properties must hold regardless.

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use tradepost_engine::{TradeDesk, TradeFilters};
use tradepost_ledger::TradeStore;
use tradepost_types::{
    CharacterId, ItemSpec, TradeItem, UserId, UserLedger, catalog::stubs::StaticDirectory,
};

const USERS: usize = 3;
const MAX_CHARACTER: u32 = 5;

/// One step of a random trading history. User and character indices are
/// mapped onto the harness's fixed cast.
#[derive(Debug, Clone)]
enum Op {
    GrantCurrency { user: usize, amount: u64 },
    GrantCopies { user: usize, character: u32, quantity: u32 },
    BuildCollection { user: usize, heroes: Vec<u32> },
    OfferCopies { user: usize, character: u32, quantity: u32, ask: u64 },
    OfferCollection { user: usize },
    AcceptNewest { user: usize },
    CancelNewest { user: usize },
    DisbandFirst { user: usize },
}

/// Strategy producing one weighted-random operation.
fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..USERS, 1u64..=500).prop_map(|(user, amount)| Op::GrantCurrency { user, amount }),
        (0..USERS, 1u32..=MAX_CHARACTER, 1u32..=3).prop_map(|(user, character, quantity)| {
            Op::GrantCopies {
                user,
                character,
                quantity,
            }
        }),
        (0..USERS, prop::collection::vec(1u32..=MAX_CHARACTER, 1..=4))
            .prop_map(|(user, heroes)| Op::BuildCollection { user, heroes }),
        (0..USERS, 1u32..=MAX_CHARACTER, 1u32..=2, 1u64..=200).prop_map(
            |(user, character, quantity, ask)| Op::OfferCopies {
                user,
                character,
                quantity,
                ask,
            }
        ),
        (0..USERS).prop_map(|user| Op::OfferCollection { user }),
        (0..USERS).prop_map(|user| Op::AcceptNewest { user }),
        (0..USERS).prop_map(|user| Op::CancelNewest { user }),
        (0..USERS).prop_map(|user| Op::DisbandFirst { user }),
    ]
}

/// A desk with a fixed registered cast, tracking everything ever granted so
/// conservation can be checked at the end of a history.
struct Harness {
    desk: TradeDesk,
    users: Vec<UserId>,
    granted_currency: u64,
    granted_copies: BTreeMap<u32, u32>,
}

impl Harness {
    fn new() -> Self {
        let desk = TradeDesk::new(Arc::new(TradeStore::new()));
        let users: Vec<UserId> = (0..USERS)
            .map(|_| {
                let user = UserId::new();
                desk.store()
                    .register_user(user)
                    .expect("Registration should succeed");
                user
            })
            .collect();
        Self {
            desk,
            users,
            granted_currency: 0,
            granted_copies: BTreeMap::new(),
        }
    }

    fn user(&self, index: usize) -> UserId {
        self.users[index % self.users.len()]
    }

    /// Apply one operation. Domain failures (shortages, locked characters,
    /// ineligible actors) are expected and ignored; only infrastructure
    /// failures panic.
    fn apply(&mut self, op: &Op) {
        match op {
            Op::GrantCurrency { user, amount } => {
                self.desk
                    .store()
                    .grant_currency(self.user(*user), *amount)
                    .expect("Grant should succeed");
                self.granted_currency += amount;
            }
            Op::GrantCopies {
                user,
                character,
                quantity,
            } => {
                self.desk
                    .store()
                    .grant_copies(self.user(*user), CharacterId(*character), *quantity)
                    .expect("Grant should succeed");
                *self.granted_copies.entry(*character).or_insert(0) += quantity;
            }
            Op::BuildCollection { user, heroes } => {
                let acting = self.user(*user);
                let col = self
                    .desk
                    .store()
                    .create_collection(acting, "Assembled", 8)
                    .expect("Collection creation should succeed");
                for (slot, hero) in heroes.iter().enumerate() {
                    // May fail: copy unavailable or hero already placed.
                    let _ = self
                        .desk
                        .store()
                        .place_hero(acting, col, slot, CharacterId(*hero));
                }
            }
            Op::OfferCopies {
                user,
                character,
                quantity,
                ask,
            } => {
                let _ = self.desk.create_market_trade(
                    self.user(*user),
                    &[ItemSpec::Character {
                        character_id: CharacterId(*character),
                        quantity: *quantity,
                    }],
                    &[ItemSpec::Currency { amount: *ask }],
                );
            }
            Op::OfferCollection { user } => {
                let acting = self.user(*user);
                let col = self.desk.store().read(|view| {
                    view.ledger(acting)
                        .and_then(|l| l.collections().first().map(|c| c.id))
                });
                if let Some(col) = col {
                    let _ = self.desk.create_market_trade(
                        acting,
                        &[ItemSpec::Collection { collection_id: col }],
                        &[ItemSpec::Currency { amount: 10 }],
                    );
                }
            }
            Op::AcceptNewest { user } => {
                let acting = self.user(*user);
                let open = self
                    .desk
                    .list_open_trades(&TradeFilters::default(), &StaticDirectory::new());
                if let Some(trade) = open.first() {
                    let _ = self.desk.accept_trade(trade.id, acting);
                }
            }
            Op::CancelNewest { user } => {
                let acting = self.user(*user);
                let mine = self.desk.get_user_trades(acting);
                if let Some(trade) = mine
                    .iter()
                    .find(|t| t.initiator == acting && !t.status.is_terminal())
                {
                    let _ = self.desk.cancel_trade(trade.id, acting);
                }
            }
            Op::DisbandFirst { user } => {
                let acting = self.user(*user);
                let col = self.desk.store().read(|view| {
                    view.ledger(acting)
                        .and_then(|l| l.collections().first().map(|c| c.id))
                });
                if let Some(col) = col {
                    self.desk
                        .store()
                        .disband_collection(acting, col)
                        .expect("Disband of an existing collection should succeed");
                }
            }
        }
    }

    /// Currency sitting in ledgers and currency escrowed in open trades.
    fn currency_totals(&self) -> (u64, u64) {
        self.desk.store().read(|view| {
            let in_ledgers: u64 = self
                .users
                .iter()
                .filter_map(|u| view.ledger(*u))
                .map(UserLedger::currency)
                .sum();
            let in_escrow: u64 = view
                .trades()
                .filter(|t| !t.status.is_terminal())
                .flat_map(|t| t.offered.iter())
                .filter_map(|item| match item {
                    TradeItem::Currency { amount } => Some(*amount),
                    _ => None,
                })
                .sum();
            (in_ledgers, in_escrow)
        })
    }

    /// Per-character copy counts across ledgers plus open-trade escrow.
    /// Escrowed collections count one copy per snapshot hero, because the
    /// debit that escrowed them removed exactly those copies.
    fn circulating_copies(&self) -> BTreeMap<u32, u32> {
        self.desk.store().read(|view| {
            let mut totals: BTreeMap<u32, u32> = BTreeMap::new();
            for user in &self.users {
                if let Some(ledger) = view.ledger(*user) {
                    for (id, quantity) in ledger.characters() {
                        *totals.entry(id.0).or_insert(0) += quantity;
                    }
                }
            }
            for trade in view.trades().filter(|t| !t.status.is_terminal()) {
                for item in &trade.offered {
                    match item {
                        TradeItem::Character {
                            character_id,
                            quantity,
                        } => {
                            *totals.entry(character_id.0).or_insert(0) += quantity;
                        }
                        TradeItem::Collection { snapshot, .. } => {
                            for hero in &snapshot.heroes {
                                *totals.entry(hero.0).or_insert(0) += 1;
                            }
                        }
                        TradeItem::Currency { .. } => {}
                    }
                }
            }
            totals
        })
    }

    /// Deterministic serialization of all ledgers, for before/after
    /// comparison around operations that must not mutate anything.
    fn fingerprint(&self) -> String {
        self.desk.store().read(|view| {
            let ledgers: Vec<Option<UserLedger>> =
                self.users.iter().map(|u| view.ledger(*u).cloned()).collect();
            serde_json::to_string(&ledgers).expect("Ledger serialization should succeed")
        })
    }
}

proptest! {
    /// Property: after every operation of any history, every ledger holds
    /// `owned >= locked` and its structural invariants, and at the end all
    /// granted assets are accounted for in ledgers plus open-trade escrow.
    #[test]
    fn prop_invariants_and_conservation_hold_across_histories(
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let mut harness = Harness::new();
        for op in &ops {
            harness.apply(op);
            prop_assert!(
                harness.desk.store().audit_invariants().is_ok(),
                "Ledger invariants must hold after {op:?}"
            );
        }

        let (in_ledgers, in_escrow) = harness.currency_totals();
        prop_assert_eq!(
            in_ledgers + in_escrow,
            harness.granted_currency,
            "Currency must be conserved: {} in ledgers + {} escrowed",
            in_ledgers,
            in_escrow
        );
        prop_assert_eq!(
            harness.circulating_copies(),
            harness.granted_copies,
            "Character copies must be conserved across ledgers and escrow"
        );
    }

    /// Property: an offer the initiator cannot fund fails and leaves the
    /// committed state byte-for-byte unchanged, no matter what history
    /// preceded it.
    #[test]
    fn prop_overdrawn_offer_leaves_state_untouched(
        ops in prop::collection::vec(op_strategy(), 1..20),
        user in 0..USERS,
        excess in 1u64..=100,
    ) {
        let mut harness = Harness::new();
        for op in &ops {
            harness.apply(op);
        }

        let acting = harness.user(user);
        let balance = harness
            .desk
            .store()
            .read(|view| view.ledger(acting).map_or(0, UserLedger::currency));
        let before = harness.fingerprint();
        let trades_before = harness.desk.store().read(|view| view.trade_count());

        let result = harness.desk.create_market_trade(
            acting,
            &[ItemSpec::Currency {
                amount: balance + excess,
            }],
            &[],
        );
        prop_assert!(result.is_err(), "Overdrawn offer must be rejected");
        prop_assert_eq!(
            harness.fingerprint(),
            before,
            "Failed creation must not mutate any ledger"
        );
        prop_assert_eq!(
            harness.desk.store().read(|view| view.trade_count()),
            trades_before,
            "Failed creation must not store a trade"
        );
    }
}
