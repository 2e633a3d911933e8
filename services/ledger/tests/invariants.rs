//! Property tests for balance invariants
//!
//! Random sequences of ledger calls; whatever succeeds must leave every
//! balance with `0 <= usable <= total`, and failed calls must change nothing.

use ledger::{BalanceStore, InMemoryBalanceStore, Ledger};
use proptest::prelude::*;
use rust_decimal::Decimal;
use types::ids::{AssetName, CustomerId};
use types::order::Side;

#[derive(Debug, Clone)]
enum Op {
    Reserve(usize, Decimal),
    Release(usize, Decimal),
    Increase(usize, Decimal),
    Decrease(usize, Decimal),
    Settle(Side, Decimal, Decimal),
}

const ASSETS: [&str; 3] = ["TRY", "AAPL", "MSFT"];

fn amount() -> impl Strategy<Value = Decimal> {
    // Two decimal places, 0.00 through 5000.00; zero exercises rejection.
    (0i64..=500_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn op() -> impl Strategy<Value = Op> {
    let asset = 0..ASSETS.len();
    prop_oneof![
        (asset.clone(), amount()).prop_map(|(a, x)| Op::Reserve(a, x)),
        (asset.clone(), amount()).prop_map(|(a, x)| Op::Release(a, x)),
        (asset.clone(), amount()).prop_map(|(a, x)| Op::Increase(a, x)),
        (asset, amount()).prop_map(|(a, x)| Op::Decrease(a, x)),
        (
            prop_oneof![Just(Side::BUY), Just(Side::SELL)],
            (1i64..=2_000).prop_map(|n| Decimal::new(n, 2)),
            (1i64..=50_000).prop_map(|n| Decimal::new(n, 2)),
        )
            .prop_map(|(side, size, price)| Op::Settle(side, size, price)),
    ]
}

fn seeded() -> Ledger<InMemoryBalanceStore> {
    let ledger = Ledger::new(InMemoryBalanceStore::new());
    let customer = CustomerId::try_new("CUST001").unwrap();
    ledger
        .increase(&customer, &AssetName::cash(), Decimal::new(1_000_000, 2))
        .unwrap();
    ledger
        .increase(&customer, &AssetName::try_new("AAPL").unwrap(), Decimal::new(5_000, 2))
        .unwrap();
    ledger
}

proptest! {
    #[test]
    fn prop_usable_stays_within_total(ops in prop::collection::vec(op(), 1..60)) {
        let ledger = seeded();
        let customer = CustomerId::try_new("CUST001").unwrap();
        let aapl = AssetName::try_new("AAPL").unwrap();

        for op in ops {
            let before = ledger.store().snapshot();
            let result = match &op {
                Op::Reserve(a, x) => ledger
                    .reserve(&customer, &AssetName::try_new(ASSETS[*a]).unwrap(), *x)
                    .map(|_| ()),
                Op::Release(a, x) => ledger
                    .release(&customer, &AssetName::try_new(ASSETS[*a]).unwrap(), *x)
                    .map(|_| ()),
                Op::Increase(a, x) => ledger
                    .increase(&customer, &AssetName::try_new(ASSETS[*a]).unwrap(), *x)
                    .map(|_| ()),
                Op::Decrease(a, x) => ledger
                    .decrease(&customer, &AssetName::try_new(ASSETS[*a]).unwrap(), *x)
                    .map(|_| ()),
                Op::Settle(side, size, price) => {
                    ledger.settle_match(&customer, &aapl, *side, *size, *price)
                }
            };

            if result.is_err() {
                prop_assert_eq!(ledger.store().snapshot(), before, "failed {:?} mutated state", op);
            }
            for balance in ledger.list_balances(&customer).unwrap() {
                prop_assert!(balance.check_invariant(), "{:?} broke {:?}", op, balance);
            }
        }
    }

    #[test]
    fn prop_reserve_release_round_trip(
        total in 1i64..=1_000_000,
        pct in 1i64..=100,
    ) {
        let ledger = Ledger::new(InMemoryBalanceStore::new());
        let customer = CustomerId::try_new("CUST001").unwrap();
        let cash = AssetName::cash();
        let total = Decimal::new(total, 2);
        let amount = (total * Decimal::new(pct, 2)).round_dp(2).max(Decimal::new(1, 2));

        let start = ledger.increase(&customer, &cash, total).unwrap();
        let reserved = ledger.reserve(&customer, &cash, amount).unwrap();
        prop_assert_eq!(reserved.usable, start.usable - amount);

        let released = ledger.release(&customer, &cash, amount).unwrap();
        prop_assert_eq!(released, start);
    }

    #[test]
    fn prop_settlement_conserves_value(
        size in 1i64..=1_000,
        price in 1i64..=100_000,
    ) {
        let ledger = seeded();
        let customer = CustomerId::try_new("CUST001").unwrap();
        let cash = AssetName::cash();
        let aapl = AssetName::try_new("AAPL").unwrap();
        let size = Decimal::new(size, 2);
        let price = Decimal::new(price, 2);
        let value = size * price;

        let cash_before = ledger.get_balance(&customer, &cash).unwrap();
        let aapl_before = ledger.get_balance(&customer, &aapl).unwrap();
        prop_assume!(value <= cash_before.usable);

        ledger.reserve(&customer, &cash, value).unwrap();
        ledger.settle_match(&customer, &aapl, Side::BUY, size, price).unwrap();

        let cash_after = ledger.get_balance(&customer, &cash).unwrap();
        let aapl_after = ledger.get_balance(&customer, &aapl).unwrap();
        prop_assert_eq!(cash_after.total, cash_before.total - value);
        prop_assert_eq!(cash_after.reserved(), Decimal::ZERO);
        prop_assert_eq!(aapl_after.total, aapl_before.total + size);
        prop_assert_eq!(aapl_after.usable, aapl_before.usable + size);
    }
}

#[test]
fn test_insufficient_reserve_is_not_partial() {
    let ledger = seeded();
    let customer = CustomerId::try_new("CUST001").unwrap();
    let before = ledger.store().get(&types::ids::BalanceKey::new(customer.clone(), AssetName::cash()));

    assert!(ledger
        .reserve(&customer, &AssetName::cash(), Decimal::from(20_000))
        .is_err());
    assert_eq!(
        ledger
            .store()
            .get(&types::ids::BalanceKey::new(customer, AssetName::cash())),
        before
    );
}
