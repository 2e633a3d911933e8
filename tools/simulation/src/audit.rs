//! Cross-checks between the ledger and the order book
//!
//! For every customer and asset, the reserved amount must equal the sum of
//! the reservations of that customer's PENDING orders, and every balance
//! must satisfy `0 <= usable <= total`.

use ledger::BalanceStore;
use order_engine::{Clock, OrderEngine, OrderStore};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use types::errors::OrderError;
use types::ids::{AssetName, CustomerId};

/// One broken invariant
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub customer_id: CustomerId,
    pub asset: AssetName,
    pub detail: String,
}

/// Check every balance of `customers` against their pending orders.
pub fn audit<B, O, C>(
    engine: &OrderEngine<B, O, C>,
    customers: &[CustomerId],
) -> Result<Vec<Violation>, OrderError>
where
    B: BalanceStore,
    O: OrderStore,
    C: Clock,
{
    let cash = &engine.config().cash_asset;
    let mut violations = Vec::new();

    for customer_id in customers {
        let mut expected: BTreeMap<AssetName, Decimal> = BTreeMap::new();
        for order in engine.list_pending_orders_for(customer_id)? {
            let reservation = order.reservation(cash);
            *expected.entry(reservation.asset).or_default() += reservation.amount;
        }

        for balance in engine.list_balances(customer_id)? {
            if !balance.check_invariant() {
                violations.push(Violation {
                    customer_id: customer_id.clone(),
                    asset: balance.asset.clone(),
                    detail: format!("usable {} outside [0, {}]", balance.usable, balance.total),
                });
            }

            let pending = expected.remove(&balance.asset).unwrap_or_default();
            if balance.reserved() != pending {
                violations.push(Violation {
                    customer_id: customer_id.clone(),
                    asset: balance.asset.clone(),
                    detail: format!(
                        "reserved {} but pending orders hold {}",
                        balance.reserved(),
                        pending
                    ),
                });
            }
        }

        for (asset, amount) in expected {
            violations.push(Violation {
                customer_id: customer_id.clone(),
                asset,
                detail: format!("pending orders hold {} with no balance record", amount),
            });
        }
    }

    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use order_engine::{CreateOrderRequest, EngineConfig, InMemoryOrderEngine};
    use types::order::Side;

    #[test]
    fn test_consistent_book_has_no_violations() {
        let engine = InMemoryOrderEngine::in_memory(EngineConfig::default());
        let customer = CustomerId::try_new("CUST001").unwrap();
        engine.deposit(&customer, &AssetName::cash(), Decimal::from(1000)).unwrap();
        engine
            .create_order(CreateOrderRequest::new("CUST001", "AAPL", Side::BUY, Decimal::ONE, Decimal::from(100)))
            .unwrap();

        assert!(audit(&engine, &[customer]).unwrap().is_empty());
    }

    #[test]
    fn test_reservation_without_order_is_reported() {
        let engine = InMemoryOrderEngine::in_memory(EngineConfig::default());
        let customer = CustomerId::try_new("CUST001").unwrap();
        engine.deposit(&customer, &AssetName::cash(), Decimal::from(1000)).unwrap();
        engine
            .ledger()
            .reserve(&customer, &AssetName::cash(), Decimal::from(10))
            .unwrap();

        let violations = audit(&engine, &[customer]).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].detail.contains("reserved 10"));
    }
}
