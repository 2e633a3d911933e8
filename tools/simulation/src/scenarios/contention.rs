//! Match/cancel contention scenario
//!
//! For every order a matcher thread and a canceler thread are released
//! together through a barrier. Exactly one must win; the loser must see
//! `InvalidOrderStatus`. The final cash balance must reflect only the
//! orders that were matched.

use crate::audit::audit;
use crate::config::SimulationConfig;
use crate::scenarios::ScenarioResult;
use order_engine::{CreateOrderRequest, InMemoryOrderEngine};
use rust_decimal::Decimal;
use std::sync::Barrier;
use std::thread;
use tracing::info;
use types::errors::OrderError;
use types::ids::{CustomerId, OrderId};
use types::order::{Order, Side};

const CUSTOMER: &str = "SIM-CONTENTION";
const ASSET: &str = "AAPL";
const PRICE: i64 = 100;

pub fn run(config: &SimulationConfig) -> ScenarioResult {
    let mut result = ScenarioResult::new("contention");

    match config.build_engine().map_err(OrderError::from).and_then(|engine| {
        race_all(&engine, config.contention_orders, &mut result).map(|()| engine)
    }) {
        Ok(engine) => {
            if let Some(customer) = CustomerId::try_new(CUSTOMER) {
                match audit(&engine, &[customer]) {
                    Ok(violations) => result.record_violations("final audit", violations),
                    Err(err) => result.failures.push(format!("audit failed: {}", err)),
                }
            }
        }
        Err(err) => result.failures.push(format!("unexpected error: {}", err)),
    }

    info!(
        orders = config.contention_orders,
        matched = result.orders_matched,
        canceled = result.orders_canceled,
        "contention scenario finished"
    );
    let details = format!(
        "{} orders raced: {} matched, {} canceled",
        config.contention_orders, result.orders_matched, result.orders_canceled
    );
    result.finish(details)
}

fn race_all(
    engine: &InMemoryOrderEngine,
    count: usize,
    result: &mut ScenarioResult,
) -> Result<(), OrderError> {
    let customer = CustomerId::try_new(CUSTOMER)
        .ok_or_else(|| OrderError::invalid_argument("scenario customer"))?;
    let cash = engine.config().cash_asset.clone();
    let funding = Decimal::from(PRICE) * Decimal::from(count as u64);
    if count == 0 {
        return Ok(());
    }
    engine.deposit(&customer, &cash, funding)?;

    let mut orders = Vec::with_capacity(count);
    for _ in 0..count {
        orders.push(engine.create_order(CreateOrderRequest::new(
            CUSTOMER,
            ASSET,
            Side::BUY,
            Decimal::ONE,
            Decimal::from(PRICE),
        ))?);
        result.orders_created += 1;
    }

    for order in &orders {
        let (matched, canceled) = race(engine, order.order_id, &customer);
        match (&matched, &canceled) {
            (Ok(_), Err(OrderError::InvalidOrderStatus { .. })) => result.orders_matched += 1,
            (Err(OrderError::InvalidOrderStatus { .. }), Ok(_)) => result.orders_canceled += 1,
            _ => result.failures.push(format!(
                "order {}: match {:?}, cancel {:?}",
                order.order_id, matched, canceled
            )),
        }
    }

    let balance = engine.get_balance(&customer, &cash)?;
    let expected = funding - Decimal::from(PRICE) * Decimal::from(result.orders_matched);
    result.check(balance.total == expected && balance.usable == expected, || {
        format!(
            "cash expected {}/{}, got {}/{}",
            expected, expected, balance.total, balance.usable
        )
    });
    Ok(())
}

fn race(
    engine: &InMemoryOrderEngine,
    order_id: OrderId,
    customer: &CustomerId,
) -> (Result<Order, OrderError>, Result<Order, OrderError>) {
    let barrier = Barrier::new(2);
    thread::scope(|s| {
        let matcher = s.spawn(|| {
            barrier.wait();
            engine.match_order(&order_id)
        });
        let canceler = s.spawn(|| {
            barrier.wait();
            engine.cancel_order(&order_id, customer)
        });
        (join(matcher), join(canceler))
    })
}

fn join(
    handle: thread::ScopedJoinHandle<'_, Result<Order, OrderError>>,
) -> Result<Order, OrderError> {
    handle
        .join()
        .unwrap_or_else(|_| Err(OrderError::invalid_argument("racing thread panicked")))
}
