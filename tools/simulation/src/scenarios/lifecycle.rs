//! Scripted lifecycle scenario
//!
//! One customer funded with 10000.00 cash and 50 AAPL walks through the
//! sample flow: a BUY that is matched, a BUY that cannot be funded, a SELL
//! that is canceled, and transitions attempted on terminal orders.

use crate::audit::audit;
use crate::config::SimulationConfig;
use crate::scenarios::ScenarioResult;
use order_engine::{CreateOrderRequest, InMemoryOrderEngine};
use rust_decimal::Decimal;
use tracing::info;
use types::errors::{LedgerError, OrderError};
use types::ids::{AssetName, CustomerId};
use types::order::Side;

const CUSTOMER: &str = "SIM-LIFECYCLE";
const ASSET: &str = "AAPL";

pub fn run(config: &SimulationConfig) -> ScenarioResult {
    let mut result = ScenarioResult::new("lifecycle");

    let outcome = config
        .build_engine()
        .map_err(OrderError::from)
        .and_then(|engine| script(&engine, &mut result).map(|()| engine));

    match outcome {
        Ok(engine) => {
            let customer = CustomerId::try_new(CUSTOMER);
            match customer.map(|c| audit(&engine, &[c])) {
                Some(Ok(violations)) => result.record_violations("final audit", violations),
                Some(Err(err)) => result.failures.push(format!("audit failed: {}", err)),
                None => result.failures.push("invalid scenario customer".to_string()),
            }
        }
        Err(err) => result.failures.push(format!("unexpected error: {}", err)),
    }

    info!(failures = result.failures.len(), "lifecycle scenario finished");
    result.finish("buy+match, unfunded buy, sell+cancel, terminal transitions".to_string())
}

fn script(engine: &InMemoryOrderEngine, result: &mut ScenarioResult) -> Result<(), OrderError> {
    let customer = CustomerId::try_new(CUSTOMER)
        .ok_or_else(|| OrderError::invalid_argument("scenario customer"))?;
    let asset = AssetName::try_new(ASSET)
        .ok_or_else(|| OrderError::invalid_argument("scenario asset"))?;
    let cash = engine.config().cash_asset.clone();

    engine.deposit(&customer, &cash, Decimal::new(1_000_000, 2))?;
    engine.deposit(&customer, &asset, Decimal::new(5_000, 2))?;

    // BUY 10 @ 150 reserves 1500 cash.
    let buy = engine.create_order(CreateOrderRequest::new(
        CUSTOMER,
        ASSET,
        Side::BUY,
        Decimal::from(10),
        Decimal::from(150),
    ))?;
    result.orders_created += 1;
    let balance = engine.get_balance(&customer, &cash)?;
    result.check(balance.usable == Decimal::from(8_500), || {
        format!("after BUY expected usable 8500, got {}", balance.usable)
    });
    result.check(balance.total == Decimal::from(10_000), || {
        format!("after BUY expected total 10000, got {}", balance.total)
    });

    engine.match_order(&buy.order_id)?;
    result.orders_matched += 1;
    let balance = engine.get_balance(&customer, &cash)?;
    result.check(balance.total == Decimal::from(8_500) && balance.usable == Decimal::from(8_500), || {
        format!("after match expected cash 8500/8500, got {}/{}", balance.total, balance.usable)
    });
    let stock = engine.get_balance(&customer, &asset)?;
    result.check(stock.total == Decimal::from(60) && stock.usable == Decimal::from(60), || {
        format!("after match expected {} 60/60, got {}/{}", ASSET, stock.total, stock.usable)
    });

    // BUY 100 @ 200 needs 20000 and must leave cash untouched.
    let before = engine.get_balance(&customer, &cash)?;
    match engine.create_order(CreateOrderRequest::new(
        CUSTOMER,
        ASSET,
        Side::BUY,
        Decimal::from(100),
        Decimal::from(200),
    )) {
        Err(OrderError::Ledger(LedgerError::InsufficientFunds { .. })) => result.orders_rejected += 1,
        other => result.failures.push(format!("unfunded BUY: expected InsufficientFunds, got {:?}", other)),
    }
    let after = engine.get_balance(&customer, &cash)?;
    result.check(after == before, || "unfunded BUY changed the cash balance".to_string());

    // SELL 5 @ 160 then cancel restores the asset.
    let sell = engine.create_order(CreateOrderRequest::new(
        CUSTOMER,
        ASSET,
        Side::SELL,
        Decimal::from(5),
        Decimal::from(160),
    ))?;
    result.orders_created += 1;
    let stock = engine.get_balance(&customer, &asset)?;
    result.check(stock.usable == Decimal::from(55), || {
        format!("after SELL expected usable 55, got {}", stock.usable)
    });

    engine.cancel_order(&sell.order_id, &customer)?;
    result.orders_canceled += 1;
    let stock = engine.get_balance(&customer, &asset)?;
    result.check(stock.usable == Decimal::from(60), || {
        format!("after cancel expected usable 60, got {}", stock.usable)
    });

    // Terminal orders accept no further transitions.
    let again = engine.cancel_order(&sell.order_id, &customer);
    result.check(matches!(again, Err(OrderError::InvalidOrderStatus { .. })), || {
        format!("second cancel: expected InvalidOrderStatus, got {:?}", again)
    });
    let rematch = engine.match_order(&sell.order_id);
    result.check(matches!(rematch, Err(OrderError::InvalidOrderStatus { .. })), || {
        format!("match after cancel: expected InvalidOrderStatus, got {:?}", rematch)
    });
    let recancel = engine.cancel_order(&buy.order_id, &customer);
    result.check(matches!(recancel, Err(OrderError::InvalidOrderStatus { .. })), || {
        format!("cancel after match: expected InvalidOrderStatus, got {:?}", recancel)
    });

    Ok(())
}
