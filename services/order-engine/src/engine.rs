//! Order engine: orchestrator
//!
//! Drives the order state machine against the ledger. Each mutating
//! operation holds the lock of the order's customer and then a ledger
//! transaction over the balances it affects. The ledger change is committed
//! first and the order written second; if that write fails the ledger
//! transaction is rolled back before any lock is released.
//!
//! Readers of a customer's orders or balances take the same customer lock,
//! and the cross-customer pending listing waits for every in-flight
//! commit-then-write span to finish. No reader sees a PENDING order without
//! its reservation or a terminal order still holding one.

use ledger::{BalanceStore, InMemoryBalanceStore, KeyedLocks, Ledger, LedgerTxn};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{error, info};
use types::balance::Balance;
use types::errors::{LedgerError, OrderError};
use types::ids::{AssetName, BalanceKey, CustomerId, OrderId};
use types::numeric::display_amount;
use types::order::{Order, OrderStatus};

use crate::clock::{Clock, MonotonicClock};
use crate::config::EngineConfig;
use crate::request::{CreateOrderRequest, DateRange};
use crate::store::{InMemoryOrderStore, OrderStore};

/// Engine over in-memory stores
pub type InMemoryOrderEngine = OrderEngine<InMemoryBalanceStore, InMemoryOrderStore>;

/// Order lifecycle service
pub struct OrderEngine<B: BalanceStore, O: OrderStore, C: Clock = MonotonicClock> {
    ledger: Ledger<B>,
    orders: O,
    customer_locks: KeyedLocks<CustomerId>,
    // Shared by writers between ledger commit and order write; taken
    // exclusively by listings that span customers.
    publishing: RwLock<()>,
    clock: C,
    config: EngineConfig,
}

impl InMemoryOrderEngine {
    /// Fresh engine with empty in-memory stores
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::with_config(InMemoryBalanceStore::new(), InMemoryOrderStore::new(), config)
    }
}

impl<B: BalanceStore, O: OrderStore> OrderEngine<B, O, MonotonicClock> {
    /// Create an engine with default configuration
    pub fn new(balances: B, orders: O) -> Self {
        Self::with_config(balances, orders, EngineConfig::default())
    }

    /// Create an engine with custom configuration
    pub fn with_config(balances: B, orders: O, config: EngineConfig) -> Self {
        Self::with_clock(balances, orders, config, MonotonicClock::new())
    }
}

impl<B: BalanceStore, O: OrderStore, C: Clock> OrderEngine<B, O, C> {
    pub fn with_clock(balances: B, orders: O, config: EngineConfig, clock: C) -> Self {
        Self {
            ledger: Ledger::with_config(balances, config.ledger_config()),
            orders,
            customer_locks: KeyedLocks::new(),
            publishing: RwLock::new(()),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger<B> {
        &self.ledger
    }

    pub fn order_store(&self) -> &O {
        &self.orders
    }

    /// Reserve funds and record a new PENDING order.
    ///
    /// Nothing is written when validation or the reservation fails.
    pub fn create_order(&self, request: CreateOrderRequest) -> Result<Order, OrderError> {
        let (customer_id, asset) = request.identifiers()?;
        let order = Order::new(
            customer_id,
            asset,
            request.side,
            request.size,
            request.price,
            self.clock.now_nanos(),
        )?;

        let _customer = self.customer_locks.lock(order.customer_id.clone());
        let reservation = order.reservation(&self.config.cash_asset);
        let key = BalanceKey::new(order.customer_id.clone(), reservation.asset);
        let mut txn = self.ledger.begin([key.clone()]);
        txn.reserve(&key, reservation.amount)?;
        self.publish(&order, &mut txn)?;

        info!(
            order_id = %order.order_id,
            customer = %order.customer_id,
            asset = %order.asset,
            side = %order.side,
            size = %order.size,
            price = %order.price,
            "order created"
        );
        Ok(order)
    }

    /// Release the reservation of a PENDING order and mark it CANCELED.
    ///
    /// An order owned by another customer is reported as not found.
    pub fn cancel_order(
        &self,
        order_id: &OrderId,
        customer_id: &CustomerId,
    ) -> Result<Order, OrderError> {
        let _customer = self.customer_locks.lock(customer_id.clone());
        let order = self.owned_order(order_id, customer_id)?;
        let mut canceled = order.clone();
        canceled.mark_canceled()?;

        let reservation = order.reservation(&self.config.cash_asset);
        let key = BalanceKey::new(order.customer_id.clone(), reservation.asset);
        let mut txn = self.ledger.begin([key.clone()]);
        txn.release(&key, reservation.amount)?;
        self.publish(&canceled, &mut txn)?;

        info!(order_id = %order_id, customer = %customer_id, "order canceled");
        Ok(canceled)
    }

    /// Settle a PENDING order and mark it MATCHED.
    pub fn match_order(&self, order_id: &OrderId) -> Result<Order, OrderError> {
        // The owner never changes, so it can be read before locking.
        let owner = self.order(order_id)?.customer_id;
        let _customer = self.customer_locks.lock(owner);
        let order = self.order(order_id)?;
        let mut matched = order.clone();
        matched.mark_matched()?;

        let mut txn = self
            .ledger
            .begin(self.ledger.settlement_keys(&order.customer_id, &order.asset));
        txn.settle(
            &order.customer_id,
            &order.asset,
            order.side,
            order.size,
            order.price,
        )?;
        self.publish(&matched, &mut txn)?;

        info!(
            order_id = %order_id,
            customer = %order.customer_id,
            asset = %order.asset,
            side = %order.side,
            value = %display_amount(order.total_value()),
            "order matched"
        );
        Ok(matched)
    }

    pub fn get_order(
        &self,
        order_id: &OrderId,
        customer_id: &CustomerId,
    ) -> Result<Order, OrderError> {
        let _customer = self.customer_locks.lock(customer_id.clone());
        self.owned_order(order_id, customer_id)
    }

    /// A customer's orders, newest first, optionally limited to a creation window.
    pub fn list_orders(
        &self,
        customer_id: &CustomerId,
        range: Option<DateRange>,
    ) -> Result<Vec<Order>, OrderError> {
        let _customer = self.customer_locks.lock(customer_id.clone());
        let mut orders = self.orders.list_by_customer(customer_id)?;
        if let Some(range) = range {
            orders.retain(|order| range.contains(order.created_at));
        }
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.order_id.cmp(&a.order_id))
        });
        Ok(orders)
    }

    /// Every PENDING order, oldest first
    pub fn list_pending_orders(&self) -> Result<Vec<Order>, OrderError> {
        let _quiet = self.publishing.write();
        let mut orders = self.orders.list_by_status(OrderStatus::Pending)?;
        sort_oldest_first(&mut orders);
        Ok(orders)
    }

    /// One customer's PENDING orders, oldest first
    pub fn list_pending_orders_for(&self, customer_id: &CustomerId) -> Result<Vec<Order>, OrderError> {
        let _customer = self.customer_locks.lock(customer_id.clone());
        let mut orders = self.orders.list_by_customer(customer_id)?;
        orders.retain(Order::is_pending);
        sort_oldest_first(&mut orders);
        Ok(orders)
    }

    pub fn get_balance(
        &self,
        customer_id: &CustomerId,
        asset: &AssetName,
    ) -> Result<Balance, LedgerError> {
        let _customer = self.customer_locks.lock(customer_id.clone());
        self.ledger.get_balance(customer_id, asset)
    }

    pub fn list_balances(&self, customer_id: &CustomerId) -> Result<Vec<Balance>, LedgerError> {
        let _customer = self.customer_locks.lock(customer_id.clone());
        self.ledger.list_balances(customer_id)
    }

    /// Customers whose lock is currently held or waited on
    pub fn locked_customers(&self) -> usize {
        self.customer_locks.len()
    }

    /// Credit a customer's balance, opening it if needed.
    pub fn deposit(
        &self,
        customer_id: &CustomerId,
        asset: &AssetName,
        amount: Decimal,
    ) -> Result<Balance, LedgerError> {
        let balance = self.ledger.increase(customer_id, asset, amount)?;
        info!(customer = %customer_id, %asset, %amount, total = %balance.total, "deposit");
        Ok(balance)
    }

    fn order(&self, order_id: &OrderId) -> Result<Order, OrderError> {
        self.orders.get(order_id)?.ok_or(OrderError::OrderNotFound {
            order_id: *order_id,
        })
    }

    fn owned_order(
        &self,
        order_id: &OrderId,
        customer_id: &CustomerId,
    ) -> Result<Order, OrderError> {
        self.orders
            .get(order_id)?
            .filter(|order| &order.customer_id == customer_id)
            .ok_or(OrderError::OrderNotFound {
                order_id: *order_id,
            })
    }

    /// Commit the ledger change, then write the order.
    ///
    /// If the order write fails the committed ledger change is undone.
    fn publish(&self, order: &Order, txn: &mut LedgerTxn<'_, B>) -> Result<(), OrderError> {
        let _publishing = self.publishing.read();
        txn.commit()?;
        let Err(store_err) = self.orders.upsert(order) else {
            return Ok(());
        };

        if let Err(rollback_err) = txn.rollback() {
            error!(
                order_id = %order.order_id,
                error = %rollback_err,
                "ledger rollback failed after order write failure"
            );
        }
        Err(store_err.into())
    }
}

fn sort_oldest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.order_id.cmp(&b.order_id))
    });
}
