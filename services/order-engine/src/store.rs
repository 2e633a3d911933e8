//! Order store interface and the in-memory implementation

use parking_lot::RwLock;
use std::collections::HashMap;
use types::errors::StoreError;
use types::ids::{CustomerId, OrderId};
use types::order::{Order, OrderStatus};

/// Storage collaborator for order records
///
/// Listing order is left to the engine; implementations may return records
/// in any order.
pub trait OrderStore: Send + Sync {
    fn get(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// Insert or replace by `order_id`
    fn upsert(&self, order: &Order) -> Result<(), StoreError>;

    fn list_by_customer(&self, customer_id: &CustomerId) -> Result<Vec<Order>, StoreError>;

    fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, StoreError>;
}

/// Thread-safe in-memory order store
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn get(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().get(order_id).cloned())
    }

    fn upsert(&self, order: &Order) -> Result<(), StoreError> {
        self.orders.write().insert(order.order_id, order.clone());
        Ok(())
    }

    fn list_by_customer(&self, customer_id: &CustomerId) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .orders
            .read()
            .values()
            .filter(|order| &order.customer_id == customer_id)
            .cloned()
            .collect())
    }

    fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .orders
            .read()
            .values()
            .filter(|order| order.status == status)
            .cloned()
            .collect())
    }
}
