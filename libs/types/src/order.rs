//! Order lifecycle types
//!
//! An order is created PENDING and moves exactly once, to MATCHED or to
//! CANCELED. Both are terminal.

use crate::errors::OrderError;
use crate::ids::{AssetName, CustomerId, OrderId};
use crate::numeric::{ensure_positive, notional};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy the named asset, paying in cash
    BUY,
    /// Sell the named asset for cash
    SELL,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::BUY => f.write_str("BUY"),
            Side::SELL => f.write_str("SELL"),
        }
    }
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Accepted, funds reserved, awaiting match or cancel
    Pending,
    /// Settled (terminal)
    Matched,
    /// Canceled by the customer, reservation released (terminal)
    Canceled,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => f.write_str("PENDING"),
            OrderStatus::Matched => f.write_str("MATCHED"),
            OrderStatus::Canceled => f.write_str("CANCELED"),
        }
    }
}

/// Asset and amount an order holds in reserve while it is pending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub asset: AssetName,
    pub amount: Decimal,
}

/// Complete order structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub asset: AssetName,
    pub side: Side,
    pub size: Decimal,
    pub price: Decimal,
    pub status: OrderStatus,
    pub created_at: i64, // Unix nanos
}

impl Order {
    /// Create a new pending order with a fresh id
    ///
    /// Fails with `InvalidArgument` unless size and price are positive and
    /// their product is representable.
    pub fn new(
        customer_id: CustomerId,
        asset: AssetName,
        side: Side,
        size: Decimal,
        price: Decimal,
        created_at: i64,
    ) -> Result<Self, OrderError> {
        ensure_positive("size", size).map_err(OrderError::invalid_argument)?;
        ensure_positive("price", price).map_err(OrderError::invalid_argument)?;
        if notional(size, price).is_none() {
            return Err(OrderError::invalid_argument(format!(
                "order value {} x {} overflows",
                size, price
            )));
        }

        Ok(Self {
            order_id: OrderId::new(),
            customer_id,
            asset,
            side,
            size,
            price,
            status: OrderStatus::Pending,
            created_at,
        })
    }

    /// size * price
    pub fn total_value(&self) -> Decimal {
        self.size * self.price
    }

    /// What this order holds in reserve: cash for a BUY, the asset itself for a SELL.
    pub fn reservation(&self, cash_asset: &AssetName) -> Reservation {
        match self.side {
            Side::BUY => Reservation {
                asset: cash_asset.clone(),
                amount: self.total_value(),
            },
            Side::SELL => Reservation {
                asset: self.asset.clone(),
                amount: self.size,
            },
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn created_at_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.created_at)
    }

    /// Transition PENDING -> MATCHED
    pub fn mark_matched(&mut self) -> Result<(), OrderError> {
        self.transition(OrderStatus::Matched, "match")
    }

    /// Transition PENDING -> CANCELED
    pub fn mark_canceled(&mut self) -> Result<(), OrderError> {
        self.transition(OrderStatus::Canceled, "cancel")
    }

    fn transition(&mut self, to: OrderStatus, operation: &str) -> Result<(), OrderError> {
        if !self.is_pending() {
            return Err(OrderError::InvalidOrderStatus {
                order_id: self.order_id,
                status: self.status,
                operation: operation.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn cash() -> AssetName {
        AssetName::try_new("TRY").unwrap()
    }

    fn make_order(side: Side, size: &str, price: &str) -> Result<Order, OrderError> {
        Order::new(
            CustomerId::try_new("CUST001").unwrap(),
            AssetName::try_new("AAPL").unwrap(),
            side,
            Decimal::from_str(size).unwrap(),
            Decimal::from_str(price).unwrap(),
            1708123456789000000,
        )
    }

    #[test]
    fn test_order_creation() {
        let order = make_order(Side::BUY, "10", "150").unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.is_pending());
        assert_eq!(order.total_value(), Decimal::from(1500));
    }

    #[test]
    fn test_order_rejects_non_positive_size_and_price() {
        assert!(matches!(
            make_order(Side::BUY, "0", "150"),
            Err(OrderError::InvalidArgument { .. })
        ));
        assert!(matches!(
            make_order(Side::SELL, "1", "-0.01"),
            Err(OrderError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_buy_reserves_cash() {
        let order = make_order(Side::BUY, "2.5", "100.10").unwrap();
        let reservation = order.reservation(&cash());
        assert_eq!(reservation.asset, cash());
        assert_eq!(reservation.amount, Decimal::from_str("250.25").unwrap());
    }

    #[test]
    fn test_sell_reserves_asset() {
        let order = make_order(Side::SELL, "5", "150").unwrap();
        let reservation = order.reservation(&cash());
        assert_eq!(reservation.asset.as_str(), "AAPL");
        assert_eq!(reservation.amount, Decimal::from(5));
    }

    #[test]
    fn test_order_match_is_terminal() {
        let mut order = make_order(Side::BUY, "1", "1").unwrap();
        order.mark_matched().unwrap();
        assert_eq!(order.status, OrderStatus::Matched);
        assert!(order.status.is_terminal());

        let err = order.mark_canceled().unwrap_err();
        assert_eq!(
            err,
            OrderError::InvalidOrderStatus {
                order_id: order.order_id,
                status: OrderStatus::Matched,
                operation: "cancel".to_string(),
            }
        );
        assert_eq!(order.status, OrderStatus::Matched);
    }

    #[test]
    fn test_order_cancel_is_terminal() {
        let mut order = make_order(Side::SELL, "1", "1").unwrap();
        order.mark_canceled().unwrap();
        assert!(matches!(
            order.mark_matched(),
            Err(OrderError::InvalidOrderStatus { status: OrderStatus::Canceled, .. })
        ));
        assert!(order.mark_canceled().is_err());
    }

    #[test]
    fn test_created_at_utc() {
        let order = make_order(Side::BUY, "1", "1").unwrap();
        assert_eq!(order.created_at_utc().timestamp(), 1708123456);
    }

    #[test]
    fn test_order_serialization() {
        let order = make_order(Side::SELL, "2.5", "3000.50").unwrap();
        let json = serde_json::to_string(&order).unwrap();
        assert!(json.contains("\"SELL\""));
        assert!(json.contains("\"PENDING\""));

        let deserialized: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, deserialized);
    }
}
