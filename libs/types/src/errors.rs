//! Error types for the ledger and the order engine
//!
//! Business failures are typed so callers can react to them; anything the
//! storage layer reports is wrapped in `StoreError` and passed through opaquely.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::ids::{AssetName, CustomerId, OrderId};
use crate::order::OrderStatus;

/// Infrastructure failure reported by a balance or order store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        StoreError::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Ledger-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Asset not found: {asset} for customer {customer_id}")]
    AssetNotFound {
        customer_id: CustomerId,
        asset: AssetName,
    },

    #[error("Insufficient funds for asset {asset}: required {required}, available {available}")]
    InsufficientFunds {
        customer_id: CustomerId,
        asset: AssetName,
        required: Decimal,
        available: Decimal,
    },

    #[error("Invalid ledger state: {reason}")]
    InvalidState { reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        LedgerError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        LedgerError::InvalidState {
            reason: reason.into(),
        }
    }

    /// True for faults the caller cannot fix by changing its request
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, LedgerError::Store(_))
    }
}

/// Order-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: OrderId },

    #[error("Cannot {operation} order {order_id} with status {status}")]
    InvalidOrderStatus {
        order_id: OrderId,
        status: OrderStatus,
        operation: String,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OrderError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        OrderError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn is_infrastructure(&self) -> bool {
        match self {
            OrderError::Store(_) => true,
            OrderError::Ledger(err) => err.is_infrastructure(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_display() {
        let err = LedgerError::InsufficientFunds {
            customer_id: CustomerId::try_new("CUST001").unwrap(),
            asset: AssetName::try_new("TRY").unwrap(),
            required: Decimal::from(20000),
            available: Decimal::from(10000),
        };
        let msg = err.to_string();
        assert!(msg.contains("TRY"));
        assert!(msg.contains("20000"));
        assert!(msg.contains("10000"));
    }

    #[test]
    fn test_invalid_order_status_display() {
        let order_id = OrderId::new();
        let err = OrderError::InvalidOrderStatus {
            order_id,
            status: OrderStatus::Matched,
            operation: "cancel".to_string(),
        };
        assert_eq!(
            err.to_string(),
            format!("Cannot cancel order {} with status MATCHED", order_id)
        );
    }

    #[test]
    fn test_order_error_from_ledger_error() {
        let ledger_err = LedgerError::invalid_state("amount exceeds total");
        let order_err: OrderError = ledger_err.clone().into();
        assert_eq!(order_err, OrderError::Ledger(ledger_err));
        assert!(!order_err.is_infrastructure());
    }

    #[test]
    fn test_store_errors_are_infrastructure() {
        let err: OrderError = LedgerError::from(StoreError::unavailable("disk gone")).into();
        assert!(err.is_infrastructure());
        assert!(OrderError::from(StoreError::unavailable("x")).is_infrastructure());
        assert_eq!(err.to_string(), "Store unavailable: disk gone");
    }
}
