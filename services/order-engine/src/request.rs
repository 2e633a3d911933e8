//! Inbound request shapes
//!
//! What a thin API layer hands the engine. Identifiers arrive as raw strings
//! and are validated here, before any state is touched.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::errors::OrderError;
use types::ids::{AssetName, CustomerId};
use types::order::Side;

/// Create-order request as received from a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: String,
    pub asset: String,
    pub side: Side,
    pub size: Decimal,
    pub price: Decimal,
}

impl CreateOrderRequest {
    pub fn new(
        customer_id: impl Into<String>,
        asset: impl Into<String>,
        side: Side,
        size: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            asset: asset.into(),
            side,
            size,
            price,
        }
    }

    /// Typed identifiers, or `InvalidArgument` when either is blank.
    ///
    /// Size and price are checked when the order itself is built.
    pub fn identifiers(&self) -> Result<(CustomerId, AssetName), OrderError> {
        let customer_id = CustomerId::try_new(self.customer_id.as_str())
            .ok_or_else(|| OrderError::invalid_argument("customer id is required"))?;
        let asset = AssetName::try_new(self.asset.as_str())
            .ok_or_else(|| OrderError::invalid_argument("asset name is required"))?;
        Ok((customer_id, asset))
    }
}

/// Inclusive creation-time window for order listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, OrderError> {
        if from > to {
            return Err(OrderError::invalid_argument(format!(
                "date range start {} is after end {}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    /// Whether a Unix-nanosecond timestamp falls inside the window (both ends inclusive)
    pub fn contains(&self, created_at: i64) -> bool {
        let ts = DateTime::from_timestamp_nanos(created_at);
        self.from <= ts && ts <= self.to
    }
}
