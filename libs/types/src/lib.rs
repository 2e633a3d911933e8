//! Types library for the brokerage core
//!
//! Shared value types used by the ledger and the order engine, plus the
//! error taxonomy both of them report through.
//!
//! # Modules
//! - `ids`: Identifiers (CustomerId, AssetName, OrderId, BalanceKey)
//! - `numeric`: Exact decimal helpers for sizes, prices and notionals
//! - `balance`: Per-(customer, asset) balance record
//! - `order`: Order lifecycle types
//! - `errors`: Error taxonomy

pub mod ids;
pub mod numeric;
pub mod balance;
pub mod order;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::balance::*;
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
}
