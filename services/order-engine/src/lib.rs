//! Order Engine Service
//!
//! Order lifecycle on top of the balance ledger:
//! - create: reserve cash (BUY) or the asset (SELL), then record a PENDING order
//! - cancel: release the reservation, then mark the order CANCELED
//! - match: settle both legs, then mark the order MATCHED
//!
//! Plus the read-side projections (single order, per-customer listing with an
//! optional date window, pending queue) and balance queries.

pub mod clock;
pub mod config;
pub mod engine;
pub mod request;
pub mod store;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::EngineConfig;
pub use engine::{InMemoryOrderEngine, OrderEngine};
pub use request::{CreateOrderRequest, DateRange};
pub use store::{InMemoryOrderStore, OrderStore};
