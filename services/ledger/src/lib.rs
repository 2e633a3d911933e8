//! Ledger Service
//!
//! Owns the per-(customer, asset) balance records and every mutation of
//! them: reserve, release, increase, decrease and match settlement.
//!
//! Mutations on the same key are serialized through a lock table; mutations
//! on different keys never wait on each other. Composite callers (the order
//! engine) open a [`LedgerTxn`] over the keys they need and commit all of
//! their changes with one store write.

pub mod locks;
pub mod store;
pub mod txn;
pub mod engine;

pub use engine::{Ledger, LedgerConfig};
pub use locks::{KeyedLocks, LockSet};
pub use store::{BalanceStore, InMemoryBalanceStore};
pub use txn::LedgerTxn;
