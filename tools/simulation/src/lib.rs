//! Brokerage Simulation
//!
//! Deterministic driver for the ledger and order engine. Seeds balances,
//! runs scripted, randomized and contended order flows, cross-checks the
//! ledger against the order book after each step, and exports a JSON report.
//!
//! # Modules
//! - `config`: Simulation configuration and seed balances
//! - `audit`: Ledger vs. pending-order cross-check
//! - `scenarios`: Lifecycle, random flow and contention scenarios
//! - `export`: Report JSON export

pub mod audit;
pub mod config;
pub mod export;
pub mod scenarios;

/// Crate version constant
pub const VERSION: &str = "1.0.0";
