//! Simulation configuration
//!
//! Loaded from a JSON file, or defaulted to the sample book of two customers.

use order_engine::{EngineConfig, InMemoryOrderEngine};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use types::errors::LedgerError;
use types::ids::{AssetName, CustomerId};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Opening balance credited before any scenario runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedBalance {
    pub customer_id: CustomerId,
    pub asset: AssetName,
    pub amount: Decimal,
}

impl SeedBalance {
    pub fn new(customer_id: &str, asset: &str, amount: Decimal) -> Option<Self> {
        Some(Self {
            customer_id: CustomerId::try_new(customer_id)?,
            asset: AssetName::try_new(asset)?,
            amount,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub engine: EngineConfig,
    pub seed_balances: Vec<SeedBalance>,
    /// Seed for the random order flow
    pub rng_seed: u64,
    /// Steps in the random order flow
    pub random_steps: usize,
    /// Orders raced between match and cancel in the contention scenario
    pub contention_orders: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let seeds = [
            ("CUST001", "TRY", Decimal::new(1_000_000, 2)),
            ("CUST001", "AAPL", Decimal::new(5_000, 2)),
            ("CUST002", "TRY", Decimal::new(1_500_000, 2)),
        ];
        Self {
            engine: EngineConfig::default(),
            seed_balances: seeds
                .into_iter()
                .filter_map(|(customer, asset, amount)| SeedBalance::new(customer, asset, amount))
                .collect(),
            rng_seed: 42,
            random_steps: 500,
            contention_orders: 100,
        }
    }
}

impl SimulationConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Distinct seeded customers, in first-seen order
    pub fn customers(&self) -> Vec<CustomerId> {
        let mut customers: Vec<CustomerId> = Vec::new();
        for seed in &self.seed_balances {
            if !customers.contains(&seed.customer_id) {
                customers.push(seed.customer_id.clone());
            }
        }
        customers
    }

    /// Fresh in-memory engine with every seed balance deposited
    pub fn build_engine(&self) -> Result<InMemoryOrderEngine, LedgerError> {
        let engine = InMemoryOrderEngine::in_memory(self.engine.clone());
        for seed in &self.seed_balances {
            engine.deposit(&seed.customer_id, &seed.asset, seed.amount)?;
        }
        Ok(engine)
    }
}
