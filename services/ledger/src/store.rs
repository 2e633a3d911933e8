//! Balance store interface and the in-memory implementation
//!
//! The ledger never assumes anything about how balances are persisted; it
//! only needs point lookups, a per-customer listing and a batch write that
//! lands completely or not at all.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use types::balance::Balance;
use types::errors::StoreError;
use types::ids::{AssetName, BalanceKey, CustomerId};

/// Storage collaborator for balance records
pub trait BalanceStore: Send + Sync {
    /// Point lookup by (customer, asset)
    fn get(&self, key: &BalanceKey) -> Result<Option<Balance>, StoreError>;

    /// All balances of one customer, ordered by asset name
    fn list_by_customer(&self, customer_id: &CustomerId) -> Result<Vec<Balance>, StoreError>;

    /// Insert or replace every record in `balances`, or none of them.
    fn upsert_all(&self, balances: &[Balance]) -> Result<(), StoreError>;

    /// Delete a record. Only used to undo a record created by a transaction
    /// that is being rolled back.
    fn remove(&self, key: &BalanceKey) -> Result<(), StoreError>;

    fn upsert(&self, balance: &Balance) -> Result<(), StoreError> {
        self.upsert_all(std::slice::from_ref(balance))
    }
}

/// Thread-safe in-memory balance store
///
/// A batch is applied under one write lock, so readers never observe half of it.
#[derive(Debug, Default)]
pub struct InMemoryBalanceStore {
    balances: RwLock<HashMap<CustomerId, BTreeMap<AssetName, Balance>>>,
}

impl InMemoryBalanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `balances`
    pub fn with_balances(balances: impl IntoIterator<Item = Balance>) -> Self {
        let store = Self::new();
        {
            let mut map = store.balances.write();
            for balance in balances {
                map.entry(balance.customer_id.clone())
                    .or_default()
                    .insert(balance.asset.clone(), balance);
            }
        }
        store
    }

    /// Every record in the store, ordered by (customer, asset)
    pub fn snapshot(&self) -> Vec<Balance> {
        let map = self.balances.read();
        let mut all: Vec<Balance> = map.values().flat_map(|assets| assets.values().cloned()).collect();
        all.sort_by(|a, b| a.key().cmp(&b.key()));
        all
    }
}

impl BalanceStore for InMemoryBalanceStore {
    fn get(&self, key: &BalanceKey) -> Result<Option<Balance>, StoreError> {
        Ok(self
            .balances
            .read()
            .get(&key.customer_id)
            .and_then(|assets| assets.get(&key.asset))
            .cloned())
    }

    fn list_by_customer(&self, customer_id: &CustomerId) -> Result<Vec<Balance>, StoreError> {
        Ok(self
            .balances
            .read()
            .get(customer_id)
            .map(|assets| assets.values().cloned().collect())
            .unwrap_or_default())
    }

    fn upsert_all(&self, balances: &[Balance]) -> Result<(), StoreError> {
        let mut map = self.balances.write();
        for balance in balances {
            map.entry(balance.customer_id.clone())
                .or_default()
                .insert(balance.asset.clone(), balance.clone());
        }
        Ok(())
    }

    fn remove(&self, key: &BalanceKey) -> Result<(), StoreError> {
        let mut map = self.balances.write();
        if let Some(assets) = map.get_mut(&key.customer_id) {
            assets.remove(&key.asset);
            if assets.is_empty() {
                map.remove(&key.customer_id);
            }
        }
        Ok(())
    }
}
