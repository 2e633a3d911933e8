//! Ledger: public balance operations
//!
//! Every operation runs inside its own single- or two-key transaction, so it
//! is atomic with respect to other callers on the same (customer, asset).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::balance::Balance;
use types::errors::LedgerError;
use types::ids::{AssetName, BalanceKey, CustomerId};
use types::order::Side;

use crate::locks::KeyedLocks;
use crate::store::BalanceStore;
use crate::txn::LedgerTxn;

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Asset BUY orders pay with and SELL orders are paid in
    pub cash_asset: AssetName,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            cash_asset: AssetName::cash(),
        }
    }
}

/// Balance ledger over a pluggable store
pub struct Ledger<S: BalanceStore> {
    store: S,
    locks: KeyedLocks<BalanceKey>,
    config: LedgerConfig,
}

impl<S: BalanceStore> Ledger<S> {
    /// Create a ledger with default configuration
    pub fn new(store: S) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    /// Create a ledger with custom configuration
    pub fn with_config(store: S, config: LedgerConfig) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
            config,
        }
    }

    pub fn cash_asset(&self) -> &AssetName {
        &self.config.cash_asset
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Open a transaction holding the locks for `keys`.
    ///
    /// Blocks until every key is free. Keys outside the set cannot be touched
    /// through the returned transaction.
    pub fn begin(&self, keys: impl IntoIterator<Item = BalanceKey>) -> LedgerTxn<'_, S> {
        LedgerTxn::new(&self.store, &self.config.cash_asset, self.locks.lock_all(keys))
    }

    /// Keys a settlement for `customer_id` trading `asset` touches
    pub fn settlement_keys(&self, customer_id: &CustomerId, asset: &AssetName) -> [BalanceKey; 2] {
        [
            BalanceKey::new(customer_id.clone(), self.config.cash_asset.clone()),
            BalanceKey::new(customer_id.clone(), asset.clone()),
        ]
    }

    /// Move `amount` from usable to reserved.
    pub fn reserve(
        &self,
        customer_id: &CustomerId,
        asset: &AssetName,
        amount: Decimal,
    ) -> Result<Balance, LedgerError> {
        let balance = self.apply(customer_id, asset, |txn, key| txn.reserve(key, amount))?;
        debug!(customer = %customer_id, %asset, %amount, usable = %balance.usable, "reserved");
        Ok(balance)
    }

    /// Move `amount` from reserved back to usable, never past total.
    pub fn release(
        &self,
        customer_id: &CustomerId,
        asset: &AssetName,
        amount: Decimal,
    ) -> Result<Balance, LedgerError> {
        let balance = self.apply(customer_id, asset, |txn, key| txn.release(key, amount))?;
        debug!(customer = %customer_id, %asset, %amount, usable = %balance.usable, "released");
        Ok(balance)
    }

    /// Credit `amount`, creating the balance record on first credit.
    pub fn increase(
        &self,
        customer_id: &CustomerId,
        asset: &AssetName,
        amount: Decimal,
    ) -> Result<Balance, LedgerError> {
        let balance = self.apply(customer_id, asset, |txn, key| txn.increase(key, amount))?;
        debug!(customer = %customer_id, %asset, %amount, total = %balance.total, "increased");
        Ok(balance)
    }

    /// Debit `amount` from total and usable (usable floored at zero).
    pub fn decrease(
        &self,
        customer_id: &CustomerId,
        asset: &AssetName,
        amount: Decimal,
    ) -> Result<Balance, LedgerError> {
        let balance = self.apply(customer_id, asset, |txn, key| txn.decrease(key, amount))?;
        debug!(customer = %customer_id, %asset, %amount, total = %balance.total, "decreased");
        Ok(balance)
    }

    /// `usable >= amount`; a missing record counts as insufficient.
    pub fn has_sufficient(
        &self,
        customer_id: &CustomerId,
        asset: &AssetName,
        amount: Decimal,
    ) -> Result<bool, LedgerError> {
        let key = BalanceKey::new(customer_id.clone(), asset.clone());
        Ok(self
            .store
            .get(&key)?
            .is_some_and(|balance| balance.has_sufficient(amount)))
    }

    /// Settle one matched order in a single transaction over both legs.
    pub fn settle_match(
        &self,
        customer_id: &CustomerId,
        asset: &AssetName,
        side: Side,
        size: Decimal,
        price: Decimal,
    ) -> Result<(), LedgerError> {
        let mut txn = self.begin(self.settlement_keys(customer_id, asset));
        txn.settle(customer_id, asset, side, size, price)?;
        txn.commit()?;
        debug!(customer = %customer_id, %asset, %side, %size, %price, "settled");
        Ok(())
    }

    pub fn get_balance(
        &self,
        customer_id: &CustomerId,
        asset: &AssetName,
    ) -> Result<Balance, LedgerError> {
        let key = BalanceKey::new(customer_id.clone(), asset.clone());
        let _held = self.locks.lock(key.clone());
        self.store
            .get(&key)?
            .ok_or_else(|| LedgerError::AssetNotFound {
                customer_id: customer_id.clone(),
                asset: asset.clone(),
            })
    }

    /// Every balance of a customer, ordered by asset.
    ///
    /// All of the customer's keys are held while reading, so a settlement
    /// is seen either entirely or not at all.
    pub fn list_balances(&self, customer_id: &CustomerId) -> Result<Vec<Balance>, LedgerError> {
        loop {
            let keys: Vec<BalanceKey> = self
                .store
                .list_by_customer(customer_id)?
                .iter()
                .map(Balance::key)
                .collect();
            let _held = self.locks.lock_all(keys.iter().cloned());

            // A record created or removed before the locks were taken means
            // the key set is stale.
            let balances = self.store.list_by_customer(customer_id)?;
            if balances.iter().map(Balance::key).eq(keys.iter().cloned()) {
                return Ok(balances);
            }
        }
    }

    /// Number of balance keys currently locked or waited on
    pub fn locked_keys(&self) -> usize {
        self.locks.len()
    }

    fn apply<F>(
        &self,
        customer_id: &CustomerId,
        asset: &AssetName,
        op: F,
    ) -> Result<Balance, LedgerError>
    where
        F: FnOnce(&mut LedgerTxn<'_, S>, &BalanceKey) -> Result<(), LedgerError>,
    {
        let key = BalanceKey::new(customer_id.clone(), asset.clone());
        let mut txn = self.begin([key.clone()]);
        op(&mut txn, &key)?;
        let balance = txn
            .balance(&key)?
            .ok_or_else(|| LedgerError::invalid_state(format!("balance {} vanished", key)))?;
        txn.commit()?;
        Ok(balance)
    }
}
