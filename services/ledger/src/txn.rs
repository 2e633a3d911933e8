//! Ledger transactions
//!
//! A `LedgerTxn` holds the locks for a fixed set of balance keys, stages
//! every mutation in memory and writes all dirty records with a single
//! `upsert_all`. Dropping a transaction that was never committed discards
//! its changes. A committed transaction can still be rolled back while its
//! locks are held, which is how the order engine undoes a ledger change when
//! the matching order write fails.

use rust_decimal::Decimal;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use types::balance::Balance;
use types::errors::LedgerError;
use types::ids::{AssetName, BalanceKey, CustomerId};
use types::numeric::{ensure_positive, notional};
use types::order::Side;

use crate::locks::LockSet;
use crate::store::BalanceStore;

#[derive(Debug, Clone)]
struct Staged {
    original: Option<Balance>,
    current: Option<Balance>,
}

impl Staged {
    fn is_dirty(&self) -> bool {
        self.original != self.current
    }
}

/// Unit of work over a locked set of balance keys
pub struct LedgerTxn<'a, S: BalanceStore> {
    store: &'a S,
    cash_asset: &'a AssetName,
    locks: LockSet<BalanceKey>,
    staged: BTreeMap<BalanceKey, Staged>,
    committed: bool,
}

impl<'a, S: BalanceStore> LedgerTxn<'a, S> {
    pub(crate) fn new(store: &'a S, cash_asset: &'a AssetName, locks: LockSet<BalanceKey>) -> Self {
        Self {
            store,
            cash_asset,
            locks,
            staged: BTreeMap::new(),
            committed: false,
        }
    }

    /// Keys this transaction may touch
    pub fn keys(&self) -> &[BalanceKey] {
        self.locks.keys()
    }

    /// Current (staged) view of a balance
    pub fn balance(&mut self, key: &BalanceKey) -> Result<Option<Balance>, LedgerError> {
        Ok(self.slot(key)?.current.clone())
    }

    pub fn reserve(&mut self, key: &BalanceKey, amount: Decimal) -> Result<(), LedgerError> {
        self.existing(key)?.reserve(amount)
    }

    pub fn release(&mut self, key: &BalanceKey, amount: Decimal) -> Result<(), LedgerError> {
        let balance = self.existing(key)?;
        let clamped = balance.release(amount)?;
        if clamped {
            warn!(
                balance = %key,
                %amount,
                total = %balance.total,
                "release exceeded reserved amount; usable capped at total"
            );
        }
        Ok(())
    }

    /// Credit `amount`, creating the record when it does not exist yet.
    pub fn increase(&mut self, key: &BalanceKey, amount: Decimal) -> Result<(), LedgerError> {
        let slot = self.slot(key)?;
        match slot.current.as_mut() {
            Some(balance) => balance.increase(amount),
            None => {
                let amount =
                    ensure_positive("increase amount", amount).map_err(LedgerError::invalid_argument)?;
                slot.current = Some(Balance::new(
                    key.customer_id.clone(),
                    key.asset.clone(),
                    amount,
                ));
                Ok(())
            }
        }
    }

    pub fn decrease(&mut self, key: &BalanceKey, amount: Decimal) -> Result<(), LedgerError> {
        self.existing(key)?.decrease(amount)
    }

    /// Settle a matched order: debit the side that was reserved, credit the other.
    ///
    /// BUY pays `size * price` cash and receives `size` of the asset; SELL is
    /// the mirror image. The debit consumes the order's reservation.
    pub fn settle(
        &mut self,
        customer_id: &CustomerId,
        asset: &AssetName,
        side: Side,
        size: Decimal,
        price: Decimal,
    ) -> Result<(), LedgerError> {
        let value = notional(size, price).ok_or_else(|| {
            LedgerError::invalid_argument(format!("order value {} x {} overflows", size, price))
        })?;
        let asset_key = BalanceKey::new(customer_id.clone(), asset.clone());
        let cash_key = BalanceKey::new(customer_id.clone(), self.cash_asset.clone());

        let ((debit_key, debit), (credit_key, credit)) = match side {
            Side::BUY => ((cash_key, value), (asset_key, size)),
            Side::SELL => ((asset_key, size), (cash_key, value)),
        };

        self.existing(&debit_key)?.consume_reserved(debit)?;
        self.increase(&credit_key, credit)
    }

    /// Write every changed record in one batch. Locks stay held.
    pub fn commit(&mut self) -> Result<(), LedgerError> {
        if self.committed {
            return Err(LedgerError::invalid_state("ledger transaction already committed"));
        }

        let dirty: Vec<Balance> = self
            .staged
            .values()
            .filter(|staged| staged.is_dirty())
            .filter_map(|staged| staged.current.clone())
            .collect();
        if !dirty.is_empty() {
            self.store.upsert_all(&dirty)?;
        }

        self.committed = true;
        debug!(records = dirty.len(), "ledger transaction committed");
        Ok(())
    }

    /// Undo this transaction.
    ///
    /// Before commit this just discards staged changes. After commit it
    /// writes the original records back and removes the ones it created.
    pub fn rollback(&mut self) -> Result<(), LedgerError> {
        if !self.committed {
            self.staged.clear();
            return Ok(());
        }

        let mut restore = Vec::new();
        let mut created = Vec::new();
        for (key, staged) in self.staged.iter().filter(|(_, staged)| staged.is_dirty()) {
            match &staged.original {
                Some(original) => restore.push(original.clone()),
                None => created.push(key.clone()),
            }
        }

        if !restore.is_empty() {
            self.store.upsert_all(&restore)?;
        }
        for key in &created {
            self.store.remove(key)?;
        }

        warn!(
            restored = restore.len(),
            removed = created.len(),
            "committed ledger transaction rolled back"
        );
        self.staged.clear();
        self.committed = false;
        Ok(())
    }

    fn existing(&mut self, key: &BalanceKey) -> Result<&mut Balance, LedgerError> {
        self.slot(key)?
            .current
            .as_mut()
            .ok_or_else(|| LedgerError::AssetNotFound {
                customer_id: key.customer_id.clone(),
                asset: key.asset.clone(),
            })
    }

    fn slot(&mut self, key: &BalanceKey) -> Result<&mut Staged, LedgerError> {
        if !self.locks.covers(key) {
            return Err(LedgerError::invalid_state(format!(
                "balance {} is not locked by this transaction",
                key
            )));
        }
        if self.committed {
            return Err(LedgerError::invalid_state("ledger transaction already committed"));
        }

        match self.staged.entry(key.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let original = self.store.get(key)?;
                Ok(entry.insert(Staged {
                    current: original.clone(),
                    original,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::KeyedLocks;
    use crate::store::InMemoryBalanceStore;

    fn key(customer: &str, asset: &str) -> BalanceKey {
        BalanceKey::new(
            CustomerId::try_new(customer).unwrap(),
            AssetName::try_new(asset).unwrap(),
        )
    }

    fn funded(total: u64) -> InMemoryBalanceStore {
        let k = key("CUST001", "TRY");
        InMemoryBalanceStore::with_balances([Balance::new(
            k.customer_id,
            k.asset,
            Decimal::from(total),
        )])
    }

    #[test]
    fn test_uncommitted_changes_are_discarded() {
        let store = funded(100);
        let locks = KeyedLocks::new();
        let cash = AssetName::cash();
        let k = key("CUST001", "TRY");

        {
            let mut txn = LedgerTxn::new(&store, &cash, locks.lock(k.clone()));
            txn.reserve(&k, Decimal::from(40)).unwrap();
            assert_eq!(txn.balance(&k).unwrap().unwrap().usable, Decimal::from(60));
        }

        assert_eq!(store.get(&k).unwrap().unwrap().usable, Decimal::from(100));
    }

    #[test]
    fn test_commit_writes_dirty_records() {
        let store = funded(100);
        let locks = KeyedLocks::new();
        let cash = AssetName::cash();
        let k = key("CUST001", "TRY");

        let mut txn = LedgerTxn::new(&store, &cash, locks.lock(k.clone()));
        txn.reserve(&k, Decimal::from(40)).unwrap();
        txn.commit().unwrap();

        assert_eq!(store.get(&k).unwrap().unwrap().usable, Decimal::from(60));
        assert!(txn.commit().is_err(), "double commit is rejected");
        assert!(txn.reserve(&k, Decimal::ONE).is_err(), "no mutation after commit");
    }

    #[test]
    fn test_rollback_after_commit_restores_and_removes() {
        let store = funded(10000);
        let locks = KeyedLocks::new();
        let cash = AssetName::cash();
        let customer = CustomerId::try_new("CUST001").unwrap();
        let aapl = AssetName::try_new("AAPL").unwrap();
        let try_key = key("CUST001", "TRY");
        let aapl_key = key("CUST001", "AAPL");
        let before = store.snapshot();

        let mut txn = LedgerTxn::new(
            &store,
            &cash,
            locks.lock_all([try_key.clone(), aapl_key.clone()]),
        );
        txn.reserve(&try_key, Decimal::from(1500)).unwrap();
        txn.settle(&customer, &aapl, Side::BUY, Decimal::from(10), Decimal::from(150))
            .unwrap();
        txn.commit().unwrap();
        assert_eq!(store.get(&aapl_key).unwrap().unwrap().total, Decimal::from(10));

        txn.rollback().unwrap();
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_undeclared_key_is_rejected() {
        let store = funded(100);
        let locks = KeyedLocks::new();
        let cash = AssetName::cash();

        let mut txn = LedgerTxn::new(&store, &cash, locks.lock(key("CUST001", "TRY")));
        let err = txn.increase(&key("CUST001", "AAPL"), Decimal::ONE).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState { .. }));
    }

    #[test]
    fn test_settle_sell_credits_cash() {
        let k_aapl = key("CUST001", "AAPL");
        let store = InMemoryBalanceStore::with_balances([Balance::new(
            k_aapl.customer_id.clone(),
            k_aapl.asset.clone(),
            Decimal::from(50),
        )]);
        let locks = KeyedLocks::new();
        let cash = AssetName::cash();
        let k_try = key("CUST001", "TRY");

        let mut txn = LedgerTxn::new(&store, &cash, locks.lock_all([k_aapl.clone(), k_try.clone()]));
        txn.reserve(&k_aapl, Decimal::from(5)).unwrap();
        txn.settle(
            &k_aapl.customer_id,
            &k_aapl.asset,
            Side::SELL,
            Decimal::from(5),
            Decimal::from(200),
        )
        .unwrap();
        txn.commit().unwrap();

        let aapl = store.get(&k_aapl).unwrap().unwrap();
        assert_eq!(aapl.total, Decimal::from(45));
        assert_eq!(aapl.usable, Decimal::from(45));

        let cash_balance = store.get(&k_try).unwrap().unwrap();
        assert_eq!(cash_balance.total, Decimal::from(1000));
        assert_eq!(cash_balance.usable, Decimal::from(1000));
    }

    #[test]
    fn test_settle_without_debit_record_fails() {
        let store = InMemoryBalanceStore::new();
        let locks = KeyedLocks::new();
        let cash = AssetName::cash();
        let k_try = key("CUST009", "TRY");
        let k_aapl = key("CUST009", "AAPL");

        let mut txn = LedgerTxn::new(&store, &cash, locks.lock_all([k_try, k_aapl.clone()]));
        let err = txn
            .settle(&k_aapl.customer_id, &k_aapl.asset, Side::BUY, Decimal::ONE, Decimal::ONE)
            .unwrap_err();
        assert!(matches!(err, LedgerError::AssetNotFound { .. }));
    }
}
