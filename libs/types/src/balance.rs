//! Balance types
//!
//! One record per (customer, asset). `usable` is the part not committed to a
//! pending order; the reserved part is always derived as `total - usable`.
//!
//! Invariant: 0 <= usable <= total

use crate::errors::LedgerError;
use crate::ids::{AssetName, BalanceKey, CustomerId};
use crate::numeric::ensure_positive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Balance for a single (customer, asset) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub customer_id: CustomerId,
    pub asset: AssetName,
    pub total: Decimal,
    pub usable: Decimal,
}

impl Balance {
    /// Create a new balance with everything usable
    pub fn new(customer_id: CustomerId, asset: AssetName, total: Decimal) -> Self {
        Self {
            customer_id,
            asset,
            total,
            usable: total,
        }
    }

    pub fn key(&self) -> BalanceKey {
        BalanceKey::new(self.customer_id.clone(), self.asset.clone())
    }

    /// Amount committed to pending orders
    pub fn reserved(&self) -> Decimal {
        self.total - self.usable
    }

    /// Check balance invariant: 0 <= usable <= total
    pub fn check_invariant(&self) -> bool {
        self.usable >= Decimal::ZERO && self.usable <= self.total
    }

    pub fn has_sufficient(&self, amount: Decimal) -> bool {
        self.usable >= amount
    }

    /// Move `amount` from usable to reserved.
    pub fn reserve(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        let amount = positive("reserve amount", amount)?;
        if !self.has_sufficient(amount) {
            return Err(LedgerError::InsufficientFunds {
                customer_id: self.customer_id.clone(),
                asset: self.asset.clone(),
                required: amount,
                available: self.usable,
            });
        }

        self.usable -= amount;
        Ok(())
    }

    /// Move `amount` from reserved back to usable, capped at `total`.
    ///
    /// Returns `true` when the cap engaged, i.e. more was released than was reserved.
    pub fn release(&mut self, amount: Decimal) -> Result<bool, LedgerError> {
        let amount = positive("release amount", amount)?;
        let released = self.usable.checked_add(amount).unwrap_or(Decimal::MAX);
        if released > self.total {
            self.usable = self.total;
            Ok(true)
        } else {
            self.usable = released;
            Ok(false)
        }
    }

    /// Credit `amount` to both total and usable.
    pub fn increase(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        let amount = positive("increase amount", amount)?;
        let total = self
            .total
            .checked_add(amount)
            .ok_or_else(|| LedgerError::invalid_state(format!("balance {} overflows", self.key())))?;

        self.total = total;
        self.usable += amount;
        Ok(())
    }

    /// Debit `amount` from both total and usable; usable is floored at zero.
    pub fn decrease(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        let amount = self.check_debit("decrease amount", amount)?;

        self.total -= amount;
        self.usable = (self.usable - amount).max(Decimal::ZERO);
        Ok(())
    }

    /// Debit `amount` for a settlement, drawing on the reserved part first.
    ///
    /// Only the portion not covered by the reservation reduces `usable`, so a
    /// settled order leaves no reservation behind.
    pub fn consume_reserved(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        let amount = self.check_debit("settlement amount", amount)?;
        let from_reserved = amount.min(self.reserved());

        self.total -= amount;
        self.usable -= amount - from_reserved;
        Ok(())
    }

    fn check_debit(&self, field: &'static str, amount: Decimal) -> Result<Decimal, LedgerError> {
        let amount = positive(field, amount)?;
        if amount > self.total {
            return Err(LedgerError::invalid_state(format!(
                "cannot debit {} from {}: total is {}",
                amount,
                self.key(),
                self.total
            )));
        }
        Ok(amount)
    }
}

fn positive(field: &'static str, amount: Decimal) -> Result<Decimal, LedgerError> {
    ensure_positive(field, amount).map_err(LedgerError::invalid_argument)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn cents() -> impl Strategy<Value = Decimal> {
        (1i64..=10_000_000).prop_map(|c| Decimal::new(c, 2))
    }

    proptest! {
        #[test]
        fn prop_debits_keep_usable_within_total(
            total in cents(),
            reserve in cents(),
            debit in cents(),
            settle in any::<bool>(),
        ) {
            let mut b = Balance::new(
                CustomerId::try_new("CUST001").unwrap(),
                AssetName::try_new("TRY").unwrap(),
                total,
            );
            let _ = b.reserve(reserve);
            let before = b.clone();

            let result = if settle { b.consume_reserved(debit) } else { b.decrease(debit) };
            match result {
                Ok(()) => prop_assert_eq!(b.total, before.total - debit),
                Err(_) => prop_assert_eq!(&b, &before),
            }
            prop_assert!(b.check_invariant());
        }
    }
}
