//! Token book: fungible balances and supplies
//!
//! Balance tracking by (mint, holder) with a per-mint total supply. The
//! engine uses it for both sides of custody: asset series are credited by
//! external funding and moved into vault custody accounts on deposit;
//! receipt series are minted and burned exclusively by their owning vault.
//!
//! Supply is checked against `u64::MAX` at mint time and conserved by
//! `transfer`, so no credit can ever overflow a holder's balance.

use std::collections::HashMap;
use types::ids::{AccountId, MintId};

use crate::errors::TokenError;

/// Fungible token balances for every mint the engine touches.
#[derive(Debug, Default)]
pub struct TokenBook {
    /// Balances: (mint, holder) -> amount
    balances: HashMap<(MintId, AccountId), u64>,
    /// Outstanding supply per mint
    supply: HashMap<MintId, u64>,
}

impl TokenBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `holder` in `mint`.
    pub fn balance_of(&self, mint: &MintId, holder: &AccountId) -> u64 {
        self.balances.get(&(*mint, *holder)).copied().unwrap_or(0)
    }

    /// Outstanding supply of `mint`.
    pub fn supply_of(&self, mint: &MintId) -> u64 {
        self.supply.get(mint).copied().unwrap_or(0)
    }

    /// Create `amount` new units of `mint` for `to`.
    ///
    /// Checks the supply bound first; a balance bounded by a valid supply
    /// cannot itself overflow.
    pub fn mint(&mut self, mint: &MintId, to: &AccountId, amount: u64) -> Result<(), TokenError> {
        let supply = self.supply.entry(*mint).or_insert(0);
        let new_supply = supply
            .checked_add(amount)
            .ok_or_else(|| TokenError::SupplyOverflow {
                mint: mint.to_string(),
            })?;
        *supply = new_supply;

        // balance <= supply, which was just bounds-checked
        *self.balances.entry((*mint, *to)).or_insert(0) += amount;
        Ok(())
    }

    /// Destroy `amount` units of `mint` held by `from`.
    pub fn burn(&mut self, mint: &MintId, from: &AccountId, amount: u64) -> Result<(), TokenError> {
        let balance = self.balances.entry((*mint, *from)).or_insert(0);
        if *balance < amount {
            return Err(TokenError::InsufficientBalance {
                mint: mint.to_string(),
                required: amount,
                available: *balance,
            });
        }
        *balance -= amount;

        // per-mint supply is the sum of balances, so supply >= balance >= amount
        if let Some(supply) = self.supply.get_mut(mint) {
            *supply -= amount;
        }
        Ok(())
    }

    /// Move `amount` units of `mint` from `from` to `to`.
    ///
    /// Checks the debit before touching either balance; the credit cannot
    /// overflow because transfers conserve supply.
    pub fn transfer(
        &mut self,
        mint: &MintId,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), TokenError> {
        let available = self.balance_of(mint, from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                mint: mint.to_string(),
                required: amount,
                available,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        *self.balances.entry((*mint, *from)).or_insert(0) -= amount;
        *self.balances.entry((*mint, *to)).or_insert(0) += amount;
        Ok(())
    }
}
