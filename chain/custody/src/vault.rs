//! Individual vault: one asset pool, one receipt series, time-locked redemption
//!
//! A vault custodies a single fungible asset and issues proportional
//! receipt shares against deposits. Share pricing follows the floor rules
//! in [`crate::ledger`]. Withdrawals are gated by a per-deposit lock:
//! each deposit opens a tranche that unlocks `lock_period_seconds` later,
//! oldest tranche first. Receipt shares acquired by transfer rather than
//! deposit carry no lock.
//!
//! Every operation validates all preconditions before the first mutation,
//! so a failed call leaves the vault, the token book, and the caller's
//! balances exactly as they were.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use types::ids::{AccountId, Address, MintId};
use uuid::Uuid;

use crate::errors::VaultError;
use crate::events::{CustodyEvent, DepositMade, WithdrawalMade};
use crate::ledger;
use crate::token::TokenBook;

/// A deposit tranche still inside its lock window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositPosition {
    pub position_id: Uuid,
    pub shares: u64,
    pub deposited_at: i64,
    pub unlock_at: i64,
}

/// A single-asset custody pool issuing proportional receipt shares.
#[derive(Debug)]
pub struct IndividualVault {
    /// Derived address; also names the custody account holding the pool.
    address: Address,
    asset_mint: MintId,
    receipt_mint: MintId,
    central_vault_address: Address,
    total_assets: u64,
    total_shares: u64,
    lock_period_seconds: i64,
    created_at: i64,
    /// Locked tranches per depositor, oldest first. Dropped once expired.
    positions: HashMap<AccountId, VecDeque<DepositPosition>>,
    /// Set when an accounting invariant is observed broken; every
    /// subsequent operation refuses with `CorruptState`.
    halted: bool,
}

impl IndividualVault {
    /// Create a fresh vault with an empty pool.
    ///
    /// Address-collision checks (`AlreadyInitialized`) are the
    /// dispatcher's responsibility, since it owns the address space.
    pub fn new(
        address: Address,
        asset_mint: MintId,
        receipt_mint: MintId,
        central_vault_address: Address,
        lock_period_seconds: i64,
        created_at: i64,
    ) -> Self {
        Self {
            address,
            asset_mint,
            receipt_mint,
            central_vault_address,
            total_assets: 0,
            total_shares: 0,
            lock_period_seconds,
            created_at,
            positions: HashMap::new(),
            halted: false,
        }
    }

    // ───────────────────────── Accessors ─────────────────────────

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn asset_mint(&self) -> &MintId {
        &self.asset_mint
    }

    pub fn receipt_mint(&self) -> &MintId {
        &self.receipt_mint
    }

    pub fn central_vault_address(&self) -> &Address {
        &self.central_vault_address
    }

    pub fn total_assets(&self) -> u64 {
        self.total_assets
    }

    pub fn total_shares(&self) -> u64 {
        self.total_shares
    }

    pub fn lock_period_seconds(&self) -> i64 {
        self.lock_period_seconds
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Current pool state as `(total_assets, total_shares)`. Read-only.
    pub fn exchange_rate(&self) -> (u64, u64) {
        (self.total_assets, self.total_shares)
    }

    /// The custody account holding this vault's pooled assets.
    ///
    /// Shares the vault's derived address; derivation is domain-separated
    /// from verifying keys, so no external signer can collide with it.
    pub fn custody_account(&self) -> AccountId {
        AccountId::from_bytes(*self.address.as_bytes())
    }

    /// Shares of `depositor` still inside a lock window at `now`.
    pub fn locked_shares(&self, depositor: &AccountId, now: i64) -> u64 {
        self.positions
            .get(depositor)
            .map(|queue| {
                queue
                    .iter()
                    .filter(|p| p.unlock_at > now)
                    .map(|p| p.shares)
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Shares of `depositor` redeemable at `now`: receipt balance minus
    /// whatever is still locked. Transferred-in receipts are never locked.
    pub fn withdrawable_shares(&self, tokens: &TokenBook, depositor: &AccountId, now: i64) -> u64 {
        let balance = tokens.balance_of(&self.receipt_mint, depositor);
        // A depositor who transferred receipts away can hold less than
        // their locked total; nothing is withdrawable until tranches expire.
        balance.saturating_sub(self.locked_shares(depositor, now))
    }

    // ───────────────────────── Deposit ─────────────────────────

    /// Deposit `amount` of the vault's asset for `depositor`.
    ///
    /// Moves the asset into custody, mints proportional receipt shares,
    /// advances both pool counters, and opens a lock tranche. The three
    /// mutations apply together or not at all.
    pub fn deposit(
        &mut self,
        tokens: &mut TokenBook,
        depositor: AccountId,
        amount: u64,
        now: i64,
    ) -> Result<CustodyEvent, VaultError> {
        self.check_operational(tokens)?;
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let shares = ledger::shares_for_deposit(amount, self.total_assets, self.total_shares)?;

        // Reserve the post-state counters up front; every fallible step
        // must run before funds move.
        let new_total_assets = self
            .total_assets
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;
        let new_total_shares = self
            .total_shares
            .checked_add(shares)
            .ok_or(VaultError::Overflow)?;

        tokens.transfer(&self.asset_mint, &depositor, &self.custody_account(), amount)?;
        // Receipt supply equals total_shares (checked on entry) and the new
        // total fits u64, so this mint cannot fail after the transfer.
        tokens.mint(&self.receipt_mint, &depositor, shares)?;

        self.total_assets = new_total_assets;
        self.total_shares = new_total_shares;

        let mut position_id = None;
        if self.lock_period_seconds > 0 && shares > 0 {
            let position = DepositPosition {
                position_id: Uuid::now_v7(),
                shares,
                deposited_at: now,
                unlock_at: now + self.lock_period_seconds,
            };
            position_id = Some(position.position_id);
            self.positions.entry(depositor).or_default().push_back(position);
        }

        Ok(CustodyEvent::DepositMade(DepositMade {
            vault_address: self.address,
            depositor,
            amount,
            shares_minted: shares,
            position_id,
            deposited_at: now,
        }))
    }

    // ───────────────────────── Withdraw ─────────────────────────

    /// Redeem `shares` receipt shares for `withdrawer`.
    ///
    /// Requires the shares to be held, unlocked at `now`, and covered by
    /// pool liquidity. Burns the shares, returns the proportional assets,
    /// and decrements both counters.
    pub fn withdraw(
        &mut self,
        tokens: &mut TokenBook,
        withdrawer: AccountId,
        shares: u64,
        now: i64,
    ) -> Result<CustodyEvent, VaultError> {
        self.check_operational(tokens)?;
        if shares == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let balance = tokens.balance_of(&self.receipt_mint, &withdrawer);
        if balance < shares {
            return Err(VaultError::InsufficientShares {
                required: shares,
                available: balance,
            });
        }

        self.prune_expired(&withdrawer, now);
        let withdrawable = self.withdrawable_shares(tokens, &withdrawer, now);
        if withdrawable < shares {
            let needed = shares - withdrawable;
            return Err(VaultError::LockNotExpired {
                requested: shares,
                available_at: self.unlock_time_for(&withdrawer, needed, now),
            });
        }

        let assets = ledger::assets_for_withdrawal(shares, self.total_assets, self.total_shares)?;
        if assets > self.total_assets {
            return Err(VaultError::InsufficientLiquidity {
                required: assets,
                available: self.total_assets,
            });
        }

        // Balance and custody coverage were checked above; neither token
        // operation can fail past this point.
        tokens.burn(&self.receipt_mint, &withdrawer, shares)?;
        tokens.transfer(&self.asset_mint, &self.custody_account(), &withdrawer, assets)?;

        self.total_assets -= assets;
        self.total_shares -= shares;

        Ok(CustodyEvent::WithdrawalMade(WithdrawalMade {
            vault_address: self.address,
            withdrawer,
            shares_burned: shares,
            assets_returned: assets,
            withdrawn_at: now,
        }))
    }

    // ───────────────────────── Internal ─────────────────────────

    /// Refuse operation if halted or if the accounting invariants no
    /// longer hold; a fresh violation halts the vault permanently.
    fn check_operational(&mut self, tokens: &TokenBook) -> Result<(), VaultError> {
        if self.halted {
            return Err(VaultError::CorruptState);
        }
        let emptiness_broken = (self.total_shares == 0) != (self.total_assets == 0);
        let supply_drift = tokens.supply_of(&self.receipt_mint) != self.total_shares;
        let custody_drift =
            tokens.balance_of(&self.asset_mint, &self.custody_account()) != self.total_assets;
        if emptiness_broken || supply_drift || custody_drift {
            self.halted = true;
            tracing::error!(vault = %self.address, "accounting invariant violated, halting vault");
            return Err(VaultError::CorruptState);
        }
        Ok(())
    }

    /// Drop tranches whose lock window has passed.
    fn prune_expired(&mut self, depositor: &AccountId, now: i64) {
        if let Some(queue) = self.positions.get_mut(depositor) {
            queue.retain(|p| p.unlock_at > now);
            if queue.is_empty() {
                self.positions.remove(depositor);
            }
        }
    }

    /// Earliest time at which `needed` more shares unlock for `depositor`.
    fn unlock_time_for(&self, depositor: &AccountId, needed: u64, now: i64) -> i64 {
        let mut locked: Vec<&DepositPosition> = self
            .positions
            .get(depositor)
            .map(|queue| queue.iter().filter(|p| p.unlock_at > now).collect())
            .unwrap_or_default();
        locked.sort_by_key(|p| p.unlock_at);

        let mut remaining = needed;
        let mut latest = now;
        for position in locked {
            latest = position.unlock_at;
            if remaining <= position.shares {
                break;
            }
            remaining -= position.shares;
        }
        latest
    }
}
