//! Custody events
//!
//! Immutable records emitted by engine operations. The dispatcher appends
//! one event per successful mutating command (two for the composite
//! create-and-register), giving external tooling a replayable audit trail.

use serde::{Deserialize, Serialize};
use types::ids::{AccountId, Address, MintId};
use uuid::Uuid;

/// The singleton registry was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryInitialized {
    pub registry_address: Address,
    pub authority: AccountId,
    pub created_at: i64,
}

/// An individual vault was initialized (registered or not).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultCreated {
    pub vault_address: Address,
    pub asset_mint: MintId,
    pub receipt_mint: MintId,
    pub lock_period_seconds: i64,
    pub created_at: i64,
}

/// A vault was appended to the registry's membership list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRegistered {
    pub vault_address: Address,
    pub registry_address: Address,
    /// Membership list length after the append.
    pub vault_count: u32,
}

/// Assets entered custody and receipt shares were minted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositMade {
    pub vault_address: Address,
    pub depositor: AccountId,
    pub amount: u64,
    pub shares_minted: u64,
    /// Lock tranche created by this deposit, if the vault enforces a lock.
    pub position_id: Option<Uuid>,
    pub deposited_at: i64,
}

/// Receipt shares were burned and assets returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalMade {
    pub vault_address: Address,
    pub withdrawer: AccountId,
    pub shares_burned: u64,
    pub assets_returned: u64,
    pub withdrawn_at: i64,
}

/// Enum wrapper for all custody events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustodyEvent {
    RegistryInitialized(RegistryInitialized),
    VaultCreated(VaultCreated),
    VaultRegistered(VaultRegistered),
    DepositMade(DepositMade),
    WithdrawalMade(WithdrawalMade),
}
