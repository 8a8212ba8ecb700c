//! Central vault registry: authoritative membership list and admin authority
//!
//! The registry is a singleton (its address is derived from a fixed seed)
//! holding the administrative authority and the append-ordered list of
//! registered vault addresses. Registration validates the caller against
//! the stored authority and the vault against the confirmation parameters
//! supplied by the caller, guarding against address confusion.

use types::ids::{AccountId, Address, MintId};

use crate::errors::RegistryError;
use crate::events::{CustodyEvent, VaultRegistered};
use crate::vault::IndividualVault;

/// The singleton registry of known vaults.
#[derive(Debug)]
pub struct CentralVaultRegistry {
    address: Address,
    authority: AccountId,
    /// Registered vaults in append order; enumeration order only.
    vault_addresses: Vec<Address>,
    created_at: i64,
}

impl CentralVaultRegistry {
    /// Create the registry with an empty vault list.
    ///
    /// Singleton enforcement (`AlreadyInitialized` on a second attempt) is
    /// the dispatcher's responsibility.
    pub fn new(address: Address, authority: AccountId, created_at: i64) -> Self {
        Self {
            address,
            authority,
            vault_addresses: Vec::new(),
            created_at,
        }
    }

    // ───────────────────────── Accessors ─────────────────────────

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn authority(&self) -> &AccountId {
        &self.authority
    }

    pub fn vault_addresses(&self) -> &[Address] {
        &self.vault_addresses
    }

    pub fn vault_count(&self) -> usize {
        self.vault_addresses.len()
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn is_registered(&self, vault_address: &Address) -> bool {
        self.vault_addresses.contains(vault_address)
    }

    // ───────────────────────── Registration ─────────────────────────

    /// Append an existing vault to the membership list.
    ///
    /// `asset_mint` and `receipt_mint` are confirmation parameters: they
    /// must match the vault actually stored at `vault_address`, and the
    /// vault's back-reference must point at this registry. All checks run
    /// before the append, so a failure leaves the list untouched.
    pub fn add_vault(
        &mut self,
        caller: &AccountId,
        vault_address: Address,
        vault: &IndividualVault,
        asset_mint: &MintId,
        receipt_mint: &MintId,
    ) -> Result<CustodyEvent, RegistryError> {
        if caller != &self.authority {
            return Err(RegistryError::Unauthorized);
        }
        if self.is_registered(&vault_address) {
            return Err(RegistryError::DuplicateVault {
                vault: vault_address.to_string(),
            });
        }
        if vault.central_vault_address() != &self.address {
            return Err(RegistryError::ForeignVault {
                vault: vault_address.to_string(),
            });
        }
        if vault.asset_mint() != asset_mint || vault.receipt_mint() != receipt_mint {
            return Err(RegistryError::MintMismatch {
                vault: vault_address.to_string(),
            });
        }

        self.vault_addresses.push(vault_address);

        Ok(CustodyEvent::VaultRegistered(VaultRegistered {
            vault_address,
            registry_address: self.address,
            vault_count: self.vault_addresses.len() as u32,
        }))
    }
}
