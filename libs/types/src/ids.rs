//! Identity types for custody entities
//!
//! Callers, token mints, and engine entities are all identified by 32-byte
//! values. Caller identities are Ed25519 verifying-key bytes; entity
//! addresses are derived from stable seeds with SHA-256, so the registry,
//! each vault, and each receipt mint can be located by recomputation alone.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Seed for the singleton registry address.
pub const REGISTRY_SEED: &str = "CentralVaultRegistry";

/// Seed for per-asset vault addresses.
pub const VAULT_SEED: &str = "IndividualVault";

/// Seed for per-vault receipt mint identities.
pub const RECEIPT_MINT_SEED: &str = "ReceiptMint";

/// Identity of a command signer.
///
/// Byte-compatible with an Ed25519 verifying key; the dispatcher rebuilds
/// the key from these bytes when checking a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId([u8; 32]);

impl AccountId {
    /// Create from raw verifying-key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Identity of a fungible token series (an asset mint or a receipt mint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MintId([u8; 32]);

impl MintId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for MintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Derived receipt mints live in the same identity space as addresses.
impl From<Address> for MintId {
    fn from(address: Address) -> Self {
        Self(address.0)
    }
}

/// Derived address of an engine entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address([u8; 32]);

impl Address {
    /// Derive an address from a seed and a sequence of inputs.
    ///
    /// Each component is length-prefixed before hashing, so distinct
    /// splits of the same concatenated bytes can never collide.
    pub fn derive(seed: &str, inputs: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((seed.len() as u64).to_le_bytes());
        hasher.update(seed.as_bytes());
        for input in inputs {
            hasher.update((input.len() as u64).to_le_bytes());
            hasher.update(input);
        }
        Self(hasher.finalize().into())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Address of the singleton central vault registry.
pub fn registry_address() -> Address {
    Address::derive(REGISTRY_SEED, &[])
}

/// Address of the vault custodying a given asset.
pub fn vault_address(asset_mint: &MintId) -> Address {
    Address::derive(VAULT_SEED, &[asset_mint.as_bytes()])
}

/// Receipt mint identity owned by a given vault.
pub fn receipt_mint(vault: &Address) -> MintId {
    MintId::from(Address::derive(RECEIPT_MINT_SEED, &[vault.as_bytes()]))
}
