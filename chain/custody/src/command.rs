//! Signed command envelope
//!
//! The external command layer submits operations as a `Command` plus the
//! signer's identity and an Ed25519 signature over the command digest.
//! Canonical bytes are the `serde_json` encoding of the envelope (struct
//! field order is fixed by declaration, so the encoding is deterministic);
//! the digest is SHA-256 of those bytes. Authentication is all this module
//! decides; business-rule validation belongs to the entities.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use types::ids::{AccountId, Address, MintId};

use crate::errors::DispatchError;

/// Operations accepted by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Create the singleton registry; the signer becomes its authority.
    InitCentralVault,
    /// Create a vault for `asset_mint` and register it, atomically.
    CreateVault {
        asset_mint: MintId,
        lock_period_seconds: i64,
    },
    /// Register an existing vault, confirming its mint pairing.
    AddVault {
        vault_address: Address,
        asset_mint: MintId,
        receipt_mint: MintId,
    },
    /// Create an unregistered vault at its derived address.
    InitIndividualVault {
        asset_mint: MintId,
        receipt_mint: MintId,
        lock_period_seconds: i64,
    },
    /// Deposit assets, receiving proportional receipt shares.
    DepositIntoVault { vault_address: Address, amount: u64 },
    /// Redeem receipt shares for assets once their lock has expired.
    WithdrawFromVault { vault_address: Address, shares: u64 },
}

impl Command {
    /// Operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::InitCentralVault => "initCentralVault",
            Command::CreateVault { .. } => "createVault",
            Command::AddVault { .. } => "addVault",
            Command::InitIndividualVault { .. } => "initIndividualVault",
            Command::DepositIntoVault { .. } => "depositIntoVault",
            Command::WithdrawFromVault { .. } => "withdrawFromVault",
        }
    }
}

/// A command plus the identity that signed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCommand {
    pub command: Command,
    /// Signer identity; also the Ed25519 verifying key.
    pub signer: AccountId,
    /// Ed25519 signature over the command digest, hex encoded.
    pub signature: String,
}

#[derive(Serialize)]
struct SigningEnvelope<'a> {
    command: &'a Command,
    signer: &'a AccountId,
}

/// SHA-256 digest of the canonical command bytes.
pub fn command_digest(command: &Command, signer: &AccountId) -> [u8; 32] {
    let envelope = SigningEnvelope { command, signer };
    let bytes =
        serde_json::to_vec(&envelope).expect("command envelope serialization must not fail");
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hasher.finalize().into()
}

/// Sign a command with an Ed25519 key.
pub fn sign_command(command: Command, key: &SigningKey) -> SignedCommand {
    let signer = AccountId::from_bytes(key.verifying_key().to_bytes());
    let digest = command_digest(&command, &signer);
    let signature = key.sign(&digest);
    SignedCommand {
        command,
        signer,
        signature: hex::encode(signature.to_bytes()),
    }
}

/// Verify a signed command's authenticity.
///
/// Any defect (malformed hex, wrong length, signer bytes that are not a
/// valid verifying key, or a signature that does not check out) collapses
/// to `Unauthorized`: the gate reports that the claimed identity did not
/// authorize this command, nothing more.
pub fn verify_command(signed: &SignedCommand) -> Result<(), DispatchError> {
    let sig_bytes = hex::decode(&signed.signature).map_err(|_| DispatchError::Unauthorized)?;
    let sig_bytes: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| DispatchError::Unauthorized)?;
    let verifying_key = VerifyingKey::from_bytes(signed.signer.as_bytes())
        .map_err(|_| DispatchError::Unauthorized)?;

    let digest = command_digest(&signed.command, &signed.signer);
    verifying_key
        .verify(&digest, &Signature::from_bytes(&sig_bytes))
        .map_err(|_| DispatchError::Unauthorized)
}
