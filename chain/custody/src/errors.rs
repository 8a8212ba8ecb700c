//! Error taxonomy for the custody engine
//!
//! Every failure names the precondition that was violated, so a caller can
//! react correctly (wait out a lock, fund an account, fix a parameter)
//! instead of retrying blindly. `CorruptState` is the one fatal case: it
//! marks a broken accounting invariant and is never recoverable.

use thiserror::Error;

/// Share/asset conversion errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("Amount must be positive")]
    ZeroAmount,

    #[error("Arithmetic overflow narrowing a widened intermediate")]
    Overflow,

    #[error("Share supply and asset pool disagree on emptiness")]
    CorruptState,
}

/// Token book errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Insufficient balance of mint {mint}: required {required}, available {available}")]
    InsufficientBalance {
        mint: String,
        required: u64,
        available: u64,
    },

    #[error("Supply overflow for mint {mint}")]
    SupplyOverflow { mint: String },
}

/// Individual vault errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("Vault already initialized")]
    AlreadyInitialized,

    #[error("Amount must be positive")]
    ZeroAmount,

    #[error("Insufficient shares: required {required}, available {available}")]
    InsufficientShares { required: u64, available: u64 },

    #[error("Insufficient liquidity: withdrawal needs {required}, vault holds {available}")]
    InsufficientLiquidity { required: u64, available: u64 },

    #[error("Lock not expired: {requested} shares withdrawable at {available_at}")]
    LockNotExpired { requested: u64, available_at: i64 },

    #[error("Arithmetic overflow updating vault counters")]
    Overflow,

    #[error("Vault state is corrupt; operations halted")]
    CorruptState,

    #[error("Token book error: {0}")]
    Token(#[from] TokenError),
}

impl From<MathError> for VaultError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::ZeroAmount => VaultError::ZeroAmount,
            MathError::Overflow => VaultError::Overflow,
            MathError::CorruptState => VaultError::CorruptState,
        }
    }
}

/// Central registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Registry already initialized")]
    AlreadyInitialized,

    #[error("Registry not initialized")]
    NotInitialized,

    #[error("Unauthorized: caller is not the registry authority")]
    Unauthorized,

    #[error("Vault already registered: {vault}")]
    DuplicateVault { vault: String },

    #[error("Vault not found: {vault}")]
    VaultNotFound { vault: String },

    #[error("Mint confirmation mismatch for vault {vault}")]
    MintMismatch { vault: String },

    #[error("Vault {vault} belongs to a different registry")]
    ForeignVault { vault: String },

    #[error("Aggregate overflow summing vault totals")]
    AggregateOverflow,

    #[error("Registry state is corrupt")]
    CorruptState,
}

/// Dispatcher errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Unauthorized: missing or invalid signature")]
    Unauthorized,

    #[error("Vault not found: {vault}")]
    VaultNotFound { vault: String },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),
}
