//! Share-Accounting Custody Engine
//!
//! This crate implements the custody core for a registry of asset vaults:
//! each vault pools one fungible asset, issues proportional receipt shares
//! on deposit, and redeems them on withdrawal once a per-deposit time lock
//! has expired.
//!
//! # Modules
//! - `errors`: error taxonomy, one enum per concern
//! - `events`: custody events emitted by engine operations
//! - `ledger`: share/asset conversion arithmetic
//! - `token`: fungible balance book (assets and receipt series)
//! - `vault`: individual vault entity
//! - `registry`: central vault registry entity
//! - `command`: signed command envelope and the Ed25519 gate
//! - `dispatcher`: authentication, routing, and the trusted clock
//!
//! # Version
//! v0.1.0

pub mod command;
pub mod dispatcher;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod registry;
pub mod token;
pub mod vault;

/// Engine ABI version, frozen after release
pub const ENGINE_ABI_VERSION: &str = "1.0.0";
