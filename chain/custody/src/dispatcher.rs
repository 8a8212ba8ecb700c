//! Command dispatcher: authentication gate and entity orchestration
//!
//! Owns every entity in the deployment: the singleton registry, the vaults
//! keyed by derived address, the token book, and the append-only event
//! log. `execute` authenticates the signer, stamps the command with the
//! trusted clock, and routes to the target entity. Business rules stay
//! with the entities; the dispatcher only decides authenticity and
//! addressing.
//!
//! All mutation goes through `&mut self`, so one command at a time touches
//! the deployment and aggregate queries always observe a consistent
//! snapshot of every vault.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use types::ids::{self, AccountId, Address, MintId};

use crate::command::{self, Command, SignedCommand};
use crate::errors::{DispatchError, RegistryError, VaultError};
use crate::events::{CustodyEvent, RegistryInitialized, VaultCreated};
use crate::registry::CentralVaultRegistry;
use crate::token::TokenBook;
use crate::vault::IndividualVault;

/// Trusted time source for the engine.
///
/// Timestamps always come from here, never from command parameters.
pub trait Clock {
    /// Current unix time in seconds.
    fn now(&self) -> i64;
}

/// Wall clock used in production.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Settable clock for tests and deterministic replay.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start)),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// The command execution surface of a custody deployment.
pub struct CommandDispatcher {
    registry: Option<CentralVaultRegistry>,
    vaults: HashMap<Address, IndividualVault>,
    tokens: TokenBook,
    /// Emitted events log (append-only)
    events: Vec<CustodyEvent>,
    clock: Box<dyn Clock>,
}

impl CommandDispatcher {
    /// Create a dispatcher on the system wall clock.
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    /// Create a dispatcher on an explicit clock.
    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            registry: None,
            vaults: HashMap::new(),
            tokens: TokenBook::new(),
            events: Vec::new(),
            clock,
        }
    }

    // ───────────────────────── Execution ─────────────────────────

    /// Authenticate and execute a signed command.
    ///
    /// Returns the events the command produced (one, or two for the
    /// composite `CreateVault`); the same events are appended to the log.
    /// On any error no state is mutated.
    pub fn execute(&mut self, signed: &SignedCommand) -> Result<Vec<CustodyEvent>, DispatchError> {
        command::verify_command(signed)?;
        let now = self.clock.now();
        debug!(
            command = signed.command.name(),
            signer = %signed.signer,
            "executing command"
        );
        let events = self.apply(&signed.command, &signed.signer, now)?;
        self.events.extend(events.iter().cloned());
        Ok(events)
    }

    fn apply(
        &mut self,
        command: &Command,
        signer: &AccountId,
        now: i64,
    ) -> Result<Vec<CustodyEvent>, DispatchError> {
        match command {
            Command::InitCentralVault => self.init_central_vault(*signer, now),
            Command::CreateVault {
                asset_mint,
                lock_period_seconds,
            } => self.create_vault(signer, asset_mint, *lock_period_seconds, now),
            Command::AddVault {
                vault_address,
                asset_mint,
                receipt_mint,
            } => self.add_vault(signer, *vault_address, asset_mint, receipt_mint),
            Command::InitIndividualVault {
                asset_mint,
                receipt_mint,
                lock_period_seconds,
            } => self.init_individual_vault(asset_mint, receipt_mint, *lock_period_seconds, now),
            Command::DepositIntoVault {
                vault_address,
                amount,
            } => self.deposit(*signer, vault_address, *amount, now),
            Command::WithdrawFromVault {
                vault_address,
                shares,
            } => self.withdraw(*signer, vault_address, *shares, now),
        }
    }

    // ───────────────────────── Handlers ─────────────────────────

    fn init_central_vault(
        &mut self,
        authority: AccountId,
        now: i64,
    ) -> Result<Vec<CustodyEvent>, DispatchError> {
        if self.registry.is_some() {
            return Err(RegistryError::AlreadyInitialized.into());
        }
        let address = ids::registry_address();
        self.registry = Some(CentralVaultRegistry::new(address, authority, now));
        info!(registry = %address, authority = %authority, "central vault registry initialized");
        Ok(vec![CustodyEvent::RegistryInitialized(RegistryInitialized {
            registry_address: address,
            authority,
            created_at: now,
        })])
    }

    fn init_individual_vault(
        &mut self,
        asset_mint: &MintId,
        receipt_mint: &MintId,
        lock_period_seconds: i64,
        now: i64,
    ) -> Result<Vec<CustodyEvent>, DispatchError> {
        let address = ids::vault_address(asset_mint);
        if self.vaults.contains_key(&address) {
            return Err(VaultError::AlreadyInitialized.into());
        }
        // The receipt mint is derivable; the parameter is a confirmation
        // against address confusion, same as registration.
        let derived_receipt = ids::receipt_mint(&address);
        if receipt_mint != &derived_receipt {
            return Err(RegistryError::MintMismatch {
                vault: address.to_string(),
            }
            .into());
        }

        let vault = IndividualVault::new(
            address,
            *asset_mint,
            derived_receipt,
            ids::registry_address(),
            lock_period_seconds,
            now,
        );
        let event = CustodyEvent::VaultCreated(VaultCreated {
            vault_address: address,
            asset_mint: *asset_mint,
            receipt_mint: derived_receipt,
            lock_period_seconds,
            created_at: now,
        });
        info!(vault = %address, asset = %asset_mint, "individual vault initialized");
        self.vaults.insert(address, vault);
        Ok(vec![event])
    }

    fn create_vault(
        &mut self,
        caller: &AccountId,
        asset_mint: &MintId,
        lock_period_seconds: i64,
        now: i64,
    ) -> Result<Vec<CustodyEvent>, DispatchError> {
        let Some(registry) = self.registry.as_mut() else {
            return Err(RegistryError::NotInitialized.into());
        };
        let address = ids::vault_address(asset_mint);
        if self.vaults.contains_key(&address) {
            return Err(VaultError::AlreadyInitialized.into());
        }

        let receipt = ids::receipt_mint(&address);
        let vault = IndividualVault::new(
            address,
            *asset_mint,
            receipt,
            *registry.address(),
            lock_period_seconds,
            now,
        );

        // Registration is validated before the vault is stored, so a
        // failure here leaves nothing half-created.
        let registered = registry.add_vault(caller, address, &vault, asset_mint, &receipt)?;
        let created = CustodyEvent::VaultCreated(VaultCreated {
            vault_address: address,
            asset_mint: *asset_mint,
            receipt_mint: receipt,
            lock_period_seconds,
            created_at: now,
        });
        info!(vault = %address, asset = %asset_mint, "vault created and registered");
        self.vaults.insert(address, vault);
        Ok(vec![created, registered])
    }

    fn add_vault(
        &mut self,
        caller: &AccountId,
        vault_address: Address,
        asset_mint: &MintId,
        receipt_mint: &MintId,
    ) -> Result<Vec<CustodyEvent>, DispatchError> {
        let Some(registry) = self.registry.as_mut() else {
            return Err(RegistryError::NotInitialized.into());
        };
        let Some(vault) = self.vaults.get(&vault_address) else {
            return Err(RegistryError::VaultNotFound {
                vault: vault_address.to_string(),
            }
            .into());
        };
        let event = registry.add_vault(caller, vault_address, vault, asset_mint, receipt_mint)?;
        info!(vault = %vault_address, "vault registered");
        Ok(vec![event])
    }

    fn deposit(
        &mut self,
        depositor: AccountId,
        vault_address: &Address,
        amount: u64,
        now: i64,
    ) -> Result<Vec<CustodyEvent>, DispatchError> {
        let Some(vault) = self.vaults.get_mut(vault_address) else {
            return Err(DispatchError::VaultNotFound {
                vault: vault_address.to_string(),
            });
        };
        let event = vault.deposit(&mut self.tokens, depositor, amount, now)?;
        debug!(vault = %vault_address, depositor = %depositor, amount, "deposit applied");
        Ok(vec![event])
    }

    fn withdraw(
        &mut self,
        withdrawer: AccountId,
        vault_address: &Address,
        shares: u64,
        now: i64,
    ) -> Result<Vec<CustodyEvent>, DispatchError> {
        let Some(vault) = self.vaults.get_mut(vault_address) else {
            return Err(DispatchError::VaultNotFound {
                vault: vault_address.to_string(),
            });
        };
        let event = vault.withdraw(&mut self.tokens, withdrawer, shares, now)?;
        debug!(vault = %vault_address, withdrawer = %withdrawer, shares, "withdrawal applied");
        Ok(vec![event])
    }

    // ───────────────────────── Queries ─────────────────────────

    /// The registry, if initialized.
    pub fn registry(&self) -> Option<&CentralVaultRegistry> {
        self.registry.as_ref()
    }

    /// Look up a vault by derived address.
    pub fn vault(&self, address: &Address) -> Option<&IndividualVault> {
        self.vaults.get(address)
    }

    /// Pool state of a vault as `(total_assets, total_shares)`.
    pub fn exchange_rate(&self, address: &Address) -> Result<(u64, u64), DispatchError> {
        self.vaults
            .get(address)
            .map(IndividualVault::exchange_rate)
            .ok_or_else(|| DispatchError::VaultNotFound {
                vault: address.to_string(),
            })
    }

    /// Sum of `total_assets` over every registered vault.
    ///
    /// Reads one consistent snapshot: the dispatcher owns all vaults and
    /// no command can interleave with this borrow.
    pub fn total_assets_across_vaults(&self) -> Result<u64, RegistryError> {
        self.sum_registered(IndividualVault::total_assets)
    }

    /// Sum of `total_shares` over every registered vault.
    pub fn total_shares_across_vaults(&self) -> Result<u64, RegistryError> {
        self.sum_registered(IndividualVault::total_shares)
    }

    fn sum_registered(&self, field: fn(&IndividualVault) -> u64) -> Result<u64, RegistryError> {
        let Some(registry) = &self.registry else {
            return Err(RegistryError::NotInitialized);
        };
        registry
            .vault_addresses()
            .iter()
            .try_fold(0u64, |acc, address| {
                // A registered address without a vault means the membership
                // list and the vault set disagree.
                let vault = self
                    .vaults
                    .get(address)
                    .ok_or(RegistryError::CorruptState)?;
                acc.checked_add(field(vault))
                    .ok_or(RegistryError::AggregateOverflow)
            })
    }

    /// Token book access for external funding and balance assertions.
    pub fn tokens(&self) -> &TokenBook {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut TokenBook {
        &mut self.tokens
    }

    /// Get all emitted events.
    pub fn events(&self) -> &[CustodyEvent] {
        &self.events
    }

    /// Drain all events (consume and clear).
    pub fn drain_events(&mut self) -> Vec<CustodyEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
