//! End-to-end custody flows driven through the signed command surface
//!
//! Covers the full lifecycle (registry init, vault creation, deposit,
//! locked and unlocked withdrawal), the accounting laws (proportional
//! share issuance, round-trip equality), and adversarial cases
//! (re-initialization, duplicate registration, forged and tampered
//! signatures, authority escalation).

use custody::command::{sign_command, Command, SignedCommand};
use custody::dispatcher::{CommandDispatcher, ManualClock};
use custody::errors::{DispatchError, RegistryError, VaultError};
use custody::events::CustodyEvent;
use ed25519_dalek::SigningKey;
use types::ids::{self, AccountId, MintId};

const T0: i64 = 1_700_000_000;
const LOCK: i64 = 3600;

fn keypair(tag: u8) -> SigningKey {
    SigningKey::from_bytes(&[tag; 32])
}

fn account(key: &SigningKey) -> AccountId {
    AccountId::from_bytes(key.verifying_key().to_bytes())
}

fn usdc() -> MintId {
    MintId::from_bytes([1u8; 32])
}

fn wbtc() -> MintId {
    MintId::from_bytes([2u8; 32])
}

/// Engine with an initialized registry owned by `admin` (keypair 9).
fn setup() -> (CommandDispatcher, ManualClock, SigningKey) {
    let clock = ManualClock::new(T0);
    let mut engine = CommandDispatcher::with_clock(Box::new(clock.clone()));
    let admin = keypair(9);
    engine
        .execute(&sign_command(Command::InitCentralVault, &admin))
        .unwrap();
    (engine, clock, admin)
}

fn create_vault(engine: &mut CommandDispatcher, admin: &SigningKey, asset: MintId, lock: i64) {
    engine
        .execute(&sign_command(
            Command::CreateVault {
                asset_mint: asset,
                lock_period_seconds: lock,
            },
            admin,
        ))
        .unwrap();
}

fn fund(engine: &mut CommandDispatcher, asset: &MintId, key: &SigningKey, amount: u64) {
    engine.tokens_mut().mint(asset, &account(key), amount).unwrap();
}

fn deposit(engine: &mut CommandDispatcher, asset: &MintId, key: &SigningKey, amount: u64) {
    engine
        .execute(&sign_command(
            Command::DepositIntoVault {
                vault_address: ids::vault_address(asset),
                amount,
            },
            key,
        ))
        .unwrap();
}

fn withdraw(
    engine: &mut CommandDispatcher,
    asset: &MintId,
    key: &SigningKey,
    shares: u64,
) -> Result<Vec<CustodyEvent>, DispatchError> {
    engine.execute(&sign_command(
        Command::WithdrawFromVault {
            vault_address: ids::vault_address(asset),
            shares,
        },
        key,
    ))
}

// ═══════════════════════════════════════════════════════════════════
// Lifecycle
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_full_lifecycle_deposit_then_half_withdrawal() {
    let (mut engine, clock, admin) = setup();
    create_vault(&mut engine, &admin, usdc(), LOCK);

    let depositor = keypair(3);
    fund(&mut engine, &usdc(), &depositor, 100_000_000);
    deposit(&mut engine, &usdc(), &depositor, 100_000_000);

    let address = ids::vault_address(&usdc());
    assert_eq!(
        engine.exchange_rate(&address).unwrap(),
        (100_000_000, 100_000_000)
    );
    assert_eq!(
        engine
            .tokens()
            .balance_of(&ids::receipt_mint(&address), &account(&depositor)),
        100_000_000
    );

    // Inside the lock window the withdrawal names the violated gate.
    let result = withdraw(&mut engine, &usdc(), &depositor, 50_000_000);
    assert!(matches!(
        result,
        Err(DispatchError::Vault(VaultError::LockNotExpired { .. }))
    ));

    clock.advance(LOCK);
    withdraw(&mut engine, &usdc(), &depositor, 50_000_000).unwrap();

    assert_eq!(
        engine.exchange_rate(&address).unwrap(),
        (50_000_000, 50_000_000)
    );
    assert_eq!(
        engine.tokens().balance_of(&usdc(), &account(&depositor)),
        50_000_000
    );
    assert_eq!(
        engine
            .tokens()
            .balance_of(&ids::receipt_mint(&address), &account(&depositor)),
        50_000_000
    );
}

#[test]
fn test_round_trip_returns_exact_amount() {
    let (mut engine, clock, admin) = setup();
    create_vault(&mut engine, &admin, usdc(), LOCK);

    let depositor = keypair(3);
    fund(&mut engine, &usdc(), &depositor, 12_345_678);
    deposit(&mut engine, &usdc(), &depositor, 12_345_678);

    clock.advance(LOCK);
    withdraw(&mut engine, &usdc(), &depositor, 12_345_678).unwrap();

    // Rate was unchanged between deposit and withdrawal, so the round
    // trip is exact.
    assert_eq!(
        engine.tokens().balance_of(&usdc(), &account(&depositor)),
        12_345_678
    );
    assert_eq!(
        engine.exchange_rate(&ids::vault_address(&usdc())).unwrap(),
        (0, 0)
    );
}

#[test]
fn test_second_deposit_follows_proportional_law() {
    let (mut engine, _clock, admin) = setup();
    create_vault(&mut engine, &admin, usdc(), 0);

    let (alice, bob) = (keypair(3), keypair(4));
    let (amount_a, amount_b) = (1_000_003u64, 777_777u64);
    fund(&mut engine, &usdc(), &alice, amount_a);
    fund(&mut engine, &usdc(), &bob, amount_b);

    deposit(&mut engine, &usdc(), &alice, amount_a);
    let shares_a = amount_a; // bootstrap 1:1
    deposit(&mut engine, &usdc(), &bob, amount_b);

    let receipt = ids::receipt_mint(&ids::vault_address(&usdc()));
    let expected =
        (amount_b as u128 * shares_a as u128 / amount_a as u128) as u64;
    assert_eq!(
        engine.tokens().balance_of(&receipt, &account(&bob)),
        expected
    );
}

#[test]
fn test_deposits_accumulate_exactly() {
    let (mut engine, _clock, admin) = setup();
    create_vault(&mut engine, &admin, usdc(), 0);

    let depositor = keypair(3);
    fund(&mut engine, &usdc(), &depositor, 1_000);
    let address = ids::vault_address(&usdc());

    let mut expected_assets = 0u64;
    for amount in [137u64, 263, 600] {
        let (_, shares_before) = engine.exchange_rate(&address).unwrap();
        deposit(&mut engine, &usdc(), &depositor, amount);
        expected_assets += amount;
        let (assets_after, shares_after) = engine.exchange_rate(&address).unwrap();
        assert_eq!(assets_after, expected_assets);
        // At parity every deposit mints shares one to one.
        assert_eq!(shares_after, shares_before + amount);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Initialization and registration
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_reinitializing_registry_fails_and_keeps_state() {
    let (mut engine, _clock, admin) = setup();
    create_vault(&mut engine, &admin, usdc(), LOCK);

    let challenger = keypair(8);
    let result = engine.execute(&sign_command(Command::InitCentralVault, &challenger));
    assert_eq!(
        result,
        Err(DispatchError::Registry(RegistryError::AlreadyInitialized))
    );

    let registry = engine.registry().unwrap();
    assert_eq!(registry.authority(), &account(&admin));
    assert_eq!(registry.vault_count(), 1);
}

#[test]
fn test_reinitializing_vault_fails() {
    let (mut engine, _clock, admin) = setup();
    create_vault(&mut engine, &admin, usdc(), LOCK);

    let address = ids::vault_address(&usdc());
    let result = engine.execute(&sign_command(
        Command::InitIndividualVault {
            asset_mint: usdc(),
            receipt_mint: ids::receipt_mint(&address),
            lock_period_seconds: LOCK,
        },
        &admin,
    ));
    assert_eq!(
        result,
        Err(DispatchError::Vault(VaultError::AlreadyInitialized))
    );
}

#[test]
fn test_registry_membership_grows_by_one_per_add() {
    let (mut engine, _clock, admin) = setup();
    assert_eq!(engine.registry().unwrap().vault_count(), 0);

    let address = ids::vault_address(&usdc());
    let receipt = ids::receipt_mint(&address);
    engine
        .execute(&sign_command(
            Command::InitIndividualVault {
                asset_mint: usdc(),
                receipt_mint: receipt,
                lock_period_seconds: LOCK,
            },
            &admin,
        ))
        .unwrap();
    engine
        .execute(&sign_command(
            Command::AddVault {
                vault_address: address,
                asset_mint: usdc(),
                receipt_mint: receipt,
            },
            &admin,
        ))
        .unwrap();

    let registry = engine.registry().unwrap();
    assert_eq!(registry.vault_count(), 1);
    assert_eq!(registry.vault_addresses(), &[address]);

    // Second registration of the same address must not grow the list.
    let result = engine.execute(&sign_command(
        Command::AddVault {
            vault_address: address,
            asset_mint: usdc(),
            receipt_mint: receipt,
        },
        &admin,
    ));
    assert!(matches!(
        result,
        Err(DispatchError::Registry(RegistryError::DuplicateVault { .. }))
    ));
    assert_eq!(engine.registry().unwrap().vault_count(), 1);
}

#[test]
fn test_add_vault_rejects_wrong_mint_confirmation() {
    let (mut engine, _clock, admin) = setup();
    let address = ids::vault_address(&usdc());
    let receipt = ids::receipt_mint(&address);
    engine
        .execute(&sign_command(
            Command::InitIndividualVault {
                asset_mint: usdc(),
                receipt_mint: receipt,
                lock_period_seconds: LOCK,
            },
            &admin,
        ))
        .unwrap();

    let result = engine.execute(&sign_command(
        Command::AddVault {
            vault_address: address,
            asset_mint: wbtc(), // confirmation does not match the vault
            receipt_mint: receipt,
        },
        &admin,
    ));
    assert!(matches!(
        result,
        Err(DispatchError::Registry(RegistryError::MintMismatch { .. }))
    ));
    assert_eq!(engine.registry().unwrap().vault_count(), 0);
}

// ═══════════════════════════════════════════════════════════════════
// Authorization
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_non_authority_cannot_create_or_register() {
    let (mut engine, _clock, _admin) = setup();
    let eve = keypair(7);

    let result = engine.execute(&sign_command(
        Command::CreateVault {
            asset_mint: usdc(),
            lock_period_seconds: LOCK,
        },
        &eve,
    ));
    assert_eq!(
        result,
        Err(DispatchError::Registry(RegistryError::Unauthorized))
    );
    assert_eq!(engine.registry().unwrap().vault_count(), 0);
}

#[test]
fn test_tampered_command_is_unauthorized() {
    let (mut engine, _clock, admin) = setup();
    create_vault(&mut engine, &admin, usdc(), LOCK);
    let depositor = keypair(3);
    fund(&mut engine, &usdc(), &depositor, 1_000);

    let mut signed = sign_command(
        Command::DepositIntoVault {
            vault_address: ids::vault_address(&usdc()),
            amount: 10,
        },
        &depositor,
    );
    // Inflate the amount after signing.
    if let Command::DepositIntoVault { amount, .. } = &mut signed.command {
        *amount = 1_000;
    }

    assert_eq!(engine.execute(&signed), Err(DispatchError::Unauthorized));
    assert_eq!(
        engine.exchange_rate(&ids::vault_address(&usdc())).unwrap(),
        (0, 0)
    );
}

#[test]
fn test_stolen_signature_is_unauthorized() {
    let (mut engine, _clock, admin) = setup();

    // Eve replays the admin's signature under her own identity.
    let eve = keypair(7);
    let genuine = sign_command(
        Command::CreateVault {
            asset_mint: usdc(),
            lock_period_seconds: LOCK,
        },
        &admin,
    );
    let forged = SignedCommand {
        command: genuine.command.clone(),
        signer: account(&eve),
        signature: genuine.signature,
    };

    assert_eq!(engine.execute(&forged), Err(DispatchError::Unauthorized));
    assert_eq!(engine.registry().unwrap().vault_count(), 0);
}

#[test]
fn test_garbage_signature_is_unauthorized() {
    let (mut engine, _clock, admin) = setup();
    let mut signed = sign_command(
        Command::CreateVault {
            asset_mint: usdc(),
            lock_period_seconds: LOCK,
        },
        &admin,
    );
    signed.signature = "00".repeat(64);
    assert_eq!(engine.execute(&signed), Err(DispatchError::Unauthorized));
}

// ═══════════════════════════════════════════════════════════════════
// Locks
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_tranches_unlock_in_deposit_order() {
    let (mut engine, clock, admin) = setup();
    create_vault(&mut engine, &admin, usdc(), LOCK);

    let depositor = keypair(3);
    fund(&mut engine, &usdc(), &depositor, 300);

    deposit(&mut engine, &usdc(), &depositor, 100);
    clock.advance(600);
    deposit(&mut engine, &usdc(), &depositor, 200);

    // First tranche free, second still locked.
    clock.set(T0 + LOCK);
    withdraw(&mut engine, &usdc(), &depositor, 100).unwrap();
    let result = withdraw(&mut engine, &usdc(), &depositor, 200);
    assert_eq!(
        result,
        Err(DispatchError::Vault(VaultError::LockNotExpired {
            requested: 200,
            available_at: T0 + 600 + LOCK,
        }))
    );

    clock.set(T0 + 600 + LOCK);
    withdraw(&mut engine, &usdc(), &depositor, 200).unwrap();
    assert_eq!(
        engine.tokens().balance_of(&usdc(), &account(&depositor)),
        300
    );
}

#[test]
fn test_zero_lock_vault_redeems_immediately() {
    let (mut engine, _clock, admin) = setup();
    create_vault(&mut engine, &admin, usdc(), 0);

    let depositor = keypair(3);
    fund(&mut engine, &usdc(), &depositor, 500);
    deposit(&mut engine, &usdc(), &depositor, 500);
    withdraw(&mut engine, &usdc(), &depositor, 500).unwrap();
    assert_eq!(
        engine.tokens().balance_of(&usdc(), &account(&depositor)),
        500
    );
}

// ═══════════════════════════════════════════════════════════════════
// Aggregates and events
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_aggregates_track_all_registered_vaults() {
    let (mut engine, clock, admin) = setup();
    create_vault(&mut engine, &admin, usdc(), 0);
    create_vault(&mut engine, &admin, wbtc(), 0);

    let depositor = keypair(3);
    fund(&mut engine, &usdc(), &depositor, 900);
    fund(&mut engine, &wbtc(), &depositor, 100);
    deposit(&mut engine, &usdc(), &depositor, 900);
    deposit(&mut engine, &wbtc(), &depositor, 100);

    assert_eq!(engine.total_assets_across_vaults().unwrap(), 1_000);
    assert_eq!(engine.total_shares_across_vaults().unwrap(), 1_000);

    clock.advance(1);
    withdraw(&mut engine, &usdc(), &depositor, 400).unwrap();
    assert_eq!(engine.total_assets_across_vaults().unwrap(), 600);
    assert_eq!(engine.total_shares_across_vaults().unwrap(), 600);
}

#[test]
fn test_every_mutating_command_appends_events() {
    let (mut engine, clock, admin) = setup();
    assert_eq!(engine.events().len(), 1); // registry init

    create_vault(&mut engine, &admin, usdc(), LOCK); // created + registered
    assert_eq!(engine.events().len(), 3);

    let depositor = keypair(3);
    fund(&mut engine, &usdc(), &depositor, 100);
    deposit(&mut engine, &usdc(), &depositor, 100);
    assert_eq!(engine.events().len(), 4);

    clock.advance(LOCK);
    withdraw(&mut engine, &usdc(), &depositor, 100).unwrap();
    assert_eq!(engine.events().len(), 5);

    // Failed commands append nothing.
    let _ = withdraw(&mut engine, &usdc(), &depositor, 1);
    assert_eq!(engine.events().len(), 5);

    assert!(matches!(engine.events()[0], CustodyEvent::RegistryInitialized(_)));
    assert!(matches!(engine.events()[3], CustodyEvent::DepositMade(_)));
    assert!(matches!(engine.events()[4], CustodyEvent::WithdrawalMade(_)));
}
