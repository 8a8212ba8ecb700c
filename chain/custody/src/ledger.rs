//! Share accounting arithmetic
//!
//! Conversions between pooled asset amounts and receipt shares. Ratios are
//! computed in widened u128 intermediates and rounded down, so the
//! remainder of every conversion stays with the pool: the exchange rate
//! can drift up through rounding dust but never down.

use crate::errors::MathError;

/// Shares minted for depositing `amount` into a pool currently holding
/// `total_assets` against `total_shares` outstanding.
///
/// The first deposit into an empty pool bootstraps the rate at 1:1.
/// A positive amount small enough to floor to zero shares is a legal
/// outcome that favors the pool.
pub fn shares_for_deposit(
    amount: u64,
    total_assets: u64,
    total_shares: u64,
) -> Result<u64, MathError> {
    if amount == 0 {
        return Err(MathError::ZeroAmount);
    }
    if total_shares == 0 {
        // Empty pool must mean an empty share supply and vice versa.
        if total_assets != 0 {
            return Err(MathError::CorruptState);
        }
        return Ok(amount);
    }
    if total_assets == 0 {
        // Shares outstanding against an empty pool: accounting was broken
        // somewhere else, refuse to divide by it.
        return Err(MathError::CorruptState);
    }
    mul_div_floor(amount, total_shares, total_assets)
}

/// Assets returned for redeeming `shares` against the current pool.
///
/// Symmetric floor rule: the vault keeps the remainder, never the
/// withdrawing party.
pub fn assets_for_withdrawal(
    shares: u64,
    total_assets: u64,
    total_shares: u64,
) -> Result<u64, MathError> {
    if shares == 0 {
        return Err(MathError::ZeroAmount);
    }
    if total_shares == 0 {
        return Err(MathError::CorruptState);
    }
    mul_div_floor(shares, total_assets, total_shares)
}

/// floor((value * numerator) / denominator) with a u128 intermediate.
///
/// The product of two u64 values always fits in u128; only the narrowing
/// back to u64 can fail.
pub fn mul_div_floor(value: u64, numerator: u64, denominator: u64) -> Result<u64, MathError> {
    if denominator == 0 {
        return Err(MathError::CorruptState);
    }
    let product = (value as u128) * (numerator as u128);
    let result = product / (denominator as u128);
    u64::try_from(result).map_err(|_| MathError::Overflow)
}
