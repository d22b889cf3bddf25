//! Base-unit / display-unit conversion.
//!
//! All arithmetic is exact: display amounts are `rust_decimal::Decimal`,
//! base amounts are `u64`. A display amount carrying precision below the
//! smallest base unit is rejected rather than rounded.

use rust_decimal::Decimal;

use crate::error::WalletError;

/// Decimals of the native coin (1 SOL = 10^9 lamports).
pub const NATIVE_DECIMALS: u8 = 9;

/// Lamports per SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Largest scale `Decimal` can represent.
pub const MAX_DECIMALS: u8 = 28;

/// Convert a display amount to integer base units.
///
/// Fails with `InvalidAmount` when the amount is negative, has a fractional
/// remainder below one base unit, or does not fit in a `u64`.
pub fn to_base_units(display: Decimal, decimals: u8) -> Result<u64, WalletError> {
    check_decimals(decimals)?;

    let normalized = display.normalize();
    let mantissa = normalized.mantissa();
    if mantissa < 0 {
        return Err(WalletError::InvalidAmount(format!(
            "negative amounts are not allowed: {display}"
        )));
    }

    let scale = normalized.scale();
    if scale > decimals as u32 {
        return Err(WalletError::InvalidAmount(format!(
            "{display} has more than {decimals} decimal places"
        )));
    }

    10i128
        .checked_pow(decimals as u32 - scale)
        .and_then(|factor| mantissa.checked_mul(factor))
        .and_then(|base| u64::try_from(base).ok())
        .ok_or_else(|| WalletError::InvalidAmount(format!("{display} overflows base units")))
}

/// Convert integer base units to a display amount with `decimals` places.
pub fn to_display_units(base: u64, decimals: u8) -> Result<Decimal, WalletError> {
    check_decimals(decimals)?;
    Ok(Decimal::from_i128_with_scale(base as i128, decimals as u32))
}

/// Convert a native display amount (SOL) to lamports.
pub fn sol_to_lamports(sol: Decimal) -> Result<u64, WalletError> {
    to_base_units(sol, NATIVE_DECIMALS)
}

/// Convert lamports to a native display amount (SOL).
pub fn lamports_to_sol(lamports: u64) -> Decimal {
    Decimal::from_i128_with_scale(lamports as i128, NATIVE_DECIMALS as u32)
}

fn check_decimals(decimals: u8) -> Result<(), WalletError> {
    if decimals > MAX_DECIMALS {
        return Err(WalletError::InvalidAmount(format!(
            "decimals {decimals} exceeds the supported maximum of {MAX_DECIMALS}"
        )));
    }
    Ok(())
}
