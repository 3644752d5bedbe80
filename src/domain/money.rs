//! Monetary types and ledger precision.
//!
//! Amounts are exact decimals. The ledger keeps them as integer atoms with
//! [`ATOM_SCALE`] fractional digits (lamports for SOL), which lets the store
//! apply balance and pool changes as atomic SQL increments.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::error::DomainError;

/// Stake, balance, pool and payout amounts.
pub type Amount = Decimal;

/// Observed oracle values and targets (prices or market caps).
pub type Price = Decimal;

/// Fractional digits kept by the ledger.
pub const ATOM_SCALE: u32 = 9;

const ATOMS_PER_UNIT: i64 = 1_000_000_000;

/// Truncate an amount toward zero to ledger precision.
#[must_use]
pub fn truncate(amount: Amount) -> Amount {
    amount
        .round_dp_with_strategy(ATOM_SCALE, RoundingStrategy::ToZero)
        .normalize()
}

/// Convert an amount to integer atoms.
///
/// # Errors
/// Returns [`DomainError::InvalidAmount`] if the amount has more precision
/// than the ledger holds or does not fit in an `i64`.
pub fn to_atoms(amount: Amount) -> Result<i64, DomainError> {
    let scaled = amount
        .checked_mul(Decimal::from(ATOMS_PER_UNIT))
        .ok_or(DomainError::InvalidAmount { amount })?;
    if !scaled.fract().is_zero() {
        return Err(DomainError::InvalidAmount { amount });
    }
    scaled.to_i64().ok_or(DomainError::InvalidAmount { amount })
}

/// Convert integer atoms back into an amount.
#[must_use]
pub fn from_atoms(atoms: i64) -> Amount {
    Decimal::new(atoms, ATOM_SCALE).normalize()
}

/// Validate that an amount is a positive, ledger-representable stake.
///
/// # Errors
/// Returns [`DomainError::InvalidAmount`] otherwise.
pub fn ensure_positive(amount: Amount) -> Result<Amount, DomainError> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::InvalidAmount { amount });
    }
    to_atoms(amount)?;
    Ok(amount)
}
