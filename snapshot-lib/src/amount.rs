//! Exact token arithmetic.
//!
//! Ledger naturals can exceed both 2^53 and 2^64 once multiplied by a reserve, so
//! amounts are arbitrary precision integers and every proportion is an exact
//! fraction until it is truncated to token units.

use fraction::{BigFraction, BigUint};
use std::str::FromStr;

pub type TokenAmount = BigUint;
pub type ExactAmount = BigFraction;

pub fn zero() -> ExactAmount {
    BigFraction::new(BigUint::default(), BigUint::from(1u8))
}

pub fn exact(amount: TokenAmount) -> ExactAmount {
    BigFraction::new(amount, BigUint::from(1u8))
}

pub fn is_zero(amount: &TokenAmount) -> bool {
    *amount == BigUint::default()
}

/// `shares / supply * reserve`, or `None` if `supply` is zero.
pub fn pro_rata(shares: ExactAmount, supply: &TokenAmount, reserve: &TokenAmount) -> Option<ExactAmount> {
    if is_zero(supply) {
        return None;
    }
    Some(shares * BigFraction::new(reserve.clone(), supply.clone()))
}

/// `amount / 10^decimals`
pub fn scale_down(amount: TokenAmount, decimals: u32) -> ExactAmount {
    let divisor = (0..decimals).fold(BigUint::from(1u8), |acc, _| acc * 10u8);
    BigFraction::new(amount, divisor)
}

/// Truncates toward zero. Amounts are never negative, so this is the floor.
pub fn floor(amount: &ExactAmount) -> Option<TokenAmount> {
    match (amount.numer(), amount.denom()) {
        (Some(numer), Some(denom)) if !is_zero(denom) => Some(numer / denom),
        _ => None,
    }
}

pub fn parse(value: &str) -> Option<TokenAmount> {
    BigUint::from_str(value.trim()).ok()
}
