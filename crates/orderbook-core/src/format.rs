//! Display formatting for raw on-chain amounts and price bounds.
//!
//! Everything here is integer fixed-point on `U256`. Token amounts with 18
//! decimals exceed the exact range of an `f64` long before they become
//! unusual, so floats are never involved.

use alloy_primitives::U256;

use crate::error::{IndexerError, Result};

/// Prices are quoted as 18-decimal fixed point by the exchange
pub const PRICE_DECIMALS: u8 = 18;

/// Fractional digits kept when displaying amounts
pub const DISPLAY_FRACTION_DIGITS: usize = 4;

/// Label used when neither price bound is set
pub const MARKET_LABEL: &str = "Market";

/// `10^exp`, or `None` when it does not fit in 256 bits
fn ten_pow(exp: u8) -> Option<U256> {
    U256::from(10u64).checked_pow(U256::from(exp))
}

/// Format a raw amount with the default display precision
pub fn format_amount(raw: U256, decimals: u8) -> String {
    format_amount_with(raw, decimals, DISPLAY_FRACTION_DIGITS)
}

/// Format a raw amount scaled by `decimals`, truncating (never rounding) to
/// `max_fraction_digits` and stripping trailing zeros.
pub fn format_amount_with(raw: U256, decimals: u8, max_fraction_digits: usize) -> String {
    if decimals == 0 {
        return raw.to_string();
    }

    // A scale past 2^256 exceeds every raw value, so it is all fraction
    let (whole, fraction) = match ten_pow(decimals) {
        Some(scale) => (raw / scale, raw % scale),
        None => (U256::ZERO, raw),
    };

    let mut digits = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    digits.truncate(max_fraction_digits.min(decimals as usize));
    let digits = digits.trim_end_matches('0');

    if digits.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, digits)
    }
}

/// Parse a human decimal string into a raw amount scaled by `decimals`
pub fn parse_amount(input: &str, decimals: u8) -> Result<U256> {
    let input = input.trim();
    if input.is_empty() {
        return Err(IndexerError::InvalidAmount("empty amount".to_string()));
    }

    let (whole, fraction) = match input.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (input, ""),
    };

    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(whole) || !is_digits(fraction) || (whole.is_empty() && fraction.is_empty()) {
        return Err(IndexerError::InvalidAmount(format!("not a decimal number: {input}")));
    }
    if fraction.len() > decimals as usize {
        return Err(IndexerError::InvalidAmount(format!(
            "{input} has more than {decimals} fractional digits"
        )));
    }

    let overflow = || IndexerError::InvalidAmount(format!("{input} overflows uint256"));
    let scale = ten_pow(decimals).ok_or_else(overflow)?;

    let whole = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).map_err(|_| overflow())?
    };
    let fraction = if fraction.is_empty() {
        U256::ZERO
    } else {
        let padding = ten_pow(decimals - fraction.len() as u8).ok_or_else(overflow)?;
        U256::from_str_radix(fraction, 10)
            .map_err(|_| overflow())?
            .checked_mul(padding)
            .ok_or_else(overflow)?
    };

    whole
        .checked_mul(scale)
        .and_then(|scaled| scaled.checked_add(fraction))
        .ok_or_else(overflow)
}

/// One side of an order's price range. Zero on chain means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceBound {
    Unbounded,
    At(U256),
}

impl PriceBound {
    pub fn from_raw(raw: U256) -> Self {
        if raw.is_zero() {
            Self::Unbounded
        } else {
            Self::At(raw)
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }
}

/// Display label for an order's `(min_price, max_price)` pair.
///
/// `(0, 0)` reads "Market", a missing lower bound reads "Market - max",
/// a missing upper bound reads "min - ∞".
pub fn price_range_label(min_price: U256, max_price: U256) -> String {
    match (PriceBound::from_raw(min_price), PriceBound::from_raw(max_price)) {
        (PriceBound::Unbounded, PriceBound::Unbounded) => MARKET_LABEL.to_string(),
        (PriceBound::Unbounded, PriceBound::At(max)) => {
            format!("{} - {}", MARKET_LABEL, format_amount(max, PRICE_DECIMALS))
        }
        (PriceBound::At(min), PriceBound::Unbounded) => {
            format!("{} - ∞", format_amount(min, PRICE_DECIMALS))
        }
        (PriceBound::At(min), PriceBound::At(max)) => format!(
            "{} - {}",
            format_amount(min, PRICE_DECIMALS),
            format_amount(max, PRICE_DECIMALS)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e18(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
    }

    #[test]
    fn test_format_truncates_and_strips() {
        assert_eq!(format_amount(e18(2000), 18), "2000");
        // 1.23456 -> truncated, not rounded
        let raw = U256::from(123_456u64) * U256::from(10u64).pow(U256::from(13u64));
        assert_eq!(format_amount(raw, 18), "1.2345");
        // 1.5 -> trailing zeros stripped
        assert_eq!(format_amount(U256::from(15u64) * U256::from(10u64).pow(U256::from(17u64)), 18), "1.5");
        // dust below display precision
        assert_eq!(format_amount(U256::from(1u64), 18), "0");
        assert_eq!(format_amount(U256::ZERO, 6), "0");
        assert_eq!(format_amount(U256::from(1_000_001u64), 6), "1");
        assert_eq!(format_amount(U256::from(42u64), 0), "42");
    }

    #[test]
    fn test_format_beyond_float_range() {
        // 123456789012345678901234567.891 with 18 decimals; an f64 would mangle the integer part
        let raw = U256::from_str_radix("123456789012345678901234567891000000000000000", 10).unwrap();
        assert_eq!(format_amount(raw, 18), "123456789012345678901234567.891");
        assert_eq!(format_amount(U256::MAX, 78), "0.1157");
        assert_eq!(format_amount(U256::MAX, 79), "0.0115");
        assert_eq!(format_amount(U256::MAX, 81), "0.0001");
        assert_eq!(format_amount(U256::MAX, 82), "0");
        assert_eq!(format_amount(U256::MAX, 100), "0");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("2000", 18).unwrap(), e18(2000));
        assert_eq!(parse_amount("1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(parse_amount(".25", 2).unwrap(), U256::from(25u64));
        assert_eq!(parse_amount("7.", 2).unwrap(), U256::from(700u64));
        assert!(parse_amount("1.234", 2).is_err());
        assert!(parse_amount("abc", 18).is_err());
        assert!(parse_amount("1.2.3", 18).is_err());
        assert!(parse_amount(".", 18).is_err());
        assert!(parse_amount("", 18).is_err());
    }

    #[test]
    fn test_price_range_labels() {
        assert_eq!(price_range_label(U256::ZERO, U256::ZERO), "Market");
        assert_eq!(price_range_label(U256::ZERO, e18(2000)), "Market - 2000");
        assert_eq!(price_range_label(e18(1500), U256::ZERO), "1500 - ∞");
        assert_eq!(price_range_label(e18(1500), e18(2000)), "1500 - 2000");
    }

    #[test]
    fn test_price_bound() {
        assert!(PriceBound::from_raw(U256::ZERO).is_unbounded());
        assert_eq!(PriceBound::from_raw(U256::from(5u64)), PriceBound::At(U256::from(5u64)));
    }
}
