//! Conversion between the chain's smallest unit and display units.

use alloy::primitives::U256;
use thiserror::Error;

/// Decimals of the native display unit (ether).
pub const ETHER_DECIMALS: u32 = 18;

/// Errors from unit parsing.
#[derive(Debug, Error)]
pub enum UnitsError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

/// Wei in one ether.
pub fn wei_per_ether() -> U256 {
    U256::from(10u64).pow(U256::from(ETHER_DECIMALS))
}

/// Parse a decimal string (e.g. "1.5") into a U256 with the given number of
/// decimals.
///
/// `parse_units("1.5", 18)` is `1_500_000_000_000_000_000` wei.
pub fn parse_units(amount: &str, decimals: u32) -> Result<U256, UnitsError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(UnitsError::InvalidAmount("empty amount".to_string()));
    }

    let (integer, fractional) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };

    if fractional.len() > decimals as usize {
        return Err(UnitsError::InvalidAmount(format!(
            "too many decimal places: got {}, max {decimals}",
            fractional.len()
        )));
    }

    // Pad the fractional part to `decimals` digits and combine with the
    // integer part into a single integer string.
    let padded = format!("{fractional:0<width$}", width = decimals as usize);
    let combined = format!("{integer}{padded}");

    // Strip leading zeros but keep at least "0".
    let combined = combined.trim_start_matches('0');
    let combined = if combined.is_empty() { "0" } else { combined };

    U256::from_str_radix(combined, 10).map_err(|e| UnitsError::InvalidAmount(e.to_string()))
}

/// Convert a raw value to a decimal string with the given number of
/// decimals.
pub fn format_units(value: U256, decimals: u32) -> String {
    let s = value.to_string();
    let decimals = decimals as usize;

    if s.len() <= decimals {
        if value.is_zero() {
            return "0.0".to_string();
        }
        let zeros = decimals - s.len();
        let mut result = "0.".to_string();
        result.push_str(&"0".repeat(zeros));
        result.push_str(s.trim_start_matches('0'));
        if result.ends_with('.') {
            result.push('0');
        }
        result
    } else {
        let integer_part = &s[..s.len() - decimals];
        let fractional_part = &s[s.len() - decimals..];
        let fractional = fractional_part.trim_end_matches('0');
        if fractional.is_empty() {
            format!("{integer_part}.0")
        } else {
            format!("{integer_part}.{fractional}")
        }
    }
}
