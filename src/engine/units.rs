use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::warn;

/// Decimals of the native token (base unit is 10^-18).
pub const NATIVE_DECIMALS: u32 = 18;
/// Decimals of the gas price unit relative to the base unit (gwei).
pub const GAS_PRICE_DECIMALS: u32 = 9;

/// An amount in base units paired with the decimals used to display it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount {
    base: u128,
    decimals: u32,
}

impl Amount {
    pub fn new(base: u128, decimals: u32) -> Self {
        Self { base, decimals }
    }

    pub fn native(base: u128) -> Self {
        Self::new(base, NATIVE_DECIMALS)
    }

    pub fn base_units(&self) -> u128 {
        self.base
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.base == 0
    }

    /// Display units with thousands separators, e.g. `1,234.5`.
    pub fn human(&self) -> String {
        format_human(self.base, self.decimals)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_units(self.base, self.decimals))
    }
}

/// Serializes as the display string, e.g. `"1.5"`.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_units(self.base, self.decimals))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("`{0}` is not a decimal amount")]
    InvalidAmount(String),
    #[error("`{value}` has more than {decimals} fractional digits")]
    Precision { value: String, decimals: u32 },
    #[error("`{0}` does not fit into 128 bits of base units")]
    Overflow(String),
}

/// Converts base units into a display string, trimming trailing zeros.
pub fn format_units(value: u128, decimals: u32) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (integer, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{integer}.{fraction}")
    }
}

/// Parses a display amount (`"1.25"`) into base units.
pub fn parse_units(text: &str, decimals: u32) -> Result<u128, UnitsError> {
    let trimmed = text.trim();
    let (integer, fraction) = match trimmed.split_once('.') {
        Some((integer, fraction)) => (integer, fraction),
        None => (trimmed, ""),
    };
    let is_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if (integer.is_empty() && fraction.is_empty()) || !is_digits(integer) || !is_digits(fraction)
    {
        return Err(UnitsError::InvalidAmount(text.to_string()));
    }
    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(UnitsError::Precision {
            value: text.to_string(),
            decimals,
        });
    }
    let combined = format!(
        "{}{}{}",
        integer,
        fraction,
        "0".repeat(decimals as usize - fraction.len())
    );
    let combined = combined.trim_start_matches('0');
    if combined.is_empty() {
        return Ok(0);
    }
    combined
        .parse::<u128>()
        .map_err(|_| UnitsError::Overflow(text.to_string()))
}

/// Display units with `,` grouping of the integer part.
pub fn format_human(value: u128, decimals: u32) -> String {
    let formatted = format_units(value, decimals);
    let (integer, fraction) = match formatted.split_once('.') {
        Some((integer, fraction)) => (integer.to_string(), Some(fraction.to_string())),
        None => (formatted, None),
    };
    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (position, digit) in integer.chars().enumerate() {
        if position > 0 && (integer.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    match fraction {
        Some(fraction) => format!("{grouped}.{fraction}"),
        None => grouped,
    }
}

/// Scales a gas-price-denominated value into native base units, saturating
/// at `u128::MAX`.
pub fn scale_up(value: u128, decimals: u32) -> u128 {
    match 10u128
        .checked_pow(decimals)
        .and_then(|factor| value.checked_mul(factor))
    {
        Some(scaled) => scaled,
        None => {
            warn!(value, decimals, "scaled amount overflows u128, saturating");
            u128::MAX
        }
    }
}
