//! Fixed-point conversion between token base units and decimal strings.
//!
//! Display formatting truncates to four fractional digits, so
//! `parse(format(w)) == w` only holds when `w` has no significant digits
//! past the fourth decimal place. Use [`TokenUnits::format_exact`] when the
//! full value must survive a round trip.

use num_bigint::BigUint;

use crate::constants::{DEFAULT_TOKEN_DECIMALS, DISPLAY_FRACTION_DIGITS, MAX_TOKEN_DECIMALS};
use crate::error::{Result, StealthFlowError};
use crate::types::U256;

/// Decimal precision of a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenUnits {
    decimals: u32,
}

impl Default for TokenUnits {
    fn default() -> Self {
        Self {
            decimals: DEFAULT_TOKEN_DECIMALS,
        }
    }
}

impl TokenUnits {
    /// Creates units with `decimals` fractional digits.
    pub fn new(decimals: u32) -> Result<Self> {
        if decimals > MAX_TOKEN_DECIMALS {
            return Err(StealthFlowError::ConfigError(format!(
                "token decimals must be at most {}, got {}",
                MAX_TOKEN_DECIMALS, decimals
            )));
        }
        Ok(Self { decimals })
    }

    /// Number of fractional digits.
    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    fn scale(&self) -> BigUint {
        BigUint::from(10u32).pow(self.decimals)
    }

    fn split(&self, wei: &U256) -> (BigUint, String) {
        let value = wei.to_biguint();
        let scale = self.scale();
        let whole = &value / &scale;
        let frac = (&value % &scale).to_string();
        let frac = if self.decimals == 0 {
            String::new()
        } else {
            format!("{:0>width$}", frac, width = self.decimals as usize)
        };
        (whole, frac)
    }

    /// Formats base units for display, truncated to four fractional digits.
    ///
    /// `1_500_000_000_000_000_000` at 18 decimals formats as `"1.5000"`.
    pub fn format(&self, wei: &U256) -> String {
        let (whole, frac) = self.split(wei);
        let shown: String = frac
            .chars()
            .chain(std::iter::repeat('0'))
            .take(DISPLAY_FRACTION_DIGITS)
            .collect();
        format!("{}.{}", whole, shown)
    }

    /// Formats base units at full precision, trimming trailing zeros.
    pub fn format_exact(&self, wei: &U256) -> String {
        let (whole, frac) = self.split(wei);
        let frac = frac.trim_end_matches('0');
        if frac.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, frac)
        }
    }

    /// Parses a decimal string into base units.
    ///
    /// The fraction is padded or truncated to exactly `decimals` digits.
    ///
    /// # Errors
    /// Returns `InvalidAmount` for anything but digits with at most one
    /// `.`, or when the value does not fit in 256 bits.
    pub fn parse(&self, text: &str) -> Result<U256> {
        let text = text.trim();
        let (whole, frac) = text.split_once('.').unwrap_or((text, ""));

        let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !is_digits(whole) || !is_digits(frac) {
            return Err(StealthFlowError::InvalidAmount(format!(
                "{:?} is not a decimal number",
                text
            )));
        }

        let width = self.decimals as usize;
        let frac: String = frac
            .chars()
            .chain(std::iter::repeat('0'))
            .take(width)
            .collect();

        let digits = format!("{}{}", whole, frac);
        let value = BigUint::parse_bytes(digits.as_bytes(), 10)
            .unwrap_or_default();
        U256::from_biguint(&value)
            .map_err(|_| StealthFlowError::InvalidAmount(format!("{:?} exceeds 256 bits", text)))
    }
}
