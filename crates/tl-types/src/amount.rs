//! Wei amounts, ether strings and display percentages.

use ethabi::ethereum_types::U256;
use thiserror::Error;

pub const ETHER_DECIMALS: u8 = 18;

const LIMB_BASE: f64 = 18_446_744_073_709_551_616.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is required")]
    Empty,
    #[error("amount must be a number: {0}")]
    NotNumeric(String),
    #[error("amount has more than {0} decimal places")]
    TooPrecise(u8),
    #[error("amount is too large")]
    Overflow,
    #[error("{0} decimals do not fit a 256-bit amount")]
    TooManyDecimals(u8),
}

/// `10^decimals`, or an error past 77 decimals.
fn unit_base(decimals: u8) -> Result<U256, AmountError> {
    U256::from(10u8)
        .checked_pow(U256::from(decimals))
        .ok_or(AmountError::TooManyDecimals(decimals))
}

/// Formats a wei value as an ether string, `10.0`, `0.5`, `1.000000000000000001`.
pub fn format_ether(wei: U256) -> String {
    render_units(wei, U256::exp10(ETHER_DECIMALS as usize), ETHER_DECIMALS)
}

pub fn format_units(value: U256, decimals: u8) -> Result<String, AmountError> {
    if decimals == 0 {
        return Ok(value.to_string());
    }
    Ok(render_units(value, unit_base(decimals)?, decimals))
}

fn render_units(value: U256, base: U256, decimals: u8) -> String {
    let whole = value / base;
    let fraction = value % base;

    let mut fraction_digits = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    while fraction_digits.len() > 1 && fraction_digits.ends_with('0') {
        fraction_digits.pop();
    }

    format!("{whole}.{fraction_digits}")
}

/// Formats with a fixed number of fractional digits, truncating.
pub fn format_ether_fixed(wei: U256, places: usize) -> String {
    let full = format_ether(wei);
    let (whole, fraction) = full.split_once('.').unwrap_or((full.as_str(), "0"));
    let mut fraction = fraction.to_owned();
    fraction.truncate(places);
    while fraction.len() < places {
        fraction.push('0');
    }
    if places == 0 {
        whole.to_owned()
    } else {
        format!("{whole}.{fraction}")
    }
}

pub fn parse_ether(input: &str) -> Result<U256, AmountError> {
    parse_units(input, ETHER_DECIMALS)
}

pub fn parse_units(input: &str, decimals: u8) -> Result<U256, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountError::NotNumeric(trimmed.to_owned()));
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) {
        return Err(AmountError::NotNumeric(trimmed.to_owned()));
    }
    if fraction.len() > decimals as usize {
        return Err(AmountError::TooPrecise(decimals));
    }

    let whole_value = if whole.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(whole).map_err(|_| AmountError::Overflow)?
    };
    let padded = format!("{fraction:0<width$}", width = decimals as usize);
    let fraction_value = if padded.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(&padded).map_err(|_| AmountError::Overflow)?
    };

    whole_value
        .checked_mul(unit_base(decimals)?)
        .and_then(|scaled| scaled.checked_add(fraction_value))
        .ok_or(AmountError::Overflow)
}

pub fn u256_to_f64(value: U256) -> f64 {
    value
        .0
        .iter()
        .rev()
        .fold(0.0, |acc, limb| acc * LIMB_BASE + *limb as f64)
}

/// `numerator / denominator * 100`, unclamped. A zero denominator yields 0.
pub fn ratio_percent(numerator: U256, denominator: U256) -> f64 {
    if denominator.is_zero() {
        return 0.0;
    }
    u256_to_f64(numerator) / u256_to_f64(denominator) * 100.0
}

/// The one display rule for every percentage: clamp into `[0, 100]`.
pub fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

pub fn saturating_u64(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.low_u64()
    }
}
