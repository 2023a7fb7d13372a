//! Base-unit amounts and fixed-point ratio arithmetic.
//!
//! All supply accounting is done on `u128` base units. Ratios (inflation
//! rate, burn rates, emission splits) are exact decimals so that bounds such
//! as "the four splits sum to exactly 1.0" are checked without float error.
//!
//! Converting a ratio-weighted amount back to base units always truncates
//! toward zero; callers decide where the truncation residue goes.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Amount in base units (1 TRI = 10^6 base units).
pub type Amount = u128;

/// Exact decimal ratio.
pub type Ratio = Decimal;

/// Number of decimal places of the native coin.
pub const TRI_DECIMALS: u32 = 6;

/// Conversion factor: 1 TRI = 10^6 base units.
pub const BASE_UNITS_PER_TRI: Amount = 10u128.pow(TRI_DECIMALS);

/// Target block interval in seconds.
pub const BLOCK_INTERVAL_SECS: u64 = 6;

/// Seconds in a (non-leap) protocol year.
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

/// Blocks per protocol year at the target block interval (5_256_000).
pub const BLOCKS_PER_YEAR: u64 = SECONDS_PER_YEAR / BLOCK_INTERVAL_SECS;

/// Blocks per day at the target block interval (14_400).
pub const BLOCKS_PER_DAY: u64 = 24 * 60 * 60 / BLOCK_INTERVAL_SECS;

/// Protocol-wide ceiling for any configured supply cap (10 billion TRI).
pub const PROTOCOL_MAX_SUPPLY: Amount = 10_000_000_000 * BASE_UNITS_PER_TRI;

/// Persisted ratios are rounded to this many decimal places.
pub const RATIO_DECIMAL_PLACES: u32 = 18;

/// Protocol-wide ceiling for the maximum inflation rate (20%).
pub fn protocol_max_inflation() -> Ratio {
    Decimal::new(20, 2)
}

/// Errors raised by amount/ratio conversions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("ratio {0} is negative")]
    NegativeRatio(Ratio),
    #[error("arithmetic overflow multiplying {amount} by {ratio}")]
    Overflow { amount: Amount, ratio: Ratio },
    #[error("amount {0} does not fit the decimal mantissa")]
    TooLarge(Amount),
}

/// `value * mul / div` with a u128 intermediate, truncating toward zero.
///
/// Falls back to a quotient/remainder decomposition when the direct product
/// overflows, so the result is exact whenever it is representable.
/// Returns `None` if `div` is zero or the result does not fit.
pub fn mul_div_floor(value: u128, mul: u128, div: u128) -> Option<u128> {
    if div == 0 {
        return None;
    }
    if let Some(product) = value.checked_mul(mul) {
        return Some(product / div);
    }
    let whole = (value / div).checked_mul(mul)?;
    let part = (value % div).checked_mul(mul)? / div;
    whole.checked_add(part)
}

/// Multiply an amount by a non-negative ratio and truncate to base units.
pub fn mul_ratio_floor(amount: Amount, ratio: Ratio) -> Result<Amount, AmountError> {
    if ratio.is_sign_negative() && !ratio.is_zero() {
        return Err(AmountError::NegativeRatio(ratio));
    }
    let normalized = ratio.normalize();
    let numer = normalized.mantissa().unsigned_abs();
    let denom = 10u128.pow(normalized.scale());
    mul_div_floor(amount, numer, denom).ok_or(AmountError::Overflow { amount, ratio })
}

/// Convert an amount into a decimal.
pub fn amount_to_decimal(amount: Amount) -> Result<Decimal, AmountError> {
    Decimal::from_u128(amount).ok_or(AmountError::TooLarge(amount))
}

/// `numer / denom` as a ratio rounded to [`RATIO_DECIMAL_PLACES`].
///
/// Returns `None` when `denom` is zero or either side exceeds the decimal range.
pub fn ratio_of(numer: Amount, denom: Amount) -> Option<Ratio> {
    if denom == 0 {
        return None;
    }
    let n = Decimal::from_u128(numer)?;
    let d = Decimal::from_u128(denom)?;
    n.checked_div(d).map(|r| r.round_dp(RATIO_DECIMAL_PLACES))
}

/// Truncate a non-negative decimal to whole base units.
pub fn decimal_to_amount(value: Decimal) -> Option<Amount> {
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    value.trunc().to_u128()
}

/// Render an amount as a human readable TRI string.
pub fn format_tri(amount: Amount) -> String {
    let whole = amount / BASE_UNITS_PER_TRI;
    let frac = amount % BASE_UNITS_PER_TRI;
    if frac == 0 {
        format!("{whole} TRI")
    } else {
        format!("{whole}.{frac:06} TRI")
    }
}
