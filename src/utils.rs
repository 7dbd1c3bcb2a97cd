use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// 1 currency unit = 1,000,000 micro units. Commission rates use the same
/// scale, so `100_000` is a 10% rate.
pub const MICRO: i64 = 1_000_000;

const MICRO_DIGITS: u32 = 6;

/// Converts a decimal amount into micro units. Non-finite values and
/// amounts outside the `i64` micro range are rejected.
pub fn to_micro(value: f64) -> Result<i64> {
  let scaled = (value * MICRO as f64).round();
  // i64::MAX is not representable as f64; the bound rounds up to 2^63
  if scaled.is_finite() && scaled >= i64::MIN as f64 && scaled < i64::MAX as f64
  {
    Ok(scaled as i64)
  } else {
    Err(out_of_range(value))
  }
}

fn out_of_range(value: impl std::fmt::Display) -> Error {
  Error::InvalidArgs(format!("Amount {value} is out of range"))
}

pub fn from_micro(amount: i64) -> f64 {
  amount as f64 / MICRO as f64
}

fn div_round(n: i128, d: i128) -> i128 {
  let (q, r) = (n / d, n % d);
  if 2 * r.abs() >= d { q + n.signum() } else { q }
}

/// `amount * rate`, rounded half away from zero to the nearest micro unit.
/// Fails when the product does not fit in micro units.
pub fn apply_rate(amount: i64, rate: i64) -> Result<i64> {
  let product = div_round(amount as i128 * rate as i128, MICRO as i128);
  i64::try_from(product).map_err(|_| out_of_range(product))
}

/// Rounds a micro amount to `decimals` places (at most six), saturating at
/// the ends of the `i64` range.
pub fn round_to(amount: i64, decimals: u32) -> i64 {
  let decimals = decimals.min(MICRO_DIGITS);
  let step = 10i128.pow(MICRO_DIGITS - decimals);
  let rounded = div_round(amount as i128, step) * step;
  i64::try_from(rounded)
    .unwrap_or(if rounded < 0 { i64::MIN } else { i64::MAX })
}

/// Renders a micro amount with exactly `decimals` digits after the point.
pub fn format_fixed(amount: i64, decimals: u32) -> String {
  let rounded = round_to(amount, decimals);
  let sign = if rounded < 0 { "-" } else { "" };
  let abs = rounded.unsigned_abs();
  let whole = abs / MICRO as u64;
  let frac = abs % MICRO as u64;

  if decimals == 0 {
    return format!("{sign}{whole}");
  }

  let kept = decimals.min(MICRO_DIGITS);
  let frac = frac / 10u64.pow(MICRO_DIGITS - kept);
  let padding = "0".repeat(decimals.saturating_sub(MICRO_DIGITS) as usize);
  format!("{sign}{whole}.{frac:0width$}{padding}", width = kept as usize)
}

/// Hex encoded sha256 of a credential, stored in place of the raw value.
pub fn hash_secret(secret: &str) -> String {
  hex::encode(Sha256::digest(secret.as_bytes()))
}
