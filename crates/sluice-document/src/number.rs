//! Exact decimal numbers.
//!
//! A [`Number`] keeps the literal text it was created from, so encoding to a
//! store and back never goes through a binary float. Arithmetic works on a
//! `(mantissa, exponent)` pair with 38 significant digits.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors produced while parsing or combining numbers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NumberError {
  /// The text is not a base-10 number literal.
  #[error("invalid number literal '{0}'")]
  Invalid(String),

  /// The value needs more than 38 significant digits or its exponent is
  /// out of range.
  #[error("number '{0}' exceeds supported precision")]
  Overflow(String),
}

/// An exact base-10 number stored as its literal text.
#[derive(Debug, Clone)]
pub struct Number(String);

/// Largest normalized exponent magnitude a number may carry.
const MAX_EXPONENT: i32 = 1000;

/// Leading or trailing zeros rendered before switching to exponent notation.
const MAX_PADDING: usize = 40;

impl Number {
  /// The literal text of this number.
  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Add two numbers without losing precision.
  pub fn checked_add(&self, other: &Number) -> Result<Number, NumberError> {
    let (m1, e1) = self.parts()?;
    let (m2, e2) = other.parts()?;
    let exp = e1.min(e2);

    let overflow = || NumberError::Overflow(format!("{} + {}", self, other));
    let lhs = e1
      .checked_sub(exp)
      .and_then(|by| scale(m1, by))
      .ok_or_else(overflow)?;
    let rhs = e2
      .checked_sub(exp)
      .and_then(|by| scale(m2, by))
      .ok_or_else(overflow)?;
    let sum = lhs.checked_add(rhs).ok_or_else(overflow)?;

    let (m, e) = normalize(sum, exp).ok_or_else(overflow)?;
    if !exponent_in_range(e) {
      return Err(overflow());
    }
    Ok(Number(render(m, e)))
  }

  /// Canonical text: numerically equal values render identically.
  pub fn canonical(&self) -> String {
    match self.parts() {
      Ok((m, e)) => render(m, e),
      Err(_) => self.0.clone(),
    }
  }

  /// Returns the value as an `i64` if it is integral and in range.
  pub fn as_i64(&self) -> Option<i64> {
    let (m, e) = self.parts().ok()?;
    if e < 0 {
      return None;
    }
    let scaled = scale(m, e)?;
    i64::try_from(scaled).ok()
  }

  /// Decompose into a normalized `(mantissa, exponent)` pair.
  fn parts(&self) -> Result<(i128, i32), NumberError> {
    let text = self.0.as_str();
    let overflow = || NumberError::Overflow(text.to_string());
    let (mantissa, exponent) = match text.find(['e', 'E']) {
      Some(idx) => (&text[..idx], Some(&text[idx + 1..])),
      None => (text, None),
    };

    let exp: i32 = match exponent {
      Some(raw) => raw.parse().map_err(|_| overflow())?,
      None => 0,
    };

    let (negative, unsigned) = match mantissa.strip_prefix('-') {
      Some(rest) => (true, rest),
      None => (false, mantissa),
    };

    // Zeros are only multiplied in once a later non-zero digit needs them,
    // so trailing zeros never count against the 38 digits.
    let mut value: i128 = 0;
    let mut zeros: i32 = 0;
    let mut fraction: i32 = 0;
    let mut seen_point = false;
    for ch in unsigned.chars() {
      if ch == '.' {
        seen_point = true;
        continue;
      }
      let digit = ch
        .to_digit(10)
        .ok_or_else(|| NumberError::Invalid(text.to_string()))?;
      if seen_point {
        fraction = fraction.checked_add(1).ok_or_else(overflow)?;
      }
      if digit == 0 {
        zeros = zeros.checked_add(1).ok_or_else(overflow)?;
        continue;
      }
      value = if value == 0 {
        i128::from(digit)
      } else {
        zeros
          .checked_add(1)
          .and_then(|by| scale(value, by))
          .and_then(|v| v.checked_add(i128::from(digit)))
          .ok_or_else(overflow)?
      };
      zeros = 0;
    }

    if value == 0 {
      return Ok((0, 0));
    }
    if negative {
      value = -value;
    }
    let exp = exp
      .checked_add(zeros)
      .and_then(|e| e.checked_sub(fraction))
      .ok_or_else(overflow)?;
    let (value, exp) = normalize(value, exp).ok_or_else(overflow)?;
    if !exponent_in_range(exp) {
      return Err(overflow());
    }
    Ok((value, exp))
  }
}

fn exponent_in_range(exp: i32) -> bool {
  (-MAX_EXPONENT..=MAX_EXPONENT).contains(&exp)
}

fn scale(mantissa: i128, by: i32) -> Option<i128> {
  let factor = 10i128.checked_pow(u32::try_from(by).ok()?)?;
  mantissa.checked_mul(factor)
}

fn normalize(mut mantissa: i128, mut exp: i32) -> Option<(i128, i32)> {
  if mantissa == 0 {
    return Some((0, 0));
  }
  while mantissa % 10 == 0 {
    mantissa /= 10;
    exp = exp.checked_add(1)?;
  }
  Some((mantissa, exp))
}

fn render(mantissa: i128, exp: i32) -> String {
  if mantissa == 0 {
    return "0".to_string();
  }

  let sign = if mantissa < 0 { "-" } else { "" };
  let digits = mantissa.unsigned_abs().to_string();

  if exp >= 0 {
    let exp = exp.unsigned_abs() as usize;
    if exp <= MAX_PADDING {
      return format!("{}{}{}", sign, digits, "0".repeat(exp));
    }
    return format!("{}{}e{}", sign, digits, exp);
  }

  let frac = exp.unsigned_abs() as usize;
  if digits.len() > frac {
    let (int, dec) = digits.split_at(digits.len() - frac);
    format!("{}{}.{}", sign, int, dec)
  } else if frac - digits.len() <= MAX_PADDING {
    format!("{}0.{}{}", sign, "0".repeat(frac - digits.len()), digits)
  } else {
    format!("{}{}e{}", sign, digits, exp)
  }
}

/// Orders two normalized decompositions by value.
fn compare_parts((m1, e1): (i128, i32), (m2, e2): (i128, i32)) -> Ordering {
  let by_sign = m1.signum().cmp(&m2.signum());
  if by_sign != Ordering::Equal || m1 == 0 {
    return by_sign;
  }

  let (a, b) = (m1.unsigned_abs().to_string(), m2.unsigned_abs().to_string());
  // Position of the leading digit decides first, then the digits themselves.
  let magnitude = (a.len() as i64 + i64::from(e1))
    .cmp(&(b.len() as i64 + i64::from(e2)))
    .then_with(|| {
      let width = a.len().max(b.len());
      format!("{:0<width$}", a).cmp(&format!("{:0<width$}", b))
    });

  if m1 < 0 { magnitude.reverse() } else { magnitude }
}

/// Checks `text` against the JSON number grammar.
fn is_number_literal(text: &str) -> bool {
  let bytes = text.as_bytes();
  let mut i = 0;

  if bytes.get(i) == Some(&b'-') {
    i += 1;
  }

  match bytes.get(i) {
    Some(b'0') => i += 1,
    Some(b'1'..=b'9') => {
      while matches!(bytes.get(i), Some(b'0'..=b'9')) {
        i += 1;
      }
    }
    _ => return false,
  }

  if bytes.get(i) == Some(&b'.') {
    i += 1;
    let start = i;
    while matches!(bytes.get(i), Some(b'0'..=b'9')) {
      i += 1;
    }
    if i == start {
      return false;
    }
  }

  if matches!(bytes.get(i), Some(b'e' | b'E')) {
    i += 1;
    if matches!(bytes.get(i), Some(b'+' | b'-')) {
      i += 1;
    }
    let start = i;
    while matches!(bytes.get(i), Some(b'0'..=b'9')) {
      i += 1;
    }
    if i == start {
      return false;
    }
  }

  i == bytes.len()
}

impl FromStr for Number {
  type Err = NumberError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if !is_number_literal(s) {
      return Err(NumberError::Invalid(s.to_string()));
    }
    let number = Number(s.to_string());
    number.parts()?;
    Ok(number)
  }
}

impl PartialEq for Number {
  fn eq(&self, other: &Self) -> bool {
    match (self.parts(), other.parts()) {
      (Ok(a), Ok(b)) => a == b,
      _ => self.0 == other.0,
    }
  }
}

impl Eq for Number {}

impl PartialOrd for Number {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Number {
  fn cmp(&self, other: &Self) -> Ordering {
    match (self.parts(), other.parts()) {
      (Ok(a), Ok(b)) => compare_parts(a, b),
      _ => self.0.cmp(&other.0),
    }
  }
}

impl fmt::Display for Number {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<i64> for Number {
  fn from(value: i64) -> Self {
    Number(value.to_string())
  }
}

impl From<u64> for Number {
  fn from(value: u64) -> Self {
    Number(value.to_string())
  }
}

impl TryFrom<f64> for Number {
  type Error = NumberError;

  fn try_from(value: f64) -> Result<Self, Self::Error> {
    if !value.is_finite() {
      return Err(NumberError::Invalid(value.to_string()));
    }
    // `Display` for f64 never uses exponent notation.
    value.to_string().parse()
  }
}

impl Serialize for Number {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.0)
  }
}

impl<'de> Deserialize<'de> for Number {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let text = String::deserialize(deserializer)?;
    text.parse().map_err(serde::de::Error::custom)
  }
}
