use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Number of stored units per whole unit. Quantities are fixed-point with nano resolution.
const NANO: i128 = 1_000_000_000;

/// Largest power of ten that fits in an `i128`.
const MAX_POW10: u32 = 38;

/// Decimal SI suffixes, smallest first, with their base-10 exponent.
const DECIMAL_SUFFIXES: &[(i32, &str)] = &[
    (-9, "n"),
    (-6, "u"),
    (-3, "m"),
    (0, ""),
    (3, "k"),
    (6, "M"),
    (9, "G"),
    (12, "T"),
    (15, "P"),
    (18, "E"),
];

/// Binary SI suffixes, smallest first, with their base-2 exponent.
const BINARY_SUFFIXES: &[(u32, &str)] = &[
    (10, "Ki"),
    (20, "Mi"),
    (30, "Gi"),
    (40, "Ti"),
    (50, "Pi"),
    (60, "Ei"),
];

/// How a quantity prefers to be printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuantityFormat {
    /// `500m`, `2`, `1k`, `3M` ...
    #[default]
    DecimalSI,
    /// `128Ki`, `252Mi`, `1Gi` ...
    BinarySI,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    #[error("quantity must not be empty")]
    Empty,
    #[error("quantity '{0}' does not start with a valid number")]
    InvalidNumber(String),
    #[error("quantity '{0}' has an unknown unit suffix")]
    InvalidSuffix(String),
    #[error("quantity '{0}' is out of range")]
    OutOfRange(String),
}

/// A measured amount of a resource: CPU cores, bytes of memory, object counts.
///
/// Values are exact. They are stored as a signed count of nano-units, so `500m`,
/// `0.5` and `500000000n` are the same quantity. Anything finer than `1n` is
/// rounded up when parsed. Two quantities compare by value only; the format is
/// just a printing preference carried over from the parsed text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quantity {
    nanos: i128,
    format: QuantityFormat,
}

impl Quantity {
    pub const fn zero() -> Self {
        Self {
            nanos: 0,
            format: QuantityFormat::DecimalSI,
        }
    }

    /// Whole units, e.g. an object count or a number of cores.
    pub fn from_int(value: i64) -> Self {
        Self {
            nanos: value as i128 * NANO,
            format: QuantityFormat::DecimalSI,
        }
    }

    /// Thousandths of a unit, e.g. millicores.
    pub fn from_milli(value: i64) -> Self {
        Self {
            nanos: value as i128 * 1_000_000,
            format: QuantityFormat::DecimalSI,
        }
    }

    /// Whole bytes, printed with binary suffixes.
    pub fn from_bytes(value: i64) -> Self {
        Self {
            nanos: value as i128 * NANO,
            format: QuantityFormat::BinarySI,
        }
    }

    pub fn format(&self) -> QuantityFormat {
        self.format
    }

    pub fn is_zero(&self) -> bool {
        self.nanos == 0
    }

    pub fn is_positive(&self) -> bool {
        self.nanos > 0
    }

    pub fn is_negative(&self) -> bool {
        self.nanos < 0
    }

    /// Value in whole units, rounded up.
    pub fn value(&self) -> i128 {
        div_ceil_signed(self.nanos, NANO)
    }

    /// Value in thousandths of a unit, rounded up.
    pub fn milli_value(&self) -> i128 {
        div_ceil_signed(self.nanos, 1_000_000)
    }

    fn with_nanos(self, nanos: i128, other: &Self) -> Self {
        let format = if self.nanos == 0 {
            other.format
        } else {
            self.format
        };
        Self { nanos, format }
    }
}

fn div_ceil_signed(value: i128, unit: i128) -> i128 {
    let quotient = value / unit;
    if value % unit > 0 { quotient + 1 } else { quotient }
}

fn pow10(exp: u32) -> Option<i128> {
    if exp > MAX_POW10 {
        return None;
    }
    10i128.checked_pow(exp)
}

/// Divide a non-negative value by `10^exp`, rounding up.
fn scale_down_ceil(value: i128, exp: u32) -> i128 {
    match pow10(exp) {
        Some(divisor) => {
            let quotient = value / divisor;
            if value % divisor > 0 { quotient + 1 } else { quotient }
        }
        // Divisor exceeds any representable value; only zero stays zero.
        None => i128::from(value > 0),
    }
}

enum Scale {
    Decimal(i32),
    Binary(u32),
}

fn parse_suffix(suffix: &str) -> Option<(Scale, QuantityFormat)> {
    if let Some((exp, _)) = DECIMAL_SUFFIXES.iter().find(|(_, s)| *s == suffix) {
        return Some((Scale::Decimal(*exp), QuantityFormat::DecimalSI));
    }
    if let Some((shift, _)) = BINARY_SUFFIXES.iter().find(|(_, s)| *s == suffix) {
        return Some((Scale::Binary(*shift), QuantityFormat::BinarySI));
    }
    // Decimal exponent form: 1e3, 5E-3
    let exponent = suffix
        .strip_prefix('e')
        .or_else(|| suffix.strip_prefix('E'))?;
    let exp: i32 = exponent.parse().ok()?;
    Some((Scale::Decimal(exp), QuantityFormat::DecimalSI))
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(QuantityError::Empty);
        }

        let (negative, unsigned) = if let Some(rest) = text.strip_prefix('-') {
            (true, rest)
        } else if let Some(rest) = text.strip_prefix('+') {
            (false, rest)
        } else {
            (false, text)
        };

        let number_len = unsigned
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(unsigned.len());
        let (number, suffix) = unsigned.split_at(number_len);
        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && frac.is_empty() || frac.contains('.') {
            return Err(QuantityError::InvalidNumber(text.to_string()));
        }

        // Trailing fractional zeros carry no value
        let frac = frac.trim_end_matches('0');
        let digits = format!("{}{}", whole, frac);
        let mantissa: i128 = if digits.is_empty() {
            0
        } else {
            digits
                .parse()
                .map_err(|_| QuantityError::OutOfRange(text.to_string()))?
        };
        let (scale, format) =
            parse_suffix(suffix).ok_or_else(|| QuantityError::InvalidSuffix(text.to_string()))?;
        let out_of_range = || QuantityError::OutOfRange(text.to_string());
        let frac_len = frac.len() as i64;

        let magnitude = match scale {
            Scale::Decimal(exp) => {
                let power = 9 + exp as i64 - frac_len;
                if mantissa == 0 {
                    0
                } else if power >= 0 {
                    let factor = u32::try_from(power)
                        .ok()
                        .and_then(pow10)
                        .ok_or_else(out_of_range)?;
                    mantissa.checked_mul(factor).ok_or_else(out_of_range)?
                } else {
                    let exp = u32::try_from(-power).unwrap_or(u32::MAX);
                    scale_down_ceil(mantissa, exp)
                }
            }
            Scale::Binary(shift) => {
                let scaled = mantissa
                    .checked_mul(1i128 << shift)
                    .and_then(|v| v.checked_mul(NANO))
                    .ok_or_else(out_of_range)?;
                scale_down_ceil(scaled, frac_len as u32)
            }
        };

        Ok(Self {
            nanos: if negative { -magnitude } else { magnitude },
            format,
        })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanos == 0 {
            return write!(f, "0");
        }
        if self.format == QuantityFormat::BinarySI && self.nanos % NANO == 0 {
            let whole = self.nanos / NANO;
            for (shift, suffix) in BINARY_SUFFIXES.iter().rev() {
                let unit = 1i128 << shift;
                if whole % unit == 0 {
                    return write!(f, "{}{}", whole / unit, suffix);
                }
            }
            return write!(f, "{}", whole);
        }
        for (exp, suffix) in DECIMAL_SUFFIXES.iter().rev() {
            let unit = 10i128.pow((exp + 9) as u32);
            if self.nanos % unit == 0 {
                return write!(f, "{}{}", self.nanos / unit, suffix);
            }
        }
        write!(f, "{}n", self.nanos)
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.nanos == other.nanos
    }
}

impl Eq for Quantity {}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.nanos.cmp(&other.nanos)
    }
}

impl Hash for Quantity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.nanos.hash(state);
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Self) -> Self::Output {
        self.with_nanos(self.nanos.saturating_add(rhs.nanos), &rhs)
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Self) -> Self::Output {
        self.with_nanos(self.nanos.saturating_sub(rhs.nanos), &rhs)
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Self::Output {
        Self {
            nanos: -self.nanos,
            format: self.format,
        }
    }
}

impl std::iter::Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), |acc, q| acc + q)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct QuantityVisitor;

impl Visitor<'_> for QuantityVisitor {
    type Value = Quantity;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a quantity such as \"500m\", \"252Mi\" or 2")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Quantity, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Quantity, E> {
        Ok(Quantity::from_int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Quantity, E> {
        i64::try_from(v)
            .map(Quantity::from_int)
            .map_err(|_| E::custom(format!("quantity {} is out of range", v)))
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(QuantityVisitor)
    }
}
