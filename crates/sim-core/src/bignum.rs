//! Extended-precision non-negative number.
//!
//! Game quantities (health pools, gold, damage) routinely pass `f64::MAX`
//! long before the interesting part of a run. `BigNum` stores a normalized
//! `(mantissa, base-10 exponent)` pair: the mantissa keeps ~15 significant
//! digits and the exponent is an `i64`, so magnitudes like `1e100000` are
//! ordinary values.
//!
//! Every constructor rejects NaN, infinities and negative inputs, which keeps
//! the type totally ordered.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::iter::{Product, Sum};
use std::ops::{Add, AddAssign, Mul, MulAssign, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Mantissas further apart than this many decades do not affect each other.
const MAX_DIGITS: i64 = 17;

/// Invalid numeric operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NumError {
    /// Division by a zero value.
    #[error("division by zero")]
    DivideByZero,
    /// Logarithm of zero (the type has no negative values).
    #[error("logarithm of a non-positive value")]
    LogOfNonPositive,
    /// Zero raised to a negative power.
    #[error("zero raised to negative power {0}")]
    ZeroToNegativePower(f64),
    /// A subtraction or conversion would produce a negative value.
    #[error("negative value is not representable")]
    Negative,
    /// NaN or infinite input.
    #[error("non-finite value: {0}")]
    NonFinite(f64),
    /// Malformed decimal string.
    #[error("cannot parse number from {0:?}")]
    Parse(String),
}

/// Non-negative number with a base-10 exponent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BigNum {
    mantissa: f64,
    exponent: i64,
}

/// Multiply `m` by `10^shift` in chunks that stay inside the `f64` range.
fn scale10(mut m: f64, mut shift: i64) -> f64 {
    while shift > 300 {
        m *= 1e300;
        shift -= 300;
    }
    while shift < -300 {
        m *= 1e-300;
        shift += 300;
    }
    m * 10f64.powi(shift as i32)
}

impl BigNum {
    pub const ZERO: BigNum = BigNum {
        mantissa: 0.0,
        exponent: 0,
    };
    pub const ONE: BigNum = BigNum {
        mantissa: 1.0,
        exponent: 0,
    };

    /// Build from an unnormalized pair. Callers guarantee `m` is finite and >= 0.
    fn normalize(m: f64, e: i64) -> BigNum {
        if m <= 0.0 || !m.is_finite() {
            return BigNum::ZERO;
        }
        let shift = m.log10().floor() as i64;
        let mut mantissa = scale10(m, -shift);
        let mut exponent = e.saturating_add(shift);
        if mantissa >= 10.0 {
            mantissa /= 10.0;
            exponent += 1;
        } else if mantissa < 1.0 {
            mantissa *= 10.0;
            exponent -= 1;
        }
        BigNum { mantissa, exponent }
    }

    /// Convert a native float, rejecting NaN, infinities and negatives.
    pub fn try_from_f64(value: f64) -> Result<BigNum, NumError> {
        if !value.is_finite() {
            return Err(NumError::NonFinite(value));
        }
        if value < 0.0 {
            return Err(NumError::Negative);
        }
        Ok(BigNum::normalize(value, 0))
    }

    /// `10^log10`, the inverse of [`BigNum::log10`].
    pub fn from_log10(log10: f64) -> Result<BigNum, NumError> {
        if !log10.is_finite() {
            return Err(NumError::NonFinite(log10));
        }
        let exponent = log10.floor();
        let mantissa = 10f64.powf(log10 - exponent);
        Ok(BigNum::normalize(mantissa, exponent as i64))
    }

    /// Build from an explicit mantissa and exponent, e.g. `(1.5, 300)` for `1.5e300`.
    pub fn from_parts(mantissa: f64, exponent: i64) -> Result<BigNum, NumError> {
        if !mantissa.is_finite() {
            return Err(NumError::NonFinite(mantissa));
        }
        if mantissa < 0.0 {
            return Err(NumError::Negative);
        }
        Ok(BigNum::normalize(mantissa, exponent))
    }

    pub fn mantissa(&self) -> f64 {
        self.mantissa
    }

    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0.0
    }

    /// Nearest native float; saturates to `f64::INFINITY` past the float range.
    pub fn to_f64(&self) -> f64 {
        if self.is_zero() {
            return 0.0;
        }
        if self.exponent > 308 {
            return f64::INFINITY;
        }
        if self.exponent < -330 {
            return 0.0;
        }
        scale10(self.mantissa, self.exponent)
    }

    /// Base-10 logarithm.
    pub fn log10(&self) -> Result<f64, NumError> {
        if self.is_zero() {
            return Err(NumError::LogOfNonPositive);
        }
        Ok(self.mantissa.log10() + self.exponent as f64)
    }

    /// Natural logarithm.
    pub fn ln(&self) -> Result<f64, NumError> {
        Ok(self.log10()? * std::f64::consts::LN_10)
    }

    /// Subtraction that refuses to go below zero.
    pub fn checked_sub(&self, rhs: &BigNum) -> Result<BigNum, NumError> {
        if rhs > self {
            return Err(NumError::Negative);
        }
        Ok(*self - *rhs)
    }

    /// Division; a zero divisor is an error rather than an infinity.
    pub fn checked_div(&self, rhs: &BigNum) -> Result<BigNum, NumError> {
        if rhs.is_zero() {
            return Err(NumError::DivideByZero);
        }
        if self.is_zero() {
            return Ok(BigNum::ZERO);
        }
        Ok(BigNum::normalize(
            self.mantissa / rhs.mantissa,
            self.exponent - rhs.exponent,
        ))
    }

    /// Integer power by repeated squaring. Negative exponents divide.
    pub fn powi(&self, n: i64) -> Result<BigNum, NumError> {
        if n < 0 {
            let positive = self.powi(n.checked_neg().unwrap_or(i64::MAX))?;
            return BigNum::ONE.checked_div(&positive).map_err(|e| match e {
                NumError::DivideByZero => NumError::ZeroToNegativePower(n as f64),
                other => other,
            });
        }
        let mut result = BigNum::ONE;
        let mut base = *self;
        let mut k = n;
        while k > 0 {
            if k & 1 == 1 {
                result = result * base;
            }
            k >>= 1;
            if k > 0 {
                base = base * base;
            }
        }
        Ok(result)
    }

    /// Real power. Integral exponents go through [`BigNum::powi`]; everything
    /// else through logarithms.
    pub fn powf(&self, p: f64) -> Result<BigNum, NumError> {
        if !p.is_finite() {
            return Err(NumError::NonFinite(p));
        }
        if self.is_zero() {
            return match p.partial_cmp(&0.0) {
                Some(Ordering::Greater) => Ok(BigNum::ZERO),
                Some(Ordering::Equal) => Ok(BigNum::ONE),
                _ => Err(NumError::ZeroToNegativePower(p)),
            };
        }
        if p.fract() == 0.0 && p.abs() < 1e9 {
            return self.powi(p as i64);
        }
        BigNum::from_log10(self.log10()? * p)
    }

    /// Multiply by a native factor. NaN, infinite and negative factors are
    /// errors.
    pub fn scale(&self, factor: f64) -> Result<BigNum, NumError> {
        Ok(*self * BigNum::try_from_f64(factor)?)
    }

    /// Largest integer not above the value.
    pub fn floor(&self) -> BigNum {
        if self.exponent >= MAX_DIGITS - 1 {
            return *self;
        }
        if self.exponent < 0 {
            return BigNum::ZERO;
        }
        BigNum::normalize(self.to_f64().floor(), 0)
    }

    /// Plain string that parses back to the same value.
    pub fn to_exact_string(&self) -> String {
        if self.is_zero() {
            "0".to_string()
        } else {
            format!("{}e{}", self.mantissa, self.exponent)
        }
    }
}

impl Default for BigNum {
    fn default() -> Self {
        BigNum::ZERO
    }
}

impl Eq for BigNum {}

impl Ord for BigNum {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_zero(), other.is_zero()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        self.exponent
            .cmp(&other.exponent)
            .then_with(|| self.mantissa.total_cmp(&other.mantissa))
    }
}

impl PartialOrd for BigNum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for BigNum {
    type Output = BigNum;

    fn add(self, rhs: BigNum) -> BigNum {
        let (big, small) = if self >= rhs { (self, rhs) } else { (rhs, self) };
        if small.is_zero() {
            return big;
        }
        let gap = big.exponent - small.exponent;
        if gap > MAX_DIGITS {
            return big;
        }
        BigNum::normalize(
            big.mantissa + scale10(small.mantissa, -gap),
            big.exponent,
        )
    }
}

impl AddAssign for BigNum {
    fn add_assign(&mut self, rhs: BigNum) {
        *self = *self + rhs;
    }
}

/// Saturating subtraction: a larger right-hand side yields zero.
/// Use [`BigNum::checked_sub`] where a negative result is a bug.
impl Sub for BigNum {
    type Output = BigNum;

    fn sub(self, rhs: BigNum) -> BigNum {
        if rhs >= self {
            return BigNum::ZERO;
        }
        if rhs.is_zero() {
            return self;
        }
        let gap = self.exponent - rhs.exponent;
        if gap > MAX_DIGITS {
            return self;
        }
        BigNum::normalize(self.mantissa - scale10(rhs.mantissa, -gap), self.exponent)
    }
}

impl Mul for BigNum {
    type Output = BigNum;

    fn mul(self, rhs: BigNum) -> BigNum {
        if self.is_zero() || rhs.is_zero() {
            return BigNum::ZERO;
        }
        BigNum::normalize(
            self.mantissa * rhs.mantissa,
            self.exponent.saturating_add(rhs.exponent),
        )
    }
}

impl MulAssign for BigNum {
    fn mul_assign(&mut self, rhs: BigNum) {
        *self = *self * rhs;
    }
}

impl Sum for BigNum {
    fn sum<I: Iterator<Item = BigNum>>(iter: I) -> BigNum {
        iter.fold(BigNum::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a BigNum> for BigNum {
    fn sum<I: Iterator<Item = &'a BigNum>>(iter: I) -> BigNum {
        iter.fold(BigNum::ZERO, |acc, x| acc + *x)
    }
}

impl Product for BigNum {
    fn product<I: Iterator<Item = BigNum>>(iter: I) -> BigNum {
        iter.fold(BigNum::ONE, |acc, x| acc * x)
    }
}

impl From<u64> for BigNum {
    fn from(value: u64) -> Self {
        BigNum::normalize(value as f64, 0)
    }
}

impl From<u32> for BigNum {
    fn from(value: u32) -> Self {
        BigNum::normalize(f64::from(value), 0)
    }
}

impl TryFrom<Decimal> for BigNum {
    type Error = NumError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        value.to_string().parse()
    }
}

impl FromStr for BigNum {
    type Err = NumError;

    /// Accepts plain (`"12345.5"`) and scientific (`"1.5e300000"`) notation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let parse_err = || NumError::Parse(s.to_string());
        let (mantissa, exponent) = match text.find(['e', 'E']) {
            Some(pos) => {
                let m: f64 = text[..pos].parse().map_err(|_| parse_err())?;
                let e: i64 = text[pos + 1..]
                    .trim_start_matches('+')
                    .parse()
                    .map_err(|_| parse_err())?;
                (m, e)
            }
            None => (text.parse::<f64>().map_err(|_| parse_err())?, 0),
        };
        if !mantissa.is_finite() {
            return Err(parse_err());
        }
        BigNum::from_parts(mantissa, exponent)
    }
}

impl fmt::Display for BigNum {
    /// Plain notation in `[0.01, 1e15)`, `m.mmme<x>` outside it. The formatter
    /// precision sets the number of fractional digits (default 3).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = f.precision().unwrap_or(3);
        if self.is_zero() {
            return f.write_str("0");
        }
        if (-2..15).contains(&self.exponent) {
            let text = format!("{:.*}", digits, self.to_f64());
            let text = if text.contains('.') {
                text.trim_end_matches('0').trim_end_matches('.')
            } else {
                text.as_str()
            };
            return f.write_str(text);
        }
        let scale = 10f64.powi(digits as i32);
        let mut mantissa = (self.mantissa * scale).round() / scale;
        let mut exponent = self.exponent;
        if mantissa >= 10.0 {
            mantissa /= 10.0;
            exponent += 1;
        }
        write!(f, "{:.*}e{}", digits, mantissa, exponent)
    }
}

impl Serialize for BigNum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_exact_string())
    }
}

impl<'de> Deserialize<'de> for BigNum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => BigNum::try_from_f64(v).map_err(serde::de::Error::custom),
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn n(s: &str) -> BigNum {
        s.parse().unwrap()
    }

    #[test]
    fn normalizes_mantissa_into_one_to_ten() {
        let x = BigNum::try_from_f64(12345.0).unwrap();
        assert!((x.mantissa() - 1.2345).abs() < 1e-12);
        assert_eq!(x.exponent(), 4);
        let y = BigNum::try_from_f64(0.05).unwrap();
        assert_eq!(y.exponent(), -2);
    }

    #[test]
    fn rejects_invalid_floats() {
        assert_eq!(
            BigNum::try_from_f64(-1.0).unwrap_err(),
            NumError::Negative
        );
        assert!(matches!(
            BigNum::try_from_f64(f64::NAN),
            Err(NumError::NonFinite(_))
        ));
        assert!(BigNum::try_from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn scale_rejects_bad_factors() {
        let x = BigNum::from_parts(2.0, 400).unwrap();
        assert_eq!(x.scale(2.5).unwrap(), BigNum::from_parts(5.0, 400).unwrap());
        assert!(x.scale(0.0).unwrap().is_zero());
        assert_eq!(x.scale(-1.0), Err(NumError::Negative));
        assert!(matches!(x.scale(f64::NAN), Err(NumError::NonFinite(_))));
        assert!(matches!(x.scale(f64::INFINITY), Err(NumError::NonFinite(_))));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(
            BigNum::ONE.checked_div(&BigNum::ZERO).unwrap_err(),
            NumError::DivideByZero
        );
        assert_eq!(
            BigNum::ZERO.log10().unwrap_err(),
            NumError::LogOfNonPositive
        );
        assert!(BigNum::ZERO.powf(-0.5).is_err());
    }

    #[test]
    fn subtraction_saturates_and_checked_sub_errors() {
        let a = n("5");
        let b = n("7");
        assert!((a - b).is_zero());
        assert_eq!(a.checked_sub(&b).unwrap_err(), NumError::Negative);
        assert!(((b - a).to_f64() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn addition_ignores_negligible_terms() {
        let big = n("1e400");
        assert_eq!(big + BigNum::ONE, big);
        let sum = n("1e400") + n("1e400");
        assert!((sum.mantissa() - 2.0).abs() < 1e-12);
        assert_eq!(sum.exponent(), 400);
    }

    #[test]
    fn fractional_and_negative_powers() {
        let x = n("1e3000");
        let root = x.powf(0.5).unwrap();
        assert!((root.log10().unwrap() - 1500.0).abs() < 1e-9);
        let inv = n("4").powi(-1).unwrap();
        assert!((inv.to_f64() - 0.25).abs() < 1e-12);
        let exact = n("1.07").powi(100).unwrap();
        assert!((exact.to_f64() - 1.07f64.powi(100)).abs() / 1.07f64.powi(100) < 1e-12);
    }

    #[test]
    fn parses_and_displays() {
        assert_eq!(n("1.5e300000").exponent(), 300_000);
        assert_eq!(n("  250 ").to_string(), "250");
        assert_eq!(n("1234.5").to_string(), "1234.5");
        assert_eq!(n("1.23456e2500").to_string(), "1.235e2500");
        assert_eq!(format!("{:.1}", n("9.99e20")), "1.0e21");
        assert_eq!(n("0.0001234").to_string(), "1.234e-4");
        assert_eq!(n("0.015").to_string(), "0.015");
        assert!("abc".parse::<BigNum>().is_err());
        assert!("1e".parse::<BigNum>().is_err());
    }

    #[test]
    fn serde_accepts_numbers_and_strings() {
        let values: Vec<BigNum> = serde_json::from_str(r#"[50, 2.5, "1e400"]"#).unwrap();
        assert!((values[0].to_f64() - 50.0).abs() < 1e-12);
        assert_eq!(values[2].exponent(), 400);
        let text = serde_json::to_string(&values[2]).unwrap();
        let back: BigNum = serde_json::from_str(&text).unwrap();
        assert_eq!(back, values[2]);
    }

    #[test]
    fn to_f64_saturates() {
        assert_eq!(n("1e400").to_f64(), f64::INFINITY);
        assert_eq!(n("1e-400").to_f64(), 0.0);
    }

    #[test]
    fn converts_from_decimal() {
        let d = Decimal::new(25, 3);
        let x = BigNum::try_from(d).unwrap();
        assert!((x.to_f64() - 0.025).abs() < 1e-15);
    }

    proptest! {
        #[test]
        fn product_log_matches_sum_of_logs(a in 2400.0f64..2600.0, b in 2400.0f64..2600.0) {
            let x = BigNum::from_log10(a).unwrap();
            let y = BigNum::from_log10(b).unwrap();
            let product = (x * y).log10().unwrap();
            prop_assert!((product - (a + b)).abs() < 0.01);
        }

        #[test]
        fn ordering_matches_logarithms(a in -50.0f64..5000.0, b in -50.0f64..5000.0) {
            let x = BigNum::from_log10(a).unwrap();
            let y = BigNum::from_log10(b).unwrap();
            if a + 1e-9 < b {
                prop_assert!(x < y);
            } else if b + 1e-9 < a {
                prop_assert!(y < x);
            }
        }

        #[test]
        fn small_values_match_native_arithmetic(a in 0.0f64..1e12, b in 1e-3f64..1e12) {
            let x = BigNum::try_from_f64(a).unwrap();
            let y = BigNum::try_from_f64(b).unwrap();
            let tol = |v: f64| v.abs() * 1e-12 + 1e-9;
            prop_assert!(((x + y).to_f64() - (a + b)).abs() <= tol(a + b));
            prop_assert!(((x * y).to_f64() - (a * b)).abs() <= tol(a * b));
            prop_assert!((x.checked_div(&y).unwrap().to_f64() - a / b).abs() <= tol(a / b));
        }
    }
}
