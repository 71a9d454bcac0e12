//! Fixed-point decimal arithmetic.
//!
//! `Dec` stores a signed value scaled by 10^18 on top of an arbitrary
//! precision integer, so sums and products never overflow and every node
//! computes bit-identical results. Rounding is explicit: the `*_truncate`
//! variants round toward zero, the plain variants round half-to-even.

use crate::errors::TypesError;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use once_cell::sync::Lazy;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Number of fractional digits carried by every `Dec`.
pub const PRECISION: u32 = 18;

static PRECISION_MULTIPLIER: Lazy<BigInt> = Lazy::new(|| pow10(PRECISION));
static HALF_PRECISION: Lazy<BigInt> = Lazy::new(|| &*PRECISION_MULTIPLIER / 2u32);

fn pow10(exp: u32) -> BigInt {
    BigInt::from(10u32).pow(exp)
}

/// Drop the extra 18 digits of a double-precision product, rounding half-to-even.
fn chop_precision_and_round(value: BigInt) -> BigInt {
    if value.is_negative() {
        return -chop_precision_and_round(-value);
    }

    let quotient = &value / &*PRECISION_MULTIPLIER;
    let remainder = &value % &*PRECISION_MULTIPLIER;
    if remainder.is_zero() {
        return quotient;
    }

    match remainder.cmp(&*HALF_PRECISION) {
        Ordering::Less => quotient,
        Ordering::Greater => quotient + 1u32,
        Ordering::Equal => {
            if (&quotient % 2u32).is_zero() {
                quotient
            } else {
                quotient + 1u32
            }
        }
    }
}

fn chop_precision_and_truncate(value: BigInt) -> BigInt {
    value / &*PRECISION_MULTIPLIER
}

/// Signed decimal with exactly 18 fractional digits.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dec(BigInt);

impl Dec {
    pub fn zero() -> Self {
        Dec(BigInt::zero())
    }

    pub fn one() -> Self {
        Dec(PRECISION_MULTIPLIER.clone())
    }

    pub fn from_int(value: i64) -> Self {
        Dec(BigInt::from(value) * &*PRECISION_MULTIPLIER)
    }

    /// Integer value as a decimal.
    pub fn from_bigint(value: BigInt) -> Self {
        Dec(value * &*PRECISION_MULTIPLIER)
    }

    /// `value * 10^-prec`, e.g. `with_prec(25, 2) == 0.25`.
    pub fn with_prec(value: i64, prec: u32) -> Result<Self, TypesError> {
        if prec > PRECISION {
            return Err(TypesError::PrecisionOutOfRange(prec));
        }
        Ok(Dec(BigInt::from(value) * pow10(PRECISION - prec)))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    /// Product rounded half-to-even at the 18th digit.
    pub fn mul(&self, other: &Dec) -> Dec {
        Dec(chop_precision_and_round(&self.0 * &other.0))
    }

    /// Product truncated toward zero.
    pub fn mul_truncate(&self, other: &Dec) -> Dec {
        Dec(chop_precision_and_truncate(&self.0 * &other.0))
    }

    /// Quotient rounded half-to-even at the 18th digit.
    pub fn quo(&self, other: &Dec) -> Result<Dec, TypesError> {
        if other.is_zero() {
            return Err(TypesError::DivisionByZero);
        }
        let scaled = &self.0 * &*PRECISION_MULTIPLIER * &*PRECISION_MULTIPLIER;
        Ok(Dec(chop_precision_and_round(scaled / &other.0)))
    }

    /// Quotient truncated toward zero.
    pub fn quo_truncate(&self, other: &Dec) -> Result<Dec, TypesError> {
        if other.is_zero() {
            return Err(TypesError::DivisionByZero);
        }
        let scaled = &self.0 * &*PRECISION_MULTIPLIER;
        Ok(Dec(scaled / &other.0))
    }

    /// Quotient by an integer, truncated toward zero.
    pub fn quo_int(&self, value: i64) -> Result<Dec, TypesError> {
        if value == 0 {
            return Err(TypesError::DivisionByZero);
        }
        Ok(Dec(&self.0 / BigInt::from(value)))
    }

    /// Integer part, truncated toward zero.
    pub fn truncate_int(&self) -> BigInt {
        chop_precision_and_truncate(self.0.clone())
    }

    /// Integer part as a decimal.
    pub fn truncate_dec(&self) -> Dec {
        Dec::from_bigint(self.truncate_int())
    }

    /// Keep `prec` fractional digits, dropping the rest toward zero.
    pub fn truncate_with_prec(&self, prec: u32) -> Result<Dec, TypesError> {
        if prec > PRECISION {
            return Err(TypesError::PrecisionOutOfRange(prec));
        }
        let factor = pow10(PRECISION - prec);
        Ok(Dec((&self.0 / &factor) * factor))
    }

    /// Lossy conversion for telemetry; never used for accounting.
    pub fn to_f64_lossy(&self) -> f64 {
        self.0
            .to_f64()
            .map(|raw| raw / 1e18)
            .unwrap_or(0.0)
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.abs();
        let integer = &abs / &*PRECISION_MULTIPLIER;
        let fraction = &abs % &*PRECISION_MULTIPLIER;
        if self.is_negative() {
            f.write_str("-")?;
        }
        write!(
            f,
            "{}.{:0>width$}",
            integer,
            fraction.to_string(),
            width = PRECISION as usize
        )
    }
}

impl fmt::Debug for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dec({self})")
    }
}

impl FromStr for Dec {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypesError::InvalidDecimal(s.to_string());
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (integer, fraction) = match body.split_once('.') {
            Some((integer, fraction)) => (integer, fraction),
            None => (body, ""),
        };

        if integer.is_empty() || !integer.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if !fraction.bytes().all(|b| b.is_ascii_digit()) || body.ends_with('.') {
            return Err(invalid());
        }
        if fraction.len() > PRECISION as usize {
            return Err(invalid());
        }

        let digits = format!("{integer}{fraction:0<width$}", width = PRECISION as usize);
        let magnitude = BigInt::from_str(&digits).map_err(|_| invalid())?;
        Ok(Dec(if negative { -magnitude } else { magnitude }))
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Dec::from_str(&raw).map_err(de::Error::custom)
    }
}

impl Add for Dec {
    type Output = Dec;

    fn add(self, rhs: Dec) -> Dec {
        Dec(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Dec> for &'a Dec {
    type Output = Dec;

    fn add(self, rhs: &'a Dec) -> Dec {
        Dec(&self.0 + &rhs.0)
    }
}

impl Sub for Dec {
    type Output = Dec;

    fn sub(self, rhs: Dec) -> Dec {
        Dec(self.0 - rhs.0)
    }
}

impl<'a> Sub<&'a Dec> for &'a Dec {
    type Output = Dec;

    fn sub(self, rhs: &'a Dec) -> Dec {
        Dec(&self.0 - &rhs.0)
    }
}

impl AddAssign<&Dec> for Dec {
    fn add_assign(&mut self, rhs: &Dec) {
        self.0 += &rhs.0;
    }
}

impl SubAssign<&Dec> for Dec {
    fn sub_assign(&mut self, rhs: &Dec) {
        self.0 -= &rhs.0;
    }
}

impl Neg for Dec {
    type Output = Dec;

    fn neg(self) -> Dec {
        Dec(-self.0)
    }
}

impl From<i64> for Dec {
    fn from(value: i64) -> Self {
        Dec::from_int(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_display() {
        assert_eq!(dec("1").to_string(), "1.000000000000000000");
        assert_eq!(dec("-0.5").to_string(), "-0.500000000000000000");
        assert_eq!(
            dec("12.000000000000000001").to_string(),
            "12.000000000000000001"
        );
        assert!("1.0000000000000000001".parse::<Dec>().is_err());
        assert!("".parse::<Dec>().is_err());
        assert!(".5".parse::<Dec>().is_err());
        assert!("5.".parse::<Dec>().is_err());
        assert!("1e5".parse::<Dec>().is_err());
    }

    #[test]
    fn with_prec_scales_down() {
        assert_eq!(Dec::with_prec(25, 2).unwrap(), dec("0.25"));
        assert_eq!(Dec::with_prec(2, 2).unwrap(), dec("0.02"));
        assert!(Dec::with_prec(1, 19).is_err());
    }

    #[test]
    fn mul_rounds_half_to_even() {
        let tiny = dec("0.000000000000000001");
        // 0.5e-18 rounds to even (zero), 1.5e-18 rounds up to 2e-18
        assert_eq!(tiny.mul(&dec("0.5")), Dec::zero());
        assert_eq!(tiny.mul(&dec("1.5")), dec("0.000000000000000002"));
        assert_eq!(tiny.mul_truncate(&dec("1.5")), tiny);
    }

    #[test]
    fn quo_variants() {
        let third = Dec::one().quo(&Dec::from_int(3)).unwrap();
        assert_eq!(third, dec("0.333333333333333333"));
        let two_thirds = Dec::from_int(2).quo(&Dec::from_int(3)).unwrap();
        assert_eq!(two_thirds, dec("0.666666666666666667"));
        let two_thirds_trunc = Dec::from_int(2).quo_truncate(&Dec::from_int(3)).unwrap();
        assert_eq!(two_thirds_trunc, dec("0.666666666666666666"));
        assert_eq!(
            Dec::one().quo(&Dec::zero()).unwrap_err(),
            TypesError::DivisionByZero
        );
        assert_eq!(dec("7").quo_int(2).unwrap(), dec("3.5"));
    }

    #[test]
    fn truncation() {
        let value = dec("-12.987654321");
        assert_eq!(value.truncate_dec(), dec("-12"));
        assert_eq!(dec("12.987654321").truncate_with_prec(2).unwrap(), dec("12.98"));
        assert_eq!(dec("12.987654321").truncate_with_prec(0).unwrap(), dec("12"));
        assert_eq!(dec("12.987654321").truncate_with_prec(18).unwrap(), dec("12.987654321"));
    }

    #[test]
    fn serde_uses_string_form() {
        let json = serde_json::to_string(&dec("1.25")).unwrap();
        assert_eq!(json, "\"1.250000000000000000\"");
        let back: Dec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dec("1.25"));
    }

    proptest! {
        #[test]
        fn truncated_product_never_exceeds_rounded(a in 0i64..1_000_000_000, b in 0i64..1_000_000_000) {
            let x = Dec::with_prec(a, 9).unwrap();
            let y = Dec::with_prec(b, 9).unwrap();
            prop_assert!(x.mul_truncate(&y) <= x.mul(&y));
        }

        #[test]
        fn quo_truncate_times_divisor_never_exceeds_dividend(a in 0i64..i64::MAX, b in 1i64..1_000_000) {
            let x = Dec::from_int(a);
            let y = Dec::from_int(b);
            let q = x.quo_truncate(&y).unwrap();
            prop_assert!(q.mul_truncate(&y) <= x);
        }
    }
}
