//! Decimal coin sets.
//!
//! A `DecCoins` value is always sanitized: sorted by denom, one entry per
//! denom and only strictly positive amounts. Every operation returns a new
//! sanitized set, which keeps encoded state canonical across nodes.

use crate::decimal::Dec;
use crate::errors::TypesError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

static DENOM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9/]{2,127}$").expect("denom pattern is valid"));

/// Validate a coin denomination.
pub fn validate_denom(denom: &str) -> Result<(), TypesError> {
    if DENOM_RE.is_match(denom) {
        Ok(())
    } else {
        Err(TypesError::InvalidDenom(denom.to_string()))
    }
}

/// A single denomination with a decimal amount.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecCoin {
    pub denom: String,
    pub amount: Dec,
}

impl DecCoin {
    pub fn new(denom: impl Into<String>, amount: Dec) -> Result<Self, TypesError> {
        let denom = denom.into();
        validate_denom(&denom)?;
        if amount.is_negative() {
            return Err(TypesError::NegativeCoinAmount(format!("{amount}{denom}")));
        }
        Ok(Self { denom, amount })
    }

    pub fn from_int(denom: impl Into<String>, amount: i64) -> Result<Self, TypesError> {
        Self::new(denom, Dec::from_int(amount))
    }
}

impl fmt::Display for DecCoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Sanitized set of decimal coins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<DecCoin>", into = "Vec<DecCoin>")]
pub struct DecCoins(Vec<DecCoin>);

impl DecCoins {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build a sanitized set, merging duplicate denoms and dropping zeros.
    pub fn new(coins: Vec<DecCoin>) -> Result<Self, TypesError> {
        let mut merged: BTreeMap<String, Dec> = BTreeMap::new();
        for coin in coins {
            validate_denom(&coin.denom)?;
            if coin.amount.is_negative() {
                return Err(TypesError::NegativeCoinAmount(coin.to_string()));
            }
            *merged.entry(coin.denom).or_default() += &coin.amount;
        }
        Ok(Self::from_map(merged))
    }

    pub fn single(denom: impl Into<String>, amount: Dec) -> Result<Self, TypesError> {
        Self::new(vec![DecCoin::new(denom, amount)?])
    }

    /// Assumes every key is a valid denom; non-positive amounts are dropped.
    fn from_map(map: BTreeMap<String, Dec>) -> Self {
        Self(
            map.into_iter()
                .filter(|(_, amount)| amount.is_positive())
                .map(|(denom, amount)| DecCoin { denom, amount })
                .collect(),
        )
    }

    fn to_map(&self) -> BTreeMap<String, Dec> {
        self.0
            .iter()
            .map(|coin| (coin.denom.clone(), coin.amount.clone()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecCoin> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A sanitized set is zero exactly when it has no entries.
    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn amount_of(&self, denom: &str) -> Dec {
        self.0
            .iter()
            .find(|coin| coin.denom == denom)
            .map(|coin| coin.amount.clone())
            .unwrap_or_default()
    }

    pub fn add(&self, other: &DecCoins) -> DecCoins {
        let mut merged = self.to_map();
        for coin in &other.0 {
            *merged.entry(coin.denom.clone()).or_default() += &coin.amount;
        }
        Self::from_map(merged)
    }

    /// `self - other`, or `None` if any denom would go negative.
    pub fn checked_sub(&self, other: &DecCoins) -> Option<DecCoins> {
        let mut merged = self.to_map();
        for coin in &other.0 {
            let entry = merged.entry(coin.denom.clone()).or_default();
            *entry -= &coin.amount;
            if entry.is_negative() {
                return None;
            }
        }
        Some(Self::from_map(merged))
    }

    pub fn sub(&self, other: &DecCoins) -> Result<DecCoins, TypesError> {
        self.checked_sub(other)
            .ok_or_else(|| TypesError::NegativeCoinAmount(format!("{self} - {other}")))
    }

    /// Per-denom minimum of both sets.
    pub fn intersect(&self, other: &DecCoins) -> DecCoins {
        let merged = self
            .0
            .iter()
            .map(|coin| {
                let bound = other.amount_of(&coin.denom);
                (coin.denom.clone(), coin.amount.clone().min(bound))
            })
            .collect();
        Self::from_map(merged)
    }

    /// True when every denom of `other` is covered by `self`.
    pub fn is_all_gte(&self, other: &DecCoins) -> bool {
        other
            .0
            .iter()
            .all(|coin| self.amount_of(&coin.denom) >= coin.amount)
    }

    /// Scale every amount, rounding half-to-even. `factor` must not be negative.
    pub fn mul_dec(&self, factor: &Dec) -> DecCoins {
        self.map_amounts(|amount| amount.mul(factor))
    }

    /// Scale every amount, truncating toward zero. `factor` must not be negative.
    pub fn mul_dec_truncate(&self, factor: &Dec) -> DecCoins {
        self.map_amounts(|amount| amount.mul_truncate(factor))
    }

    pub fn quo_dec_truncate(&self, divisor: &Dec) -> Result<DecCoins, TypesError> {
        let mut merged = BTreeMap::new();
        for coin in &self.0 {
            merged.insert(coin.denom.clone(), coin.amount.quo_truncate(divisor)?);
        }
        Ok(Self::from_map(merged))
    }

    fn map_amounts(&self, f: impl Fn(&Dec) -> Dec) -> DecCoins {
        Self::from_map(
            self.0
                .iter()
                .map(|coin| (coin.denom.clone(), f(&coin.amount)))
                .collect(),
        )
    }

    /// Split into whole units and the fractional remainder.
    pub fn truncate_decimal(&self) -> (DecCoins, DecCoins) {
        let integral = self.map_amounts(Dec::truncate_dec);
        let remainder = self.map_amounts(|amount| amount - &amount.truncate_dec());
        (integral, remainder)
    }

    /// Split into amounts carrying `prec` fractional digits and the dropped tail.
    pub fn truncate_with_prec(&self, prec: u32) -> Result<(DecCoins, DecCoins), TypesError> {
        let mut truncated = BTreeMap::new();
        let mut remainder = BTreeMap::new();
        for coin in &self.0 {
            let kept = coin.amount.truncate_with_prec(prec)?;
            remainder.insert(coin.denom.clone(), &coin.amount - &kept);
            truncated.insert(coin.denom.clone(), kept);
        }
        Ok((Self::from_map(truncated), Self::from_map(remainder)))
    }
}

impl TryFrom<Vec<DecCoin>> for DecCoins {
    type Error = TypesError;

    fn try_from(value: Vec<DecCoin>) -> Result<Self, Self::Error> {
        DecCoins::new(value)
    }
}

impl From<DecCoins> for Vec<DecCoin> {
    fn from(value: DecCoins) -> Self {
        value.0
    }
}

impl fmt::Display for DecCoins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join(","))
    }
}
