use crate::errors::{DistrError, Result};
use crate::types::DistributionType;
use serde::{Deserialize, Serialize};
use stakedist_types::{Dec, PRECISION};

/// Governance-adjustable distribution parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Share of each block's fees credited to the community pool.
    pub community_tax: Dec,
    /// Whether delegators may redirect their rewards.
    pub withdraw_addr_enabled: bool,
    /// Fractional digits kept when paying delegator rewards; the rest goes to the pool.
    pub reward_truncate_precision: i64,
    pub distribution_type: DistributionType,
    pub withdraw_reward_enabled: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            // 2%
            community_tax: Dec::with_prec(2, 2).unwrap_or_default(),
            withdraw_addr_enabled: true,
            reward_truncate_precision: 0,
            distribution_type: DistributionType::OnChain,
            withdraw_reward_enabled: true,
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<()> {
        validate_community_tax(&self.community_tax)?;
        validate_reward_truncate_precision(self.reward_truncate_precision)?;
        Ok(())
    }

    pub fn is_on_chain(&self) -> bool {
        self.distribution_type == DistributionType::OnChain
    }

    /// Precision as the unsigned digit count used by coin truncation.
    pub fn truncate_precision(&self) -> Result<u32> {
        validate_reward_truncate_precision(self.reward_truncate_precision)?;
        Ok(self.reward_truncate_precision as u32)
    }
}

pub fn validate_community_tax(tax: &Dec) -> Result<()> {
    if tax.is_negative() {
        return Err(DistrError::InvalidParam(format!(
            "community tax must be positive: {tax}"
        )));
    }
    if *tax > Dec::one() {
        return Err(DistrError::InvalidParam(format!(
            "community tax too large: {tax}"
        )));
    }
    Ok(())
}

pub fn validate_reward_truncate_precision(precision: i64) -> Result<()> {
    if !(0..=PRECISION as i64).contains(&precision) {
        return Err(DistrError::InvalidParam(format!(
            "reward truncate precision must be within [0, {PRECISION}]: {precision}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = Params::default();
        params.validate().unwrap();
        assert_eq!(params.community_tax, "0.02".parse().unwrap());
        assert!(params.is_on_chain());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut params = Params::default();
        params.community_tax = "1.01".parse().unwrap();
        assert!(matches!(params.validate(), Err(DistrError::InvalidParam(_))));

        params.community_tax = "-0.1".parse().unwrap();
        assert!(params.validate().is_err());

        let mut params = Params::default();
        params.reward_truncate_precision = 19;
        assert!(params.validate().is_err());
        params.reward_truncate_precision = -1;
        assert!(params.truncate_precision().is_err());
        params.reward_truncate_precision = 18;
        assert_eq!(params.truncate_precision().unwrap(), 18);
    }
}
