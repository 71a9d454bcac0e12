//! Validator reward periods and historical reference counting.

use super::Keeper;
use crate::context::Context;
use crate::errors::{DistrError, Result};
use crate::expected_keepers::ValidatorInfo;
use crate::types::{ValidatorCurrentRewards, ValidatorHistoricalRewards};
use stakedist_types::{DecCoins, ValAddress};
use tracing::debug;

/// A historical record is referenced by at most the validator and one
/// delegation checkpoint.
pub const MAX_REFERENCE_COUNT: u16 = 2;

impl Keeper {
    /// Seed the reward records of a freshly created validator.
    pub fn initialize_validator(&self, ctx: &mut Context<'_>, val: &ValAddress) -> Result<()> {
        self.set_validator_historical_rewards(
            ctx,
            val,
            0,
            &ValidatorHistoricalRewards::new(DecCoins::empty(), 1),
        )?;
        self.set_validator_current_rewards(ctx, val, &ValidatorCurrentRewards::new(DecCoins::empty(), 1))?;
        self.set_validator_accumulated_commission(ctx, val, &DecCoins::empty())?;
        self.set_validator_outstanding_rewards(ctx, val, &DecCoins::empty())?;

        debug!(target: "distribution", validator = %val, "initialized validator reward records");
        Ok(())
    }

    /// Close the validator's open period and return its number.
    ///
    /// The period's rewards are folded into the cumulative per-share ratio.
    /// A validator without delegated shares cannot attribute them, so they
    /// move to the community pool instead.
    pub fn increment_validator_period(&self, ctx: &mut Context<'_>, val: &ValidatorInfo) -> Result<u64> {
        let operator = &val.operator;
        let current = self
            .validator_current_rewards(ctx, operator)?
            .ok_or_else(|| {
                DistrError::invariant(format!("validator {operator} has no current rewards record"))
            })?;

        let ratio_delta = if val.delegator_shares.is_zero() {
            if !current.rewards.is_zero() {
                self.add_to_community_pool(ctx, &current.rewards)?;
                let outstanding = self.validator_outstanding_rewards(ctx, operator)?;
                let remaining = outstanding.checked_sub(&current.rewards).ok_or_else(|| {
                    DistrError::invariant(format!(
                        "validator {operator} outstanding {outstanding} below unattributed rewards {}",
                        current.rewards
                    ))
                })?;
                self.set_validator_outstanding_rewards(ctx, operator, &remaining)?;
                debug!(
                    target: "distribution",
                    validator = %operator,
                    rewards = %current.rewards,
                    "zero-share validator rewards moved to community pool"
                );
            }
            DecCoins::empty()
        } else {
            current.rewards.quo_dec_truncate(&val.delegator_shares)?
        };

        let previous_period = current.period.checked_sub(1).ok_or_else(|| {
            DistrError::invariant(format!("validator {operator} has current period 0"))
        })?;
        let previous = self
            .validator_historical_rewards(ctx, operator, previous_period)?
            .ok_or_else(|| {
                DistrError::invariant(format!(
                    "validator {operator} has no historical rewards for period {previous_period}"
                ))
            })?;

        // the validator's own reference moves from the previous record to this one
        self.decrement_reference_count(ctx, operator, previous_period)?;

        let cumulative = previous.cumulative_reward_ratio.add(&ratio_delta);
        self.set_validator_historical_rewards(
            ctx,
            operator,
            current.period,
            &ValidatorHistoricalRewards::new(cumulative, 1),
        )?;
        self.set_validator_current_rewards(
            ctx,
            operator,
            &ValidatorCurrentRewards::new(DecCoins::empty(), current.period + 1),
        )?;

        debug!(
            target: "distribution",
            validator = %operator,
            period = current.period,
            "closed validator period"
        );
        Ok(current.period)
    }

    pub(crate) fn increment_reference_count(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
        period: u64,
    ) -> Result<()> {
        let mut historical = self
            .validator_historical_rewards(ctx, val, period)?
            .ok_or_else(|| {
                DistrError::invariant(format!(
                    "cannot reference missing historical rewards of {val} at period {period}"
                ))
            })?;
        if historical.reference_count >= MAX_REFERENCE_COUNT {
            return Err(DistrError::invariant(format!(
                "reference count of {val} period {period} would exceed {MAX_REFERENCE_COUNT}"
            )));
        }
        historical.reference_count += 1;
        self.set_validator_historical_rewards(ctx, val, period, &historical)
    }

    pub(crate) fn decrement_reference_count(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
        period: u64,
    ) -> Result<()> {
        let mut historical = self
            .validator_historical_rewards(ctx, val, period)?
            .ok_or_else(|| {
                DistrError::invariant(format!(
                    "cannot release missing historical rewards of {val} at period {period}"
                ))
            })?;
        if historical.reference_count == 0 {
            return Err(DistrError::invariant(format!(
                "reference count of {val} period {period} is already zero"
            )));
        }
        historical.reference_count -= 1;
        if historical.reference_count == 0 {
            self.delete_validator_historical_reward(ctx, val, period)
        } else {
            self.set_validator_historical_rewards(ctx, val, period, &historical)
        }
    }
}
