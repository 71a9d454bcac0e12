//! Lazy delegator accrual.
//!
//! A delegation records the period it started in and its stake. Its rewards
//! are the growth of the validator's cumulative per-share ratio between that
//! period and the period closed at withdrawal time, times the stake.

use super::Keeper;
use crate::context::Context;
use crate::errors::{DistrError, Result};
use crate::expected_keepers::{DelegatorInfo, ValidatorInfo};
use crate::keeper::validator::MAX_REFERENCE_COUNT;
use crate::types::DelegatorStartingInfo;
use stakedist_types::{AccAddress, Dec, DecCoins, ValAddress};
use tracing::debug;

impl Keeper {
    /// Rewards accrued by `stake` between two closed periods.
    pub fn calculate_delegation_rewards_between(
        &self,
        ctx: &Context<'_>,
        val: &ValAddress,
        starting_period: u64,
        ending_period: u64,
        stake: &Dec,
    ) -> Result<DecCoins> {
        if starting_period > ending_period {
            return Err(DistrError::invariant(format!(
                "starting period {starting_period} is after ending period {ending_period} for {val}"
            )));
        }
        if stake.is_negative() {
            return Err(DistrError::invariant(format!(
                "negative stake {stake} on validator {val}"
            )));
        }

        let starting = self.historical_ratio(ctx, val, starting_period)?;
        let ending = self.historical_ratio(ctx, val, ending_period)?;
        let difference = ending.checked_sub(&starting).ok_or_else(|| {
            DistrError::invariant(format!(
                "cumulative reward ratio of {val} decreased between periods {starting_period} and {ending_period}"
            ))
        })?;

        Ok(difference.mul_dec_truncate(stake))
    }

    fn historical_ratio(&self, ctx: &Context<'_>, val: &ValAddress, period: u64) -> Result<DecCoins> {
        self.validator_historical_rewards(ctx, val, period)?
            .map(|record| record.cumulative_reward_ratio)
            .ok_or_else(|| {
                DistrError::invariant(format!(
                    "missing historical rewards of {val} at period {period}"
                ))
            })
    }

    /// Rewards owed to `del` up to the closed period `ending_period`.
    pub fn calculate_delegation_rewards(
        &self,
        ctx: &Context<'_>,
        val: &ValidatorInfo,
        del: &DelegatorInfo,
        ending_period: u64,
    ) -> Result<DecCoins> {
        let operator = &val.operator;
        let starting = self
            .delegator_starting_info(ctx, operator, &del.address)?
            .ok_or_else(|| {
                DistrError::invariant(format!(
                    "delegator {} has no starting info on {operator}",
                    del.address
                ))
            })?;

        // a checkpoint taken in this block has earned nothing yet
        if starting.height == ctx.block_height() {
            return Ok(DecCoins::empty());
        }

        if starting.stake > del.shares {
            return Err(DistrError::invariant(format!(
                "recorded stake {} of {} on {operator} exceeds current shares {}",
                starting.stake, del.address, del.shares
            )));
        }

        self.calculate_delegation_rewards_between(
            ctx,
            operator,
            starting.previous_period,
            ending_period,
            &starting.stake,
        )
    }

    /// Checkpoint a delegation at the validator's latest closed period.
    pub fn initialize_delegation(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
        del: &AccAddress,
    ) -> Result<()> {
        let validator = self.validator_info(val)?;
        let delegator = self.delegator_info(del)?;

        let mut previous_period = self.latest_closed_period(ctx, val)?;
        let shared = self
            .validator_historical_rewards(ctx, val, previous_period)?
            .map(|record| record.reference_count >= MAX_REFERENCE_COUNT)
            .unwrap_or(false);
        if shared {
            // every checkpoint gets a record of its own
            previous_period = self.increment_validator_period(ctx, &validator)?;
        }

        self.increment_reference_count(ctx, val, previous_period)?;
        let info = DelegatorStartingInfo::new(previous_period, delegator.shares.clone(), ctx.block_height());
        self.set_delegator_starting_info(ctx, val, del, &info)?;

        debug!(
            target: "distribution",
            validator = %val,
            delegator = %del,
            period = previous_period,
            stake = %delegator.shares,
            "initialized delegation"
        );
        Ok(())
    }

    /// Give a delegation that predates on-chain accounting a checkpoint.
    ///
    /// The validator's period is closed first so the delegation starts
    /// accruing from a fresh record; the checkpoint carries height 0.
    pub fn init_existed_delegation_start_info(
        &self,
        ctx: &mut Context<'_>,
        val: &ValidatorInfo,
        del: &DelegatorInfo,
    ) -> Result<()> {
        let new_period = self.increment_validator_period(ctx, val)?;
        self.increment_reference_count(ctx, &val.operator, new_period)?;
        let info = DelegatorStartingInfo::new(new_period, del.shares.clone(), 0);
        self.set_delegator_starting_info(ctx, &val.operator, &del.address, &info)?;

        debug!(
            target: "distribution",
            validator = %val.operator,
            delegator = %del.address,
            period = new_period,
            "bootstrapped starting info for existing delegation"
        );
        Ok(())
    }

    pub(crate) fn latest_closed_period(&self, ctx: &Context<'_>, val: &ValAddress) -> Result<u64> {
        let current = self.validator_current_rewards(ctx, val)?.ok_or_else(|| {
            DistrError::invariant(format!("validator {val} has no current rewards record"))
        })?;
        current.period.checked_sub(1).ok_or_else(|| {
            DistrError::invariant(format!("validator {val} has current period 0"))
        })
    }

    /// Ensure `del` has a checkpoint on `val`, bootstrapping one for
    /// delegations with shares. Returns false when there is nothing to track.
    pub(crate) fn ensure_starting_info(
        &self,
        ctx: &mut Context<'_>,
        val: &ValidatorInfo,
        del: &DelegatorInfo,
    ) -> Result<bool> {
        if self.has_delegator_starting_info(ctx, &val.operator, &del.address)? {
            return Ok(true);
        }
        if del.shares.is_zero() {
            return Ok(false);
        }
        self.init_existed_delegation_start_info(ctx, val, del)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::mock::TestInput;
    use stakedist_types::{AccAddress, Dec, DecCoins};

    fn stake(amount: &str) -> DecCoins {
        DecCoins::single("stake", amount.parse().unwrap()).unwrap()
    }

    #[test]
    fn rewards_between_reject_reversed_periods() {
        let mut input = TestInput::new();
        let val = input.create_validator("0", 100);
        input.with_ctx(|keeper, ctx| {
            let err = keeper
                .calculate_delegation_rewards_between(ctx, &val, 2, 1, &Dec::one())
                .unwrap_err();
            assert!(err.is_fatal());
            let err = keeper
                .calculate_delegation_rewards_between(ctx, &val, 1, 1, &Dec::from_int(-1))
                .unwrap_err();
            assert!(err.is_fatal());
        });
    }

    #[test]
    fn checkpoint_in_current_block_earns_nothing() {
        let mut input = TestInput::new();
        let val = input.create_validator("0", 100);
        input.allocate_to_validator(&val, &stake("10"));

        let info = input.validator(&val);
        let del = input.delegator(&AccAddress::from(val));
        input.with_ctx(|keeper, ctx| {
            let end = keeper.increment_validator_period(ctx, &info).unwrap();
            let rewards = keeper.calculate_delegation_rewards(ctx, &info, &del, end).unwrap();
            assert!(rewards.is_zero());
        });
    }

    #[test]
    fn accrual_follows_ratio_growth() {
        let mut input = TestInput::new();
        let val = input.create_validator("0", 100);
        input.advance_height();
        input.allocate_to_validator(&val, &stake("10"));

        let info = input.validator(&val);
        let del = input.delegator(&AccAddress::from(val));
        input.with_ctx(|keeper, ctx| {
            let end = keeper.increment_validator_period(ctx, &info).unwrap();
            let rewards = keeper.calculate_delegation_rewards(ctx, &info, &del, end).unwrap();
            assert_eq!(rewards, stake("10"));
        });
    }

    #[test]
    fn stake_above_live_shares_is_fatal() {
        let mut input = TestInput::new();
        let val = input.create_validator("0", 100);
        input.advance_height();

        let info = input.validator(&val);
        let mut del = input.delegator(&AccAddress::from(val));
        del.shares = Dec::from_int(50);
        input.with_ctx(|keeper, ctx| {
            let end = keeper.increment_validator_period(ctx, &info).unwrap();
            let err = keeper.calculate_delegation_rewards(ctx, &info, &del, end).unwrap_err();
            assert!(err.is_fatal());
        });
    }

    #[test]
    fn shared_checkpoint_closes_period_first() {
        let mut input = TestInput::new();
        let val = input.create_validator("0", 100);
        let operator = AccAddress::from(val);

        input.with_ctx(|keeper, ctx| {
            let before = keeper.latest_closed_period(ctx, &val).unwrap();
            let record = keeper
                .validator_historical_rewards(ctx, &val, before)
                .unwrap()
                .unwrap();
            assert_eq!(record.reference_count, 2);

            // drop the existing checkpoint without releasing its reference
            keeper.delete_delegator_starting_info(ctx, &val, &operator).unwrap();
            keeper.initialize_delegation(ctx, &val, &operator).unwrap();

            let info = keeper
                .delegator_starting_info(ctx, &val, &operator)
                .unwrap()
                .unwrap();
            assert_eq!(info.previous_period, before + 1);
            let fresh = keeper
                .validator_historical_rewards(ctx, &val, info.previous_period)
                .unwrap()
                .unwrap();
            assert_eq!(fresh.reference_count, 2);
        });
    }
}
