//! Commission and reward withdrawals.

use super::Keeper;
use crate::context::Context;
use crate::errors::{DistrError, Result};
use crate::events::Event;
use crate::expected_keepers::{DelegatorInfo, ValidatorInfo};
use crate::types::Transfer;
use stakedist_types::{AccAddress, DecCoins, ValAddress};
use tracing::{debug, info, warn};

impl Keeper {
    /// Redirect `del`'s future payouts to `withdraw_addr`.
    pub fn set_withdraw_address(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        withdraw_addr: &AccAddress,
    ) -> Result<()> {
        self.atomic(ctx, |ctx| {
            if self.is_blocked(withdraw_addr) {
                return Err(DistrError::WithdrawAddrBlocked(*withdraw_addr));
            }
            if !self.params(ctx)?.withdraw_addr_enabled {
                return Err(DistrError::SetWithdrawAddrDisabled);
            }

            self.set_delegator_withdraw_addr(ctx, del, withdraw_addr)?;
            ctx.emit(Event::SetWithdrawAddress {
                delegator: *del,
                withdraw_address: *withdraw_addr,
            });
            info!(target: "distribution", delegator = %del, withdraw_address = %withdraw_addr, "set withdraw address");
            Ok(())
        })
    }

    /// Pay out the whole-unit part of a validator's commission.
    pub fn withdraw_validator_commission(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
    ) -> Result<DecCoins> {
        let paid = self.atomic(ctx, |ctx| self.withdraw_validator_commission_inner(ctx, val))?;
        self.telemetry().commission_withdrawn(val, &paid);
        Ok(paid)
    }

    pub(crate) fn withdraw_validator_commission_inner(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
    ) -> Result<DecCoins> {
        let accumulated = self.validator_accumulated_commission(ctx, val)?;
        if accumulated.is_zero() {
            return Err(DistrError::NoValidatorCommission(*val));
        }

        let (commission, remainder) = accumulated.truncate_decimal();
        self.set_validator_accumulated_commission(ctx, val, &remainder)?;

        let outstanding = self.validator_outstanding_rewards(ctx, val)?;
        let remaining = outstanding.checked_sub(&commission).ok_or_else(|| {
            DistrError::invariant(format!(
                "validator {val} outstanding {outstanding} below withdrawn commission {commission}"
            ))
        })?;
        self.set_validator_outstanding_rewards(ctx, val, &remaining)?;

        if !commission.is_zero() {
            let withdraw_addr = self.delegator_withdraw_addr(ctx, &AccAddress::from(*val))?;
            ctx.queue_transfer(Transfer::ModuleToAccount {
                from: self.module_name().to_string(),
                to: withdraw_addr,
                amount: commission.clone(),
            });
        }

        ctx.emit(Event::WithdrawCommission {
            validator: *val,
            amount: commission.clone(),
        });
        info!(target: "distribution", validator = %val, amount = %commission, "withdrew validator commission");
        Ok(commission)
    }

    /// Pay `del` everything accrued on `val` and restart its accrual.
    pub fn withdraw_delegation_rewards(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        val: &ValAddress,
    ) -> Result<DecCoins> {
        self.atomic(ctx, |ctx| {
            self.ensure_delegator_withdrawals_enabled(ctx)?;
            let delegator = self.delegator_info(del)?;
            self.withdraw_from_validator(ctx, &delegator, val)
        })
    }

    /// Withdraw from every validator `del` votes for, as one operation.
    pub fn withdraw_all_delegator_rewards(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
    ) -> Result<DecCoins> {
        self.atomic(ctx, |ctx| {
            self.ensure_delegator_withdrawals_enabled(ctx)?;
            let delegator = self.delegator_info(del)?;
            let mut total = DecCoins::empty();
            for val in &delegator.validators {
                let paid = self.withdraw_from_validator(ctx, &delegator, val)?;
                total = total.add(&paid);
            }
            Ok(total)
        })
    }

    fn ensure_delegator_withdrawals_enabled(&self, ctx: &Context<'_>) -> Result<()> {
        let params = self.params(ctx)?;
        if !params.is_on_chain() {
            return Err(DistrError::DistributionTypeOffChain);
        }
        if !params.withdraw_reward_enabled {
            return Err(DistrError::WithdrawRewardDisabled);
        }
        Ok(())
    }

    fn withdraw_from_validator(
        &self,
        ctx: &mut Context<'_>,
        delegator: &DelegatorInfo,
        val: &ValAddress,
    ) -> Result<DecCoins> {
        let validator = self.validator_info(val)?;
        if !delegator.votes_for(val) {
            return Err(DistrError::NoDelegationDistInfo {
                delegator: delegator.address,
                validator: *val,
            });
        }
        if !self.ensure_starting_info(ctx, &validator, delegator)? {
            return Err(DistrError::ZeroDelegationShares {
                delegator: delegator.address,
                validator: *val,
            });
        }

        let paid = self.withdraw_delegation_rewards_inner(ctx, &validator, delegator)?;
        self.initialize_delegation(ctx, val, &delegator.address)?;
        Ok(paid)
    }

    /// Settle a delegation's accrued rewards and drop its checkpoint.
    ///
    /// Rewards are clamped to the validator's outstanding balance, then
    /// truncated to the configured precision; the truncated tail goes to the
    /// community pool. The caller decides whether to checkpoint again.
    pub(crate) fn withdraw_delegation_rewards_inner(
        &self,
        ctx: &mut Context<'_>,
        val: &ValidatorInfo,
        del: &DelegatorInfo,
    ) -> Result<DecCoins> {
        let operator = &val.operator;
        let starting = self
            .delegator_starting_info(ctx, operator, &del.address)?
            .ok_or(DistrError::NoDelegationDistInfo {
                delegator: del.address,
                validator: *operator,
            })?;

        let ending_period = self.increment_validator_period(ctx, val)?;
        let raw = self.calculate_delegation_rewards(ctx, val, del, ending_period)?;
        let outstanding = self.validator_outstanding_rewards(ctx, operator)?;

        let rewards = raw.intersect(&outstanding);
        if rewards != raw {
            let shortfall = raw.checked_sub(&rewards).unwrap_or_default();
            warn!(
                target: "distribution",
                validator = %operator,
                delegator = %del.address,
                computed = %raw,
                outstanding = %outstanding,
                "rounding error withdrawing rewards from validator"
            );
            self.telemetry().rounding_shortfall(operator, &shortfall);
        }

        let precision = self.params(ctx)?.truncate_precision()?;
        let (payout, remainder) = rewards.truncate_with_prec(precision)?;

        if !payout.is_zero() {
            let withdraw_addr = self.delegator_withdraw_addr(ctx, &del.address)?;
            ctx.queue_transfer(Transfer::ModuleToAccount {
                from: self.module_name().to_string(),
                to: withdraw_addr,
                amount: payout.clone(),
            });
        }

        self.add_to_community_pool(ctx, &remainder)?;
        let remaining = outstanding.checked_sub(&rewards).ok_or_else(|| {
            DistrError::invariant(format!(
                "validator {operator} outstanding {outstanding} below withdrawn rewards {rewards}"
            ))
        })?;
        self.set_validator_outstanding_rewards(ctx, operator, &remaining)?;

        self.decrement_reference_count(ctx, operator, starting.previous_period)?;
        self.delete_delegator_starting_info(ctx, operator, &del.address)?;

        ctx.emit(Event::WithdrawRewards {
            delegator: del.address,
            validator: *operator,
            amount: payout.clone(),
        });
        self.telemetry().rewards_withdrawn(&del.address, operator, &payout);
        debug!(
            target: "distribution",
            validator = %operator,
            delegator = %del.address,
            paid = %payout,
            to_community = %remainder,
            "withdrew delegation rewards"
        );
        Ok(payout)
    }
}
