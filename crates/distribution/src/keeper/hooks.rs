//! Staking lifecycle hooks.

use super::Keeper;
use crate::context::Context;
use crate::errors::{DistrError, Result};
use crate::expected_keepers::StakingHooks;
use crate::types::Transfer;
use stakedist_types::{AccAddress, ConsAddress, ValAddress};
use tracing::{debug, info};

impl Keeper {
    fn delegation_hooks_active(&self, ctx: &Context<'_>) -> Result<bool> {
        Ok(self.params(ctx)?.is_on_chain())
    }

    /// Pay out what a removed validator still owns and erase its records.
    fn clear_validator(&self, ctx: &mut Context<'_>, cons: &ConsAddress, val: &ValAddress) -> Result<()> {
        let mut outstanding = self.validator_outstanding_rewards(ctx, val)?;

        let commission = self.validator_accumulated_commission(ctx, val)?;
        if !commission.is_zero() {
            let (paid, _) = commission.truncate_decimal();
            if !paid.is_zero() {
                outstanding = outstanding.checked_sub(&paid).ok_or_else(|| {
                    DistrError::invariant(format!(
                        "removed validator {val} outstanding {outstanding} below commission {paid}"
                    ))
                })?;
                let withdraw_addr = self.delegator_withdraw_addr(ctx, &AccAddress::from(*val))?;
                ctx.queue_transfer(Transfer::ModuleToAccount {
                    from: self.module_name().to_string(),
                    to: withdraw_addr,
                    amount: paid.clone(),
                });
                info!(target: "distribution", validator = %val, amount = %paid, "paid commission of removed validator");
            }
        }

        // the commission remainder is still part of outstanding
        self.add_to_community_pool(ctx, &outstanding)?;

        self.delete_validator_outstanding_rewards(ctx, val)?;
        self.delete_validator_accumulated_commission(ctx, val)?;
        self.delete_validator_historical_rewards(ctx, val)?;
        self.delete_validator_current_rewards(ctx, val)?;
        for (_, del, _) in self.validator_starting_infos(ctx, val)? {
            self.delete_delegator_starting_info(ctx, val, &del)?;
        }

        debug!(
            target: "distribution",
            validator = %val,
            cons = %cons,
            to_community = %outstanding,
            "cleared removed validator"
        );
        Ok(())
    }
}

impl StakingHooks for Keeper {
    fn after_validator_created(&self, ctx: &mut Context<'_>, val: &ValAddress) -> Result<()> {
        self.atomic(ctx, |ctx| self.initialize_validator(ctx, val))
    }

    fn after_validator_removed(&self, ctx: &mut Context<'_>, cons: &ConsAddress, val: &ValAddress) -> Result<()> {
        self.atomic(ctx, |ctx| self.clear_validator(ctx, cons, val))
    }

    fn before_delegation_created(&self, ctx: &mut Context<'_>, _del: &AccAddress, vals: &[ValAddress]) -> Result<()> {
        self.atomic(ctx, |ctx| {
            if !self.delegation_hooks_active(ctx)? {
                return Ok(());
            }
            for val in vals {
                let validator = self.validator_info(val)?;
                self.increment_validator_period(ctx, &validator)?;
            }
            Ok(())
        })
    }

    fn before_delegation_shares_modified(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        vals: &[ValAddress],
    ) -> Result<()> {
        self.atomic(ctx, |ctx| {
            if !self.delegation_hooks_active(ctx)? {
                return Ok(());
            }
            let delegator = self.delegator_info(del)?;
            for val in vals {
                let validator = self.validator_info(val)?;
                if !self.ensure_starting_info(ctx, &validator, &delegator)? {
                    continue;
                }
                self.withdraw_delegation_rewards_inner(ctx, &validator, &delegator)?;
            }
            Ok(())
        })
    }

    fn after_delegation_modified(&self, ctx: &mut Context<'_>, del: &AccAddress, vals: &[ValAddress]) -> Result<()> {
        self.atomic(ctx, |ctx| {
            if !self.delegation_hooks_active(ctx)? {
                return Ok(());
            }
            for val in vals {
                self.initialize_delegation(ctx, val, del)?;
            }
            Ok(())
        })
    }
}
