//! Ledger consistency checks.
//!
//! Each check returns a human readable report and whether the invariant is
//! broken. Hosts run them periodically and halt on a broken ledger.

use super::Keeper;
use crate::context::Context;
use crate::errors::{DistrError, Result};
use crate::keys;
use stakedist_storage::decode;
use stakedist_types::DecCoins;
use tracing::warn;

pub const NONNEGATIVE_OUTSTANDING: &str = "nonnegative-outstanding";
pub const CAN_WITHDRAW: &str = "can-withdraw";
pub const REFERENCE_COUNT: &str = "reference-count";
pub const MODULE_ACCOUNT: &str = "module-account";

fn report(name: &str, detail: &str, broken: bool) -> (String, bool) {
    let status = if broken { "broken" } else { "ok" };
    (format!("distribution: {name} invariant {status}\n{detail}"), broken)
}

impl Keeper {
    /// Every stored outstanding balance decodes to non-negative coins.
    pub fn nonnegative_outstanding_invariant(&self, ctx: &Context<'_>) -> Result<(String, bool)> {
        let mut detail = String::new();
        let mut count = 0usize;

        for (key, value) in ctx.store().prefix_scan(&[keys::OUTSTANDING_REWARDS_PREFIX])? {
            let val = keys::validator_from_key(&key)?;
            match decode::<DecCoins>(&value) {
                Ok(coins) if coins.iter().any(|coin| coin.amount.is_negative()) => {
                    count += 1;
                    detail.push_str(&format!("\t{val} has negative outstanding coins: {coins}\n"));
                }
                Ok(_) => {}
                Err(err) => {
                    count += 1;
                    detail.push_str(&format!("\t{val} has unreadable outstanding coins: {err}\n"));
                }
            }
        }

        let broken = count != 0;
        detail.insert_str(0, &format!("found {count} validators with negative outstanding rewards\n"));
        Ok(report(NONNEGATIVE_OUTSTANDING, &detail, broken))
    }

    /// Withdrawing all commission and delegator rewards leaves every
    /// validator with non-negative outstanding rewards.
    ///
    /// Runs the withdrawals on a simulated branch.
    pub fn can_withdraw_invariant(&self, ctx: &mut Context<'_>) -> Result<(String, bool)> {
        let outcome = ctx.simulate(|ctx| {
            for (val, commission) in self.all_validator_accumulated_commissions(ctx)? {
                let (integral, _) = commission.truncate_decimal();
                if !integral.is_zero() {
                    self.withdraw_validator_commission_inner(ctx, &val)?;
                }
            }

            for (val, del, _) in self.delegator_starting_infos(ctx)? {
                let validator = self.validator_info(&val)?;
                let delegator = self.delegator_info(&del)?;
                self.withdraw_delegation_rewards_inner(ctx, &validator, &delegator)?;
            }

            let mut negative = Vec::new();
            for (val, outstanding) in self.all_validator_outstanding_rewards(ctx)? {
                if outstanding.iter().any(|coin| coin.amount.is_negative()) {
                    negative.push((val, outstanding));
                }
            }
            Ok(negative)
        });

        match outcome {
            Ok(negative) if negative.is_empty() => Ok(report(CAN_WITHDRAW, "all rewards withdrawable\n", false)),
            Ok(negative) => {
                let detail = negative
                    .iter()
                    .map(|(val, coins)| format!("\t{val} left with {coins}\n"))
                    .collect::<String>();
                Ok(report(CAN_WITHDRAW, &detail, true))
            }
            Err(err) if err.is_fatal() => {
                warn!(target: "distribution", error = %err, "withdrawal simulation failed");
                Ok(report(CAN_WITHDRAW, &format!("withdrawal failed: {err}\n"), true))
            }
            Err(err) => Err(err),
        }
    }

    /// Historical reference counts equal one per validator plus one per
    /// delegation checkpoint.
    pub fn reference_count_invariant(&self, ctx: &Context<'_>) -> Result<(String, bool)> {
        let validators = self.all_validator_current_rewards(ctx)?.len() as u64;
        let checkpoints = self.delegator_starting_infos(ctx)?.len() as u64;
        let expected = validators + checkpoints;

        let actual: u64 = self
            .all_validator_historical_rewards(ctx)?
            .iter()
            .map(|(_, _, record)| u64::from(record.reference_count))
            .sum();

        let broken = expected != actual;
        let detail = format!(
            "expected historical reference count: {expected} = {validators} validators + {checkpoints} starting infos\nsum of reference counts: {actual}\n"
        );
        Ok(report(REFERENCE_COUNT, &detail, broken))
    }

    /// The module account holds exactly the community pool plus every
    /// validator's outstanding rewards.
    pub fn module_account_invariant(&self, ctx: &Context<'_>) -> Result<(String, bool)> {
        let expected = self.expected_module_balance(ctx)?;
        let balance = self
            .supply()
            .module_balance(self.module_name())
            .map_err(DistrError::Transfer)?;

        let broken = balance != expected;
        let detail = format!("\tsum of outstanding and community pool: {expected}\n\tmodule balance: {balance}\n");
        Ok(report(MODULE_ACCOUNT, &detail, broken))
    }

    pub(crate) fn expected_module_balance(&self, ctx: &Context<'_>) -> Result<DecCoins> {
        let outstanding = self
            .all_validator_outstanding_rewards(ctx)?
            .into_iter()
            .fold(DecCoins::empty(), |acc, (_, coins)| acc.add(&coins));
        Ok(outstanding.add(&self.fee_pool(ctx)?.community_pool))
    }

    /// Run every check and return the first broken report, if any.
    pub fn all_invariants(&self, ctx: &mut Context<'_>) -> Result<(String, bool)> {
        let checks = [
            self.can_withdraw_invariant(ctx)?,
            self.nonnegative_outstanding_invariant(ctx)?,
            self.reference_count_invariant(ctx)?,
            self.module_account_invariant(ctx)?,
        ];
        for (message, broken) in &checks {
            if *broken {
                return Ok((message.clone(), true));
            }
        }
        Ok(("distribution: all invariants hold\n".to_string(), false))
    }
}

#[cfg(test)]
mod tests {
    use crate::keys;
    use crate::mock::TestInput;
    use stakedist_storage::KvStore;
    use stakedist_types::{AccAddress, DecCoins};

    fn stake(amount: &str) -> DecCoins {
        DecCoins::single("stake", amount.parse().unwrap()).unwrap()
    }

    fn busy_input() -> TestInput {
        let mut input = TestInput::new();
        let a = input.create_validator_with_commission("a", "0.1".parse().unwrap(), 100);
        let b = input.create_validator("b", 50);
        input.delegate(&AccAddress::from_seed(b"del"), &[a, b], 30);
        input.next_block(&stake("77"));
        input.next_block(&stake("13"));
        input
    }

    #[test]
    fn healthy_ledger_passes_every_check() {
        let mut input = busy_input();
        let (message, broken) = input.with_ctx(|keeper, ctx| keeper.all_invariants(ctx)).unwrap();
        assert!(!broken, "{message}");
    }

    #[test]
    fn missing_module_funds_break_module_account() {
        let mut input = busy_input();
        input.supply.burn_from_module("distribution", &stake("1")).unwrap();
        let (_, broken) = input
            .with_ctx(|keeper, ctx| keeper.module_account_invariant(ctx))
            .unwrap();
        assert!(broken);
    }

    #[test]
    fn orphan_checkpoint_breaks_reference_count() {
        let mut input = busy_input();
        let del = AccAddress::from_seed(b"del");
        let val = input.delegator(&del).validators[0];
        input.with_ctx(|keeper, ctx| {
            keeper.delete_delegator_starting_info(ctx, &val, &del).unwrap();
            let (message, broken) = keeper.reference_count_invariant(ctx).unwrap();
            assert!(broken, "{message}");
        });
    }

    #[test]
    fn unreadable_outstanding_is_reported() {
        let mut input = busy_input();
        let val = input.delegator(&AccAddress::from_seed(b"del")).validators[0];
        input
            .store
            .set(&keys::outstanding_rewards_key(&val), vec![0xff, 0x01])
            .unwrap();
        let (message, broken) = input
            .with_ctx(|keeper, ctx| keeper.nonnegative_outstanding_invariant(ctx))
            .unwrap();
        assert!(broken);
        assert!(message.contains("unreadable"));
    }
}
