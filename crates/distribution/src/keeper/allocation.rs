//! Per-block fee allocation.

use super::Keeper;
use crate::context::Context;
use crate::errors::{DistrError, Result};
use crate::events::Event;
use crate::expected_keepers::ValidatorInfo;
use crate::types::{AllocationSummary, DistributionType, Transfer, VoteInfo};
use stakedist_types::{ConsAddress, Dec, DecCoins, ValAddress};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Signers split 1 / EQUAL_SHARE_DIVISOR of the validator allocation evenly.
const EQUAL_SHARE_DIVISOR: i64 = 4;

impl Keeper {
    /// Distribute the fees collected in the previous block.
    ///
    /// The community tax is taken first. Of the rest, a quarter is split
    /// evenly among validators that signed the previous block and the
    /// remainder in proportion to delegated shares across bonded validators.
    /// Whatever truncation leaves over goes to the community pool.
    pub fn allocate_tokens(
        &self,
        ctx: &mut Context<'_>,
        total_previous_power: i64,
        previous_proposer: &ConsAddress,
        votes: &[VoteInfo],
    ) -> Result<AllocationSummary> {
        let summary = self.atomic(ctx, |ctx| {
            let fees = self
                .supply()
                .module_balance(self.fee_collector_name())
                .map_err(DistrError::Transfer)?;
            if fees.is_zero() {
                return Ok(AllocationSummary::default());
            }

            ctx.queue_transfer(Transfer::ModuleToModule {
                from: self.fee_collector_name().to_string(),
                to: self.module_name().to_string(),
                amount: fees.clone(),
            });

            if total_previous_power == 0 {
                self.add_to_community_pool(ctx, &fees)?;
                debug!(
                    target: "distribution",
                    fees = %fees,
                    "no voting power in previous block, fees sent to community pool"
                );
                return Ok(AllocationSummary {
                    total: fees.clone(),
                    to_validators: DecCoins::empty(),
                    to_community: fees,
                });
            }

            let params = self.params(ctx)?;
            let fees_to_validators = fees.mul_dec_truncate(&(Dec::one() - params.community_tax));
            let equal_share = fees_to_validators.mul_dec_truncate(&Dec::one().quo_int(EQUAL_SHARE_DIVISOR)?);
            let proportional_share = fees_to_validators.sub(&equal_share)?;

            let equal_left = self.allocate_equal_share(ctx, &equal_share, votes)?;
            let proportional_left = self.allocate_proportional_share(ctx, &proportional_share)?;

            let taxed = fees.sub(&fees_to_validators)?;
            let to_community = taxed.add(&equal_left).add(&proportional_left);
            self.add_to_community_pool(ctx, &to_community)?;

            let to_validators = fees.sub(&to_community)?;
            debug!(
                target: "distribution",
                proposer = %previous_proposer,
                fees = %fees,
                to_validators = %to_validators,
                to_community = %to_community,
                "allocated block fees"
            );
            Ok(AllocationSummary {
                total: fees,
                to_validators,
                to_community,
            })
        })?;

        if !summary.total.is_zero() {
            self.telemetry()
                .fees_allocated(&summary.total, &summary.to_validators, &summary.to_community);
        }
        Ok(summary)
    }

    fn allocate_equal_share(
        &self,
        ctx: &mut Context<'_>,
        equal_share: &DecCoins,
        votes: &[VoteInfo],
    ) -> Result<DecCoins> {
        // a validator listed more than once still takes a single slice
        let signers: BTreeMap<ValAddress, ValidatorInfo> = votes
            .iter()
            .filter(|vote| vote.signed_last_block)
            .filter_map(|vote| self.staking().validator_by_cons_addr(&vote.validator))
            .filter(|validator| !validator.jailed)
            .map(|validator| (validator.operator, validator))
            .collect();
        if signers.is_empty() {
            return Ok(equal_share.clone());
        }

        let fraction = Dec::one().quo_truncate(&Dec::from_int(signers.len() as i64))?;
        let reward = equal_share.mul_dec_truncate(&fraction);
        let mut remaining = equal_share.clone();
        for validator in signers.values() {
            self.credit_validator(ctx, validator, &reward)?;
            remaining = remaining.sub(&reward)?;
        }
        Ok(remaining)
    }

    fn allocate_proportional_share(&self, ctx: &mut Context<'_>, share: &DecCoins) -> Result<DecCoins> {
        let validators: Vec<ValidatorInfo> = self
            .staking()
            .bonded_validators()
            .into_iter()
            .filter(|validator| !validator.jailed)
            .collect();
        let total_shares = validators
            .iter()
            .fold(Dec::zero(), |acc, validator| acc + validator.delegator_shares.clone());
        if total_shares.is_zero() {
            return Ok(share.clone());
        }

        let mut remaining = share.clone();
        for validator in &validators {
            let fraction = validator.delegator_shares.quo_truncate(&total_shares)?;
            let reward = share.mul_dec_truncate(&fraction);
            self.credit_validator(ctx, validator, &reward)?;
            remaining = remaining.sub(&reward)?;
        }
        Ok(remaining)
    }

    /// Credit `tokens`, already held by the module account, to a validator.
    pub fn allocate_tokens_to_validator(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
        tokens: &DecCoins,
    ) -> Result<()> {
        let validator = self.validator_info(val)?;
        self.atomic(ctx, |ctx| self.credit_validator(ctx, &validator, tokens))
    }

    fn credit_validator(&self, ctx: &mut Context<'_>, validator: &ValidatorInfo, tokens: &DecCoins) -> Result<()> {
        if tokens.is_zero() {
            return Ok(());
        }
        let operator = &validator.operator;

        let commission = match self.params(ctx)?.distribution_type {
            DistributionType::OnChain => tokens.mul_dec(&validator.commission_rate),
            DistributionType::OffChain => tokens.clone(),
        };
        let shared = tokens.sub(&commission)?;

        let accumulated = self.validator_accumulated_commission(ctx, operator)?;
        self.set_validator_accumulated_commission(ctx, operator, &accumulated.add(&commission))?;
        ctx.emit(Event::Commission {
            validator: *operator,
            amount: commission,
        });

        if !shared.is_zero() {
            let mut current = self.validator_current_rewards(ctx, operator)?.ok_or_else(|| {
                DistrError::invariant(format!("validator {operator} has no current rewards record"))
            })?;
            current.rewards = current.rewards.add(&shared);
            self.set_validator_current_rewards(ctx, operator, &current)?;
        }
        ctx.emit(Event::Rewards {
            validator: *operator,
            amount: shared,
        });

        let outstanding = self.validator_outstanding_rewards(ctx, operator)?;
        self.set_validator_outstanding_rewards(ctx, operator, &outstanding.add(tokens))?;
        Ok(())
    }

    /// Record the proposer of the block being finalized.
    pub fn record_proposer(&self, ctx: &mut Context<'_>, proposer: &ConsAddress) -> Result<()> {
        self.atomic(ctx, |ctx| {
            self.set_previous_proposer_cons_addr(ctx, proposer)?;
            info!(target: "distribution", proposer = %proposer, "recorded block proposer");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::events::Event;
    use crate::mock::TestInput;
    use crate::types::{DistributionType, VoteInfo};
    use stakedist_types::{ConsAddress, DecCoins};

    fn stake(amount: &str) -> DecCoins {
        DecCoins::single("stake", amount.parse().unwrap()).unwrap()
    }

    #[test]
    fn commission_split_on_validator_credit() {
        let mut input = TestInput::new();
        let val = input.create_validator_with_commission("0", "0.5".parse().unwrap(), 100);
        input.allocate_to_validator(&val, &stake("20"));

        input.with_ctx(|keeper, ctx| {
            assert_eq!(keeper.validator_accumulated_commission(ctx, &val).unwrap(), stake("10"));
            let current = keeper.validator_current_rewards(ctx, &val).unwrap().unwrap();
            assert_eq!(current.rewards, stake("10"));
            assert_eq!(keeper.validator_outstanding_rewards(ctx, &val).unwrap(), stake("20"));
        });
    }

    #[test]
    fn off_chain_credits_everything_as_commission() {
        let mut input = TestInput::new();
        let val = input.create_validator_with_commission("0", "0.1".parse().unwrap(), 100);
        input
            .with_ctx(|keeper, ctx| keeper.set_distribution_type(ctx, DistributionType::OffChain))
            .unwrap();
        input.allocate_to_validator(&val, &stake("20"));

        input.with_ctx(|keeper, ctx| {
            assert_eq!(keeper.validator_accumulated_commission(ctx, &val).unwrap(), stake("20"));
            let current = keeper.validator_current_rewards(ctx, &val).unwrap().unwrap();
            assert!(current.rewards.is_zero());
        });
    }

    #[test]
    fn empty_fee_collector_is_a_no_op() {
        let mut input = TestInput::new();
        input.create_validator("0", 100);
        let summary = input.next_block(&DecCoins::empty());
        assert!(summary.total.is_zero());
        assert!(input.telemetry.records().is_empty());
    }

    #[test]
    fn zero_power_sends_fees_to_community_pool() {
        let mut input = TestInput::new();
        input.create_validator("0", 100);
        input.fund_fee_collector(&stake("50"));

        let summary = input
            .with_ctx(|keeper, ctx| {
                keeper.allocate_tokens(ctx, 0, &ConsAddress::from_seed(b"proposer"), &[])
            })
            .unwrap();
        assert_eq!(summary.to_community, stake("50"));
        assert!(summary.to_validators.is_zero());
        assert_eq!(input.module_balance(), stake("50"));
        assert!(input.fee_collector_balance().is_zero());
        input.with_ctx(|keeper, ctx| {
            assert_eq!(keeper.fee_pool(ctx).unwrap().community_pool, stake("50"));
        });
    }

    #[test]
    fn fees_split_between_equal_and_proportional_shares() {
        let mut input = TestInput::new();
        let a = input.create_validator("a", 100);
        let b = input.create_validator("b", 300);
        input.with_ctx(|_, ctx| ctx.take_events());

        let summary = input.next_block(&stake("100"));
        assert_eq!(summary.total, stake("100"));
        assert_eq!(summary.to_community, stake("2"));
        assert_eq!(summary.to_validators, stake("98"));

        input.with_ctx(|keeper, ctx| {
            // 12.25 equal plus 18.375 and 55.125 proportional
            assert_eq!(keeper.validator_outstanding_rewards(ctx, &a).unwrap(), stake("30.625"));
            assert_eq!(keeper.validator_outstanding_rewards(ctx, &b).unwrap(), stake("67.375"));
            assert_eq!(keeper.fee_pool(ctx).unwrap().community_pool, stake("2"));
        });
        assert_eq!(input.telemetry.total_fees_allocated(), stake("100"));
    }

    #[test]
    fn non_signers_and_jailed_miss_the_equal_share() {
        let mut input = TestInput::new();
        let a = input.create_validator("a", 100);
        let b = input.create_validator("b", 300);
        let c = input.create_validator("c", 100);
        input.jail(&c);
        input.fund_fee_collector(&stake("100"));

        let votes = vec![
            VoteInfo::new(input.validator(&a).cons_address, 100, true),
            VoteInfo::new(input.validator(&b).cons_address, 300, false),
            VoteInfo::new(input.validator(&c).cons_address, 100, true),
        ];
        input
            .with_ctx(|keeper, ctx| {
                let proposer = ConsAddress::from_seed(b"a");
                keeper.allocate_tokens(ctx, 500, &proposer, &votes)
            })
            .unwrap();

        input.with_ctx(|keeper, ctx| {
            // a takes the whole equal share of 24.5 plus a quarter of 73.5
            assert_eq!(keeper.validator_outstanding_rewards(ctx, &a).unwrap(), stake("42.875"));
            assert_eq!(keeper.validator_outstanding_rewards(ctx, &b).unwrap(), stake("55.125"));
            assert!(keeper.validator_outstanding_rewards(ctx, &c).unwrap().is_zero());
        });
    }

    #[test]
    fn repeated_votes_count_once() {
        let mut input = TestInput::new();
        let a = input.create_validator("a", 100);
        let b = input.create_validator("b", 100);
        input.fund_fee_collector(&stake("100"));

        let a_cons = input.validator(&a).cons_address;
        let votes = vec![
            VoteInfo::new(a_cons, 100, true),
            VoteInfo::new(a_cons, 100, true),
            VoteInfo::new(input.validator(&b).cons_address, 100, true),
        ];
        input
            .with_ctx(|keeper, ctx| keeper.allocate_tokens(ctx, 200, &a_cons, &votes))
            .unwrap();

        input.with_ctx(|keeper, ctx| {
            // 12.25 of the equal share plus half of 73.5 each
            assert_eq!(keeper.validator_outstanding_rewards(ctx, &a).unwrap(), stake("49"));
            assert_eq!(keeper.validator_outstanding_rewards(ctx, &b).unwrap(), stake("49"));
            assert_eq!(keeper.fee_pool(ctx).unwrap().community_pool, stake("2"));
        });
    }

    #[test]
    fn credit_emits_commission_and_rewards_events() {
        let mut input = TestInput::new();
        let val = input.create_validator_with_commission("0", "0.5".parse().unwrap(), 100);
        input.fund_module(&stake("4"));

        let events = input.with_ctx(|keeper, ctx| {
            ctx.take_events();
            keeper.allocate_tokens_to_validator(ctx, &val, &stake("4")).unwrap();
            ctx.take_events()
        });
        assert_eq!(
            events,
            vec![
                Event::Commission { validator: val, amount: stake("2") },
                Event::Rewards { validator: val, amount: stake("2") },
            ]
        );
    }

    #[test]
    fn proposer_is_recorded() {
        let mut input = TestInput::new();
        let proposer = ConsAddress::from_seed(b"proposer");
        input.with_ctx(|keeper, ctx| {
            assert!(keeper.previous_proposer_cons_addr(ctx).unwrap().is_none());
            keeper.record_proposer(ctx, &proposer).unwrap();
            assert_eq!(keeper.previous_proposer_cons_addr(ctx).unwrap(), Some(proposer));
        });
    }
}
