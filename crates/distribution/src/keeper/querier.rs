//! Read-only queries.
//!
//! Reward queries need to close a validator period to see the latest
//! rewards, so every query runs on a simulated branch of the context and
//! leaves the store untouched.

use super::Keeper;
use crate::context::Context;
use crate::errors::{DistrError, Result};
use crate::params::Params;
use crate::types::{DelegationDelegatorReward, QueryDelegatorTotalRewardsResponse};
use serde::{Deserialize, Serialize};
use stakedist_types::{AccAddress, DecCoins, ValAddress};

/// Query routes served by [`Keeper::query`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum QueryRequest {
    Params,
    ValidatorCommission { validator: ValAddress },
    WithdrawAddr { delegator: AccAddress },
    CommunityPool,
    DelegatorValidators { delegator: AccAddress },
    DelegationRewards { delegator: AccAddress, validator: ValAddress },
    DelegatorTotalRewards { delegator: AccAddress },
    ValidatorOutstandingRewards { validator: ValAddress },
}

impl Keeper {
    /// Route `request` and return the JSON-encoded response.
    pub fn query(&self, ctx: &mut Context<'_>, request: &QueryRequest) -> Result<Vec<u8>> {
        let bytes = match request {
            QueryRequest::Params => serde_json::to_vec(&self.query_params(ctx)?)?,
            QueryRequest::ValidatorCommission { validator } => {
                serde_json::to_vec(&self.query_validator_commission(ctx, validator)?)?
            }
            QueryRequest::WithdrawAddr { delegator } => {
                serde_json::to_vec(&self.query_withdraw_addr(ctx, delegator)?)?
            }
            QueryRequest::CommunityPool => serde_json::to_vec(&self.query_community_pool(ctx)?)?,
            QueryRequest::DelegatorValidators { delegator } => {
                serde_json::to_vec(&self.query_delegator_validators(delegator)?)?
            }
            QueryRequest::DelegationRewards {
                delegator,
                validator,
            } => serde_json::to_vec(&self.query_delegation_rewards(ctx, delegator, validator)?)?,
            QueryRequest::DelegatorTotalRewards { delegator } => {
                serde_json::to_vec(&self.query_delegator_total_rewards(ctx, delegator)?)?
            }
            QueryRequest::ValidatorOutstandingRewards { validator } => {
                serde_json::to_vec(&self.query_validator_outstanding_rewards(ctx, validator)?)?
            }
        };
        Ok(bytes)
    }

    pub fn query_params(&self, ctx: &Context<'_>) -> Result<Params> {
        self.params(ctx)
    }

    pub fn query_validator_commission(&self, ctx: &Context<'_>, val: &ValAddress) -> Result<DecCoins> {
        self.validator_accumulated_commission(ctx, val)
    }

    pub fn query_withdraw_addr(&self, ctx: &Context<'_>, del: &AccAddress) -> Result<AccAddress> {
        self.delegator_withdraw_addr(ctx, del)
    }

    pub fn query_community_pool(&self, ctx: &Context<'_>) -> Result<DecCoins> {
        Ok(self.fee_pool(ctx)?.community_pool)
    }

    pub fn query_delegator_validators(&self, del: &AccAddress) -> Result<Vec<ValAddress>> {
        Ok(self.delegator_info(del)?.validators)
    }

    pub fn query_validator_outstanding_rewards(&self, ctx: &Context<'_>, val: &ValAddress) -> Result<DecCoins> {
        self.validator_outstanding_rewards(ctx, val)
    }

    /// Rewards `del` would receive from `val` if it withdrew now, before
    /// clamping and truncation.
    pub fn query_delegation_rewards(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        val: &ValAddress,
    ) -> Result<DecCoins> {
        if !self.params(ctx)?.is_on_chain() {
            return Err(DistrError::DistributionTypeOffChain);
        }
        let delegator = self.delegator_info(del)?;
        ctx.simulate(|ctx| self.pending_rewards(ctx, &delegator.address, val))
    }

    pub fn query_delegator_total_rewards(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
    ) -> Result<QueryDelegatorTotalRewardsResponse> {
        if !self.params(ctx)?.is_on_chain() {
            return Err(DistrError::DistributionTypeOffChain);
        }
        let delegator = self.delegator_info(del)?;

        ctx.simulate(|ctx| {
            let mut response = QueryDelegatorTotalRewardsResponse::default();
            for val in &delegator.validators {
                let reward = self.pending_rewards(ctx, &delegator.address, val)?;
                response.total = response.total.add(&reward);
                response.rewards.push(DelegationDelegatorReward {
                    validator_address: *val,
                    reward,
                });
            }
            Ok(response)
        })
    }

    fn pending_rewards(&self, ctx: &mut Context<'_>, del: &AccAddress, val: &ValAddress) -> Result<DecCoins> {
        let validator = self.validator_info(val)?;
        let delegator = self.delegator_info(del)?;
        if !delegator.votes_for(val) {
            return Err(DistrError::NoDelegationDistInfo {
                delegator: *del,
                validator: *val,
            });
        }
        if !self.ensure_starting_info(ctx, &validator, &delegator)? {
            return Ok(DecCoins::empty());
        }
        let ending_period = self.increment_validator_period(ctx, &validator)?;
        self.calculate_delegation_rewards(ctx, &validator, &delegator, ending_period)
    }
}

#[cfg(test)]
mod tests {
    use super::QueryRequest;
    use crate::errors::DistrError;
    use crate::mock::TestInput;
    use crate::params::Params;
    use crate::types::{DistributionType, QueryDelegatorTotalRewardsResponse};
    use stakedist_types::{AccAddress, DecCoins, ValAddress};

    fn stake(amount: &str) -> DecCoins {
        DecCoins::single("stake", amount.parse().unwrap()).unwrap()
    }

    #[test]
    fn reward_query_leaves_store_untouched() {
        let mut input = TestInput::new();
        let val = input.create_validator("0", 100);
        let operator = AccAddress::from(val);
        input.advance_height();
        input.allocate_to_validator(&val, &stake("10"));

        let before = input.store.clone();
        let rewards = input
            .with_ctx(|keeper, ctx| keeper.query_delegation_rewards(ctx, &operator, &val))
            .unwrap();
        assert_eq!(rewards, stake("10"));
        assert_eq!(input.store, before);
    }

    #[test]
    fn total_rewards_cover_every_voted_validator() {
        let mut input = TestInput::new();
        let a = input.create_validator("a", 100);
        let b = input.create_validator("b", 100);
        let del = AccAddress::from_seed(b"del");
        input.delegate(&del, &[a, b], 100);
        input.advance_height();
        input.allocate_to_validator(&a, &stake("10"));
        input.allocate_to_validator(&b, &stake("20"));

        let raw = input
            .with_ctx(|keeper, ctx| {
                keeper.query(ctx, &QueryRequest::DelegatorTotalRewards { delegator: del })
            })
            .unwrap();
        let response: QueryDelegatorTotalRewardsResponse = serde_json::from_slice(&raw).unwrap();
        assert_eq!(response.rewards.len(), 2);
        assert_eq!(response.total, stake("15"));
    }

    #[test]
    fn routes_encode_json() {
        let mut input = TestInput::new();
        let val = input.create_validator("0", 100);

        let raw = input
            .with_ctx(|keeper, ctx| keeper.query(ctx, &QueryRequest::Params))
            .unwrap();
        let params: Params = serde_json::from_slice(&raw).unwrap();
        assert_eq!(params, Params::default());

        let raw = input
            .with_ctx(|keeper, ctx| {
                keeper.query(ctx, &QueryRequest::ValidatorOutstandingRewards { validator: val })
            })
            .unwrap();
        let outstanding: DecCoins = serde_json::from_slice(&raw).unwrap();
        assert!(outstanding.is_zero());

        let raw = input
            .with_ctx(|keeper, ctx| {
                keeper.query(
                    ctx,
                    &QueryRequest::DelegatorValidators {
                        delegator: AccAddress::from(val),
                    },
                )
            })
            .unwrap();
        let validators: Vec<ValAddress> = serde_json::from_slice(&raw).unwrap();
        assert_eq!(validators, vec![val]);
    }

    #[test]
    fn request_wire_format() {
        let request: QueryRequest = serde_json::from_str(r#"{"route":"community_pool"}"#).unwrap();
        assert_eq!(request, QueryRequest::CommunityPool);
    }

    #[test]
    fn off_chain_reward_queries_fail() {
        let mut input = TestInput::new();
        let val = input.create_validator("0", 100);
        input
            .with_ctx(|keeper, ctx| keeper.set_distribution_type(ctx, DistributionType::OffChain))
            .unwrap();
        let err = input
            .with_ctx(|keeper, ctx| keeper.query_delegation_rewards(ctx, &AccAddress::from(val), &val))
            .unwrap_err();
        assert!(matches!(err, DistrError::DistributionTypeOffChain));
    }
}
