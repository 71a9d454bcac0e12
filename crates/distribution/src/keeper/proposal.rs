//! Governance entry points: community pool spends and parameter changes.

use super::Keeper;
use crate::context::Context;
use crate::errors::{DistrError, Result};
use crate::events::Event;
use crate::params::{validate_community_tax, validate_reward_truncate_precision, Params};
use crate::types::{DistributionType, Transfer};
use stakedist_types::{AccAddress, Dec, DecCoins};
use tracing::info;

impl Keeper {
    /// Pay `amount` out of the community pool to `receiver`.
    pub fn distribute_from_fee_pool(
        &self,
        ctx: &mut Context<'_>,
        amount: &DecCoins,
        receiver: &AccAddress,
    ) -> Result<()> {
        self.atomic(ctx, |ctx| {
            if self.is_blocked(receiver) {
                return Err(DistrError::WithdrawAddrBlocked(*receiver));
            }

            let mut pool = self.fee_pool(ctx)?;
            let remaining = pool.community_pool.checked_sub(amount).ok_or_else(|| {
                DistrError::InsufficientCommunityPool {
                    available: pool.community_pool.to_string(),
                    requested: amount.to_string(),
                }
            })?;
            pool.community_pool = remaining;
            self.set_fee_pool(ctx, &pool)?;

            ctx.queue_transfer(Transfer::ModuleToAccount {
                from: self.module_name().to_string(),
                to: *receiver,
                amount: amount.clone(),
            });
            ctx.emit(Event::CommunityPoolSpend {
                recipient: *receiver,
                amount: amount.clone(),
            });
            info!(target: "distribution", recipient = %receiver, amount = %amount, "spent from community pool");
            Ok(())
        })
    }

    pub fn set_community_tax(&self, ctx: &mut Context<'_>, tax: Dec) -> Result<()> {
        validate_community_tax(&tax)?;
        let value = tax.to_string();
        self.update_param(ctx, "community_tax", value, |params| params.community_tax = tax)
    }

    pub fn set_withdraw_addr_enabled(&self, ctx: &mut Context<'_>, enabled: bool) -> Result<()> {
        self.update_param(ctx, "withdraw_addr_enabled", enabled.to_string(), |params| {
            params.withdraw_addr_enabled = enabled
        })
    }

    pub fn set_reward_truncate_precision(&self, ctx: &mut Context<'_>, precision: i64) -> Result<()> {
        validate_reward_truncate_precision(precision)?;
        self.update_param(ctx, "reward_truncate_precision", precision.to_string(), |params| {
            params.reward_truncate_precision = precision
        })
    }

    pub fn set_distribution_type(&self, ctx: &mut Context<'_>, distribution_type: DistributionType) -> Result<()> {
        let value = serde_json::to_string(&distribution_type)?;
        self.update_param(ctx, "distribution_type", value, |params| {
            params.distribution_type = distribution_type
        })
    }

    pub fn set_withdraw_reward_enabled(&self, ctx: &mut Context<'_>, enabled: bool) -> Result<()> {
        self.update_param(ctx, "withdraw_reward_enabled", enabled.to_string(), |params| {
            params.withdraw_reward_enabled = enabled
        })
    }

    fn update_param<F>(&self, ctx: &mut Context<'_>, key: &str, value: String, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Params),
    {
        self.atomic(ctx, |ctx| {
            let mut params = self.params(ctx)?;
            apply(&mut params);
            self.set_params(ctx, &params)?;
            info!(target: "distribution", key, value = %value, "parameter changed");
            ctx.emit(Event::ParamChanged {
                key: key.to_string(),
                value,
            });
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::DistrError;
    use crate::events::Event;
    use crate::mock::TestInput;
    use crate::types::DistributionType;
    use stakedist_types::{AccAddress, Dec, DecCoins};

    fn stake(amount: &str) -> DecCoins {
        DecCoins::single("stake", amount.parse().unwrap()).unwrap()
    }

    #[test]
    fn community_pool_spend_pays_receiver() {
        let mut input = TestInput::new();
        input.fund_fee_collector(&stake("50"));
        input
            .with_ctx(|keeper, ctx| {
                keeper.allocate_tokens(ctx, 0, &stakedist_types::ConsAddress::from_seed(b"p"), &[])
            })
            .unwrap();

        let receiver = AccAddress::from_seed(b"grantee");
        let events = input.with_ctx(|keeper, ctx| {
            keeper.distribute_from_fee_pool(ctx, &stake("20"), &receiver).unwrap();
            assert_eq!(keeper.fee_pool(ctx).unwrap().community_pool, stake("30"));
            ctx.take_events()
        });
        assert_eq!(input.account_balance(&receiver), stake("20"));
        assert!(matches!(events.last(), Some(Event::CommunityPoolSpend { .. })));
    }

    #[test]
    fn community_pool_spend_checks() {
        let mut input = TestInput::new();
        let receiver = AccAddress::from_seed(b"grantee");
        let module = input.keeper.module_account();

        input.with_ctx(|keeper, ctx| {
            let err = keeper.distribute_from_fee_pool(ctx, &stake("1"), &receiver).unwrap_err();
            assert!(matches!(err, DistrError::InsufficientCommunityPool { .. }));
            let err = keeper.distribute_from_fee_pool(ctx, &stake("1"), &module).unwrap_err();
            assert!(matches!(err, DistrError::WithdrawAddrBlocked(_)));
        });
    }

    #[test]
    fn setters_validate_and_emit() {
        let mut input = TestInput::new();
        input.with_ctx(|keeper, ctx| {
            keeper.set_community_tax(ctx, "0.1".parse().unwrap()).unwrap();
            keeper.set_reward_truncate_precision(ctx, 6).unwrap();
            keeper.set_distribution_type(ctx, DistributionType::OffChain).unwrap();

            let params = keeper.params(ctx).unwrap();
            assert_eq!(params.community_tax, "0.1".parse::<Dec>().unwrap());
            assert_eq!(params.reward_truncate_precision, 6);
            assert_eq!(params.distribution_type, DistributionType::OffChain);

            assert!(matches!(
                keeper.set_community_tax(ctx, Dec::from_int(2)),
                Err(DistrError::InvalidParam(_))
            ));
            assert!(matches!(
                keeper.set_reward_truncate_precision(ctx, 19),
                Err(DistrError::InvalidParam(_))
            ));

            let events = ctx.take_events();
            assert_eq!(events.len(), 3);
            assert_eq!(
                events[2],
                Event::ParamChanged {
                    key: "distribution_type".to_string(),
                    value: "\"off_chain\"".to_string(),
                }
            );
        });
    }
}
