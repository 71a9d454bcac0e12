//! Typed accessors over the distribution key space.

use super::Keeper;
use crate::context::Context;
use crate::errors::Result;
use crate::keys;
use crate::params::Params;
use crate::types::{
    DelegatorStartingInfo, FeePool, ValidatorCurrentRewards, ValidatorHistoricalRewards,
};
use stakedist_storage::{decode, get_value, set_value};
use stakedist_types::{AccAddress, ConsAddress, DecCoins, ValAddress};

impl Keeper {
    // ---- params -----------------------------------------------------------

    /// Stored parameters, or the defaults before genesis wrote any.
    pub fn params(&self, ctx: &Context<'_>) -> Result<Params> {
        Ok(get_value(ctx.store(), keys::PARAMS_KEY)?.unwrap_or_default())
    }

    pub fn set_params(&self, ctx: &mut Context<'_>, params: &Params) -> Result<()> {
        params.validate()?;
        Ok(set_value(ctx.store_mut(), keys::PARAMS_KEY, params)?)
    }

    // ---- fee pool ---------------------------------------------------------

    pub fn fee_pool(&self, ctx: &Context<'_>) -> Result<FeePool> {
        Ok(get_value(ctx.store(), keys::FEE_POOL_KEY)?.unwrap_or_default())
    }

    pub fn set_fee_pool(&self, ctx: &mut Context<'_>, pool: &FeePool) -> Result<()> {
        Ok(set_value(ctx.store_mut(), keys::FEE_POOL_KEY, pool)?)
    }

    pub(crate) fn add_to_community_pool(&self, ctx: &mut Context<'_>, coins: &DecCoins) -> Result<()> {
        if coins.is_zero() {
            return Ok(());
        }
        let mut pool = self.fee_pool(ctx)?;
        pool.community_pool = pool.community_pool.add(coins);
        self.set_fee_pool(ctx, &pool)
    }

    // ---- previous proposer ------------------------------------------------

    pub fn previous_proposer_cons_addr(&self, ctx: &Context<'_>) -> Result<Option<ConsAddress>> {
        Ok(get_value(ctx.store(), keys::PROPOSER_KEY)?)
    }

    pub fn set_previous_proposer_cons_addr(
        &self,
        ctx: &mut Context<'_>,
        cons: &ConsAddress,
    ) -> Result<()> {
        Ok(set_value(ctx.store_mut(), keys::PROPOSER_KEY, cons)?)
    }

    // ---- withdraw addresses -----------------------------------------------

    /// Where `del`'s payouts go; the delegator itself unless redirected.
    pub fn delegator_withdraw_addr(&self, ctx: &Context<'_>, del: &AccAddress) -> Result<AccAddress> {
        Ok(get_value(ctx.store(), &keys::delegator_withdraw_addr_key(del))?.unwrap_or(*del))
    }

    pub(crate) fn set_delegator_withdraw_addr(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        withdraw: &AccAddress,
    ) -> Result<()> {
        Ok(set_value(
            ctx.store_mut(),
            &keys::delegator_withdraw_addr_key(del),
            withdraw,
        )?)
    }

    pub fn withdraw_addrs(&self, ctx: &Context<'_>) -> Result<Vec<(AccAddress, AccAddress)>> {
        ctx.store()
            .prefix_scan(&[keys::DELEGATOR_WITHDRAW_ADDR_PREFIX])?
            .into_iter()
            .map(|(key, value)| Ok((keys::delegator_from_key(&key)?, decode(&value)?)))
            .collect()
    }

    // ---- starting infos ---------------------------------------------------

    pub fn delegator_starting_info(
        &self,
        ctx: &Context<'_>,
        val: &ValAddress,
        del: &AccAddress,
    ) -> Result<Option<DelegatorStartingInfo>> {
        Ok(get_value(
            ctx.store(),
            &keys::delegator_starting_info_key(val, del),
        )?)
    }

    pub fn has_delegator_starting_info(
        &self,
        ctx: &Context<'_>,
        val: &ValAddress,
        del: &AccAddress,
    ) -> Result<bool> {
        Ok(ctx
            .store()
            .has(&keys::delegator_starting_info_key(val, del))?)
    }

    pub(crate) fn set_delegator_starting_info(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
        del: &AccAddress,
        info: &DelegatorStartingInfo,
    ) -> Result<()> {
        Ok(set_value(
            ctx.store_mut(),
            &keys::delegator_starting_info_key(val, del),
            info,
        )?)
    }

    pub(crate) fn delete_delegator_starting_info(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
        del: &AccAddress,
    ) -> Result<()> {
        Ok(ctx
            .store_mut()
            .delete(&keys::delegator_starting_info_key(val, del))?)
    }

    pub fn delegator_starting_infos(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Vec<(ValAddress, AccAddress, DelegatorStartingInfo)>> {
        self.scan_starting_infos(ctx, &[keys::DELEGATOR_STARTING_INFO_PREFIX])
    }

    pub fn validator_starting_infos(
        &self,
        ctx: &Context<'_>,
        val: &ValAddress,
    ) -> Result<Vec<(ValAddress, AccAddress, DelegatorStartingInfo)>> {
        self.scan_starting_infos(ctx, &keys::delegator_starting_info_prefix(val))
    }

    fn scan_starting_infos(
        &self,
        ctx: &Context<'_>,
        prefix: &[u8],
    ) -> Result<Vec<(ValAddress, AccAddress, DelegatorStartingInfo)>> {
        ctx.store()
            .prefix_scan(prefix)?
            .into_iter()
            .map(|(key, value)| {
                let (val, del) = keys::split_starting_info_key(&key)?;
                Ok((val, del, decode(&value)?))
            })
            .collect()
    }

    // ---- historical rewards -----------------------------------------------

    pub fn validator_historical_rewards(
        &self,
        ctx: &Context<'_>,
        val: &ValAddress,
        period: u64,
    ) -> Result<Option<ValidatorHistoricalRewards>> {
        Ok(get_value(
            ctx.store(),
            &keys::validator_historical_rewards_key(val, period),
        )?)
    }

    pub(crate) fn set_validator_historical_rewards(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
        period: u64,
        rewards: &ValidatorHistoricalRewards,
    ) -> Result<()> {
        Ok(set_value(
            ctx.store_mut(),
            &keys::validator_historical_rewards_key(val, period),
            rewards,
        )?)
    }

    pub(crate) fn delete_validator_historical_reward(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
        period: u64,
    ) -> Result<()> {
        Ok(ctx
            .store_mut()
            .delete(&keys::validator_historical_rewards_key(val, period))?)
    }

    pub(crate) fn delete_validator_historical_rewards(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
    ) -> Result<()> {
        let entries = ctx
            .store()
            .prefix_scan(&keys::validator_historical_rewards_prefix(val))?;
        for (key, _) in entries {
            ctx.store_mut().delete(&key)?;
        }
        Ok(())
    }

    pub fn all_validator_historical_rewards(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Vec<(ValAddress, u64, ValidatorHistoricalRewards)>> {
        ctx.store()
            .prefix_scan(&[keys::VALIDATOR_HISTORICAL_REWARDS_PREFIX])?
            .into_iter()
            .map(|(key, value)| {
                let (val, period) = keys::split_historical_rewards_key(&key)?;
                Ok((val, period, decode(&value)?))
            })
            .collect()
    }

    // ---- current rewards --------------------------------------------------

    pub fn validator_current_rewards(
        &self,
        ctx: &Context<'_>,
        val: &ValAddress,
    ) -> Result<Option<ValidatorCurrentRewards>> {
        Ok(get_value(
            ctx.store(),
            &keys::validator_current_rewards_key(val),
        )?)
    }

    pub(crate) fn set_validator_current_rewards(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
        rewards: &ValidatorCurrentRewards,
    ) -> Result<()> {
        Ok(set_value(
            ctx.store_mut(),
            &keys::validator_current_rewards_key(val),
            rewards,
        )?)
    }

    pub(crate) fn delete_validator_current_rewards(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
    ) -> Result<()> {
        Ok(ctx
            .store_mut()
            .delete(&keys::validator_current_rewards_key(val))?)
    }

    pub fn all_validator_current_rewards(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Vec<(ValAddress, ValidatorCurrentRewards)>> {
        self.scan_by_validator(ctx, keys::VALIDATOR_CURRENT_REWARDS_PREFIX)
    }

    // ---- accumulated commission -------------------------------------------

    pub fn validator_accumulated_commission(
        &self,
        ctx: &Context<'_>,
        val: &ValAddress,
    ) -> Result<DecCoins> {
        Ok(get_value(
            ctx.store(),
            &keys::validator_accumulated_commission_key(val),
        )?
        .unwrap_or_default())
    }

    pub(crate) fn set_validator_accumulated_commission(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
        commission: &DecCoins,
    ) -> Result<()> {
        Ok(set_value(
            ctx.store_mut(),
            &keys::validator_accumulated_commission_key(val),
            commission,
        )?)
    }

    pub(crate) fn delete_validator_accumulated_commission(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
    ) -> Result<()> {
        Ok(ctx
            .store_mut()
            .delete(&keys::validator_accumulated_commission_key(val))?)
    }

    pub fn all_validator_accumulated_commissions(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Vec<(ValAddress, DecCoins)>> {
        self.scan_by_validator(ctx, keys::VALIDATOR_ACCUMULATED_COMMISSION_PREFIX)
    }

    // ---- outstanding rewards ----------------------------------------------

    pub fn validator_outstanding_rewards(
        &self,
        ctx: &Context<'_>,
        val: &ValAddress,
    ) -> Result<DecCoins> {
        Ok(get_value(
            ctx.store(),
            &keys::outstanding_rewards_key(val),
        )?
        .unwrap_or_default())
    }

    pub(crate) fn set_validator_outstanding_rewards(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
        rewards: &DecCoins,
    ) -> Result<()> {
        Ok(set_value(
            ctx.store_mut(),
            &keys::outstanding_rewards_key(val),
            rewards,
        )?)
    }

    pub(crate) fn delete_validator_outstanding_rewards(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
    ) -> Result<()> {
        Ok(ctx
            .store_mut()
            .delete(&keys::outstanding_rewards_key(val))?)
    }

    pub fn all_validator_outstanding_rewards(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Vec<(ValAddress, DecCoins)>> {
        self.scan_by_validator(ctx, keys::OUTSTANDING_REWARDS_PREFIX)
    }

    fn scan_by_validator<T: serde::de::DeserializeOwned>(
        &self,
        ctx: &Context<'_>,
        prefix: u8,
    ) -> Result<Vec<(ValAddress, T)>> {
        ctx.store()
            .prefix_scan(&[prefix])?
            .into_iter()
            .map(|(key, value)| Ok((keys::validator_from_key(&key)?, decode(&value)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use crate::mock::TestInput;
    use crate::types::ValidatorHistoricalRewards;
    use stakedist_storage::MemStore;
    use stakedist_types::{AccAddress, DecCoins, ValAddress};

    #[test]
    fn withdraw_address_defaults_to_delegator() {
        let input = TestInput::new();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        let del = AccAddress::from_seed(b"del");
        let target = AccAddress::from_seed(b"target");

        assert_eq!(input.keeper.delegator_withdraw_addr(&ctx, &del).unwrap(), del);
        input
            .keeper
            .set_delegator_withdraw_addr(&mut ctx, &del, &target)
            .unwrap();
        assert_eq!(input.keeper.delegator_withdraw_addr(&ctx, &del).unwrap(), target);
        assert_eq!(input.keeper.withdraw_addrs(&ctx).unwrap(), vec![(del, target)]);
    }

    #[test]
    fn historical_rewards_iterate_in_period_order() {
        let input = TestInput::new();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        let val = ValAddress::from_seed(b"val");
        let record = ValidatorHistoricalRewards::new(DecCoins::empty(), 1);

        for period in [300u64, 2, 17] {
            input
                .keeper
                .set_validator_historical_rewards(&mut ctx, &val, period, &record)
                .unwrap();
        }
        let periods: Vec<u64> = input
            .keeper
            .all_validator_historical_rewards(&ctx)
            .unwrap()
            .into_iter()
            .map(|(_, period, _)| period)
            .collect();
        assert_eq!(periods, vec![2, 17, 300]);

        input
            .keeper
            .delete_validator_historical_rewards(&mut ctx, &val)
            .unwrap();
        assert!(input.keeper.all_validator_historical_rewards(&ctx).unwrap().is_empty());
    }
}
