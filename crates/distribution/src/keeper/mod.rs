//! Distribution keeper
//!
//! Owns every distribution record in the host store and implements fee
//! allocation, the validator period state machine, lazy delegator accrual,
//! withdrawals, staking hooks, queries and invariant checks. Public
//! operations run atomically on a branch of the caller's [`Context`].

pub mod allocation;
pub mod delegation;
pub mod hooks;
pub mod invariants;
pub mod proposal;
pub mod querier;
pub mod store;
pub mod validator;
pub mod withdraw;

use crate::config::DistributionConfig;
use crate::context::Context;
use crate::errors::{DistrError, Result};
use crate::expected_keepers::{DelegatorInfo, StakingKeeper, SupplyKeeper, ValidatorInfo};
use crate::telemetry::DistributionTelemetry;
use stakedist_types::{module_address, AccAddress, ValAddress};
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct Keeper {
    staking: Arc<dyn StakingKeeper>,
    supply: Arc<dyn SupplyKeeper>,
    telemetry: Arc<dyn DistributionTelemetry>,
    module_name: String,
    fee_collector_name: String,
    blocked: BTreeSet<AccAddress>,
}

impl Keeper {
    pub fn new(
        config: &DistributionConfig,
        staking: Arc<dyn StakingKeeper>,
        supply: Arc<dyn SupplyKeeper>,
        telemetry: Arc<dyn DistributionTelemetry>,
    ) -> Self {
        Self {
            staking,
            supply,
            telemetry,
            module_name: config.module_name.clone(),
            fee_collector_name: config.fee_collector_name.clone(),
            blocked: config.blocked_accounts(),
        }
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn fee_collector_name(&self) -> &str {
        &self.fee_collector_name
    }

    pub fn module_account(&self) -> AccAddress {
        module_address(&self.module_name)
    }

    /// Module accounts and configured addresses cannot receive payouts.
    pub fn is_blocked(&self, address: &AccAddress) -> bool {
        self.blocked.contains(address)
    }

    pub fn staking(&self) -> &dyn StakingKeeper {
        self.staking.as_ref()
    }

    pub fn supply(&self) -> &dyn SupplyKeeper {
        self.supply.as_ref()
    }

    pub(crate) fn telemetry(&self) -> &dyn DistributionTelemetry {
        self.telemetry.as_ref()
    }

    pub(crate) fn atomic<T, F>(&self, ctx: &mut Context<'_>, f: F) -> Result<T>
    where
        F: FnOnce(&mut Context<'_>) -> Result<T>,
    {
        ctx.atomic(self.supply.as_ref(), f)
    }

    pub(crate) fn validator_info(&self, val: &ValAddress) -> Result<ValidatorInfo> {
        self.staking
            .validator(val)
            .ok_or(DistrError::UnknownValidator(*val))
    }

    pub(crate) fn delegator_info(&self, del: &AccAddress) -> Result<DelegatorInfo> {
        self.staking
            .delegator(del)
            .ok_or(DistrError::UnknownDelegator(*del))
    }
}
