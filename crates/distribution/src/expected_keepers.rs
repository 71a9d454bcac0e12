//! Interfaces of the collaborators the distribution keeper depends on.
//!
//! The staking subsystem and the token ledger live outside this crate; the
//! keeper only sees them through these traits.

use crate::context::Context;
use crate::errors::Result as DistrResult;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use stakedist_types::{AccAddress, ConsAddress, Dec, DecCoins, ValAddress};

/// Snapshot of a validator as seen by distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorInfo {
    pub operator: ValAddress,
    pub cons_address: ConsAddress,
    /// Total shares delegated to the validator.
    pub delegator_shares: Dec,
    pub commission_rate: Dec,
    pub jailed: bool,
}

/// Snapshot of a delegator as seen by distribution.
///
/// A delegator votes its whole share balance for every validator it lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatorInfo {
    pub address: AccAddress,
    pub shares: Dec,
    pub validators: Vec<ValAddress>,
}

impl DelegatorInfo {
    pub fn votes_for(&self, validator: &ValAddress) -> bool {
        self.validators.contains(validator)
    }
}

/// Read access to the staking subsystem.
pub trait StakingKeeper: Send + Sync {
    fn validator(&self, operator: &ValAddress) -> Option<ValidatorInfo>;

    fn validator_by_cons_addr(&self, cons: &ConsAddress) -> Option<ValidatorInfo>;

    /// Bonded validators in operator address order.
    fn bonded_validators(&self) -> Vec<ValidatorInfo>;

    /// Every known validator in operator address order.
    fn all_validators(&self) -> Vec<ValidatorInfo>;

    fn delegator(&self, address: &AccAddress) -> Option<DelegatorInfo>;
}

/// Module-account view of the token ledger.
pub trait SupplyKeeper: Send + Sync {
    fn module_balance(&self, module: &str) -> Result<DecCoins>;

    fn send_coins_from_module_to_module(
        &self,
        from_module: &str,
        to_module: &str,
        amount: &DecCoins,
    ) -> Result<()>;

    fn send_coins_from_module_to_account(
        &self,
        from_module: &str,
        to: &AccAddress,
        amount: &DecCoins,
    ) -> Result<()>;
}

/// Callbacks fired by the staking subsystem around stake changes.
///
/// `before_*` hooks run strictly before the change is applied, `after_*`
/// hooks right after it.
pub trait StakingHooks {
    fn after_validator_created(&self, ctx: &mut Context<'_>, val: &ValAddress) -> DistrResult<()>;

    fn before_validator_modified(&self, _ctx: &mut Context<'_>, _val: &ValAddress) -> DistrResult<()> {
        Ok(())
    }

    fn after_validator_removed(
        &self,
        ctx: &mut Context<'_>,
        cons: &ConsAddress,
        val: &ValAddress,
    ) -> DistrResult<()>;

    fn after_validator_bonded(
        &self,
        _ctx: &mut Context<'_>,
        _cons: &ConsAddress,
        _val: &ValAddress,
    ) -> DistrResult<()> {
        Ok(())
    }

    fn after_validator_begin_unbonding(
        &self,
        _ctx: &mut Context<'_>,
        _cons: &ConsAddress,
        _val: &ValAddress,
    ) -> DistrResult<()> {
        Ok(())
    }

    fn before_delegation_created(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        vals: &[ValAddress],
    ) -> DistrResult<()>;

    fn before_delegation_shares_modified(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        vals: &[ValAddress],
    ) -> DistrResult<()>;

    fn before_delegation_removed(
        &self,
        _ctx: &mut Context<'_>,
        _del: &AccAddress,
        _val: &ValAddress,
    ) -> DistrResult<()> {
        Ok(())
    }

    fn after_delegation_modified(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        vals: &[ValAddress],
    ) -> DistrResult<()>;
}
