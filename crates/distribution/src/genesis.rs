//! Genesis import and export.

use crate::context::Context;
use crate::errors::{DistrError, Result};
use crate::keeper::validator::MAX_REFERENCE_COUNT;
use crate::keeper::Keeper;
use crate::params::Params;
use crate::types::{DelegatorStartingInfo, FeePool, ValidatorCurrentRewards, ValidatorHistoricalRewards};
use serde::{Deserialize, Serialize};
use stakedist_types::{AccAddress, ConsAddress, DecCoins, ValAddress};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatorWithdrawInfo {
    pub delegator_address: AccAddress,
    pub withdraw_address: AccAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorOutstandingRewardsRecord {
    pub validator_address: ValAddress,
    pub outstanding_rewards: DecCoins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorAccumulatedCommissionRecord {
    pub validator_address: ValAddress,
    pub accumulated: DecCoins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorHistoricalRewardsRecord {
    pub validator_address: ValAddress,
    pub period: u64,
    pub rewards: ValidatorHistoricalRewards,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorCurrentRewardsRecord {
    pub validator_address: ValAddress,
    pub rewards: ValidatorCurrentRewards,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatorStartingInfoRecord {
    pub delegator_address: AccAddress,
    pub validator_address: ValAddress,
    pub starting_info: DelegatorStartingInfo,
}

/// Full distribution state as written to and read from a genesis file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisState {
    pub params: Params,
    pub fee_pool: FeePool,
    pub delegator_withdraw_infos: Vec<DelegatorWithdrawInfo>,
    pub previous_proposer: Option<ConsAddress>,
    pub outstanding_rewards: Vec<ValidatorOutstandingRewardsRecord>,
    pub validator_accumulated_commissions: Vec<ValidatorAccumulatedCommissionRecord>,
    pub validator_historical_rewards: Vec<ValidatorHistoricalRewardsRecord>,
    pub validator_current_rewards: Vec<ValidatorCurrentRewardsRecord>,
    pub delegator_starting_infos: Vec<DelegatorStartingInfoRecord>,
}

impl GenesisState {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Empty state carrying `params`.
pub fn default_genesis(params: Params) -> GenesisState {
    GenesisState {
        params,
        ..GenesisState::default()
    }
}

/// Stateless sanity checks run before a genesis file is imported.
pub fn validate_genesis(state: &GenesisState) -> Result<()> {
    state.params.validate()?;

    for record in &state.validator_historical_rewards {
        let count = record.rewards.reference_count;
        if count == 0 || count > MAX_REFERENCE_COUNT {
            return Err(DistrError::InvalidParam(format!(
                "historical rewards of {} at period {} have reference count {count}",
                record.validator_address, record.period
            )));
        }
    }
    for record in &state.validator_current_rewards {
        if record.rewards.period == 0 {
            return Err(DistrError::InvalidParam(format!(
                "current rewards of {} are at period 0",
                record.validator_address
            )));
        }
    }
    Ok(())
}

impl Keeper {
    /// Import `state`, checking it against the module account balance.
    pub fn init_genesis(&self, ctx: &mut Context<'_>, state: &GenesisState) -> Result<()> {
        validate_genesis(state)?;

        self.atomic(ctx, |ctx| {
            self.set_params(ctx, &state.params)?;
            self.set_fee_pool(ctx, &state.fee_pool)?;

            for info in &state.delegator_withdraw_infos {
                self.set_delegator_withdraw_addr(ctx, &info.delegator_address, &info.withdraw_address)?;
            }
            if let Some(proposer) = &state.previous_proposer {
                self.set_previous_proposer_cons_addr(ctx, proposer)?;
            }
            for record in &state.outstanding_rewards {
                self.set_validator_outstanding_rewards(ctx, &record.validator_address, &record.outstanding_rewards)?;
            }
            for record in &state.validator_accumulated_commissions {
                self.set_validator_accumulated_commission(ctx, &record.validator_address, &record.accumulated)?;
            }
            for record in &state.validator_historical_rewards {
                self.set_validator_historical_rewards(ctx, &record.validator_address, record.period, &record.rewards)?;
            }
            for record in &state.validator_current_rewards {
                self.set_validator_current_rewards(ctx, &record.validator_address, &record.rewards)?;
            }
            for record in &state.delegator_starting_infos {
                self.set_delegator_starting_info(
                    ctx,
                    &record.validator_address,
                    &record.delegator_address,
                    &record.starting_info,
                )?;
            }

            let expected = self.expected_module_balance(ctx)?;
            let balance = self
                .supply()
                .module_balance(self.module_name())
                .map_err(DistrError::Transfer)?;
            if balance != expected {
                return Err(DistrError::invariant(format!(
                    "distribution module balance {balance} does not match community pool plus outstanding rewards {expected}"
                )));
            }

            info!(
                target: "distribution",
                validators = state.validator_current_rewards.len(),
                starting_infos = state.delegator_starting_infos.len(),
                "initialized distribution genesis"
            );
            Ok(())
        })
    }

    pub fn export_genesis(&self, ctx: &Context<'_>) -> Result<GenesisState> {
        Ok(GenesisState {
            params: self.params(ctx)?,
            fee_pool: self.fee_pool(ctx)?,
            delegator_withdraw_infos: self
                .withdraw_addrs(ctx)?
                .into_iter()
                .map(|(delegator_address, withdraw_address)| DelegatorWithdrawInfo {
                    delegator_address,
                    withdraw_address,
                })
                .collect(),
            previous_proposer: self.previous_proposer_cons_addr(ctx)?,
            outstanding_rewards: self
                .all_validator_outstanding_rewards(ctx)?
                .into_iter()
                .map(|(validator_address, outstanding_rewards)| ValidatorOutstandingRewardsRecord {
                    validator_address,
                    outstanding_rewards,
                })
                .collect(),
            validator_accumulated_commissions: self
                .all_validator_accumulated_commissions(ctx)?
                .into_iter()
                .map(|(validator_address, accumulated)| ValidatorAccumulatedCommissionRecord {
                    validator_address,
                    accumulated,
                })
                .collect(),
            validator_historical_rewards: self
                .all_validator_historical_rewards(ctx)?
                .into_iter()
                .map(|(validator_address, period, rewards)| ValidatorHistoricalRewardsRecord {
                    validator_address,
                    period,
                    rewards,
                })
                .collect(),
            validator_current_rewards: self
                .all_validator_current_rewards(ctx)?
                .into_iter()
                .map(|(validator_address, rewards)| ValidatorCurrentRewardsRecord {
                    validator_address,
                    rewards,
                })
                .collect(),
            delegator_starting_infos: self
                .delegator_starting_infos(ctx)?
                .into_iter()
                .map(|(validator_address, delegator_address, starting_info)| DelegatorStartingInfoRecord {
                    delegator_address,
                    validator_address,
                    starting_info,
                })
                .collect(),
        })
    }
}
