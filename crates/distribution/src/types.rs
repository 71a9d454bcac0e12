//! Persisted distribution records and the value types exchanged with hosts.

use serde::{Deserialize, Serialize};
use stakedist_types::{AccAddress, ConsAddress, Dec, DecCoins, ValAddress};

/// Global pool absorbing every remainder that cannot be attributed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePool {
    pub community_pool: DecCoins,
}

/// Rewards accrued by a validator during its open period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorCurrentRewards {
    pub rewards: DecCoins,
    pub period: u64,
}

impl ValidatorCurrentRewards {
    pub fn new(rewards: DecCoins, period: u64) -> Self {
        Self { rewards, period }
    }
}

/// Checkpoint of the per-share reward ratio at the close of a period.
///
/// `reference_count` counts the validator's own pointer (held on the
/// latest closed period) plus every delegation checkpoint starting here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorHistoricalRewards {
    pub cumulative_reward_ratio: DecCoins,
    pub reference_count: u16,
}

impl ValidatorHistoricalRewards {
    pub fn new(cumulative_reward_ratio: DecCoins, reference_count: u16) -> Self {
        Self {
            cumulative_reward_ratio,
            reference_count,
        }
    }
}

/// Where a delegation started accruing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatorStartingInfo {
    pub previous_period: u64,
    pub stake: Dec,
    pub height: u64,
}

impl DelegatorStartingInfo {
    pub fn new(previous_period: u64, stake: Dec, height: u64) -> Self {
        Self {
            previous_period,
            stake,
            height,
        }
    }
}

/// How fees reach delegators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionType {
    /// Per-delegator accounting on the ledger.
    #[default]
    OnChain,
    /// Validators receive everything as commission and settle delegators themselves.
    OffChain,
}

/// A previous-block vote as reported by consensus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteInfo {
    pub validator: ConsAddress,
    pub power: i64,
    pub signed_last_block: bool,
}

impl VoteInfo {
    pub fn new(validator: ConsAddress, power: i64, signed_last_block: bool) -> Self {
        Self {
            validator,
            power,
            signed_last_block,
        }
    }
}

/// Breakdown of one block's fee allocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSummary {
    pub total: DecCoins,
    pub to_validators: DecCoins,
    pub to_community: DecCoins,
}

/// Rewards owed to a delegator by one validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationDelegatorReward {
    pub validator_address: ValAddress,
    pub reward: DecCoins,
}

/// Response of the delegator total rewards query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDelegatorTotalRewardsResponse {
    pub rewards: Vec<DelegationDelegatorReward>,
    pub total: DecCoins,
}

/// A pending coin movement executed when the enclosing operation commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transfer {
    ModuleToModule {
        from: String,
        to: String,
        amount: DecCoins,
    },
    ModuleToAccount {
        from: String,
        to: AccAddress,
        amount: DecCoins,
    },
}
