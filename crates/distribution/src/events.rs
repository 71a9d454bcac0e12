use serde::{Deserialize, Serialize};
use stakedist_types::{AccAddress, DecCoins, ValAddress};

/// Events emitted by committed distribution operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Commission {
        validator: ValAddress,
        amount: DecCoins,
    },
    Rewards {
        validator: ValAddress,
        amount: DecCoins,
    },
    WithdrawCommission {
        validator: ValAddress,
        amount: DecCoins,
    },
    WithdrawRewards {
        delegator: AccAddress,
        validator: ValAddress,
        amount: DecCoins,
    },
    SetWithdrawAddress {
        delegator: AccAddress,
        withdraw_address: AccAddress,
    },
    CommunityPoolSpend {
        recipient: AccAddress,
        amount: DecCoins,
    },
    ParamChanged {
        key: String,
        value: String,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Commission { .. } => "commission",
            Event::Rewards { .. } => "rewards",
            Event::WithdrawCommission { .. } => "withdraw_commission",
            Event::WithdrawRewards { .. } => "withdraw_rewards",
            Event::SetWithdrawAddress { .. } => "set_withdraw_address",
            Event::CommunityPoolSpend { .. } => "community_pool_spend",
            Event::ParamChanged { .. } => "param_changed",
        }
    }
}
