use stakedist_storage::StoreError;
use stakedist_types::{AccAddress, TypesError, ValAddress};
use thiserror::Error;

/// Errors returned by the distribution keeper.
#[derive(Debug, Error)]
pub enum DistrError {
    // ---- caller input ---------------------------------------------------
    #[error("validator {0} does not exist")]
    UnknownValidator(ValAddress),

    #[error("delegator {0} does not exist")]
    UnknownDelegator(AccAddress),

    #[error("delegator {delegator} has no distribution info for validator {validator}")]
    NoDelegationDistInfo {
        delegator: AccAddress,
        validator: ValAddress,
    },

    #[error("delegator {delegator} has zero shares on validator {validator}")]
    ZeroDelegationShares {
        delegator: AccAddress,
        validator: ValAddress,
    },

    #[error("validator {0} has no accumulated commission")]
    NoValidatorCommission(ValAddress),

    #[error("set withdraw address is disabled")]
    SetWithdrawAddrDisabled,

    #[error("address {0} is not allowed to receive funds")]
    WithdrawAddrBlocked(AccAddress),

    #[error("withdrawing delegation rewards is disabled")]
    WithdrawRewardDisabled,

    #[error("delegator rewards are distributed off-chain")]
    DistributionTypeOffChain,

    #[error("community pool holds {available}, cannot spend {requested}")]
    InsufficientCommunityPool { available: String, requested: String },

    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    // ---- ledger corruption ----------------------------------------------
    #[error("distribution invariant violated: {0}")]
    Invariant(String),

    // ---- infrastructure -------------------------------------------------
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("arithmetic error: {0}")]
    Types(#[from] TypesError),

    #[error("coin transfer failed: {0}")]
    Transfer(#[source] anyhow::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl DistrError {
    /// Log and build an invariant violation.
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(target: "distribution", %message, "invariant violation");
        DistrError::Invariant(message)
    }

    /// True when the ledger itself is inconsistent and the host should halt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DistrError::Invariant(_))
    }
}

pub type Result<T> = std::result::Result<T, DistrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invariants_are_fatal() {
        assert!(DistrError::Invariant("negative ratio".into()).is_fatal());
        assert!(!DistrError::SetWithdrawAddrDisabled.is_fatal());
        assert!(!DistrError::Transfer(anyhow::anyhow!("bank offline")).is_fatal());
    }

    #[test]
    fn messages_name_the_subject() {
        let val = ValAddress::from_seed(b"val");
        let msg = DistrError::NoValidatorCommission(val).to_string();
        assert!(msg.contains(&val.to_string()));
    }
}
