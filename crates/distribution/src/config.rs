//! Host configuration for the distribution keeper.
//!
//! Values come from an optional TOML file overlaid with `STAKEDIST_*`
//! environment variables, e.g. `STAKEDIST_FEE_COLLECTOR_NAME=fees`.

use crate::errors::{DistrError, Result};
use crate::params::Params;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use stakedist_types::{module_address, AccAddress};
use std::collections::BTreeSet;
use std::path::Path;

pub const ENV_PREFIX: &str = "STAKEDIST";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Name of the module account holding undistributed rewards.
    pub module_name: String,
    /// Name of the module account collecting block fees.
    pub fee_collector_name: String,
    /// Accounts that may never receive rewards or pool spends.
    pub blocked_addresses: Vec<AccAddress>,
    pub genesis_params: Params,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            module_name: "distribution".to_string(),
            fee_collector_name: "fee_collector".to_string(),
            blocked_addresses: Vec::new(),
            genesis_params: Params::default(),
        }
    }
}

impl DistributionConfig {
    /// Load from `path` (if given) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("blocked_addresses"),
        );

        let config: DistributionConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        tracing::info!(
            target: "distribution",
            module = %config.module_name,
            fee_collector = %config.fee_collector_name,
            blocked = config.blocked_addresses.len(),
            "loaded distribution config"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.module_name.is_empty() || self.fee_collector_name.is_empty() {
            return Err(DistrError::InvalidParam(
                "module account names must not be empty".to_string(),
            ));
        }
        if self.module_name == self.fee_collector_name {
            return Err(DistrError::InvalidParam(format!(
                "module account and fee collector share the name {}",
                self.module_name
            )));
        }
        self.genesis_params.validate()
    }

    pub fn module_account(&self) -> AccAddress {
        module_address(&self.module_name)
    }

    pub fn fee_collector_account(&self) -> AccAddress {
        module_address(&self.fee_collector_name)
    }

    /// Configured addresses plus both module accounts.
    pub fn blocked_accounts(&self) -> BTreeSet<AccAddress> {
        let mut blocked: BTreeSet<AccAddress> = self.blocked_addresses.iter().copied().collect();
        blocked.insert(self.module_account());
        blocked.insert(self.fee_collector_account());
        blocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DistributionType;
    use std::io::Write;

    #[test]
    fn loads_toml_file() {
        let blocked = AccAddress::from_seed(b"exchange");
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
module_name = "distr"
blocked_addresses = ["{blocked}"]

[genesis_params]
community_tax = "0.1"
withdraw_addr_enabled = false
reward_truncate_precision = 4
distribution_type = "off_chain"
withdraw_reward_enabled = true
"#
        )
        .unwrap();

        let config = DistributionConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.module_name, "distr");
        assert_eq!(config.genesis_params.community_tax, "0.1".parse().unwrap());
        assert_eq!(config.genesis_params.reward_truncate_precision, 4);
        assert_eq!(config.genesis_params.distribution_type, DistributionType::OffChain);
        assert!(!config.genesis_params.withdraw_addr_enabled);

        let accounts = config.blocked_accounts();
        assert!(accounts.contains(&blocked));
        assert!(accounts.contains(&module_address("distr")));
        assert_eq!(accounts.len(), 3);
    }

    #[test]
    fn environment_overrides_defaults() {
        std::env::set_var("STAKEDIST_FEE_COLLECTOR_NAME", "block_fees");
        let config = DistributionConfig::load(None).unwrap();
        std::env::remove_var("STAKEDIST_FEE_COLLECTOR_NAME");
        assert_eq!(config.fee_collector_name, "block_fees");
        assert_eq!(config.fee_collector_account(), module_address("block_fees"));
    }

    #[test]
    fn rejects_invalid_values() {
        let mut config = DistributionConfig::default();
        config.validate().unwrap();

        config.fee_collector_name = config.module_name.clone();
        assert!(config.validate().is_err());

        let mut config = DistributionConfig::default();
        config.genesis_params.community_tax = "2".parse().unwrap();
        assert!(config.validate().is_err());
    }
}
