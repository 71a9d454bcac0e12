//! Stake Reward Distribution Module
//!
//! Splits each block's collected fees between a community pool and the
//! validators that secured the block, takes validator commission, and lets
//! delegators claim their share lazily through per-validator reward periods
//! instead of crediting every delegation every block.
//!
//! The [`Keeper`] owns all distribution records in a host [`KvStore`] and
//! reaches staking and bank state only through the [`StakingKeeper`] and
//! [`SupplyKeeper`] collaborators. Staking changes reach it through
//! [`StakingHooks`].
//!
//! [`KvStore`]: stakedist_storage::KvStore

pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod expected_keepers;
pub mod genesis;
pub mod keeper;
pub mod keys;
pub mod mock;
pub mod params;
pub mod telemetry;
pub mod types;

pub use config::DistributionConfig;
pub use context::Context;
pub use errors::{DistrError, Result};
pub use events::Event;
pub use expected_keepers::{DelegatorInfo, StakingHooks, StakingKeeper, SupplyKeeper, ValidatorInfo};
pub use genesis::{default_genesis, validate_genesis, GenesisState};
pub use keeper::querier::QueryRequest;
pub use keeper::Keeper;
pub use params::Params;
pub use telemetry::{init_tracing, DistributionTelemetry, MetricsTelemetry, NoopTelemetry, RecordingTelemetry};
pub use types::{
    AllocationSummary, DelegationDelegatorReward, DelegatorStartingInfo, DistributionType, FeePool,
    QueryDelegatorTotalRewardsResponse, ValidatorCurrentRewards, ValidatorHistoricalRewards, VoteInfo,
};
