//! Accounting telemetry and log setup.
//!
//! The keeper reports totals through an injected [`DistributionTelemetry`]
//! instead of process-wide accumulators, so hosts choose where the numbers
//! go and tests can assert on them.

use parking_lot::Mutex;
use stakedist_types::{AccAddress, DecCoins, ValAddress};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub trait DistributionTelemetry: Send + Sync {
    fn fees_allocated(&self, total: &DecCoins, to_validators: &DecCoins, to_community: &DecCoins);

    fn commission_withdrawn(&self, validator: &ValAddress, amount: &DecCoins);

    fn rewards_withdrawn(&self, delegator: &AccAddress, validator: &ValAddress, amount: &DecCoins);

    /// Computed rewards exceeded the validator's outstanding balance.
    fn rounding_shortfall(&self, validator: &ValAddress, shortfall: &DecCoins);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl DistributionTelemetry for NoopTelemetry {
    fn fees_allocated(&self, _: &DecCoins, _: &DecCoins, _: &DecCoins) {}
    fn commission_withdrawn(&self, _: &ValAddress, _: &DecCoins) {}
    fn rewards_withdrawn(&self, _: &AccAddress, _: &ValAddress, _: &DecCoins) {}
    fn rounding_shortfall(&self, _: &ValAddress, _: &DecCoins) {}
}

// -----------------------------------------------------------------------------
// metrics facade
// -----------------------------------------------------------------------------

/// Forwards totals to whatever `metrics` recorder the host installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsTelemetry;

impl MetricsTelemetry {
    pub fn describe() {
        metrics::describe_gauge!(
            "distribution_fees_allocated",
            "Fees allocated per denom since start, split by destination"
        );
        metrics::describe_gauge!(
            "distribution_commission_withdrawn",
            "Validator commission paid out per denom"
        );
        metrics::describe_gauge!(
            "distribution_rewards_withdrawn",
            "Delegator rewards paid out per denom"
        );
        metrics::describe_counter!(
            "distribution_rounding_shortfalls",
            "Withdrawals clamped to the validator's outstanding rewards"
        );
    }

    fn add(name: &'static str, destination: &'static str, coins: &DecCoins) {
        for coin in coins.iter() {
            metrics::gauge!(name, "denom" => coin.denom.clone(), "destination" => destination)
                .increment(coin.amount.to_f64_lossy());
        }
    }
}

impl DistributionTelemetry for MetricsTelemetry {
    fn fees_allocated(&self, total: &DecCoins, to_validators: &DecCoins, to_community: &DecCoins) {
        Self::add("distribution_fees_allocated", "total", total);
        Self::add("distribution_fees_allocated", "validators", to_validators);
        Self::add("distribution_fees_allocated", "community", to_community);
    }

    fn commission_withdrawn(&self, _validator: &ValAddress, amount: &DecCoins) {
        Self::add("distribution_commission_withdrawn", "validator", amount);
    }

    fn rewards_withdrawn(&self, _delegator: &AccAddress, _validator: &ValAddress, amount: &DecCoins) {
        Self::add("distribution_rewards_withdrawn", "delegator", amount);
    }

    fn rounding_shortfall(&self, _validator: &ValAddress, _shortfall: &DecCoins) {
        metrics::counter!("distribution_rounding_shortfalls").increment(1);
    }
}

// -----------------------------------------------------------------------------
// in-memory recorder for tests
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryRecord {
    FeesAllocated {
        total: DecCoins,
        to_validators: DecCoins,
        to_community: DecCoins,
    },
    CommissionWithdrawn {
        validator: ValAddress,
        amount: DecCoins,
    },
    RewardsWithdrawn {
        delegator: AccAddress,
        validator: ValAddress,
        amount: DecCoins,
    },
    RoundingShortfall {
        validator: ValAddress,
        shortfall: DecCoins,
    },
}

#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    records: Mutex<Vec<TelemetryRecord>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.records.lock().clone()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    /// Sum of every allocation reported so far.
    pub fn total_fees_allocated(&self) -> DecCoins {
        self.records
            .lock()
            .iter()
            .filter_map(|record| match record {
                TelemetryRecord::FeesAllocated { total, .. } => Some(total),
                _ => None,
            })
            .fold(DecCoins::empty(), |acc, total| acc.add(total))
    }

    pub fn shortfall_count(&self) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|record| matches!(record, TelemetryRecord::RoundingShortfall { .. }))
            .count()
    }
}

impl DistributionTelemetry for RecordingTelemetry {
    fn fees_allocated(&self, total: &DecCoins, to_validators: &DecCoins, to_community: &DecCoins) {
        self.records.lock().push(TelemetryRecord::FeesAllocated {
            total: total.clone(),
            to_validators: to_validators.clone(),
            to_community: to_community.clone(),
        });
    }

    fn commission_withdrawn(&self, validator: &ValAddress, amount: &DecCoins) {
        self.records.lock().push(TelemetryRecord::CommissionWithdrawn {
            validator: *validator,
            amount: amount.clone(),
        });
    }

    fn rewards_withdrawn(&self, delegator: &AccAddress, validator: &ValAddress, amount: &DecCoins) {
        self.records.lock().push(TelemetryRecord::RewardsWithdrawn {
            delegator: *delegator,
            validator: *validator,
            amount: amount.clone(),
        });
    }

    fn rounding_shortfall(&self, validator: &ValAddress, shortfall: &DecCoins) {
        self.records.lock().push(TelemetryRecord::RoundingShortfall {
            validator: *validator,
            shortfall: shortfall.clone(),
        });
    }
}

/// Install a global `tracing` subscriber filtered by `RUST_LOG`, falling
/// back to `default_filter`. Returns false if a subscriber already exists.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakedist_types::Dec;

    #[test]
    fn recording_telemetry_accumulates_allocations() {
        let telemetry = RecordingTelemetry::new();
        let fees = DecCoins::single("stake", Dec::from_int(10)).unwrap();
        telemetry.fees_allocated(&fees, &DecCoins::empty(), &fees);
        telemetry.fees_allocated(&fees, &fees, &DecCoins::empty());

        assert_eq!(
            telemetry.total_fees_allocated(),
            DecCoins::single("stake", Dec::from_int(20)).unwrap()
        );
        assert_eq!(telemetry.records().len(), 2);
        telemetry.clear();
        assert!(telemetry.records().is_empty());
    }

    #[test]
    fn metrics_telemetry_without_recorder_is_harmless() {
        MetricsTelemetry::describe();
        let fees = DecCoins::single("stake", Dec::from_int(3)).unwrap();
        MetricsTelemetry.fees_allocated(&fees, &fees, &DecCoins::empty());
        MetricsTelemetry.rounding_shortfall(&ValAddress::from_seed(b"v"), &fees);
    }

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing("debug");
        assert!(!init_tracing("debug"));
    }
}
