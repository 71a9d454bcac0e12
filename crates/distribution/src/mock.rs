//! In-memory collaborators and a test harness.
//!
//! [`MockStakingKeeper`] and [`MockSupplyKeeper`] stand in for the host's
//! staking and bank modules. [`TestInput`] wires them to a [`Keeper`] over a
//! [`MemStore`] and drives the staking hooks in the order a staking module
//! fires them. Its helpers panic on failure, like any test fixture.

use crate::config::DistributionConfig;
use crate::context::Context;
use crate::errors::Result as DistrResult;
use crate::expected_keepers::{DelegatorInfo, StakingHooks, StakingKeeper, SupplyKeeper, ValidatorInfo};
use crate::genesis::default_genesis;
use crate::keeper::Keeper;
use crate::telemetry::RecordingTelemetry;
use crate::types::{AllocationSummary, VoteInfo};
use anyhow::{anyhow, Result};
use parking_lot::{Mutex, RwLock};
use stakedist_storage::MemStore;
use stakedist_types::{AccAddress, ConsAddress, Dec, DecCoins, ValAddress};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

// -----------------------------------------------------------------------------
// Staking
// -----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct StakingState {
    validators: BTreeMap<ValAddress, ValidatorInfo>,
    bonded: BTreeSet<ValAddress>,
    delegators: BTreeMap<AccAddress, DelegatorInfo>,
}

/// Staking view backed by plain maps. Validators are bonded when added.
#[derive(Debug, Default)]
pub struct MockStakingKeeper {
    state: RwLock<StakingState>,
}

impl MockStakingKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_validator(&self, validator: ValidatorInfo) {
        let mut state = self.state.write();
        state.bonded.insert(validator.operator);
        state.validators.insert(validator.operator, validator);
    }

    pub fn update_validator<F: FnOnce(&mut ValidatorInfo)>(&self, operator: &ValAddress, update: F) {
        if let Some(validator) = self.state.write().validators.get_mut(operator) {
            update(validator);
        }
    }

    /// Drop a validator and strip it from every delegator's vote set.
    pub fn remove_validator(&self, operator: &ValAddress) -> Option<ValidatorInfo> {
        let mut state = self.state.write();
        state.bonded.remove(operator);
        for delegator in state.delegators.values_mut() {
            delegator.validators.retain(|val| val != operator);
        }
        state.validators.remove(operator)
    }

    pub fn set_bonded(&self, operator: &ValAddress, bonded: bool) {
        let mut state = self.state.write();
        if bonded {
            state.bonded.insert(*operator);
        } else {
            state.bonded.remove(operator);
        }
    }

    pub fn jail(&self, operator: &ValAddress) {
        self.update_validator(operator, |validator| validator.jailed = true);
    }

    pub fn set_delegator(&self, delegator: DelegatorInfo) {
        self.state.write().delegators.insert(delegator.address, delegator);
    }

    pub fn remove_delegator(&self, address: &AccAddress) -> Option<DelegatorInfo> {
        self.state.write().delegators.remove(address)
    }
}

impl StakingKeeper for MockStakingKeeper {
    fn validator(&self, operator: &ValAddress) -> Option<ValidatorInfo> {
        self.state.read().validators.get(operator).cloned()
    }

    fn validator_by_cons_addr(&self, cons: &ConsAddress) -> Option<ValidatorInfo> {
        self.state
            .read()
            .validators
            .values()
            .find(|validator| &validator.cons_address == cons)
            .cloned()
    }

    fn bonded_validators(&self) -> Vec<ValidatorInfo> {
        let state = self.state.read();
        state
            .bonded
            .iter()
            .filter_map(|operator| state.validators.get(operator).cloned())
            .collect()
    }

    fn all_validators(&self) -> Vec<ValidatorInfo> {
        self.state.read().validators.values().cloned().collect()
    }

    fn delegator(&self, address: &AccAddress) -> Option<DelegatorInfo> {
        self.state.read().delegators.get(address).cloned()
    }
}

// -----------------------------------------------------------------------------
// Supply
// -----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SupplyState {
    modules: BTreeMap<String, DecCoins>,
    accounts: BTreeMap<AccAddress, DecCoins>,
}

/// Bank stand-in holding module and account balances. Sends fail when the
/// source module cannot cover them.
#[derive(Debug, Default)]
pub struct MockSupplyKeeper {
    state: Mutex<SupplyState>,
}

impl MockSupplyKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint_to_module(&self, module: &str, amount: &DecCoins) {
        let mut state = self.state.lock();
        let balance = state.modules.entry(module.to_string()).or_default();
        *balance = balance.add(amount);
    }

    pub fn burn_from_module(&self, module: &str, amount: &DecCoins) -> Result<()> {
        let mut state = self.state.lock();
        debit(&mut state.modules, module, amount)
    }

    pub fn account_balance(&self, address: &AccAddress) -> DecCoins {
        self.state.lock().accounts.get(address).cloned().unwrap_or_default()
    }
}

fn debit(modules: &mut BTreeMap<String, DecCoins>, module: &str, amount: &DecCoins) -> Result<()> {
    let balance = modules.get(module).cloned().unwrap_or_default();
    let remaining = balance
        .checked_sub(amount)
        .ok_or_else(|| anyhow!("insufficient funds in module {module}: {balance} < {amount}"))?;
    modules.insert(module.to_string(), remaining);
    Ok(())
}

impl SupplyKeeper for MockSupplyKeeper {
    fn module_balance(&self, module: &str) -> Result<DecCoins> {
        Ok(self.state.lock().modules.get(module).cloned().unwrap_or_default())
    }

    fn send_coins_from_module_to_module(&self, from: &str, to: &str, amount: &DecCoins) -> Result<()> {
        let mut state = self.state.lock();
        debit(&mut state.modules, from, amount)?;
        let balance = state.modules.entry(to.to_string()).or_default();
        *balance = balance.add(amount);
        Ok(())
    }

    fn send_coins_from_module_to_account(&self, from: &str, to: &AccAddress, amount: &DecCoins) -> Result<()> {
        let mut state = self.state.lock();
        debit(&mut state.modules, from, amount)?;
        let balance = state.accounts.entry(*to).or_default();
        *balance = balance.add(amount);
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Harness
// -----------------------------------------------------------------------------

/// A keeper over fresh mocks and an in-memory store, initialized from the
/// default genesis at height 1.
pub struct TestInput {
    pub keeper: Keeper,
    pub config: DistributionConfig,
    pub staking: Arc<MockStakingKeeper>,
    pub supply: Arc<MockSupplyKeeper>,
    pub telemetry: Arc<RecordingTelemetry>,
    pub store: MemStore,
    pub height: u64,
}

impl Default for TestInput {
    fn default() -> Self {
        Self::new()
    }
}

impl TestInput {
    pub fn new() -> Self {
        Self::with_config(DistributionConfig::default())
    }

    pub fn with_config(config: DistributionConfig) -> Self {
        let staking = Arc::new(MockStakingKeeper::new());
        let supply = Arc::new(MockSupplyKeeper::new());
        let telemetry = Arc::new(RecordingTelemetry::new());
        let keeper = Keeper::new(&config, staking.clone(), supply.clone(), telemetry.clone());

        let mut input = Self {
            keeper,
            config,
            staking,
            supply,
            telemetry,
            store: MemStore::new(),
            height: 1,
        };
        let genesis = default_genesis(input.config.genesis_params.clone());
        input.hook("init_genesis", |keeper, ctx| keeper.init_genesis(ctx, &genesis));
        input
    }

    /// Run `f` against a context over the harness store at the current height.
    pub fn with_ctx<T, F>(&mut self, f: F) -> T
    where
        F: FnOnce(&Keeper, &mut Context<'_>) -> T,
    {
        let mut ctx = Context::new(&mut self.store, self.height);
        f(&self.keeper, &mut ctx)
    }

    fn hook<F>(&mut self, what: &str, f: F)
    where
        F: FnOnce(&Keeper, &mut Context<'_>) -> DistrResult<()>,
    {
        if let Err(err) = self.with_ctx(f) {
            panic!("{what} failed: {err}");
        }
    }

    pub fn advance_height(&mut self) {
        self.height += 1;
    }

    pub fn create_validator(&mut self, name: &str, self_delegation: i64) -> ValAddress {
        self.create_validator_with_commission(name, Dec::zero(), self_delegation)
    }

    /// Register a bonded validator named `name` and self-delegate to it.
    pub fn create_validator_with_commission(
        &mut self,
        name: &str,
        commission_rate: Dec,
        self_delegation: i64,
    ) -> ValAddress {
        let operator = ValAddress::from_seed(name.as_bytes());
        self.staking.set_validator(ValidatorInfo {
            operator,
            cons_address: ConsAddress::from_seed(name.as_bytes()),
            delegator_shares: Dec::zero(),
            commission_rate,
            jailed: false,
        });
        self.hook("after_validator_created", |keeper, ctx| {
            keeper.after_validator_created(ctx, &operator)
        });

        if self_delegation > 0 {
            self.delegate(&AccAddress::from(operator), &[operator], self_delegation);
        }
        operator
    }

    /// Add `amount` shares to `del` and make `vals` its vote set. Every
    /// voted validator carries the delegator's full shares.
    pub fn delegate(&mut self, del: &AccAddress, vals: &[ValAddress], amount: i64) {
        let existing = self.staking.delegator(del);
        let previous = existing.clone().unwrap_or(DelegatorInfo {
            address: *del,
            shares: Dec::zero(),
            validators: Vec::new(),
        });
        let added: Vec<ValAddress> = vals
            .iter()
            .filter(|val| !previous.validators.contains(val))
            .copied()
            .collect();

        match existing {
            None => self.hook("before_delegation_created", |keeper, ctx| {
                keeper.before_delegation_created(ctx, del, vals)
            }),
            Some(_) => {
                self.hook("before_delegation_shares_modified", |keeper, ctx| {
                    keeper.before_delegation_shares_modified(ctx, del, &previous.validators)
                });
                if !added.is_empty() {
                    self.hook("before_delegation_created", |keeper, ctx| {
                        keeper.before_delegation_created(ctx, del, &added)
                    });
                }
            }
        }

        let shares = previous.shares.clone() + Dec::from_int(amount);
        for val in &previous.validators {
            self.staking
                .update_validator(val, |validator| validator.delegator_shares -= &previous.shares);
        }
        for val in vals {
            self.staking
                .update_validator(val, |validator| validator.delegator_shares += &shares);
        }
        self.staking.set_delegator(DelegatorInfo {
            address: *del,
            shares,
            validators: vals.to_vec(),
        });

        self.hook("after_delegation_modified", |keeper, ctx| {
            keeper.after_delegation_modified(ctx, del, vals)
        });
    }

    /// Withdraw all of `del`'s shares and forget the delegator.
    pub fn undelegate(&mut self, del: &AccAddress) {
        let delegator = self.delegator(del);
        self.hook("before_delegation_shares_modified", |keeper, ctx| {
            keeper.before_delegation_shares_modified(ctx, del, &delegator.validators)
        });

        for val in &delegator.validators {
            self.staking
                .update_validator(val, |validator| validator.delegator_shares -= &delegator.shares);
        }
        self.staking.remove_delegator(del);

        self.hook("after_delegation_modified", |keeper, ctx| {
            keeper.after_delegation_modified(ctx, del, &[])
        });
    }

    pub fn remove_validator(&mut self, val: &ValAddress) {
        let validator = self.validator(val);
        self.staking.remove_validator(val);
        self.hook("after_validator_removed", |keeper, ctx| {
            keeper.after_validator_removed(ctx, &validator.cons_address, val)
        });
    }

    pub fn jail(&mut self, val: &ValAddress) {
        self.staking.jail(val);
    }

    pub fn validator(&self, val: &ValAddress) -> ValidatorInfo {
        match self.staking.validator(val) {
            Some(validator) => validator,
            None => panic!("validator {val} not registered"),
        }
    }

    pub fn delegator(&self, del: &AccAddress) -> DelegatorInfo {
        match self.staking.delegator(del) {
            Some(delegator) => delegator,
            None => panic!("delegator {del} not registered"),
        }
    }

    /// Collect `fees`, allocate them with every bonded validator signing,
    /// record the proposer and move to the next height.
    pub fn next_block(&mut self, fees: &DecCoins) -> AllocationSummary {
        self.fund_fee_collector(fees);
        let votes: Vec<VoteInfo> = self
            .staking
            .bonded_validators()
            .into_iter()
            .map(|validator| VoteInfo::new(validator.cons_address, 1, true))
            .collect();
        let total_power = votes.len() as i64;
        let proposer = votes
            .first()
            .map(|vote| vote.validator)
            .unwrap_or_else(|| ConsAddress::from_seed(b"proposer"));

        let summary = self.with_ctx(|keeper, ctx| {
            let summary = keeper.allocate_tokens(ctx, total_power, &proposer, &votes)?;
            keeper.record_proposer(ctx, &proposer)?;
            Ok::<_, crate::errors::DistrError>(summary)
        });
        self.advance_height();
        match summary {
            Ok(summary) => summary,
            Err(err) => panic!("allocation failed: {err}"),
        }
    }

    /// Mint `tokens` into the module account and credit them to `val`.
    pub fn allocate_to_validator(&mut self, val: &ValAddress, tokens: &DecCoins) {
        self.fund_module(tokens);
        if let Err(err) = self.with_ctx(|keeper, ctx| keeper.allocate_tokens_to_validator(ctx, val, tokens)) {
            panic!("allocation to {val} failed: {err}");
        }
    }

    pub fn withdraw_rewards(&mut self, del: &AccAddress, val: &ValAddress) -> DistrResult<DecCoins> {
        self.with_ctx(|keeper, ctx| keeper.withdraw_delegation_rewards(ctx, del, val))
    }

    pub fn withdraw_commission(&mut self, val: &ValAddress) -> DistrResult<DecCoins> {
        self.with_ctx(|keeper, ctx| keeper.withdraw_validator_commission(ctx, val))
    }

    pub fn fund_fee_collector(&self, tokens: &DecCoins) {
        self.supply.mint_to_module(self.keeper.fee_collector_name(), tokens);
    }

    pub fn fund_module(&self, tokens: &DecCoins) {
        self.supply.mint_to_module(self.keeper.module_name(), tokens);
    }

    pub fn module_balance(&self) -> DecCoins {
        self.supply.module_balance(self.keeper.module_name()).unwrap_or_default()
    }

    pub fn fee_collector_balance(&self) -> DecCoins {
        self.supply
            .module_balance(self.keeper.fee_collector_name())
            .unwrap_or_default()
    }

    pub fn account_balance(&self, address: &AccAddress) -> DecCoins {
        self.supply.account_balance(address)
    }
}
