//! Execution context handed to every keeper operation.
//!
//! A context bundles the host store, the current block height, the events
//! emitted so far and the coin transfers waiting to settle. Operations run
//! on a buffered branch of the context: the branch's writes, events and
//! transfers reach the parent only when the operation succeeds.

use crate::errors::{DistrError, Result};
use crate::events::Event;
use crate::expected_keepers::SupplyKeeper;
use crate::types::Transfer;
use stakedist_storage::{CacheStore, KvStore};
use stakedist_types::DecCoins;
use std::collections::BTreeMap;

pub struct Context<'a> {
    store: &'a mut dyn KvStore,
    block_height: u64,
    events: Vec<Event>,
    transfers: Vec<Transfer>,
    is_branch: bool,
}

impl<'a> Context<'a> {
    pub fn new(store: &'a mut dyn KvStore, block_height: u64) -> Self {
        Self {
            store,
            block_height,
            events: Vec::new(),
            transfers: Vec::new(),
            is_branch: false,
        }
    }

    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    pub fn set_block_height(&mut self, height: u64) {
        self.block_height = height;
    }

    pub fn store(&self) -> &dyn KvStore {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut dyn KvStore {
        &mut *self.store
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Queue a coin movement; it settles when the outermost operation commits.
    pub(crate) fn queue_transfer(&mut self, transfer: Transfer) {
        self.transfers.push(transfer);
    }

    /// Run `f` on a buffered branch and commit it only if `f` succeeds.
    ///
    /// On the outermost context the queued transfers are checked as a batch
    /// against the module balances and then settled through `supply` before
    /// the branch is flushed; a batch that would overdraw a module discards
    /// the branch without moving any coins. Nested branches hand their
    /// transfers to the parent instead.
    pub fn atomic<T, F>(&mut self, supply: &dyn SupplyKeeper, f: F) -> Result<T>
    where
        F: FnOnce(&mut Context<'_>) -> Result<T>,
    {
        let height = self.block_height;
        let defer = self.is_branch;
        let mut cache = CacheStore::new(&mut *self.store);

        let (out, events, transfers) = {
            let mut branch = Context {
                store: &mut cache,
                block_height: height,
                events: Vec::new(),
                transfers: Vec::new(),
                is_branch: true,
            };
            let out = f(&mut branch)?;
            (out, branch.events, branch.transfers)
        };

        if defer {
            cache.write()?;
            self.transfers.extend(transfers);
        } else {
            check_batch(supply, &transfers)?;
            for transfer in &transfers {
                settle(supply, transfer)?;
            }
            cache.write()?;
        }
        self.events.extend(events);
        Ok(out)
    }

    /// Run `f` on a branch that is always discarded, together with its
    /// events and transfers.
    pub fn simulate<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Context<'_>) -> Result<T>,
    {
        let height = self.block_height;
        let mut cache = CacheStore::new(&mut *self.store);
        let mut branch = Context {
            store: &mut cache,
            block_height: height,
            events: Vec::new(),
            transfers: Vec::new(),
            is_branch: true,
        };
        f(&mut branch)
    }
}

/// Replay `transfers` against the current module balances, failing if any
/// step would overdraw its source module.
fn check_batch(supply: &dyn SupplyKeeper, transfers: &[Transfer]) -> Result<()> {
    let mut balances: BTreeMap<&str, DecCoins> = BTreeMap::new();
    for transfer in transfers {
        let (from, amount, to_module) = match transfer {
            Transfer::ModuleToModule { from, to, amount } => (from.as_str(), amount, Some(to.as_str())),
            Transfer::ModuleToAccount { from, amount, .. } => (from.as_str(), amount, None),
        };

        let balance = balance_of(supply, &balances, from)?;
        let remaining = balance.checked_sub(amount).ok_or_else(|| {
            DistrError::Transfer(anyhow::anyhow!(
                "module {from} cannot cover transfer batch: {balance} < {amount}"
            ))
        })?;
        balances.insert(from, remaining);

        if let Some(to) = to_module {
            let credited = balance_of(supply, &balances, to)?.add(amount);
            balances.insert(to, credited);
        }
    }
    Ok(())
}

fn balance_of(
    supply: &dyn SupplyKeeper,
    balances: &BTreeMap<&str, DecCoins>,
    module: &str,
) -> Result<DecCoins> {
    match balances.get(module) {
        Some(balance) => Ok(balance.clone()),
        None => supply.module_balance(module).map_err(DistrError::Transfer),
    }
}

fn settle(supply: &dyn SupplyKeeper, transfer: &Transfer) -> Result<()> {
    match transfer {
        Transfer::ModuleToModule { from, to, amount } => supply
            .send_coins_from_module_to_module(from, to, amount)
            .map_err(DistrError::Transfer),
        Transfer::ModuleToAccount { from, to, amount } => supply
            .send_coins_from_module_to_account(from, to, amount)
            .map_err(DistrError::Transfer),
    }
}
