//! Store key layout.
//!
//! One prefix byte, then fixed-width 20-byte addresses, then a big-endian
//! period where relevant, so prefix scans return records in address and
//! period order.

use crate::errors::{DistrError, Result};
use stakedist_types::{AccAddress, ValAddress, ADDRESS_BYTES};

pub const FEE_POOL_KEY: &[u8] = &[0x00];
pub const PROPOSER_KEY: &[u8] = &[0x01];
pub const OUTSTANDING_REWARDS_PREFIX: u8 = 0x02;
pub const DELEGATOR_WITHDRAW_ADDR_PREFIX: u8 = 0x03;
pub const DELEGATOR_STARTING_INFO_PREFIX: u8 = 0x04;
pub const VALIDATOR_HISTORICAL_REWARDS_PREFIX: u8 = 0x05;
pub const VALIDATOR_CURRENT_REWARDS_PREFIX: u8 = 0x06;
pub const VALIDATOR_ACCUMULATED_COMMISSION_PREFIX: u8 = 0x07;
pub const PARAMS_KEY: &[u8] = &[0x09];

fn with_prefix(prefix: u8, parts: &[&[u8]]) -> Vec<u8> {
    let len = 1 + parts.iter().map(|part| part.len()).sum::<usize>();
    let mut key = Vec::with_capacity(len);
    key.push(prefix);
    for part in parts {
        key.extend_from_slice(part);
    }
    key
}

pub fn outstanding_rewards_key(val: &ValAddress) -> Vec<u8> {
    with_prefix(OUTSTANDING_REWARDS_PREFIX, &[val.as_bytes()])
}

pub fn delegator_withdraw_addr_key(del: &AccAddress) -> Vec<u8> {
    with_prefix(DELEGATOR_WITHDRAW_ADDR_PREFIX, &[del.as_bytes()])
}

pub fn delegator_starting_info_key(val: &ValAddress, del: &AccAddress) -> Vec<u8> {
    with_prefix(
        DELEGATOR_STARTING_INFO_PREFIX,
        &[val.as_bytes(), del.as_bytes()],
    )
}

pub fn delegator_starting_info_prefix(val: &ValAddress) -> Vec<u8> {
    with_prefix(DELEGATOR_STARTING_INFO_PREFIX, &[val.as_bytes()])
}

pub fn validator_historical_rewards_key(val: &ValAddress, period: u64) -> Vec<u8> {
    with_prefix(
        VALIDATOR_HISTORICAL_REWARDS_PREFIX,
        &[val.as_bytes(), &period.to_be_bytes()],
    )
}

pub fn validator_historical_rewards_prefix(val: &ValAddress) -> Vec<u8> {
    with_prefix(VALIDATOR_HISTORICAL_REWARDS_PREFIX, &[val.as_bytes()])
}

pub fn validator_current_rewards_key(val: &ValAddress) -> Vec<u8> {
    with_prefix(VALIDATOR_CURRENT_REWARDS_PREFIX, &[val.as_bytes()])
}

pub fn validator_accumulated_commission_key(val: &ValAddress) -> Vec<u8> {
    with_prefix(VALIDATOR_ACCUMULATED_COMMISSION_PREFIX, &[val.as_bytes()])
}

fn address_at(key: &[u8], offset: usize) -> Result<[u8; ADDRESS_BYTES]> {
    key.get(offset..offset + ADDRESS_BYTES)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| DistrError::invariant(format!("malformed store key {key:02x?}")))
}

/// Validator address of any key laid out as `prefix ‖ val ‖ ...`.
pub fn validator_from_key(key: &[u8]) -> Result<ValAddress> {
    address_at(key, 1).map(ValAddress)
}

/// Delegator address of a `prefix ‖ del` key.
pub fn delegator_from_key(key: &[u8]) -> Result<AccAddress> {
    address_at(key, 1).map(AccAddress)
}

/// `(validator, delegator)` of a starting info key.
pub fn split_starting_info_key(key: &[u8]) -> Result<(ValAddress, AccAddress)> {
    Ok((
        ValAddress(address_at(key, 1)?),
        AccAddress(address_at(key, 1 + ADDRESS_BYTES)?),
    ))
}

/// `(validator, period)` of a historical rewards key.
pub fn split_historical_rewards_key(key: &[u8]) -> Result<(ValAddress, u64)> {
    let val = ValAddress(address_at(key, 1)?);
    let start = 1 + ADDRESS_BYTES;
    let period = key
        .get(start..start + 8)
        .and_then(|slice| <[u8; 8]>::try_from(slice).ok())
        .map(u64::from_be_bytes)
        .ok_or_else(|| DistrError::invariant(format!("malformed historical key {key:02x?}")))?;
    Ok((val, period))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn historical_keys_sort_by_period() {
        let val = ValAddress::from_seed(b"val");
        let low = validator_historical_rewards_key(&val, 2);
        let high = validator_historical_rewards_key(&val, 256);
        assert!(low < high);
        assert!(low.starts_with(&validator_historical_rewards_prefix(&val)));
        assert_eq!(split_historical_rewards_key(&high).unwrap(), (val, 256));
    }

    #[test]
    fn starting_info_key_round_trips() {
        let val = ValAddress::from_seed(b"val");
        let del = AccAddress::from_seed(b"del");
        let key = delegator_starting_info_key(&val, &del);
        assert_eq!(key.len(), 1 + 2 * ADDRESS_BYTES);
        assert_eq!(split_starting_info_key(&key).unwrap(), (val, del));
        assert!(split_starting_info_key(&key[..10]).is_err());
    }
}
