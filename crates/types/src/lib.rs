//! Ledger primitives shared by the stake reward distribution engine.

pub mod address;
pub mod coins;
pub mod decimal;
pub mod errors;

pub use address::{module_address, AccAddress, AddressError, ConsAddress, ValAddress, ADDRESS_BYTES};
pub use coins::{validate_denom, DecCoin, DecCoins};
pub use decimal::{Dec, PRECISION};
pub use errors::TypesError;
