use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing an address string.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AddressError {
    #[error("address must start with '{expected}'")]
    InvalidPrefix { expected: &'static str },
    #[error("address must be {expected} characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("address payload is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("address payload must be exactly 20 bytes")]
    InvalidPayloadLength,
}

/// Number of raw bytes contained in an address.
pub const ADDRESS_BYTES: usize = 20;

/// Human readable prefix for delegator and module accounts.
pub const ACC_PREFIX: &str = "acc";
/// Human readable prefix for validator operators.
pub const VALOPER_PREFIX: &str = "valoper";
/// Human readable prefix for validator consensus keys.
pub const VALCONS_PREFIX: &str = "valcons";

/// Encode raw address bytes as `prefix` followed by lowercase hex.
pub fn encode_address(prefix: &str, bytes: &[u8; ADDRESS_BYTES]) -> String {
    let mut encoded = String::with_capacity(prefix.len() + ADDRESS_BYTES * 2);
    encoded.push_str(prefix);
    encoded.push_str(&hex::encode(bytes));
    encoded
}

/// Decode an address string carrying the given prefix.
pub fn decode_address(
    prefix: &'static str,
    address: &str,
) -> Result<[u8; ADDRESS_BYTES], AddressError> {
    let payload = address
        .strip_prefix(prefix)
        .ok_or(AddressError::InvalidPrefix { expected: prefix })?;

    let expected = prefix.len() + ADDRESS_BYTES * 2;
    if address.len() != expected {
        return Err(AddressError::InvalidLength {
            expected,
            actual: address.len(),
        });
    }

    let decoded = hex::decode(payload)?;
    decoded
        .try_into()
        .map_err(|_| AddressError::InvalidPayloadLength)
}

macro_rules! define_address {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(pub [u8; ADDRESS_BYTES]);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
                &self.0
            }

            /// Deterministic address derived from an arbitrary seed.
            pub fn from_seed(seed: &[u8]) -> Self {
                let digest = blake3::hash(seed);
                let mut bytes = [0u8; ADDRESS_BYTES];
                bytes.copy_from_slice(&digest.as_bytes()[..ADDRESS_BYTES]);
                $name(bytes)
            }

            pub fn parse(value: &str) -> Result<Self, AddressError> {
                decode_address($prefix, value).map($name)
            }
        }

        impl From<[u8; ADDRESS_BYTES]> for $name {
            fn from(value: [u8; ADDRESS_BYTES]) -> Self {
                $name(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                encode_address($prefix, &value.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = AddressError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                $name::parse(&value)
            }
        }

        impl FromStr for $name {
            type Err = AddressError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::parse(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&encode_address($prefix, &self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }
    };
}

define_address!(
    /// Account address of a delegator, withdraw target or module account.
    AccAddress,
    ACC_PREFIX
);
define_address!(
    /// Operator address identifying a validator.
    ValAddress,
    VALOPER_PREFIX
);
define_address!(
    /// Consensus address used by block votes and proposer identification.
    ConsAddress,
    VALCONS_PREFIX
);

/// Account owned by the named module.
pub fn module_address(name: &str) -> AccAddress {
    AccAddress::from_seed(format!("module/{name}").as_bytes())
}

impl From<ValAddress> for AccAddress {
    /// Self-delegation account of a validator operator.
    fn from(value: ValAddress) -> Self {
        AccAddress(value.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let addr = AccAddress([0xAB; ADDRESS_BYTES]);
        let encoded = addr.to_string();
        assert!(encoded.starts_with(ACC_PREFIX));
        assert_eq!(encoded.len(), ACC_PREFIX.len() + 40);
        assert_eq!(AccAddress::parse(&encoded).unwrap(), addr);
    }

    #[test]
    fn prefixes_are_not_interchangeable() {
        let val = ValAddress::from_seed(b"validator-1");
        let err = AccAddress::parse(&val.to_string()).unwrap_err();
        assert!(matches!(err, AddressError::InvalidPrefix { .. }));
    }

    #[test]
    fn invalid_length_and_hex_rejected() {
        let short = format!("{ACC_PREFIX}{}", "00".repeat(ADDRESS_BYTES - 1));
        assert!(matches!(
            AccAddress::parse(&short).unwrap_err(),
            AddressError::InvalidLength { .. }
        ));
        let bad_hex = format!("{ACC_PREFIX}{}", "gg".repeat(ADDRESS_BYTES));
        assert!(matches!(
            AccAddress::parse(&bad_hex).unwrap_err(),
            AddressError::InvalidHex(_)
        ));
    }

    #[test]
    fn module_accounts_are_stable_and_distinct() {
        assert_eq!(module_address("distribution"), module_address("distribution"));
        assert_ne!(module_address("distribution"), module_address("fee_collector"));
    }

    #[test]
    fn serde_uses_string_form() {
        let cons = ConsAddress::from_seed(b"cons");
        let json = serde_json::to_string(&cons).unwrap();
        assert_eq!(json, format!("\"{cons}\""));
        let back: ConsAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cons);
    }
}
