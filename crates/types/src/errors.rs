use thiserror::Error;

/// Errors produced by the ledger primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid decimal string: {0}")]
    InvalidDecimal(String),

    #[error("decimal precision {0} exceeds the maximum of 18 fractional digits")]
    PrecisionOutOfRange(u32),

    #[error("invalid denomination: {0}")]
    InvalidDenom(String),

    #[error("negative coin amount: {0}")]
    NegativeCoinAmount(String),
}
