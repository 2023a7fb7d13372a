use thiserror::Error;
use trichain_storage::StorageError;
use trichain_treasury::BankError;
use trichain_types::{Amount, AmountError, ChainId};

/// Errors returned by the monetary keeper.
///
/// Every command entry point returns one of these variants so callers can
/// branch on the exact condition.
#[derive(Debug, Error)]
pub enum MonetaryError {
    #[error("supply cap is immutable once set")]
    ParamsImmutable,

    #[error("invalid parameter {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("amount must be positive")]
    InvalidAmount,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("mint of {requested} exceeds supply cap headroom {remaining}")]
    SupplyCapExceeded { requested: Amount, remaining: Amount },

    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("burn of {requested} exceeds current supply {current}")]
    InsufficientSupply { requested: Amount, current: Amount },

    #[error("unauthorized: expected {expected}, got {got}")]
    Unauthorized { expected: String, got: String },

    #[error("recipient amounts {requested} exceed emission budget {budget}")]
    EmissionBudgetExceeded { requested: Amount, budget: Amount },

    #[error("no usable channel for chain {0}")]
    InvalidChannel(ChainId),

    #[error("invalid burn proof: {0}")]
    InvalidProof(String),

    #[error("conservation violated: current {current} != minted {minted} - burned {burned}")]
    ConservationViolation {
        current: Amount,
        minted: Amount,
        burned: Amount,
    },

    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),

    #[error("unknown packet sequence {0}")]
    UnknownPacket(u64),

    #[error("arithmetic overflow: {0}")]
    Overflow(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] BankError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl MonetaryError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        MonetaryError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn overflow(context: impl Into<String>) -> Self {
        MonetaryError::Overflow(context.into())
    }
}

impl From<AmountError> for MonetaryError {
    fn from(err: AmountError) -> Self {
        MonetaryError::Overflow(err.to_string())
    }
}

impl From<serde_json::Error> for MonetaryError {
    fn from(err: serde_json::Error) -> Self {
        MonetaryError::Storage(StorageError::Serialization(err))
    }
}

pub type Result<T, E = MonetaryError> = std::result::Result<T, E>;
