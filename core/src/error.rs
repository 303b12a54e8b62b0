//! Domain error type for staking operations.

use thiserror::Error;

/// Failures surfaced by the controller, one variant per way a caller reacts.
#[derive(Debug, Error)]
pub enum StakingError {
    /// Amount is empty, malformed, or not greater than zero.
    #[error("{0}")]
    InvalidAmount(String),

    /// Amount exceeds the balance ceiling for the selected action.
    #[error("{0}")]
    InsufficientBalance(String),

    /// The wallet declined to sign or the pre-flight check failed.
    #[error("Transaction rejected: {0}")]
    DispatchRejected(String),

    /// The transaction was included but reverted or errored.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// A balance read from the ledger failed. The cached value is kept.
    #[error("{0}")]
    ReadFetch(String),

    /// Operation not possible in the current state (e.g. nothing to claim).
    #[error("{0}")]
    InvalidState(String),

    /// Missing or malformed configuration.
    #[error("{0}")]
    Config(String),

    /// Unexpected error from internal subsystems.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StakingError {
    /// Whether this error belongs to the input-validation category: recovered
    /// locally, surfaced as a notification, no state change.
    pub fn is_input_validation(&self) -> bool {
        matches!(
            self,
            StakingError::InvalidAmount(_) | StakingError::InsufficientBalance(_)
        )
    }
}

/// Alias for `std::result::Result<T, StakingError>`.
pub type Result<T> = std::result::Result<T, StakingError>;
