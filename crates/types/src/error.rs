//! Error types for the stake drafter system

use thiserror::Error;

/// Main error type for the stake drafter system
#[derive(Error, Debug)]
pub enum StakingError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The external data source could not produce raw resource records
    #[error("Data unavailable from {source_name}: {message}")]
    DataUnavailable { source_name: String, message: String },

    /// A draft cannot be turned into protocol messages
    #[error("Transaction construction error: {0}")]
    Construction(#[from] ConstructionError),

    /// Fee quoting failed
    #[error("Fee estimation error: {0}")]
    FeeEstimation(#[from] FeeError),

    /// The account has not been synced with staking resources yet
    #[error("Account {account} has no staking resources")]
    MissingResources { account: String },

    /// Raw (persisted) data could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The operation was cancelled before completing
    #[error("Operation cancelled")]
    Cancelled,

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for stake drafter operations
pub type Result<T> = std::result::Result<T, StakingError>;

/// Fatal failures raised while building protocol messages from a draft
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// A delegation-like draft carries no validator
    #[error("no validators")]
    NoValidators,

    /// A redelegate draft does not name its source validator
    #[error("source validator is empty")]
    MissingSourceValidator,
}

/// Fee quoting errors.
///
/// `Clone` because a single in-flight computation hands its outcome to every
/// waiter that joined it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeeError {
    /// The quoting service answered with an error
    #[error("Fee quote from {quoter} failed: {message}")]
    Quote { quoter: String, message: String },

    /// The quoting service could not be reached
    #[error("Fee quoter unavailable: {quoter}")]
    Unavailable { quoter: String },
}

/// Configuration specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Parse error
    #[error("Configuration parse error: {0}")]
    ParseError(String),

    /// Validation error
    #[error("Configuration validation error: {field}: {message}")]
    ValidationError { field: String, message: String },

    /// Missing required field
    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    /// Invalid value
    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

/// Field-scoped errors reported by transaction validation.
///
/// These are data, surfaced to the caller for display; they never abort
/// draft preparation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatusError {
    #[error("recipient is required")]
    RecipientRequired,

    #[error("invalid address")]
    InvalidAddress,

    #[error("destination address is also the source address")]
    InvalidAddressBecauseDestinationIsAlsoSource,

    #[error("not enough balance")]
    NotEnoughBalance,

    #[error("amount is required")]
    AmountRequired,
}

/// Field-scoped warnings reported by transaction validation
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatusWarning {
    #[error("fees are high compared to the amount")]
    FeeTooHigh,

    #[error("claiming costs more in fees than the pending rewards")]
    ClaimRewardsFeesWarning,
}

impl From<ConfigError> for StakingError {
    fn from(err: ConfigError) -> Self {
        StakingError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for StakingError {
    fn from(err: serde_json::Error) -> Self {
        StakingError::Serialization(err.to_string())
    }
}

impl StakingError {
    /// Build a data-source failure for the named collaborator
    pub fn data_unavailable(source_name: impl Into<String>, message: impl ToString) -> Self {
        StakingError::DataUnavailable {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StakingError::DataUnavailable { .. } | StakingError::FeeEstimation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_error_messages() {
        assert_eq!(ConstructionError::NoValidators.to_string(), "no validators");
        assert_eq!(
            ConstructionError::MissingSourceValidator.to_string(),
            "source validator is empty"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(StakingError::data_unavailable("node", "timeout").is_retryable());
        assert!(StakingError::from(FeeError::Unavailable {
            quoter: "node".to_string()
        })
        .is_retryable());
        assert!(!StakingError::from(ConstructionError::NoValidators).is_retryable());
        assert!(!StakingError::Cancelled.is_retryable());
    }
}
