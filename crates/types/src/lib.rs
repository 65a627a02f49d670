//! Shared types for the stake drafter system
//!
//! This crate contains the domain types shared by the staking, fee,
//! simulator and node client crates.

pub mod error;
pub mod params;
pub mod raw;
pub mod records;
pub mod resources;
pub mod status;
pub mod transaction;
pub mod utils;
pub mod validator;

// Re-export commonly used types
pub use error::{
    ConfigError, ConstructionError, FeeError, Result, StakingError, TransactionStatusError,
    TransactionStatusWarning,
};
pub use params::ProtocolParams;
pub use raw::*;
pub use records::*;
pub use resources::*;
pub use status::*;
pub use transaction::*;
pub use validator::*;
