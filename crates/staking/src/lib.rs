//! Staking resources and transaction drafting
//!
//! This crate aggregates an account's staking resources, decides which
//! staking actions are available, and builds, prices and validates
//! transaction drafts.

pub mod aggregator;
pub mod command;
pub mod display;
pub mod drafter;
pub mod eligibility;
pub mod message;
pub mod preload;
pub mod traits;
pub mod validation;

#[cfg(test)]
mod testing;

pub use aggregator::*;
pub use command::*;
pub use display::*;
pub use drafter::*;
pub use eligibility::*;
pub use message::*;
pub use preload::*;
pub use traits::*;
pub use validation::*;
