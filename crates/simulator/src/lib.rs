//! Staking resource simulation
//!
//! This crate generates reproducible synthetic accounts by replaying seeded
//! delegate, redelegate, claim and undelegate transitions, and checks the
//! resulting resources against the balance invariants.

pub mod engine;
pub mod operation;
pub mod validation;

pub use engine::*;
pub use operation::*;
pub use validation::*;
