//! Node client for the stake drafter
//!
//! This crate talks to a node's REST API and serves as the staking
//! resource source, the validator roster source and the fee quoter.

pub mod client;
pub mod wire;

pub use client::*;
