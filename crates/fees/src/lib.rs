//! Fee estimation
//!
//! This crate prices transaction drafts through a pluggable quoter and
//! memoizes the results in a bounded single-flight cache.

pub mod cache;
pub mod quoter;

pub use cache::*;
pub use quoter::*;
