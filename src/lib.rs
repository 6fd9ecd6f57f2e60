//! Chainhook relay
//!
//! Receives signed chainhook deliveries for the Stacks blockchain, processes
//! their apply and rollback blocks through application handlers, and manages
//! registered chainhooks through the hosted chainhooks API.

pub mod chainhooks;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::RelayError;
