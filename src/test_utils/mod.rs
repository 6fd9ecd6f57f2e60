//! Test utilities for the chainhook relay
//!
//! Builders for webhook payloads and a recording handler shared by unit and
//! integration tests.

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;
