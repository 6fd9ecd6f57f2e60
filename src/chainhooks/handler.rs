//! Hook points invoked by the event processor

use super::error::{ChainhookError, Result};
use super::models::{BlockIdentifier, ChainhookInfo};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A contract call found in an applied transaction
#[derive(Debug, Clone, PartialEq)]
pub struct ContractCallApplied {
    pub chainhook: ChainhookInfo,
    pub block: BlockIdentifier,
    pub transaction_hash: String,
    pub contract_id: String,
    pub function_name: String,
    pub function_args: Vec<serde_json::Value>,
    pub success: bool,
}

/// A transaction event found in an applied transaction
#[derive(Debug, Clone, PartialEq)]
pub struct EventApplied {
    pub chainhook: ChainhookInfo,
    pub block: BlockIdentifier,
    pub transaction_hash: String,
    pub event_type: String,
    pub data: Option<serde_json::Map<String, serde_json::Value>>,
}

/// A block reorganized off the canonical chain
#[derive(Debug, Clone, PartialEq)]
pub struct BlockRolledBack {
    pub chainhook: ChainhookInfo,
    pub block: BlockIdentifier,
    pub parent_block: BlockIdentifier,
    pub timestamp: i64,
    pub transaction_hashes: Vec<String>,
}

/// Application logic driven by chainhook deliveries.
///
/// Deliveries may be retried or reordered by the sender, so implementations
/// that persist state should key their writes on block and transaction
/// hashes and make `apply_rollback` the exact inverse of the apply hooks.
#[async_trait]
pub trait ChainhookHandler: Send + Sync {
    /// Handle a contract call from an applied block
    async fn apply_contract_call(&self, call: &ContractCallApplied) -> Result<()>;

    /// Handle a transaction event from an applied block
    async fn apply_event(&self, event: &EventApplied) -> Result<()>;

    /// Revert whatever was applied for a rolled-back block
    async fn apply_rollback(&self, block: &BlockRolledBack) -> Result<()>;
}

/// Handler that only logs what it receives
pub struct LogOnlyHandler;

#[async_trait]
impl ChainhookHandler for LogOnlyHandler {
    async fn apply_contract_call(&self, call: &ContractCallApplied) -> Result<()> {
        info!(
            "Contract call {}::{} in tx {} at block #{} (success: {})",
            call.contract_id,
            call.function_name,
            call.transaction_hash,
            call.block.index,
            call.success
        );
        debug!("Contract call arguments: {:?}", call.function_args);
        Ok(())
    }

    async fn apply_event(&self, event: &EventApplied) -> Result<()> {
        info!(
            "Event {} in tx {} at block #{}",
            event.event_type, event.transaction_hash, event.block.index
        );
        debug!("Event data: {:?}", event.data);
        Ok(())
    }

    async fn apply_rollback(&self, block: &BlockRolledBack) -> Result<()> {
        warn!(
            "Rollback of block #{} ({}) for chainhook '{}', {} transaction(s) to revert",
            block.block.index,
            block.block.hash,
            block.chainhook.name,
            block.transaction_hashes.len()
        );
        Ok(())
    }
}

/// Handler that forwards every hook to several handlers in order.
///
/// All handlers are invoked even if an earlier one fails; the first error
/// is returned.
pub struct MultiHandler {
    handlers: Vec<Arc<dyn ChainhookHandler>>,
}

impl MultiHandler {
    pub fn new(handlers: Vec<Arc<dyn ChainhookHandler>>) -> Self {
        Self { handlers }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

fn keep_first(first: &mut Option<ChainhookError>, result: Result<()>) {
    if let Err(e) = result {
        if first.is_none() {
            *first = Some(e);
        }
    }
}

#[async_trait]
impl ChainhookHandler for MultiHandler {
    async fn apply_contract_call(&self, call: &ContractCallApplied) -> Result<()> {
        let mut first_error = None;
        for handler in &self.handlers {
            keep_first(&mut first_error, handler.apply_contract_call(call).await);
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn apply_event(&self, event: &EventApplied) -> Result<()> {
        let mut first_error = None;
        for handler in &self.handlers {
            keep_first(&mut first_error, handler.apply_event(event).await);
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn apply_rollback(&self, block: &BlockRolledBack) -> Result<()> {
        let mut first_error = None;
        for handler in &self.handlers {
            keep_first(&mut first_error, handler.apply_rollback(block).await);
        }
        first_error.map_or(Ok(()), Err)
    }
}
