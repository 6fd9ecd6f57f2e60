//! Mock implementations for testing

use crate::chainhooks::error::{ChainhookError, Result};
use crate::chainhooks::handler::{
    BlockRolledBack, ChainhookHandler, ContractCallApplied, EventApplied,
};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

/// Configuration for controlling mock handler failures
#[derive(Debug, Clone, Default)]
pub struct HookFailures {
    pub contract_call_at_block: Option<u64>,
    pub event_at_block: Option<u64>,
    pub rollback_at_block: Option<u64>,
    pub panic_at_block: Option<u64>,
}

/// Compact record of a hook invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestHook {
    ContractCall {
        block: u64,
        function_name: String,
        success: bool,
    },
    Event {
        block: u64,
        event_type: String,
    },
    Rollback(u64),
}

/// Handler that records every invocation, optionally failing on demand.
///
/// Invocations are recorded before any configured failure is applied.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    hooks: Mutex<Vec<TestHook>>,
    contract_calls: Mutex<Vec<ContractCallApplied>>,
    events: Mutex<Vec<EventApplied>>,
    rollbacks: Mutex<Vec<BlockRolledBack>>,
    failures: HookFailures,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failures(failures: HookFailures) -> Self {
        Self {
            failures,
            ..Default::default()
        }
    }

    pub fn failing_on_rollback(block: u64) -> Self {
        Self::with_failures(HookFailures {
            rollback_at_block: Some(block),
            ..Default::default()
        })
    }

    /// All hook invocations in call order
    pub fn hooks(&self) -> Vec<TestHook> {
        lock(&self.hooks).clone()
    }

    pub fn contract_calls(&self) -> Vec<ContractCallApplied> {
        lock(&self.contract_calls).clone()
    }

    pub fn events(&self) -> Vec<EventApplied> {
        lock(&self.events).clone()
    }

    pub fn rollbacks(&self) -> Vec<BlockRolledBack> {
        lock(&self.rollbacks).clone()
    }

    fn outcome(&self, stage: &str, block: u64, fail_at: Option<u64>) -> Result<()> {
        if self.failures.panic_at_block == Some(block) {
            panic!("mock handler panic at block {block}");
        }
        if fail_at == Some(block) {
            return Err(ChainhookError::processing(stage, "mock failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainhookHandler for RecordingHandler {
    async fn apply_contract_call(&self, call: &ContractCallApplied) -> Result<()> {
        lock(&self.hooks).push(TestHook::ContractCall {
            block: call.block.index,
            function_name: call.function_name.clone(),
            success: call.success,
        });
        lock(&self.contract_calls).push(call.clone());
        self.outcome(
            "apply_contract_call",
            call.block.index,
            self.failures.contract_call_at_block,
        )
    }

    async fn apply_event(&self, event: &EventApplied) -> Result<()> {
        lock(&self.hooks).push(TestHook::Event {
            block: event.block.index,
            event_type: event.event_type.clone(),
        });
        lock(&self.events).push(event.clone());
        self.outcome("apply_event", event.block.index, self.failures.event_at_block)
    }

    async fn apply_rollback(&self, block: &BlockRolledBack) -> Result<()> {
        lock(&self.hooks).push(TestHook::Rollback(block.block.index));
        lock(&self.rollbacks).push(block.clone());
        self.outcome(
            "apply_rollback",
            block.block.index,
            self.failures.rollback_at_block,
        )
    }
}
