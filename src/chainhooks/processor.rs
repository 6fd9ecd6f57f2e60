//! Apply/rollback processing of verified chainhook payloads

use super::error::{ChainhookError, ChainhookErrorContext, Result};
use super::handler::{
    BlockRolledBack, ChainhookHandler, ContractCallApplied, EventApplied, LogOnlyHandler,
};
use super::metrics::ChainhookMetricsContext;
use super::models::{Block, ChainhookInfo, Transaction, WebhookPayload};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Hook that failed while processing a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    ContractCall,
    Event,
    Rollback,
}

impl ProcessingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContractCall => "apply_contract_call",
            Self::Event => "apply_event",
            Self::Rollback => "apply_rollback",
        }
    }
}

/// An isolated failure recorded while processing continued
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingFailure {
    pub stage: ProcessingStage,
    pub block_index: u64,
    pub transaction_hash: Option<String>,
    pub reason: String,
}

/// Summary of one processed payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingReport {
    pub apply_blocks: usize,
    pub rollback_blocks: usize,
    pub transactions: usize,
    pub contract_calls: usize,
    pub events: usize,
    pub failures: Vec<ProcessingFailure>,
}

impl ProcessingReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Walks a payload and drives the handler hooks.
///
/// Apply blocks are visited in payload order, then rollback blocks in
/// payload order. A failing or panicking hook never stops the walk.
pub struct EventProcessor {
    handler: Arc<dyn ChainhookHandler>,
}

impl EventProcessor {
    /// Create a processor around a handler
    pub fn new(handler: Arc<dyn ChainhookHandler>) -> Self {
        Self { handler }
    }

    /// Processor that only logs the hooks
    pub fn log_only() -> Self {
        Self::new(Arc::new(LogOnlyHandler))
    }

    /// Process every apply block, then every rollback block
    pub async fn process(&self, payload: &WebhookPayload) -> ProcessingReport {
        let start_time = Instant::now();
        let metrics = ChainhookMetricsContext::new(&payload.chainhook.name);
        let mut report = ProcessingReport::default();

        info!(
            "Chainhook event received: uuid={}, name={}, apply={}, rollback={}",
            payload.chainhook.uuid,
            payload.chainhook.name,
            payload.apply.len(),
            payload.rollback.len()
        );

        for block in &payload.apply {
            self.apply_block(&payload.chainhook, block, &metrics, &mut report)
                .await;
        }

        for block in &payload.rollback {
            self.rollback_block(&payload.chainhook, block, &metrics, &mut report)
                .await;
        }

        metrics.processing_duration(start_time.elapsed().as_secs_f64());

        if report.is_clean() {
            debug!(
                "Processed chainhook '{}': {} apply block(s), {} rollback block(s)",
                payload.chainhook.name, report.apply_blocks, report.rollback_blocks
            );
        } else {
            warn!(
                "Processed chainhook '{}' with {} failure(s)",
                payload.chainhook.name,
                report.failures.len()
            );
        }

        report
    }

    async fn apply_block(
        &self,
        chainhook: &ChainhookInfo,
        block: &Block,
        metrics: &ChainhookMetricsContext,
        report: &mut ProcessingReport,
    ) {
        info!(
            "Apply block #{}: hash={}, timestamp={}, transactions={}",
            block.block_identifier.index,
            block.block_identifier.hash,
            block.timestamp_rfc3339(),
            block.transactions.len()
        );
        metrics.block("apply");
        report.apply_blocks += 1;

        for tx in &block.transactions {
            report.transactions += 1;
            self.apply_transaction(chainhook, block, tx, metrics, report)
                .await;
        }
    }

    async fn apply_transaction(
        &self,
        chainhook: &ChainhookInfo,
        block: &Block,
        tx: &Transaction,
        metrics: &ChainhookMetricsContext,
        report: &mut ProcessingReport,
    ) {
        let tx_hash = &tx.transaction_identifier.hash;
        debug!("Transaction {}", tx_hash);

        let Some(metadata) = &tx.metadata else {
            return;
        };

        if let Some(call) = &metadata.contract_call {
            let applied = ContractCallApplied {
                chainhook: chainhook.clone(),
                block: block.block_identifier.clone(),
                transaction_hash: tx_hash.clone(),
                contract_id: call.contract_id.clone(),
                function_name: call.function_name.clone(),
                function_args: call.function_args.clone().unwrap_or_default(),
                success: metadata.is_success(),
            };

            report.contract_calls += 1;
            metrics.contract_call(applied.success);

            if let Err(e) = guarded(
                ProcessingStage::ContractCall,
                self.handler.apply_contract_call(&applied),
            )
            .await
            .block_context(block.block_identifier.index, &block.block_identifier.hash)
            {
                self.record_failure(
                    ProcessingStage::ContractCall,
                    block,
                    Some(tx_hash),
                    e,
                    metrics,
                    report,
                );
            }
        }

        for event in metadata.events.iter().flatten() {
            let applied = EventApplied {
                chainhook: chainhook.clone(),
                block: block.block_identifier.clone(),
                transaction_hash: tx_hash.clone(),
                event_type: event.event_type.clone(),
                data: event.data.clone(),
            };

            report.events += 1;
            metrics.chain_event(&event.event_type);

            if let Err(e) = guarded(ProcessingStage::Event, self.handler.apply_event(&applied))
                .await
                .block_context(block.block_identifier.index, &block.block_identifier.hash)
            {
                self.record_failure(
                    ProcessingStage::Event,
                    block,
                    Some(tx_hash),
                    e,
                    metrics,
                    report,
                );
            }
        }
    }

    async fn rollback_block(
        &self,
        chainhook: &ChainhookInfo,
        block: &Block,
        metrics: &ChainhookMetricsContext,
        report: &mut ProcessingReport,
    ) {
        info!(
            "Rollback block #{}: hash={}, transactions={}",
            block.block_identifier.index,
            block.block_identifier.hash,
            block.transactions.len()
        );
        metrics.block("rollback");
        report.rollback_blocks += 1;

        let rolled_back = BlockRolledBack {
            chainhook: chainhook.clone(),
            block: block.block_identifier.clone(),
            parent_block: block.parent_block_identifier.clone(),
            timestamp: block.timestamp,
            transaction_hashes: block
                .transactions
                .iter()
                .map(|tx| tx.transaction_identifier.hash.clone())
                .collect(),
        };

        if let Err(e) = guarded(
            ProcessingStage::Rollback,
            self.handler.apply_rollback(&rolled_back),
        )
        .await
        .block_context(block.block_identifier.index, &block.block_identifier.hash)
        {
            self.record_failure(ProcessingStage::Rollback, block, None, e, metrics, report);
        }
    }

    fn record_failure(
        &self,
        stage: ProcessingStage,
        block: &Block,
        tx_hash: Option<&String>,
        err: ChainhookError,
        metrics: &ChainhookMetricsContext,
        report: &mut ProcessingReport,
    ) {
        error!(
            "Handler {} failed (tx: {}): {}",
            stage.as_str(),
            tx_hash.map(String::as_str).unwrap_or("-"),
            err
        );
        metrics.processing_error(stage.as_str());

        report.failures.push(ProcessingFailure {
            stage,
            block_index: block.block_identifier.index,
            transaction_hash: tx_hash.cloned(),
            reason: err.to_string(),
        });
    }
}

/// Run a single hook, turning a panic into a processing failure
async fn guarded<F>(stage: ProcessingStage, hook: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    match AssertUnwindSafe(hook).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(ChainhookError::processing(stage.as_str(), "handler panicked")),
    }
}
