//! Decouples accepting a delivery from processing it
//!
//! The HTTP handler only validates and enqueues; a single worker task drains
//! the queue and runs the [`EventProcessor`] for each payload in order.
//! Processing failures and panics are logged by the worker and never reach
//! the sender of the webhook.

use super::error::{ChainhookError, Result};
use super::metrics::{ChainhookMetrics, ChainhookMetricsContext};
use super::models::WebhookPayload;
use super::processor::EventProcessor;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Default number of accepted payloads that may wait for the worker
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

struct Job {
    payload: WebhookPayload,
    accepted_at: Instant,
}

/// Handle used to enqueue verified payloads
#[derive(Clone)]
pub struct EventDispatcher {
    sender: mpsc::Sender<Job>,
}

impl EventDispatcher {
    /// Start the processing worker and return a dispatcher feeding it.
    ///
    /// The worker stops once every dispatcher clone has been dropped and the
    /// queue is drained.
    pub fn spawn(processor: Arc<EventProcessor>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_worker(processor, receiver));
        (Self { sender }, handle)
    }

    /// Enqueue a payload without waiting for it to be processed
    pub fn dispatch(&self, payload: WebhookPayload) -> Result<()> {
        let job = Job {
            payload,
            accepted_at: Instant::now(),
        };

        match self.sender.try_send(job) {
            Ok(()) => {
                ChainhookMetrics::global().queue_enqueued();
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(
                    "Processing queue full, rejecting delivery from chainhook '{}'",
                    job.payload.chainhook.name
                );
                Err(ChainhookError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(ChainhookError::QueueClosed),
        }
    }
}

async fn run_worker(processor: Arc<EventProcessor>, mut receiver: mpsc::Receiver<Job>) {
    info!("Chainhook processing worker started");
    let metrics = ChainhookMetrics::global();

    while let Some(job) = receiver.recv().await {
        metrics.queue_dequeued();

        let chainhook = job.payload.chainhook.name.clone();
        let queued_for = job.accepted_at.elapsed();
        let processor = processor.clone();

        // Hook panics are caught by the processor; the task boundary covers
        // anything else that unwinds.
        let task = tokio::spawn(async move { processor.process(&job.payload).await });

        match task.await {
            Ok(report) => debug!(
                "Chainhook '{}' processed after {:?} in queue: {} block(s), {} failure(s)",
                chainhook,
                queued_for,
                report.apply_blocks + report.rollback_blocks,
                report.failures.len()
            ),
            Err(e) => {
                error!("Error processing chainhook event '{}': {}", chainhook, e);
                ChainhookMetricsContext::new(&chainhook).processing_error("panic");
            }
        }
    }

    info!("Chainhook processing worker stopped");
}
