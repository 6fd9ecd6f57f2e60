//! Metrics for chainhook deliveries and processing

use super::models::ChainhookEventType;
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, CounterVec, HistogramVec,
    IntGauge,
};
use std::collections::HashSet;
use std::sync::Mutex;

/// Labels for chainhook metrics
pub const CHAINHOOK_LABEL: &str = "chainhook";
pub const OUTCOME_LABEL: &str = "outcome";
pub const BLOCK_KIND_LABEL: &str = "kind";
pub const EVENT_TYPE_LABEL: &str = "event_type";
pub const STATUS_LABEL: &str = "status";
pub const STAGE_LABEL: &str = "stage";
pub const OPERATION_LABEL: &str = "operation";

/// Distinct chainhook label values kept before folding into [`OTHER_LABEL`]
pub const MAX_CHAINHOOK_LABELS: usize = 128;

/// Label value for unknown event types and chainhooks past the label limit
pub const OTHER_LABEL: &str = "other";

lazy_static! {
    /// Webhook deliveries by outcome (accepted, rejected, malformed, unavailable)
    static ref DELIVERIES: CounterVec = register_counter_vec!(
        "chainhook_relay_deliveries_total",
        "Total number of webhook deliveries received",
        &[OUTCOME_LABEL]
    ).expect("Failed to create deliveries metric");

    /// Blocks processed
    static ref BLOCKS_PROCESSED: CounterVec = register_counter_vec!(
        "chainhook_relay_blocks_processed_total",
        "Total number of apply and rollback blocks processed",
        &[CHAINHOOK_LABEL, BLOCK_KIND_LABEL]
    ).expect("Failed to create blocks_processed metric");

    /// Contract calls surfaced to handlers
    static ref CONTRACT_CALLS: CounterVec = register_counter_vec!(
        "chainhook_relay_contract_calls_total",
        "Total number of contract calls surfaced to handlers",
        &[CHAINHOOK_LABEL, STATUS_LABEL]
    ).expect("Failed to create contract_calls metric");

    /// Transaction events surfaced to handlers
    static ref CHAIN_EVENTS: CounterVec = register_counter_vec!(
        "chainhook_relay_chain_events_total",
        "Total number of transaction events surfaced to handlers",
        &[CHAINHOOK_LABEL, EVENT_TYPE_LABEL]
    ).expect("Failed to create chain_events metric");

    /// Handler failures
    static ref PROCESSING_ERRORS: CounterVec = register_counter_vec!(
        "chainhook_relay_processing_errors_total",
        "Total number of isolated processing failures",
        &[CHAINHOOK_LABEL, STAGE_LABEL]
    ).expect("Failed to create processing_errors metric");

    /// Time spent processing a whole payload
    static ref PROCESSING_DURATION: HistogramVec = register_histogram_vec!(
        "chainhook_relay_processing_duration_seconds",
        "Payload processing time in seconds",
        &[CHAINHOOK_LABEL]
    ).expect("Failed to create processing_duration metric");

    /// Payloads waiting for the worker
    static ref QUEUE_DEPTH: IntGauge = register_int_gauge!(
        "chainhook_relay_queue_depth",
        "Number of accepted payloads waiting to be processed"
    ).expect("Failed to create queue_depth metric");

    /// Chainhook label values handed out so far
    static ref CHAINHOOK_LABELS: Mutex<HashSet<String>> = Mutex::new(HashSet::new());

    /// Management API calls
    static ref API_CALLS: CounterVec = register_counter_vec!(
        "chainhook_relay_api_calls_total",
        "Total number of chainhooks management API calls",
        &[OPERATION_LABEL, STATUS_LABEL]
    ).expect("Failed to create api_calls metric");
}

fn status(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

/// Label for a chainhook name, folded into `other` once the limit is reached.
///
/// Names come from delivery bodies, so the label set must stay bounded.
pub fn chainhook_label(name: &str) -> String {
    let mut seen = CHAINHOOK_LABELS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if seen.contains(name) {
        return name.to_string();
    }
    if seen.len() < MAX_CHAINHOOK_LABELS {
        seen.insert(name.to_string());
        return name.to_string();
    }
    OTHER_LABEL.to_string()
}

/// Canonical label for an event type, `other` when unknown
pub fn event_type_label(event_type: &str) -> &'static str {
    event_type
        .parse::<ChainhookEventType>()
        .map(|t| t.as_str())
        .unwrap_or(OTHER_LABEL)
}

/// Chainhook relay metrics
pub struct ChainhookMetrics;

impl ChainhookMetrics {
    /// Get global metrics instance
    pub fn global() -> Self {
        ChainhookMetrics
    }

    /// Record a delivery outcome
    pub fn record_delivery(&self, outcome: &str) {
        DELIVERIES.with_label_values(&[outcome]).inc();
    }

    /// Record a processed block
    pub fn record_block(&self, chainhook: &str, kind: &str) {
        BLOCKS_PROCESSED.with_label_values(&[chainhook, kind]).inc();
    }

    /// Record a contract call
    pub fn record_contract_call(&self, chainhook: &str, success: bool) {
        CONTRACT_CALLS
            .with_label_values(&[chainhook, status(success)])
            .inc();
    }

    /// Record a transaction event
    pub fn record_chain_event(&self, chainhook: &str, event_type: &str) {
        CHAIN_EVENTS
            .with_label_values(&[chainhook, event_type_label(event_type)])
            .inc();
    }

    /// Record a processing error
    pub fn record_processing_error(&self, chainhook: &str, stage: &str) {
        PROCESSING_ERRORS
            .with_label_values(&[chainhook, stage])
            .inc();
    }

    /// Record payload processing duration
    pub fn record_processing_duration(&self, chainhook: &str, duration_secs: f64) {
        PROCESSING_DURATION
            .with_label_values(&[chainhook])
            .observe(duration_secs);
    }

    /// Track queue depth
    pub fn queue_enqueued(&self) {
        QUEUE_DEPTH.inc();
    }

    /// Track queue depth
    pub fn queue_dequeued(&self) {
        QUEUE_DEPTH.dec();
    }

    /// Record a management API call
    pub fn record_api_call(&self, operation: &str, success: bool) {
        API_CALLS
            .with_label_values(&[operation, status(success)])
            .inc();
    }
}

/// Metrics context for a single chainhook
pub struct ChainhookMetricsContext {
    metrics: ChainhookMetrics,
    chainhook: String,
}

impl ChainhookMetricsContext {
    /// Create new metrics context
    pub fn new(chainhook: &str) -> Self {
        Self {
            metrics: ChainhookMetrics::global(),
            chainhook: chainhook_label(chainhook),
        }
    }

    pub fn block(&self, kind: &str) {
        self.metrics.record_block(&self.chainhook, kind);
    }

    pub fn contract_call(&self, success: bool) {
        self.metrics.record_contract_call(&self.chainhook, success);
    }

    pub fn chain_event(&self, event_type: &str) {
        self.metrics.record_chain_event(&self.chainhook, event_type);
    }

    pub fn processing_error(&self, stage: &str) {
        self.metrics.record_processing_error(&self.chainhook, stage);
    }

    pub fn processing_duration(&self, duration_secs: f64) {
        self.metrics
            .record_processing_duration(&self.chainhook, duration_secs);
    }
}
