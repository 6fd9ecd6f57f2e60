//! Chainhook webhook ingestion and management
//!
//! Verifies signed deliveries from the chainhooks service, hands them to a
//! background worker, and walks apply/rollback blocks through a pluggable
//! [`ChainhookHandler`]. The management client registers and maintains the
//! chainhooks that feed the relay.

pub mod client;
pub mod definition;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod models;
pub mod processor;
pub mod verifier;

pub use client::{ChainhooksClient, Pagination, RegisteredChainhook};
pub use definition::{ChainhookDefinition, CreateChainhookParams, StacksNetwork};
pub use dispatcher::EventDispatcher;
pub use error::{ChainhookError, ChainhookErrorContext};
pub use handler::{ChainhookHandler, LogOnlyHandler, MultiHandler};
pub use models::{ChainhookEventType, WebhookPayload};
pub use processor::{EventProcessor, ProcessingReport};
pub use verifier::WebhookVerifier;
