//! Core data structures for chainhook deliveries

use serde::{Deserialize, Serialize};

/// A single webhook delivery from the chainhooks service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookPayload {
    /// The chainhook that matched
    pub chainhook: ChainhookInfo,

    /// Blocks newly applied to the canonical chain, in processing order
    #[serde(default)]
    pub apply: Vec<Block>,

    /// Blocks reorganized off the canonical chain, in processing order
    #[serde(default)]
    pub rollback: Vec<Block>,
}

/// Identity of the chainhook that produced a delivery
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainhookInfo {
    pub uuid: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BlockIdentifier {
    pub index: u64,
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
    pub block_identifier: BlockIdentifier,
    pub parent_block_identifier: BlockIdentifier,

    /// Unix timestamp in seconds
    pub timestamp: i64,

    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TransactionIdentifier {
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub transaction_identifier: TransactionIdentifier,

    /// Rollback deliveries may omit operations entirely
    #[serde(default)]
    pub operations: Vec<Operation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TransactionMetadata>,
}

/// A balance-affecting operation within a transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Operation {
    #[serde(rename = "type", default)]
    pub operation_type: String,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub account: Option<Account>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransactionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_call: Option<ContractCall>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<ChainEvent>>,
}

/// Contract invocation carried by a transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractCall {
    /// Fully qualified contract identifier, e.g. `SP000...000.my-contract`
    pub contract_id: String,
    pub function_name: String,

    /// Arguments as delivered; decoded Clarity values may be structured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_args: Option<Vec<serde_json::Value>>,
}

/// An event emitted by a transaction (transfer, print, etc.)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainEvent {
    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Kinds of on-chain activity a chainhook can filter on.
///
/// The canonical wire names are the ones accepted by the chainhooks API;
/// the older `contract_deploy`, `stx_transfer` and `contract_log` spellings
/// are accepted on input and mapped onto the same variants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ChainhookEventType {
    #[serde(rename = "contract_call")]
    ContractCall,
    #[serde(rename = "contract_deployment", alias = "contract_deploy")]
    ContractDeployment,
    #[serde(rename = "stx_transfer_event", alias = "stx_transfer")]
    StxTransfer,
    #[serde(rename = "print_event", alias = "contract_log")]
    PrintEvent,
}

impl ChainhookEventType {
    /// Wire name used in chainhook filter definitions
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContractCall => "contract_call",
            Self::ContractDeployment => "contract_deployment",
            Self::StxTransfer => "stx_transfer_event",
            Self::PrintEvent => "print_event",
        }
    }
}

impl std::fmt::Display for ChainhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChainhookEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contract_call" => Ok(Self::ContractCall),
            "contract_deployment" | "contract_deploy" => Ok(Self::ContractDeployment),
            "stx_transfer_event" | "stx_transfer" => Ok(Self::StxTransfer),
            "print_event" | "contract_log" => Ok(Self::PrintEvent),
            other => Err(format!("Unknown chainhook event type '{other}'")),
        }
    }
}

impl WebhookPayload {
    /// Total number of transactions across apply and rollback blocks
    pub fn transaction_count(&self) -> usize {
        self.apply
            .iter()
            .chain(self.rollback.iter())
            .map(|b| b.transactions.len())
            .sum()
    }
}

impl Block {
    /// Block timestamp rendered as RFC 3339, falling back to the raw value
    pub fn timestamp_rfc3339(&self) -> String {
        chrono::DateTime::from_timestamp(self.timestamp, 0)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| self.timestamp.to_string())
    }
}

impl TransactionMetadata {
    /// Whether the transaction executed successfully; absent means failure
    pub fn is_success(&self) -> bool {
        self.success.unwrap_or(false)
    }
}
