//! Test data builders for chainhook payloads

use crate::chainhooks::models::{
    Block, BlockIdentifier, ChainEvent, ChainhookInfo, ContractCall, Transaction,
    TransactionIdentifier, TransactionMetadata, WebhookPayload,
};

/// Builder for creating test webhook payloads
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    chainhook: ChainhookInfo,
    apply: Vec<Block>,
    rollback: Vec<Block>,
}

impl PayloadBuilder {
    /// Create a payload for the given chainhook with no blocks
    pub fn new(uuid: &str, name: &str) -> Self {
        Self {
            chainhook: ChainhookInfo {
                uuid: uuid.to_string(),
                name: name.to_string(),
            },
            apply: Vec::new(),
            rollback: Vec::new(),
        }
    }

    /// Append an apply block
    pub fn apply(mut self, block: Block) -> Self {
        self.apply.push(block);
        self
    }

    /// Append a rollback block
    pub fn rollback(mut self, block: Block) -> Self {
        self.rollback.push(block);
        self
    }

    pub fn build(self) -> WebhookPayload {
        WebhookPayload {
            chainhook: self.chainhook,
            apply: self.apply,
            rollback: self.rollback,
        }
    }

    /// Build and serialize to the JSON body the chainhooks service would send
    pub fn to_json(self) -> String {
        serde_json::to_string(&self.build()).expect("payload serializes")
    }
}

/// Builder for creating test blocks
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    index: u64,
    hash: String,
    parent: Option<BlockIdentifier>,
    timestamp: i64,
    transactions: Vec<Transaction>,
}

impl BlockBuilder {
    /// Create a block; the parent defaults to `index - 1`
    pub fn new(index: u64, hash: &str) -> Self {
        Self {
            index,
            hash: hash.to_string(),
            parent: None,
            timestamp: 1_700_000_000,
            transactions: Vec::new(),
        }
    }

    pub fn with_parent(mut self, index: u64, hash: &str) -> Self {
        self.parent = Some(BlockIdentifier {
            index,
            hash: hash.to_string(),
        });
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_transaction(mut self, tx: Transaction) -> Self {
        self.transactions.push(tx);
        self
    }

    pub fn build(self) -> Block {
        let parent = self.parent.unwrap_or_else(|| BlockIdentifier {
            index: self.index.saturating_sub(1),
            hash: format!("{}-parent", self.hash),
        });

        Block {
            block_identifier: BlockIdentifier {
                index: self.index,
                hash: self.hash,
            },
            parent_block_identifier: parent,
            timestamp: self.timestamp,
            transactions: self.transactions,
        }
    }
}

/// Builder for creating test transactions
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    hash: String,
    metadata: Option<TransactionMetadata>,
}

impl TransactionBuilder {
    /// Create a transaction without metadata
    pub fn new(hash: &str) -> Self {
        Self {
            hash: hash.to_string(),
            metadata: None,
        }
    }

    fn metadata(&mut self) -> &mut TransactionMetadata {
        self.metadata.get_or_insert_with(TransactionMetadata::default)
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.metadata().success = Some(success);
        self
    }

    pub fn with_contract_call(mut self, contract_id: &str, function_name: &str) -> Self {
        self.metadata().contract_call = Some(ContractCall {
            contract_id: contract_id.to_string(),
            function_name: function_name.to_string(),
            function_args: None,
        });
        self
    }

    pub fn with_function_args(mut self, args: Vec<serde_json::Value>) -> Self {
        if let Some(call) = self.metadata().contract_call.as_mut() {
            call.function_args = Some(args);
        }
        self
    }

    pub fn with_event(
        mut self,
        event_type: &str,
        data: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Self {
        self.metadata()
            .events
            .get_or_insert_with(Vec::new)
            .push(ChainEvent {
                event_type: event_type.to_string(),
                data,
            });
        self
    }

    pub fn build(self) -> Transaction {
        Transaction {
            transaction_identifier: TransactionIdentifier { hash: self.hash },
            operations: Vec::new(),
            metadata: self.metadata,
        }
    }
}
