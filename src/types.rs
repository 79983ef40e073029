use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Call parameters of a single transaction, before it is assigned to a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxCall {
    pub to: Address,
    pub value: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TxCall {
    /// Plain value transfer with no payload
    pub fn transfer(to: Address, value: U256) -> Self {
        Self {
            to,
            value,
            data: None,
            gas_limit: None,
            description: None,
        }
    }
}

/// Transaction intent owned by a batch
///
/// The id has the form `{batch_id}-{index}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionIntent {
    pub id: String,
    #[serde(flatten)]
    pub call: TxCall,
}

/// Ordered set of intents created by the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: String,
    pub intents: Vec<TransactionIntent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }

    /// Status only moves forward: pending -> executing -> completed | failed
    pub fn can_transition_to(self, next: BatchStatus) -> bool {
        matches!(
            (self, next),
            (BatchStatus::Pending, BatchStatus::Executing)
                | (BatchStatus::Executing, BatchStatus::Executing)
                | (BatchStatus::Executing, BatchStatus::Completed)
                | (BatchStatus::Executing, BatchStatus::Failed)
                | (BatchStatus::Pending, BatchStatus::Failed)
        )
    }
}

/// Progress record of one batch
///
/// `completed + failed + pending == total` holds for every snapshot handed
/// to an observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    pub current_transaction: Option<String>,
    pub status: BatchStatus,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            failed: 0,
            pending: total,
            current_transaction: None,
            status: BatchStatus::Pending,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.completed + self.failed + self.pending == self.total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failed,
    Pending,
}

/// Confirmed receipt as reported by the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// `true` when the transaction executed without reverting
    pub status: bool,
    pub gas_used: U256,
    pub effective_gas_price: U256,
    pub block_number: Option<u64>,
    pub block_hash: Option<H256>,
    pub transaction_hash: H256,
    pub from: Address,
    pub to: Option<Address>,
    pub contract_address: Option<Address>,
}

impl TxReceipt {
    /// Amount actually paid for this transaction, in wei
    pub fn cost(&self) -> U256 {
        self.gas_used.saturating_mul(self.effective_gas_price)
    }
}

/// Final outcome of one intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutcome {
    pub id: String,
    pub status: OutcomeStatus,
    pub nonce: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<H256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<TxReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub retries: u32,
}

impl TransactionOutcome {
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Aggregated result of one `execute_batch` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: String,
    pub success: bool,
    pub outcomes: Vec<TransactionOutcome>,
    pub total_gas_used: U256,
    pub total_cost: U256,
    pub elapsed: Duration,
}

/// Pre-flight projection returned by the cost estimator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub total_gas_limit: U256,
    pub gas_price: U256,
    pub estimated_cost: U256,
    /// Estimated cost in ether
    pub formatted: String,
}
