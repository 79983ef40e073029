//! Error Types
//!
//! Three layers of failure are kept apart:
//! - `ChainError`: a collaborator call (RPC, signer, receipt wait) failed
//! - `TransactionError`: one intent failed; recorded in its outcome and never
//!   aborts a sequential batch
//! - `BatchError`: the whole `execute_batch` call is aborted

use ethers::providers::ProviderError;
use ethers::types::H256;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("invalid chain configuration: {0}")]
    InvalidConfig(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("failed to broadcast transaction: {0}")]
    Broadcast(String),

    #[error("signer error: {0}")]
    Signer(String),

    #[error("receipt for {tx_hash:?} not available after {waited_secs}s")]
    ReceiptTimeout { tx_hash: H256, waited_secs: u64 },

    #[error("transaction {0:?} was dropped from the mempool")]
    TransactionDropped(H256),
}

impl From<ProviderError> for ChainError {
    fn from(err: ProviderError) -> Self {
        ChainError::Rpc(err.to_string())
    }
}

/// Failure of a single broadcast attempt
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("broadcast at nonce {nonce} failed: {source}")]
    Broadcast {
        nonce: u64,
        #[source]
        source: ChainError,
    },

    #[error("confirmation of {tx_hash:?} at nonce {nonce} failed: {source}")]
    Confirmation {
        nonce: u64,
        tx_hash: H256,
        #[source]
        source: ChainError,
    },
}

/// Batch-level failure, distinct from any per-transaction outcome
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("no signer connected; executing a batch requires an account")]
    SignerNotConnected,

    #[error("batch {0} is already executing")]
    AlreadyExecuting(String),

    #[error("failed to fetch starting nonce: {0}")]
    NonceLookup(#[source] ChainError),

    #[error("transaction {transaction_id} could not be broadcast: {source}")]
    Broadcast {
        transaction_id: String,
        #[source]
        source: ChainError,
    },

    #[error("transaction {transaction_id} was not confirmed: {source}")]
    Confirmation {
        transaction_id: String,
        #[source]
        source: ChainError,
    },

    /// Earlier confirmed transactions stay on-chain; they cannot be retracted.
    #[error(
        "transaction {transaction_id} reverted ({tx_hash:?}); {confirmed} earlier transaction(s) already confirmed"
    )]
    Reverted {
        transaction_id: String,
        tx_hash: H256,
        confirmed: usize,
    },
}
