//! Chain Interaction Module
//!
//! This module defines the two collaborator seams used by the batch engine:
//! - `ChainReader`: read-only queries (nonce, gas, receipts)
//! - `TransactionSender`: signs and broadcasts for one connected account
//!
//! Concrete implementations over ethers-rs live in `provider` and `signer`.

mod provider;
mod signer;

pub use provider::EthersChain;
pub use signer::EthersSigner;

use crate::{ChainError, TxCall, TxReceipt};
use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};

/// Read-only chain access
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Number of transactions already sent from `address`
    async fn get_transaction_count(&self, address: Address) -> Result<u64, ChainError>;

    /// Gas the node expects `call` to consume; nothing is broadcast
    async fn estimate_gas(&self, call: &TxCall) -> Result<U256, ChainError>;

    /// Current price per gas unit, in wei
    async fn get_gas_price(&self) -> Result<U256, ChainError>;

    /// Wait until `tx_hash` is mined with the given confirmation depth
    async fn wait_for_receipt(
        &self,
        tx_hash: H256,
        confirmations: usize,
    ) -> Result<TxReceipt, ChainError>;
}

/// Complete transaction handed to the signer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub to: Address,
    pub value: U256,
    pub data: Option<Bytes>,
    pub nonce: u64,
    pub gas_limit: Option<U256>,
}

impl SendRequest {
    pub fn new(call: &TxCall, nonce: u64) -> Self {
        Self {
            to: call.to,
            value: call.value,
            data: call.data.clone(),
            nonce,
            gas_limit: call.gas_limit,
        }
    }
}

/// Signs and broadcasts transactions for a connected account
#[async_trait]
pub trait TransactionSender: Send + Sync {
    /// Account the transactions are sent from
    fn address(&self) -> Address;

    /// Sign and broadcast, returning the transaction hash without waiting
    async fn send_transaction(&self, request: &SendRequest) -> Result<H256, ChainError>;
}
