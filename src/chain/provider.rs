//! Read-only chain access over an ethers HTTP provider.

use super::ChainReader;
use crate::{ChainError, TxCall, TxReceipt, config::ChainConfig};
use async_trait::async_trait;
use ethers::providers::{Http, Middleware, PendingTransaction, Provider};
use ethers::types::{
    Address, TransactionReceipt, TransactionRequest, U64, U256, H256,
    transaction::eip2718::TypedTransaction,
};
use std::time::Duration;
use tracing::{debug, error, info};

/// `ChainReader` backed by `Provider<Http>`
#[derive(Debug, Clone)]
pub struct EthersChain {
    provider: Provider<Http>,
    /// Sender used for gas estimation, when known
    from: Option<Address>,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl EthersChain {
    /// Connects to the RPC endpoint from the chain configuration
    pub fn connect(config: &ChainConfig) -> Result<Self, ChainError> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| ChainError::InvalidConfig(format!("rpc_url: {}", e)))?
            .interval(config.poll_interval());

        Ok(Self {
            provider,
            from: None,
            receipt_timeout: config.receipt_timeout(),
            poll_interval: config.poll_interval(),
        })
    }

    /// Estimate gas as if sent from `address`
    pub fn with_sender(mut self, address: Address) -> Self {
        self.from = Some(address);
        self
    }

    pub fn provider(&self) -> &Provider<Http> {
        &self.provider
    }
}

#[async_trait]
impl ChainReader for EthersChain {
    async fn get_transaction_count(&self, address: Address) -> Result<u64, ChainError> {
        let count = self.provider.get_transaction_count(address, None).await?;
        debug!(?address, %count, "Fetched transaction count");
        nonce_from_count(count)
    }

    async fn estimate_gas(&self, call: &TxCall) -> Result<U256, ChainError> {
        let mut request = TransactionRequest::new().to(call.to).value(call.value);
        if let Some(from) = self.from {
            request = request.from(from);
        }
        if let Some(data) = &call.data {
            request = request.data(data.clone());
        }

        let tx: TypedTransaction = request.into();
        let gas = self.provider.estimate_gas(&tx, None).await?;
        Ok(gas)
    }

    async fn get_gas_price(&self) -> Result<U256, ChainError> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: H256,
        confirmations: usize,
    ) -> Result<TxReceipt, ChainError> {
        let pending = PendingTransaction::new(tx_hash, &self.provider)
            .interval(self.poll_interval)
            .confirmations(confirmations);

        match tokio::time::timeout(self.receipt_timeout, pending).await {
            Ok(Ok(Some(receipt))) => {
                info!(?tx_hash, "Confirmed transaction");
                Ok(receipt_from_ethers(receipt))
            }
            // ethers returns None once the tx can no longer be found in the mempool
            Ok(Ok(None)) => Err(ChainError::TransactionDropped(tx_hash)),
            Ok(Err(e)) => {
                error!(?tx_hash, error = ?e, "Error while waiting for receipt");
                Err(e.into())
            }
            Err(_) => {
                error!(?tx_hash, "Waiting for receipt timed out");
                Err(ChainError::ReceiptTimeout {
                    tx_hash,
                    waited_secs: self.receipt_timeout.as_secs(),
                })
            }
        }
    }
}

/// Rejects counts that do not fit a u64 nonce
fn nonce_from_count(count: U256) -> Result<u64, ChainError> {
    if count.bits() > 64 {
        return Err(ChainError::Rpc(format!(
            "transaction count {} exceeds the nonce range",
            count
        )));
    }
    Ok(count.low_u64())
}

fn receipt_from_ethers(receipt: TransactionReceipt) -> TxReceipt {
    TxReceipt {
        status: receipt.status == Some(U64::from(1)),
        gas_used: receipt.gas_used.unwrap_or_default(),
        effective_gas_price: receipt.effective_gas_price.unwrap_or_default(),
        block_number: receipt.block_number.map(|n| n.as_u64()),
        block_hash: receipt.block_hash,
        transaction_hash: receipt.transaction_hash,
        from: receipt.from,
        to: receipt.to,
        contract_address: receipt.contract_address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_conversion() {
        let receipt = TransactionReceipt {
            transaction_hash: H256::from_low_u64_be(7),
            block_number: Some(U64::from(12)),
            gas_used: Some(U256::from(21_000)),
            effective_gas_price: Some(U256::from(3_000_000_000u64)),
            status: Some(U64::from(1)),
            to: Some(Address::from_low_u64_be(2)),
            ..Default::default()
        };

        let converted = receipt_from_ethers(receipt);
        assert!(converted.status);
        assert_eq!(converted.block_number, Some(12));
        assert_eq!(converted.cost(), U256::from(63_000_000_000_000u64));
        assert_eq!(converted.to, Some(Address::from_low_u64_be(2)));
    }

    #[test]
    fn test_reverted_receipt_conversion() {
        let receipt = TransactionReceipt {
            status: Some(U64::zero()),
            ..Default::default()
        };

        let converted = receipt_from_ethers(receipt);
        assert!(!converted.status);
        assert_eq!(converted.gas_used, U256::zero());
    }

    #[test]
    fn test_nonce_from_count() {
        assert_eq!(nonce_from_count(U256::from(17)).unwrap(), 17);
        assert_eq!(nonce_from_count(U256::from(u64::MAX)).unwrap(), u64::MAX);
        assert!(matches!(
            nonce_from_count(U256::from(u64::MAX) + 1),
            Err(ChainError::Rpc(_))
        ));
    }

    #[test]
    fn test_connect_rejects_bad_url() {
        let config = ChainConfig {
            rpc_url: "not a url".to_string(),
            chain_id: 1,
            signer_key_env: "KEY".to_string(),
            confirmations: 1,
            receipt_timeout_secs: 1,
            poll_interval_ms: 10,
        };
        assert!(matches!(
            EthersChain::connect(&config),
            Err(ChainError::InvalidConfig(_))
        ));
    }
}
