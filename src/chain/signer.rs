//! Signing and broadcasting through a local wallet.

use super::{SendRequest, TransactionSender};
use crate::{ChainError, config::ChainConfig};
use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, TransactionRequest, H256};
use std::env;
use tracing::{debug, info};

/// `TransactionSender` that signs with a `LocalWallet`
///
/// The nonce of every request is set explicitly; the middleware never
/// picks one on its own.
pub struct EthersSigner {
    client: SignerMiddleware<Provider<Http>, LocalWallet>,
}

impl EthersSigner {
    pub fn new(provider: Provider<Http>, wallet: LocalWallet) -> Self {
        Self {
            client: SignerMiddleware::new(provider, wallet),
        }
    }

    /// Builds a signer from a hex private key
    pub fn from_private_key(
        provider: Provider<Http>,
        private_key: &str,
        chain_id: u64,
    ) -> Result<Self, ChainError> {
        let wallet = private_key
            .trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| ChainError::Signer(e.to_string()))?
            .with_chain_id(chain_id);
        Ok(Self::new(provider, wallet))
    }

    /// Reads the private key from the environment variable named in config
    ///
    /// # Returns
    /// * `Ok(None)` if the variable is not set (read-only mode)
    /// * `Err` if the variable holds an invalid key
    pub fn from_env(
        provider: Provider<Http>,
        config: &ChainConfig,
    ) -> Result<Option<Self>, ChainError> {
        match env::var(&config.signer_key_env) {
            Ok(key) => {
                let signer = Self::from_private_key(provider, &key, config.chain_id)?;
                info!(address = ?signer.address(), "Signer connected");
                Ok(Some(signer))
            }
            Err(_) => Ok(None),
        }
    }
}

#[async_trait]
impl TransactionSender for EthersSigner {
    fn address(&self) -> Address {
        self.client.address()
    }

    async fn send_transaction(&self, request: &SendRequest) -> Result<H256, ChainError> {
        let mut tx = TransactionRequest::new()
            .from(self.client.address())
            .to(request.to)
            .value(request.value)
            .nonce(request.nonce)
            .chain_id(self.client.signer().chain_id());
        if let Some(data) = &request.data {
            tx = tx.data(data.clone());
        }
        if let Some(gas) = request.gas_limit {
            tx = tx.gas(gas);
        }

        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| ChainError::Broadcast(e.to_string()))?;
        let tx_hash = pending.tx_hash();

        debug!(?tx_hash, nonce = request.nonce, "Broadcast transaction");
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development key (anvil/hardhat account #0)
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn provider() -> Provider<Http> {
        Provider::<Http>::try_from("http://127.0.0.1:8545").unwrap()
    }

    #[test]
    fn test_signer_address_from_key() {
        let signer = EthersSigner::from_private_key(provider(), DEV_KEY, 31337).unwrap();
        let expected: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
        assert_eq!(signer.address(), expected);
    }

    #[test]
    fn test_invalid_key_is_rejected() {
        assert!(matches!(
            EthersSigner::from_private_key(provider(), "zz", 1),
            Err(ChainError::Signer(_))
        ));
    }
}
