//! Configuration Module
//!
//! This module defines all configuration structures for the batch executor.
//! Configuration is loaded from TOML files and parsed using serde.

use serde::Deserialize;
use std::fs;
use std::time::Duration;

/// Main configuration structure
///
/// # Example TOML
/// ```toml
/// [chain]
/// rpc_url = "http://127.0.0.1:8545"
/// chain_id = 31337
/// signer_key_env = "BATCH_SIGNER_KEY"
/// confirmations = 1
/// receipt_timeout_secs = 120
/// poll_interval_ms = 2000
///
/// [execution]
/// atomic = false
/// delay_ms = 0
/// max_retries = 2
///
/// [retry]
/// base_delay_ms = 1000
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub chain: ChainConfig,
    #[serde(default)]
    pub execution: ExecutionDefaults,
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Chain connection configuration
///
/// # Fields
/// - `rpc_url`: JSON-RPC endpoint of the target chain
/// - `chain_id`: Chain id used when signing
/// - `signer_key_env`: Name of the environment variable holding the hex private key
/// - `confirmations`: Block confirmations to wait for on every receipt
/// - `receipt_timeout_secs`: Upper bound on a single receipt wait
/// - `poll_interval_ms`: How often a pending transaction is polled
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    #[serde(default = "default_signer_key_env")]
    pub signer_key_env: String,
    #[serde(default = "default_confirmations")]
    pub confirmations: usize,
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl ChainConfig {
    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Defaults applied to every `ExecutionConfig` built from this file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutionDefaults {
    #[serde(default)]
    pub atomic: bool,
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default)]
    pub max_retries: u32,
}

/// Retry backoff settings
///
/// Attempt `n` of a failing transaction is followed by a pause of
/// `base_delay_ms * 2^n`.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

fn default_signer_key_env() -> String {
    "BATCH_SIGNER_KEY".to_string()
}

fn default_confirmations() -> usize {
    1
}

fn default_receipt_timeout_secs() -> u64 {
    120
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_base_delay_ms() -> u64 {
    1000
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    /// * `Ok(Config)` if the file was successfully loaded and parsed
    /// * `Err` if the file couldn't be read or the TOML is invalid
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
