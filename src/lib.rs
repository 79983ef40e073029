//! Batch transaction execution for a single EVM account.
//!
//! Submits an ordered list of transactions either best-effort "atomic"
//! (stop and fail on the first reversion) or strictly sequential (every
//! transaction attempted, each with same-nonce retries), reporting progress
//! as it goes and aggregating gas and cost at the end.

pub mod types; // Data model shared by every module.
pub mod error; // Chain, per-transaction and batch-level errors.
pub mod chain; // Collaborator traits and their ethers-rs implementations.
pub mod batch; // Registry, coordinator, retries, progress and cost estimation.
pub mod config; // Defines and loads configuration.

// Re-export commonly used types and configurations for easier access.
pub use types::*;
pub use error::{BatchError, ChainError, TransactionError};
pub use config::Config;
pub use batch::{BatchExecutor, ExecutionConfig};
