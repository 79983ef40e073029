//! Batch Execution Module
//!
//! This module submits ordered sets of transactions for one account:
//! - BatchRegistry: Creates batches and tracks their progress
//! - ExecutionCoordinator: Runs the atomic or the sequential path
//! - RetryController: Same-nonce retries with doubling backoff
//! - NonceAllocator: Position to nonce mapping
//! - estimator: Read-only gas and cost projection

mod coordinator;
pub mod estimator;
mod executor;
mod nonce;
mod progress;
mod registry;
mod retry;


pub use coordinator::{ExecutionConfig, ExecutionCoordinator};
pub use executor::BatchExecutor;
pub use nonce::NonceAllocator;
pub use progress::{ChannelObserver, ProgressObserver, ProgressReporter, ProgressTable};
pub use registry::BatchRegistry;
pub use retry::{RetryController, RetryPolicy};
