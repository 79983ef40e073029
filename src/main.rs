use anyhow::Context;
use batch_executor::{
    BatchExecutor, ExecutionConfig, TxCall,
    chain::{ChainReader, EthersChain, EthersSigner, TransactionSender},
    config::Config,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Runs one batch described by a JSON file.
///
/// Loads `config/default.toml`, reads a JSON array of calls from the path
/// given as the first argument, prints the cost estimate and, when a signer
/// key is present in the environment, executes the batch and prints the
/// result as JSON.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::load("config/default.toml")?;
    info!("Batch executor starting with config: {:?}", config.chain);

    let path = std::env::args()
        .nth(1)
        .context("usage: batch-executor <calls.json>")?;
    let calls: Vec<TxCall> = serde_json::from_str(&std::fs::read_to_string(&path)?)
        .with_context(|| format!("invalid batch file {}", path))?;

    let chain = EthersChain::connect(&config.chain)?;
    let signer = EthersSigner::from_env(chain.provider().clone(), &config.chain)?;
    let chain = match &signer {
        Some(signer) => chain.with_sender(signer.address()),
        None => chain,
    };

    let chain: Arc<dyn ChainReader> = Arc::new(chain);
    let sender = signer.map(|s| Arc::new(s) as Arc<dyn TransactionSender>);
    let executor = BatchExecutor::from_config(chain, sender, &config);

    let estimate = executor.estimate_batch_cost(&calls).await?;
    info!(
        total_gas_limit = %estimate.total_gas_limit,
        gas_price = %estimate.gas_price,
        "Estimated cost: {} ETH",
        estimate.formatted
    );

    if !executor.has_signer() {
        warn!(
            "{} is not set; skipping execution",
            config.chain.signer_key_env
        );
        return Ok(());
    }

    let batch = executor.create_batch(calls).await;
    let execution = ExecutionConfig::from(&config.execution).with_callback(|progress| {
        info!(
            completed = progress.completed,
            failed = progress.failed,
            pending = progress.pending,
            status = ?progress.status,
            "Batch progress"
        );
    });

    let result = executor
        .execute_batch(&batch.batch_id, &batch.intents, execution)
        .await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
