//! Cost Estimation
//!
//! Read-only pre-flight projection of a batch's gas and cost. Needs no nonce
//! and no connected signer.

use crate::{ChainError, CostEstimate, TxCall, chain::ChainReader};
use ethers::types::U256;
use ethers::utils::format_ether;
use tracing::debug;

/// Sums the gas of every call and prices it at the current gas price
///
/// A call's gas-limit override is taken as-is; every other call is
/// estimated by the node. Errors are returned without retry.
pub async fn estimate_batch_cost(
    chain: &dyn ChainReader,
    calls: &[TxCall],
) -> Result<CostEstimate, ChainError> {
    let mut total_gas_limit = U256::zero();
    for call in calls {
        let gas = match call.gas_limit {
            Some(limit) => limit,
            None => chain.estimate_gas(call).await?,
        };
        total_gas_limit = total_gas_limit.saturating_add(gas);
    }

    let gas_price = chain.get_gas_price().await?;
    let estimated_cost = total_gas_limit.saturating_mul(gas_price);
    debug!(
        calls = calls.len(),
        %total_gas_limit,
        %gas_price,
        "Estimated batch cost"
    );

    Ok(CostEstimate {
        total_gas_limit,
        gas_price,
        estimated_cost,
        formatted: format_cost(estimated_cost),
    })
}

/// Formats wei as ether without trailing zeros
pub fn format_cost(wei: U256) -> String {
    let formatted = format_ether(wei);
    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                whole.to_string()
            } else {
                format!("{}.{}", whole, fraction)
            }
        }
        None => formatted,
    }
}
