//! Idempotent oracle registration.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use tracing::info;

use super::revert::{chain_failure, RevertClass};
use crate::domain::{ErrorKind, PairRecord, SkipReason, StepData, StepResult};
use crate::error::ChainError;
use crate::port::ChainClient;

pub struct OracleRegistrar {
    chain: Arc<dyn ChainClient>,
    oracle: Address,
    min_liquidity: U256,
}

impl OracleRegistrar {
    /// `min_liquidity` is only reported back when the oracle rejects the pair
    /// for thin reserves.
    pub fn new(chain: Arc<dyn ChainClient>, oracle: Address, min_liquidity: U256) -> Self {
        Self {
            chain,
            oracle,
            min_liquidity,
        }
    }

    /// Register `record` with the oracle in canonical token order.
    ///
    /// Already-supported pairs are skipped without a transaction.
    pub async fn register(&self, record: &PairRecord) -> StepResult {
        match self.chain.is_pair_supported(self.oracle, record.address).await {
            Ok(true) => {
                info!(pair = %record.address, "Pair already supported by oracle");
                return StepResult::skipped(SkipReason::AlreadyRegistered);
            }
            Ok(false) => {}
            Err(e) => return chain_failure(ErrorKind::ChainUnavailable, "oracle query failed", &e, &[]),
        }

        // Order comes from the pair contract, never from caller input.
        let canonical = match record.canonical() {
            Ok(canonical) => canonical,
            Err(e) => return StepResult::failed(ErrorKind::RegistrationRejected, e.to_string()),
        };
        let (token0, token1) = (canonical.token0(), canonical.token1());

        info!(pair = %record.address, token0 = %token0, token1 = %token1, "Registering pair with oracle");
        match self
            .chain
            .add_oracle_pair(self.oracle, record.address, token0, token1)
            .await
        {
            Ok(receipt) => {
                info!(tx_hash = %receipt.tx_id, "Oracle registration confirmed");
                StepResult::success(
                    vec![receipt.tx_id],
                    StepData::Registered {
                        pair: record.address,
                        token0,
                        token1,
                    },
                )
            }
            Err(ChainError::Reverted { tx_id, reason })
                if RevertClass::classify(&reason) == RevertClass::InsufficientLiquidity =>
            {
                StepResult::failed(
                    ErrorKind::InsufficientLiquidityForOracle {
                        required: self.min_liquidity,
                        reserve0: record.reserve0,
                        reserve1: record.reserve1,
                    },
                    format!("oracle rejected: {reason}"),
                )
                .with_txs(tx_id)
            }
            Err(e) => chain_failure(ErrorKind::RegistrationRejected, "oracle rejected", &e, &[]),
        }
    }
}
