//! Minimum-liquidity gate in front of oracle registration.

use std::sync::Arc;

use alloy_primitives::U256;
use tracing::{debug, warn};

use super::resolver::read_record;
use super::revert::chain_failure;
use crate::domain::{ErrorKind, PairRecord, StepData, StepResult};
use crate::port::ChainClient;

/// Read-and-compare check; never sends a transaction.
pub struct LiquidityGate {
    chain: Arc<dyn ChainClient>,
}

impl LiquidityGate {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }

    /// Re-read reserves and require both to reach `minimum`.
    ///
    /// On success the refreshed record is carried in the step data.
    pub async fn check_minimum(&self, record: &PairRecord, minimum: U256) -> StepResult {
        let refreshed = match read_record(self.chain.as_ref(), record.address).await {
            Ok(refreshed) => refreshed,
            Err(e) => return chain_failure(ErrorKind::ChainUnavailable, "reserve read failed", &e, &[]),
        };

        if !refreshed.meets_minimum(minimum) {
            warn!(
                pair = %refreshed.address,
                required = %minimum,
                reserve0 = %refreshed.reserve0,
                reserve1 = %refreshed.reserve1,
                "Reserves below oracle minimum"
            );
            return StepResult::failed(
                ErrorKind::InsufficientLiquidityForOracle {
                    required: minimum,
                    reserve0: refreshed.reserve0,
                    reserve1: refreshed.reserve1,
                },
                format!(
                    "reserves {}/{} below minimum {minimum}",
                    refreshed.reserve0, refreshed.reserve1
                ),
            );
        }

        debug!(pair = %refreshed.address, "Reserves clear oracle minimum");
        StepResult::success(
            Vec::new(),
            StepData::Gate {
                record: refreshed,
                required: minimum,
            },
        )
    }
}
