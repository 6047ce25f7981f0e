//! Transfer authorization management.
//!
//! Some ERC-20 implementations reject moving a nonzero allowance directly to
//! another nonzero value. Tokens flagged `requires_zero_reset` get a zero
//! approval first; all others are approved in a single transaction.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use tracing::{debug, info, warn};

use super::revert::chain_failure;
use crate::domain::{ErrorKind, SkipReason, StepData, StepResult, TokenMeta};
use crate::port::ChainClient;

/// Ensures spenders hold sufficient allowance before transfer-dependent calls.
pub struct AllowanceManager {
    chain: Arc<dyn ChainClient>,
}

impl AllowanceManager {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }

    /// Check that `owner` holds at least `required` of `token`.
    ///
    /// When `native` is set the chain's native-asset balance is read instead.
    /// Returns the available balance, or the failed step to record.
    pub async fn ensure_funded(
        &self,
        owner: Address,
        token: &TokenMeta,
        required: U256,
        native: bool,
    ) -> Result<U256, StepResult> {
        let balance = if native {
            self.chain.native_balance(owner).await
        } else {
            self.chain.balance_of(token.address, owner).await
        };
        let available = balance.map_err(|e| {
            chain_failure(ErrorKind::ChainUnavailable, "balance read failed", &e, &[])
        })?;

        if available < required {
            warn!(
                token = %token.symbol,
                required = %required,
                available = %available,
                "Insufficient balance"
            );
            return Err(StepResult::failed(
                ErrorKind::InsufficientBalance {
                    token: token.address,
                    required,
                    available,
                },
                format!("{} balance {available} below required {required}", token.symbol),
            ));
        }
        Ok(available)
    }

    /// Make sure `spender` may pull `required` of `token` from `owner`.
    pub async fn ensure(
        &self,
        owner: Address,
        spender: Address,
        token: &TokenMeta,
        required: U256,
    ) -> StepResult {
        let current = match self.chain.allowance(token.address, owner, spender).await {
            Ok(current) => current,
            Err(e) => {
                return chain_failure(ErrorKind::ChainUnavailable, "allowance read failed", &e, &[])
            }
        };

        if current >= required {
            debug!(token = %token.symbol, allowance = %current, "Allowance already sufficient");
            return StepResult::skipped(SkipReason::Sufficient);
        }

        let zero_reset = token.requires_zero_reset && !current.is_zero();
        self.approve(spender, token, required, zero_reset).await
    }

    /// Unconditionally approve zero, then `amount`.
    ///
    /// Clears stale or partially consumed allowances before a retry.
    pub async fn reset_cycle(
        &self,
        spender: Address,
        token: &TokenMeta,
        amount: U256,
    ) -> StepResult {
        self.approve(spender, token, amount, true).await
    }

    async fn approve(
        &self,
        spender: Address,
        token: &TokenMeta,
        amount: U256,
        zero_first: bool,
    ) -> StepResult {
        let mut tx_ids = Vec::new();

        if zero_first {
            info!(token = %token.symbol, spender = %spender, "Resetting allowance to zero");
            match self.chain.approve(token.address, spender, U256::ZERO).await {
                Ok(receipt) => tx_ids.push(receipt.tx_id),
                Err(e) => {
                    return chain_failure(
                        ErrorKind::AllowanceRejected,
                        "zero approval rejected",
                        &e,
                        &tx_ids,
                    )
                }
            }
        }

        info!(token = %token.symbol, spender = %spender, amount = %amount, "Approving spender");
        match self.chain.approve(token.address, spender, amount).await {
            Ok(receipt) => {
                info!(tx_hash = %receipt.tx_id, "Approval transaction confirmed");
                tx_ids.push(receipt.tx_id);
            }
            Err(e) => {
                return chain_failure(ErrorKind::AllowanceRejected, "approval rejected", &e, &tx_ids)
            }
        }

        StepResult::success(
            tx_ids,
            StepData::Allowance {
                token: token.address,
                spender,
                approved: amount,
                zero_reset: zero_first,
            },
        )
    }
}
