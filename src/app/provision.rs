//! Liquidity provisioning through the router.
//!
//! Ambiguous reverts walk a bounded fallback ladder, each rung at most once:
//! a direct attempt, a fresh zero-then-amount allowance cycle followed by a
//! retry, and a pair `sync()` followed by a final retry. Deadline expiry,
//! slippage violations and transport failures are never retried.

use std::sync::Arc;

use alloy_primitives::Address;
use chrono::Utc;
use tracing::{info, warn};

use super::allowance::AllowanceManager;
use super::revert::{chain_failure, RevertClass};
use crate::domain::{
    ErrorKind, PairRecord, PairSpec, Rung, Side, StepData, StepResult, TokenAmount, TxId,
};
use crate::error::ChainError;
use crate::port::{AddLiquidity, AddLiquidityNative, ChainClient, TxReceipt};

const LADDER: [Rung; 3] = [Rung::Direct, Rung::AllowanceReset, Rung::SyncRetry];

pub struct LiquidityProvisioner {
    chain: Arc<dyn ChainClient>,
    router: Address,
    allowances: AllowanceManager,
}

impl LiquidityProvisioner {
    pub fn new(chain: Arc<dyn ChainClient>, router: Address) -> Self {
        let allowances = AllowanceManager::new(chain.clone());
        Self {
            chain,
            router,
            allowances,
        }
    }

    /// Add the desired liquidity from `spec` to the resolved pair.
    pub async fn provision(&self, record: &PairRecord, spec: &PairSpec) -> StepResult {
        let (min_a, min_b) = spec.min_amounts();
        let mut tx_ids: Vec<TxId> = Vec::new();
        let mut rungs = Vec::new();
        let mut last_error: Option<ChainError> = None;

        for rung in LADDER {
            match rung {
                Rung::Direct => {}
                Rung::AllowanceReset => {
                    if let Some(failed) = self.refresh_allowances(spec, &mut tx_ids).await {
                        return failed;
                    }
                }
                Rung::SyncRetry => {
                    info!(pair = %record.address, "Syncing pair before final attempt");
                    match self.chain.sync(record.address).await {
                        Ok(receipt) => tx_ids.push(receipt.tx_id),
                        Err(e) => {
                            return chain_failure(
                                ErrorKind::TransactionReverted,
                                "pair sync failed",
                                &e,
                                &tx_ids,
                            )
                        }
                    }
                }
            }

            if Utc::now() >= spec.deadline() {
                return StepResult::failed(
                    ErrorKind::DeadlineExpired,
                    format!("deadline {} elapsed before submission", spec.deadline()),
                )
                .with_txs(tx_ids);
            }

            rungs.push(rung);
            info!(pair = %spec.id(), rung = ?rung, "Submitting liquidity");
            let err = match self.submit(spec, min_a, min_b).await {
                Ok(receipt) => {
                    tx_ids.push(receipt.tx_id);
                    let shares_minted = receipt.minted_to(record.address, self.chain.sender());
                    info!(
                        pair = %spec.id(),
                        tx_hash = %receipt.tx_id,
                        shares = ?shares_minted,
                        "Liquidity added"
                    );
                    return StepResult::success(
                        tx_ids,
                        StepData::Provisioned {
                            amount_a_min: min_a.raw(),
                            amount_b_min: min_b.raw(),
                            shares_minted,
                            rungs,
                        },
                    );
                }
                Err(err) => err,
            };

            let Some(reason) = err.revert_reason() else {
                return chain_failure(ErrorKind::ChainUnavailable, "liquidity submission failed", &err, &tx_ids);
            };
            tx_ids.extend(err.tx_id());

            let class = RevertClass::classify(reason);
            if class == RevertClass::DeadlineExpired {
                return StepResult::failed(ErrorKind::DeadlineExpired, format!("router rejected: {reason}"))
                    .with_txs(tx_ids);
            }
            if !class.is_ambiguous() {
                return StepResult::failed(
                    ErrorKind::TransactionReverted,
                    format!("liquidity reverted: {reason}"),
                )
                .with_txs(tx_ids);
            }
            // A reasonless revert past the deadline is the router's expiry check.
            if Utc::now() >= spec.deadline() {
                return StepResult::failed(
                    ErrorKind::DeadlineExpired,
                    format!("deadline {} elapsed before inclusion: {reason}", spec.deadline()),
                )
                .with_txs(tx_ids);
            }

            warn!(pair = %spec.id(), rung = ?rung, reason, "Ambiguous liquidity revert");
            last_error = Some(err);
        }

        let last = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt made".to_string());
        StepResult::failed(
            ErrorKind::TransactionReverted,
            format!("fallback ladder exhausted: {last}"),
        )
        .with_txs(tx_ids)
    }

    async fn submit(
        &self,
        spec: &PairSpec,
        min_a: TokenAmount,
        min_b: TokenAmount,
    ) -> Result<TxReceipt, ChainError> {
        let to = self.chain.sender();
        match spec.native() {
            None => {
                let call = AddLiquidity {
                    token_a: spec.token_a().address,
                    token_b: spec.token_b().address,
                    amount_a_desired: spec.amount_a().raw(),
                    amount_b_desired: spec.amount_b().raw(),
                    amount_a_min: min_a.raw(),
                    amount_b_min: min_b.raw(),
                    to,
                    deadline: spec.deadline(),
                };
                self.chain.add_liquidity(self.router, &call).await
            }
            Some(native) => {
                let (token_side, token_min, native_min) = match native {
                    Side::A => (Side::B, min_b, min_a),
                    Side::B => (Side::A, min_a, min_b),
                };
                let call = AddLiquidityNative {
                    token: spec.token(token_side).address,
                    amount_token_desired: spec.amount(token_side).raw(),
                    amount_token_min: token_min.raw(),
                    amount_native_min: native_min.raw(),
                    value: spec.amount(native).raw(),
                    to,
                    deadline: spec.deadline(),
                };
                self.chain.add_liquidity_native(self.router, &call).await
            }
        }
    }

    /// Zero-then-amount allowance cycle for every fungible side.
    async fn refresh_allowances(&self, spec: &PairSpec, tx_ids: &mut Vec<TxId>) -> Option<StepResult> {
        for side in [Side::A, Side::B] {
            if spec.is_native(side) {
                continue;
            }
            let token = spec.token(side);
            let step = self
                .allowances
                .reset_cycle(self.router, token, spec.amount(side).raw())
                .await;
            tx_ids.extend_from_slice(step.tx_ids());
            if let StepResult::Failed { error, message, .. } = step {
                return Some(StepResult::failed(error, message).with_txs(tx_ids.iter().copied()));
            }
        }
        None
    }
}
