//! Classification of revert reasons and chain failures into step outcomes.

use crate::domain::{ErrorKind, StepResult, TxId};
use crate::error::ChainError;

/// Coarse cause of a reverted liquidity or registration call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertClass {
    /// Router deadline elapsed before inclusion.
    DeadlineExpired,
    /// Quoted amounts fell below the caller's minimums.
    Slippage,
    /// Pool reserves below what the callee requires.
    InsufficientLiquidity,
    /// Token pull failed (allowance or balance drift).
    TransferFailed,
    /// Anything else, including empty revert data.
    Unknown,
}

impl RevertClass {
    pub fn classify(reason: &str) -> Self {
        let reason = reason.to_ascii_uppercase();
        if reason.contains("EXPIRED") {
            RevertClass::DeadlineExpired
        } else if reason.contains("INSUFFICIENT_A_AMOUNT") || reason.contains("INSUFFICIENT_B_AMOUNT")
        {
            RevertClass::Slippage
        } else if reason.contains("INSUFFICIENT_LIQUIDITY") || reason.contains("MIN_LIQUIDITY") {
            RevertClass::InsufficientLiquidity
        } else if reason.contains("TRANSFER_FROM_FAILED") || reason.contains("ALLOWANCE") {
            RevertClass::TransferFailed
        } else {
            RevertClass::Unknown
        }
    }

    /// Worth walking the provisioning fallback ladder for.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, RevertClass::TransferFailed | RevertClass::Unknown)
    }
}

/// Map a chain failure into a failed step.
///
/// On-chain reverts become `on_revert`; transport, signer and receipt
/// failures become `ChainUnavailable`. Any broadcast transaction hash is kept.
pub(crate) fn chain_failure(
    on_revert: ErrorKind,
    context: &str,
    err: &ChainError,
    prior_txs: &[TxId],
) -> StepResult {
    let kind = match err {
        ChainError::Reverted { .. } => on_revert,
        ChainError::ReceiptUnavailable { .. } | ChainError::Rpc(_) | ChainError::Signer(_) => {
            ErrorKind::ChainUnavailable
        }
    };
    StepResult::failed(kind, format!("{context}: {err}"))
        .with_txs(prior_txs.iter().copied().chain(err.tx_id()))
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;

    use super::*;

    #[test]
    fn classifies_router_reasons() {
        assert_eq!(
            RevertClass::classify("UniswapV2Router: EXPIRED"),
            RevertClass::DeadlineExpired
        );
        assert_eq!(
            RevertClass::classify("execution reverted: UniswapV2Router: INSUFFICIENT_B_AMOUNT"),
            RevertClass::Slippage
        );
        assert_eq!(
            RevertClass::classify("Oracle: INSUFFICIENT_LIQUIDITY"),
            RevertClass::InsufficientLiquidity
        );
        assert_eq!(
            RevertClass::classify("TransferHelper: TRANSFER_FROM_FAILED"),
            RevertClass::TransferFailed
        );
        assert_eq!(RevertClass::classify(""), RevertClass::Unknown);
    }

    #[test]
    fn only_transfer_and_unknown_are_ambiguous() {
        assert!(RevertClass::TransferFailed.is_ambiguous());
        assert!(RevertClass::Unknown.is_ambiguous());
        assert!(!RevertClass::DeadlineExpired.is_ambiguous());
        assert!(!RevertClass::Slippage.is_ambiguous());
    }

    #[test]
    fn chain_failure_keeps_broadcast_hash() {
        let prior = TxId::new(B256::repeat_byte(1));
        let sent = TxId::new(B256::repeat_byte(2));
        let err = ChainError::Reverted {
            tx_id: Some(sent),
            reason: "nope".to_string(),
        };
        let step = chain_failure(ErrorKind::AllowanceRejected, "approve", &err, &[prior]);
        assert_eq!(step.error(), Some(&ErrorKind::AllowanceRejected));
        assert_eq!(step.tx_ids(), &[prior, sent]);

        let rpc = ChainError::Rpc("connection refused".to_string());
        let step = chain_failure(ErrorKind::AllowanceRejected, "approve", &rpc, &[]);
        assert_eq!(step.error(), Some(&ErrorKind::ChainUnavailable));
        assert!(step.tx_ids().is_empty());
    }
}
