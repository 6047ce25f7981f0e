//! Uniform step outcomes recorded by every workflow component.

use std::fmt;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use super::ids::TxId;
use super::pair::PairRecord;

/// Workflow stage a step result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    AllowanceChecked,
    PairResolved,
    LiquidityProvisioned,
    GateChecked,
    Registered,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::AllowanceChecked => "allowance_checked",
            Stage::PairResolved => "pair_resolved",
            Stage::LiquidityProvisioned => "liquidity_provisioned",
            Stage::GateChecked => "gate_checked",
            Stage::Registered => "registered",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified failure cause, with diagnostic values where they exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    InsufficientBalance {
        token: Address,
        required: U256,
        available: U256,
    },
    AllowanceRejected,
    PhantomPair {
        pair: Address,
    },
    PairNotFound,
    PairMismatch {
        pair: Address,
        token0: Address,
        token1: Address,
    },
    TransactionReverted,
    DeadlineExpired,
    InsufficientLiquidityForOracle {
        required: U256,
        reserve0: U256,
        reserve1: U256,
    },
    RegistrationRejected,
    ChainUnavailable,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::InsufficientBalance { .. } => "InsufficientBalance",
            ErrorKind::AllowanceRejected => "AllowanceRejected",
            ErrorKind::PhantomPair { .. } => "PhantomPair",
            ErrorKind::PairNotFound => "PairNotFound",
            ErrorKind::PairMismatch { .. } => "PairMismatch",
            ErrorKind::TransactionReverted => "TransactionReverted",
            ErrorKind::DeadlineExpired => "DeadlineExpired",
            ErrorKind::InsufficientLiquidityForOracle { .. } => "InsufficientLiquidityForOracle",
            ErrorKind::RegistrationRejected => "RegistrationRejected",
            ErrorKind::ChainUnavailable => "ChainUnavailable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a step did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Allowance already covers the required amount.
    Sufficient,
    /// Side is funded with the native asset, no allowance involved.
    NativeAsset,
    /// Pair already holds reserves above the oracle minimum; no deposit made.
    AlreadyFunded,
    /// Oracle already supports the pair.
    AlreadyRegistered,
    /// Pair is deployed, funded above the threshold and registered.
    AlreadyBootstrapped,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Sufficient => "sufficient",
            SkipReason::NativeAsset => "native_asset",
            SkipReason::AlreadyFunded => "already_funded",
            SkipReason::AlreadyRegistered => "already_registered",
            SkipReason::AlreadyBootstrapped => "already_bootstrapped",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rung of the provisioning fallback ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rung {
    Direct,
    AllowanceReset,
    SyncRetry,
}

/// Payload of a successful step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepData {
    Allowance {
        token: Address,
        spender: Address,
        approved: U256,
        zero_reset: bool,
    },
    Pair {
        record: PairRecord,
        created: bool,
    },
    Provisioned {
        amount_a_min: U256,
        amount_b_min: U256,
        shares_minted: Option<U256>,
        rungs: Vec<Rung>,
    },
    Gate {
        record: PairRecord,
        required: U256,
    },
    Registered {
        pair: Address,
        token0: Address,
        token1: Address,
    },
}

/// Outcome of one workflow step.
///
/// `tx_ids` lists every transaction the step broadcast, including those sent
/// before a failure, so the ledger can tell "spent but incomplete" apart
/// from "nothing happened".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepResult {
    Success {
        tx_ids: Vec<TxId>,
        data: StepData,
    },
    Failed {
        error: ErrorKind,
        message: String,
        tx_ids: Vec<TxId>,
    },
    Skipped {
        reason: SkipReason,
    },
}

impl StepResult {
    pub fn success(tx_ids: Vec<TxId>, data: StepData) -> Self {
        StepResult::Success { tx_ids, data }
    }

    pub fn failed(error: ErrorKind, message: impl Into<String>) -> Self {
        StepResult::Failed {
            error,
            message: message.into(),
            tx_ids: Vec::new(),
        }
    }

    pub fn skipped(reason: SkipReason) -> Self {
        StepResult::Skipped { reason }
    }

    /// Attach broadcast transactions to a failure (or success).
    #[must_use]
    pub fn with_txs(mut self, txs: impl IntoIterator<Item = TxId>) -> Self {
        match &mut self {
            StepResult::Success { tx_ids, .. } | StepResult::Failed { tx_ids, .. } => {
                tx_ids.extend(txs);
            }
            StepResult::Skipped { .. } => {}
        }
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StepResult::Success { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepResult::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, StepResult::Skipped { .. })
    }

    pub fn tx_ids(&self) -> &[TxId] {
        match self {
            StepResult::Success { tx_ids, .. } | StepResult::Failed { tx_ids, .. } => tx_ids,
            StepResult::Skipped { .. } => &[],
        }
    }

    pub fn error(&self) -> Option<&ErrorKind> {
        match self {
            StepResult::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            StepResult::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn data(&self) -> Option<&StepData> {
        match self {
            StepResult::Success { data, .. } => Some(data),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;

    use super::*;

    #[test]
    fn failed_result_keeps_broadcast_txs() {
        let tx = TxId::new(B256::repeat_byte(1));
        let result = StepResult::failed(ErrorKind::AllowanceRejected, "reverted").with_txs([tx]);
        assert!(result.is_failed());
        assert_eq!(result.tx_ids(), &[tx]);
        assert_eq!(result.error(), Some(&ErrorKind::AllowanceRejected));
    }

    #[test]
    fn skipped_result_never_carries_txs() {
        let tx = TxId::new(B256::repeat_byte(2));
        let result = StepResult::skipped(SkipReason::AlreadyRegistered).with_txs([tx]);
        assert!(result.tx_ids().is_empty());
    }

    #[test]
    fn serializes_with_status_tag() {
        let result = StepResult::failed(
            ErrorKind::InsufficientLiquidityForOracle {
                required: U256::from(1000u64),
                reserve0: U256::from(10u64),
                reserve1: U256::from(2000u64),
            },
            "below threshold",
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"]["kind"], "insufficient_liquidity_for_oracle");

        let skipped = serde_json::to_value(StepResult::skipped(SkipReason::Sufficient)).unwrap();
        assert_eq!(skipped["reason"], "sufficient");
    }
}
