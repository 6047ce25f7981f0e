//! Workflow ledger: the persisted record of what a run did.
//!
//! One entry per pair with its terminal state, the ordered step trace and
//! every transaction broadcast on its behalf. Saved as pretty JSON using a
//! write-to-temp-then-rename sequence so readers never see a partial file.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{CanonicalPair, ErrorKind, PairId, SkipReason, Stage, StepResult, TxId};
use crate::error::Result;

/// Current ledger format version.
pub const LEDGER_VERSION: &str = "1";

/// Ledger shared between concurrently running lanes.
pub type SharedLedger = Arc<Mutex<WorkflowLedger>>;

/// Per-pair workflow state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PairState {
    Pending,
    AllowanceChecked,
    PairResolved,
    LiquidityProvisioned,
    GateChecked,
    Registered,
    FailedAt { stage: Stage, error: ErrorKind },
    Skipped { reason: SkipReason },
}

impl PairState {
    /// State reached after a non-failing step of `stage`.
    fn reached(stage: Stage) -> Self {
        match stage {
            Stage::AllowanceChecked => PairState::AllowanceChecked,
            Stage::PairResolved => PairState::PairResolved,
            Stage::LiquidityProvisioned => PairState::LiquidityProvisioned,
            Stage::GateChecked => PairState::GateChecked,
            Stage::Registered => PairState::Registered,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PairState::Registered | PairState::FailedAt { .. } | PairState::Skipped { .. }
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PairState::FailedAt { .. })
    }
}

/// A step result tagged with its stage and completion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub stage: Stage,
    pub at: DateTime<Utc>,
    pub result: StepResult,
}

/// Everything that happened to one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairEntry {
    pub pair: PairId,
    /// Account that sent this pair's transactions.
    pub sender: Address,
    /// Token order as stored on chain.
    pub canonical: CanonicalPair,
    pub state: PairState,
    pub steps: Vec<StepRecord>,
    /// All transactions broadcast for this pair, in order.
    pub transactions: Vec<TxId>,
}

impl PairEntry {
    pub fn new(pair: PairId, sender: Address, canonical: CanonicalPair) -> Self {
        Self {
            pair,
            sender,
            canonical,
            state: PairState::Pending,
            steps: Vec::new(),
            transactions: Vec::new(),
        }
    }

    /// Append a step and advance the state machine.
    ///
    /// Returns `false` once the pair has failed and must not progress.
    pub fn record(&mut self, stage: Stage, result: StepResult) -> bool {
        self.transactions.extend_from_slice(result.tx_ids());
        let proceed = match result.error() {
            Some(error) => {
                self.state = PairState::FailedAt {
                    stage,
                    error: error.clone(),
                };
                false
            }
            None => {
                self.state = PairState::reached(stage);
                true
            }
        };
        self.steps.push(StepRecord {
            stage,
            at: Utc::now(),
            result,
        });
        proceed
    }

    /// Mark the whole pair as skipped.
    pub fn skip(&mut self, reason: SkipReason) {
        self.state = PairState::Skipped { reason };
    }

    /// Whether any transaction was broadcast, successful or not.
    pub fn spent(&self) -> bool {
        !self.transactions.is_empty()
    }

    /// The failing step, if the pair failed.
    pub fn failure(&self) -> Option<&StepRecord> {
        self.state
            .is_failed()
            .then(|| self.steps.last())
            .flatten()
    }
}

/// Counts of terminal states across a ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total: usize,
    pub registered: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Entries that never reached a terminal state.
    pub incomplete: usize,
    pub transactions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowLedger {
    /// Schema version for forward compatibility.
    pub version: String,
    pub run_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Every account that sent transactions in this run.
    pub senders: Vec<Address>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub entries: Vec<PairEntry>,
}

impl WorkflowLedger {
    #[must_use]
    pub fn new(chain_id: Option<u64>) -> Self {
        Self {
            version: LEDGER_VERSION.to_string(),
            run_id: Uuid::new_v4(),
            chain_id,
            senders: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn shared(self) -> SharedLedger {
        Arc::new(Mutex::new(self))
    }

    /// Append an entry, returning its index for later [`update`](Self::update)s.
    pub fn push(&mut self, entry: PairEntry) -> usize {
        if !self.senders.contains(&entry.sender) {
            self.senders.push(entry.sender);
        }
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Replace the entry at `index` with a newer snapshot of the same pair.
    pub fn update(&mut self, index: usize, entry: PairEntry) {
        if let Some(slot) = self.entries.get_mut(index) {
            *slot = entry;
        }
    }

    pub fn entry(&self, pair: &PairId) -> Option<&PairEntry> {
        self.entries.iter().find(|e| &e.pair == pair)
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn summary(&self) -> LedgerSummary {
        let mut summary = LedgerSummary {
            total: self.entries.len(),
            ..LedgerSummary::default()
        };
        for entry in &self.entries {
            summary.transactions += entry.transactions.len();
            match entry.state {
                PairState::Registered => summary.registered += 1,
                PairState::Skipped { .. } => summary.skipped += 1,
                PairState::FailedAt { .. } => summary.failed += 1,
                _ => summary.incomplete += 1,
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|e| e.state.is_failed())
    }

    /// Write the ledger to `path` atomically.
    ///
    /// Creates the parent directory if it does not exist.
    #[allow(clippy::result_large_err)]
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;

        let cleanup_and_err = |e| {
            let _ = fs::remove_file(&temp_path);
            e
        };

        file.write_all(json.as_bytes()).map_err(cleanup_and_err)?;
        file.sync_all().map_err(cleanup_and_err)?;
        fs::rename(&temp_path, path).map_err(cleanup_and_err)?;

        Ok(())
    }

    #[allow(clippy::result_large_err)]
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;

    use super::*;
    use crate::domain::StepData;

    fn entry(id: &str) -> PairEntry {
        let canonical =
            CanonicalPair::new(Address::repeat_byte(0xaa), Address::repeat_byte(0xbb)).unwrap();
        PairEntry::new(PairId::new(id), Address::repeat_byte(0x01), canonical)
    }

    fn allowance_step(tx: u8) -> StepResult {
        StepResult::success(
            vec![TxId::new(B256::repeat_byte(tx))],
            StepData::Allowance {
                token: Address::repeat_byte(0xaa),
                spender: Address::repeat_byte(0x0f),
                approved: alloy_primitives::U256::from(1u64),
                zero_reset: false,
            },
        )
    }

    #[test]
    fn record_advances_until_failure() {
        let mut e = entry("A/B");
        assert!(e.record(Stage::AllowanceChecked, allowance_step(1)));
        assert_eq!(e.state, PairState::AllowanceChecked);

        let failed = StepResult::failed(ErrorKind::PairNotFound, "missing");
        assert!(!e.record(Stage::PairResolved, failed));
        assert_eq!(
            e.state,
            PairState::FailedAt {
                stage: Stage::PairResolved,
                error: ErrorKind::PairNotFound,
            }
        );
        assert_eq!(e.failure().map(|s| s.stage), Some(Stage::PairResolved));
        assert!(e.spent());
    }

    #[test]
    fn skipped_step_does_not_fail_pair() {
        let mut e = entry("A/B");
        assert!(e.record(Stage::Registered, StepResult::skipped(SkipReason::AlreadyRegistered)));
        assert_eq!(e.state, PairState::Registered);
        assert!(!e.spent());
        assert!(e.failure().is_none());
    }

    #[test]
    fn summary_counts_terminal_states() {
        let mut ledger = WorkflowLedger::new(Some(31337));
        let mut ok = entry("ok");
        ok.record(Stage::Registered, allowance_step(1));
        let mut failed = entry("failed");
        failed.record(Stage::GateChecked, StepResult::failed(ErrorKind::ChainUnavailable, "down"));
        let mut skipped = entry("skipped");
        skipped.skip(SkipReason::AlreadyBootstrapped);
        ledger.push(ok);
        ledger.push(failed);
        ledger.push(skipped);
        ledger.push(entry("pending"));

        let summary = ledger.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.registered, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.incomplete, 1);
        assert_eq!(summary.transactions, 1);
        assert!(ledger.has_failures());
        assert_eq!(ledger.senders, vec![Address::repeat_byte(0x01)]);
    }

    #[test]
    fn update_replaces_in_flight_entry() {
        let mut ledger = WorkflowLedger::new(None);
        let mut e = entry("A/B");
        let index = ledger.push(e.clone());
        assert!(!ledger.entries[index].state.is_terminal());

        e.record(Stage::AllowanceChecked, allowance_step(7));
        ledger.update(index, e);

        assert_eq!(ledger.entries.len(), 1);
        assert_eq!(ledger.entries[0].transactions, vec![TxId::new(B256::repeat_byte(7))]);
        assert_eq!(ledger.summary().incomplete, 1);
    }

    #[test]
    fn serializes_terminal_state_with_tag() {
        let mut e = entry("A/B");
        e.record(
            Stage::GateChecked,
            StepResult::failed(ErrorKind::DeadlineExpired, "late"),
        );
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["state"]["state"], "failed_at");
        assert_eq!(json["state"]["stage"], "gate_checked");
        assert_eq!(json["steps"][0]["result"]["status"], "failed");
    }
}
