//! Application layer - the bootstrap workflow and its result ledger.
//!
//! Components here return [`StepResult`](crate::domain::StepResult) values and
//! never raise; the orchestrator folds them into a [`WorkflowLedger`].

mod allowance;
mod gate;
mod ledger;
mod orchestrator;
mod provision;
mod registrar;
mod resolver;
mod revert;

pub use allowance::AllowanceManager;
pub use gate::LiquidityGate;
pub use ledger::{
    LedgerSummary, PairEntry, PairState, SharedLedger, StepRecord, WorkflowLedger, LEDGER_VERSION,
};
pub use orchestrator::{
    ensure_distinct_senders, run_lanes, run_lanes_into, Lane, WorkflowOptions, WorkflowOrchestrator,
};
pub use provision::LiquidityProvisioner;
pub use registrar::OracleRegistrar;
pub use resolver::{PairResolver, Probe};
pub use revert::RevertClass;
