//! Handler for `ledger`: summarise a persisted run.

use crate::app::{PairEntry, PairState, WorkflowLedger};
use crate::cli::{output, LedgerArgs};
use crate::error::Result;

#[allow(clippy::result_large_err)]
pub fn execute(args: &LedgerArgs) -> Result<()> {
    let ledger = WorkflowLedger::load(&args.path)?;
    print_ledger(&ledger, args.verbose);
    Ok(())
}

/// Print run metadata, per-pair outcomes and totals.
pub fn print_ledger(ledger: &WorkflowLedger, verbose: bool) {
    output::section("Run");
    output::key_value("Run ID", ledger.run_id);
    if let Some(chain_id) = ledger.chain_id {
        output::key_value("Chain ID", chain_id);
    }
    for sender in &ledger.senders {
        output::key_value("Sender", sender);
    }
    output::key_value("Started", ledger.started_at.to_rfc3339());
    match ledger.finished_at {
        Some(at) => output::key_value("Finished", at.to_rfc3339()),
        None => output::key_value("Finished", "interrupted"),
    }

    output::section("Pairs");
    for entry in &ledger.entries {
        print_entry(entry, verbose);
    }

    let summary = ledger.summary();
    output::section("Totals");
    output::key_value("Pairs", summary.total);
    output::key_value("Registered", summary.registered);
    output::key_value("Skipped", summary.skipped);
    output::key_value("Failed", summary.failed);
    if summary.incomplete > 0 {
        output::key_value("Incomplete", summary.incomplete);
    }
    output::key_value("Transactions", summary.transactions);
}

fn print_entry(entry: &PairEntry, verbose: bool) {
    let line = match &entry.state {
        PairState::Registered => format!("{} registered", entry.pair),
        PairState::Skipped { reason } => format!("{} skipped ({reason})", entry.pair),
        PairState::FailedAt { stage, error } => format!("{} failed at {stage}: {error}", entry.pair),
        state => format!("{} stopped in {state:?}", entry.pair),
    };
    if entry.state.is_failed() {
        output::error(&line);
    } else if entry.state.is_terminal() {
        output::ok(&line);
    } else {
        output::warn(&line);
    }

    if let Some(failure) = entry.failure() {
        if let Some(message) = failure.result.message() {
            output::detail("reason", message);
        }
    }
    if entry.spent() {
        output::detail("txs", entry.transactions.len());
    }
    if verbose {
        for step in &entry.steps {
            let outcome = if step.result.is_success() {
                "success"
            } else if step.result.is_skipped() {
                "skipped"
            } else {
                "failed"
            };
            output::detail(step.stage.as_str(), outcome);
            for tx in step.result.tx_ids() {
                output::detail("", tx);
            }
        }
    }
}
