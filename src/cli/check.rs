//! Handler for `check config`.

use std::path::Path;

use crate::cli::output;
use crate::config::Config;
use crate::error::Result;

/// Validate configuration file without touching the chain.
#[allow(clippy::result_large_err)]
pub fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    output::note(&format!("Checking configuration: {}", path.display()));

    let config = Config::load(path)?;
    output::ok("Configuration file is valid");

    output::section("Summary");
    output::key_value("RPC", &config.network.rpc_url);
    match config.network.chain_id {
        Some(id) => output::key_value("Chain ID", id),
        None => output::key_value("Chain ID", "not pinned"),
    }
    output::key_value("Factory", config.contracts.factory);
    output::key_value("Router", config.contracts.router);
    output::key_value("Oracle", config.contracts.oracle);
    output::key_value("Min liquidity", config.min_liquidity()?);
    output::key_value("Tokens", config.tokens.len());
    output::key_value("Pairs", config.pairs.len());
    output::key_value("Create pairs", config.workflow.allow_create);
    output::key_value("Ledger", config.workflow.ledger_path.display());

    output::section("Signing");
    if config.wallet.private_key.is_some() {
        output::ok("Primary wallet key found");
    } else {
        output::warn("No primary wallet key configured");
        output::note("  Set WALLET_PRIVATE_KEY or wallet.keystore_path to run");
    }
    for lane in &config.lanes {
        if lane.private_key().is_ok() {
            output::ok(&format!("Lane {} key found in {}", lane.name, lane.key_env));
        } else {
            output::warn(&format!("Lane {} key missing: {} is not set", lane.name, lane.key_env));
        }
    }

    if config.pairs.is_empty() {
        output::warn("No pairs configured; a run would do nothing");
    }
    Ok(())
}
