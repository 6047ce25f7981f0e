//! Handler for the `run` command.

use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::Result;

/// Execute the run command.
///
/// Returns `Ok(true)` when every pair reached `Registered` or `Skipped`.
pub async fn execute(args: &RunArgs) -> Result<bool> {
    let mut config = Config::load(&args.config)?;

    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }
    if args.no_create {
        config.workflow.allow_create = false;
    }
    if args.force {
        config.workflow.skip_bootstrapped = false;
    }
    if let Some(ref path) = args.ledger {
        config.workflow.ledger_path = path.clone();
    }

    config.init_logging();
    imp::run(config).await
}

#[cfg(feature = "rpc")]
mod imp {
    use std::sync::Arc;

    use chrono::Utc;
    use tokio::signal;
    use tokio::sync::watch;
    use tracing::{info, warn};

    use crate::adapter::evm::EvmChainClient;
    use crate::app::{ensure_distinct_senders, run_lanes_into, Lane, WorkflowLedger, WorkflowOrchestrator};
    use crate::cli::{ledger, output};
    use crate::config::Config;
    use crate::error::{ConfigError, Result};

    pub(super) async fn run(config: Config) -> Result<bool> {
        let groups = config.pair_specs_by_lane(Utc::now())?;
        if groups.is_empty() {
            output::warn("No pairs configured");
            return Ok(true);
        }

        let deployment = config.deployment();
        let options = config.workflow_options()?;
        let mut chain_id = None;
        let mut lanes = Vec::with_capacity(groups.len());

        for (lane, specs) in groups {
            let key = match &lane {
                None => config
                    .wallet
                    .private_key
                    .clone()
                    .ok_or(ConfigError::MissingField {
                        field: "WALLET_PRIVATE_KEY",
                    })?,
                Some(name) => config
                    .lane(name)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        field: "pairs.lane",
                        reason: format!("unknown lane {name}"),
                    })?
                    .private_key()?,
            };
            let client = EvmChainClient::new(&key, &config.network)?;

            let reported = client.chain_id().await?;
            if let Some(expected) = config.network.chain_id {
                if expected != reported {
                    return Err(ConfigError::InvalidValue {
                        field: "chain_id",
                        reason: format!("endpoint reports chain {reported}, expected {expected}"),
                    }
                    .into());
                }
            }
            chain_id = Some(reported);

            let orchestrator = WorkflowOrchestrator::new(Arc::new(client), deployment, options);
            info!(
                lane = lane.as_deref().unwrap_or("primary"),
                sender = %orchestrator.sender(),
                pairs = specs.len(),
                "Lane ready"
            );
            lanes.push(Lane { orchestrator, specs });
        }

        ensure_distinct_senders(&lanes)?;

        info!(
            chain_id = ?chain_id,
            lanes = lanes.len(),
            allow_create = options.allow_create,
            "seedpool starting"
        );

        // First Ctrl-C lets in-flight pairs finish; a second one stops at once.
        let shared = WorkflowLedger::new(chain_id).shared();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut run = Box::pin(run_lanes_into(lanes, &shared, shutdown_rx));

        let mut interrupted = false;
        tokio::select! {
            () = &mut run => {}
            _ = signal::ctrl_c() => {
                warn!("Shutdown signal received, finishing pairs in flight");
                interrupted = true;
                let _ = shutdown_tx.send(true);
                tokio::select! {
                    () = &mut run => {}
                    _ = signal::ctrl_c() => {
                        warn!("Second signal received, aborting lanes");
                    }
                }
            }
        }
        // Aborts any lane still running before the ledger is written.
        drop(run);

        let mut ledger = shared.lock().clone();
        if !interrupted {
            ledger.finish();
        }
        ledger.save(&config.workflow.ledger_path)?;
        info!(path = %config.workflow.ledger_path.display(), "Ledger written");

        ledger::print_ledger(&ledger, false);
        Ok(!interrupted && !ledger.has_failures())
    }
}

#[cfg(not(feature = "rpc"))]
mod imp {
    use crate::config::Config;
    use crate::error::{ConfigError, Result};

    pub(super) async fn run(_config: Config) -> Result<bool> {
        Err(ConfigError::InvalidValue {
            field: "features",
            reason: "built without the `rpc` feature; no chain client available".to_string(),
        }
        .into())
    }
}
