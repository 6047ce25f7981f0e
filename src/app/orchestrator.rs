//! Per-pair workflow driver.
//!
//! Each pair moves through allowance, resolution, provisioning, gating and
//! registration. A failed step halts that pair only; the next pair always
//! runs. Pairs of one sending account are processed strictly in order.
//!
//! When a shared ledger is attached, a pair's entry is pushed as soon as the
//! pair starts and rewritten after every step, so an interrupted run still
//! records every transaction that was broadcast.

use std::collections::HashSet;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::allowance::AllowanceManager;
use super::gate::LiquidityGate;
use super::ledger::{PairEntry, PairState, SharedLedger, WorkflowLedger};
use super::provision::LiquidityProvisioner;
use super::registrar::OracleRegistrar;
use super::resolver::{PairResolver, Probe};
use super::revert::chain_failure;
use crate::domain::{ErrorKind, PairSpec, Side, SkipReason, Stage, StepData, StepResult};
use crate::error::{ConfigError, Result};
use crate::port::{ChainClient, Deployment};

/// Run-wide workflow switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowOptions {
    /// Create missing pairs through the factory.
    pub allow_create: bool,
    /// Skip pairs that are deployed, funded and registered already, and do
    /// not deposit again into pairs that are only missing registration.
    pub skip_bootstrapped: bool,
    /// Per-token reserve minimum required before oracle registration.
    pub min_liquidity: U256,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            allow_create: true,
            skip_bootstrapped: true,
            min_liquidity: U256::ZERO,
        }
    }
}

/// What the read-only preflight found at a deployed pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Preflight {
    /// Below the minimum or never minted.
    Unfunded,
    /// Funded above the minimum but not yet supported by the oracle.
    Funded,
    /// Funded and supported; nothing left to do.
    Bootstrapped,
}

/// A pair entry, mirrored into the shared ledger after every step.
struct Progress<'a> {
    entry: PairEntry,
    live: Option<(&'a SharedLedger, usize)>,
}

impl<'a> Progress<'a> {
    fn new(entry: PairEntry, ledger: Option<&'a SharedLedger>) -> Self {
        let live = ledger.map(|ledger| {
            let index = ledger.lock().push(entry.clone());
            (ledger, index)
        });
        Self { entry, live }
    }

    fn record(&mut self, stage: Stage, result: StepResult) -> bool {
        let proceed = self.entry.record(stage, result);
        self.publish();
        proceed
    }

    fn skip(&mut self, reason: SkipReason) {
        self.entry.skip(reason);
        self.publish();
    }

    fn publish(&self) {
        if let Some((ledger, index)) = self.live {
            ledger.lock().update(index, self.entry.clone());
        }
    }
}

pub struct WorkflowOrchestrator {
    chain: Arc<dyn ChainClient>,
    deployment: Deployment,
    options: WorkflowOptions,
    allowances: AllowanceManager,
    resolver: PairResolver,
    provisioner: LiquidityProvisioner,
    gate: LiquidityGate,
    registrar: OracleRegistrar,
}

impl WorkflowOrchestrator {
    pub fn new(chain: Arc<dyn ChainClient>, deployment: Deployment, options: WorkflowOptions) -> Self {
        Self {
            allowances: AllowanceManager::new(chain.clone()),
            resolver: PairResolver::new(chain.clone(), deployment.factory),
            provisioner: LiquidityProvisioner::new(chain.clone(), deployment.router),
            gate: LiquidityGate::new(chain.clone()),
            registrar: OracleRegistrar::new(chain.clone(), deployment.oracle, options.min_liquidity),
            chain,
            deployment,
            options,
        }
    }

    pub fn sender(&self) -> Address {
        self.chain.sender()
    }

    /// Bootstrap every pair in order and return the finished ledger.
    pub async fn run(&self, specs: &[PairSpec], chain_id: Option<u64>) -> WorkflowLedger {
        let ledger = WorkflowLedger::new(chain_id).shared();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        self.run_into(specs, &ledger, &shutdown_rx).await;
        let mut ledger = ledger.lock().clone();
        ledger.finish();
        ledger
    }

    /// Bootstrap pairs in order, recording each into `ledger` while it runs.
    ///
    /// Stops before the next pair once `shutdown` reads `true`; the pair in
    /// flight always finishes.
    pub async fn run_into(&self, specs: &[PairSpec], ledger: &SharedLedger, shutdown: &watch::Receiver<bool>) {
        for (done, spec) in specs.iter().enumerate() {
            let stopping = *shutdown.borrow();
            if stopping {
                info!(
                    sender = %self.sender(),
                    remaining = specs.len() - done,
                    "Shutdown requested, not starting further pairs"
                );
                return;
            }
            let entry = self.drive(spec, Some(ledger)).await;
            match &entry.state {
                PairState::FailedAt { stage, error } => {
                    warn!(pair = %spec.id(), stage = %stage, error = %error, "Pair failed");
                }
                state => info!(pair = %spec.id(), state = ?state, "Pair finished"),
            }
        }
    }

    /// Drive a single pair to a terminal state.
    pub async fn run_pair(&self, spec: &PairSpec) -> PairEntry {
        self.drive(spec, None).await
    }

    async fn drive(&self, spec: &PairSpec, ledger: Option<&SharedLedger>) -> PairEntry {
        let sender = self.chain.sender();
        let mut progress = Progress::new(PairEntry::new(spec.id().clone(), sender, spec.canonical()), ledger);
        let (token_a, token_b) = (spec.token_a().address, spec.token_b().address);
        info!(pair = %spec.id(), "Bootstrapping pair");

        // Read-only preflight: phantom and finished pairs never cost a transaction.
        let mut funded = false;
        match self.resolver.probe(token_a, token_b).await {
            Ok(Probe::Phantom(pair)) => {
                warn!(pair_id = %spec.id(), pair = %pair, "Phantom pair, skipping all transactions");
                progress.record(
                    Stage::PairResolved,
                    StepResult::failed(
                        ErrorKind::PhantomPair { pair },
                        format!("factory returned {pair} but no contract code is deployed there"),
                    ),
                );
                return progress.entry;
            }
            Ok(Probe::Deployed(pair)) if self.options.skip_bootstrapped => match self.preflight(pair).await {
                Preflight::Bootstrapped => {
                    info!(pair_id = %spec.id(), pair = %pair, "Pair already bootstrapped");
                    progress.skip(SkipReason::AlreadyBootstrapped);
                    return progress.entry;
                }
                Preflight::Funded => {
                    info!(pair_id = %spec.id(), pair = %pair, "Pair already funded, resuming at registration");
                    funded = true;
                }
                Preflight::Unfunded => {}
            },
            Ok(_) => {}
            Err(e) => {
                progress.record(
                    Stage::PairResolved,
                    chain_failure(ErrorKind::ChainUnavailable, "factory query failed", &e, &[]),
                );
                return progress.entry;
            }
        }

        if funded {
            progress.record(Stage::AllowanceChecked, StepResult::skipped(SkipReason::AlreadyFunded));
        } else if !self.prepare_allowances(spec, &mut progress).await {
            return progress.entry;
        }

        let resolved = self
            .resolver
            .resolve(token_a, token_b, self.options.allow_create)
            .await;
        let record = match resolved.data() {
            Some(StepData::Pair { record, .. }) => Some(record.clone()),
            _ => None,
        };
        progress.record(Stage::PairResolved, resolved);
        let Some(record) = record else {
            return progress.entry;
        };

        let provisioned = if funded {
            StepResult::skipped(SkipReason::AlreadyFunded)
        } else {
            self.provisioner.provision(&record, spec).await
        };
        if !progress.record(Stage::LiquidityProvisioned, provisioned) {
            return progress.entry;
        }

        let gated = self.gate.check_minimum(&record, self.options.min_liquidity).await;
        let record = match gated.data() {
            Some(StepData::Gate { record, .. }) => Some(record.clone()),
            _ => None,
        };
        progress.record(Stage::GateChecked, gated);
        let Some(record) = record else {
            return progress.entry;
        };

        let registered = self.registrar.register(&record).await;
        progress.record(Stage::Registered, registered);
        progress.entry
    }

    /// Balance preflight for both sides, then router allowances.
    ///
    /// Returns `false` once a step failed.
    async fn prepare_allowances(&self, spec: &PairSpec, progress: &mut Progress<'_>) -> bool {
        let sender = self.chain.sender();
        for side in [Side::A, Side::B] {
            let token = spec.token(side);
            let required = spec.amount(side).raw();
            if let Err(step) = self
                .allowances
                .ensure_funded(sender, token, required, spec.is_native(side))
                .await
            {
                progress.record(Stage::AllowanceChecked, step);
                return false;
            }
        }

        for side in [Side::A, Side::B] {
            let step = if spec.is_native(side) {
                StepResult::skipped(SkipReason::NativeAsset)
            } else {
                self.allowances
                    .ensure(sender, self.deployment.router, spec.token(side), spec.amount(side).raw())
                    .await
            };
            if !progress.record(Stage::AllowanceChecked, step) {
                return false;
            }
        }
        true
    }

    /// Classify a deployed pair by its reserves and oracle support.
    async fn preflight(&self, pair: Address) -> Preflight {
        let funded = match self.resolver.read_record(pair).await {
            Ok(record) => record.meets_minimum(self.options.min_liquidity) && !record.total_shares.is_zero(),
            Err(e) => {
                debug!(pair = %pair, error = %e, "Could not read pair during preflight");
                return Preflight::Unfunded;
            }
        };
        if !funded {
            return Preflight::Unfunded;
        }
        match self.chain.is_pair_supported(self.deployment.oracle, pair).await {
            Ok(true) => Preflight::Bootstrapped,
            Ok(false) => Preflight::Funded,
            Err(e) => {
                debug!(pair = %pair, error = %e, "Could not query oracle during preflight");
                Preflight::Funded
            }
        }
    }
}

/// Pairs assigned to one sending account.
pub struct Lane {
    pub orchestrator: WorkflowOrchestrator,
    pub specs: Vec<PairSpec>,
}

/// Refuse lane sets where two lanes would send from one account.
///
/// Concurrent lanes on one account race for its nonce sequence.
#[allow(clippy::result_large_err)]
pub fn ensure_distinct_senders(lanes: &[Lane]) -> Result<()> {
    let mut seen = HashSet::new();
    for lane in lanes {
        let sender = lane.orchestrator.sender();
        if !seen.insert(sender) {
            return Err(ConfigError::InvalidValue {
                field: "lanes",
                reason: format!("more than one lane sends from {sender}"),
            }
            .into());
        }
    }
    Ok(())
}

/// Run lanes for distinct sending accounts concurrently.
///
/// Pairs within a lane stay sequential; lanes share only the ledger.
pub async fn run_lanes(lanes: Vec<Lane>, chain_id: Option<u64>) -> WorkflowLedger {
    let ledger = WorkflowLedger::new(chain_id).shared();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    run_lanes_into(lanes, &ledger, shutdown_rx).await;
    let mut ledger = ledger.lock().clone();
    ledger.finish();
    ledger
}

/// Like [`run_lanes`], recording into a caller-owned ledger.
///
/// Each lane stops before its next pair once `shutdown` reads `true`.
/// Dropping the returned future aborts every lane task.
pub async fn run_lanes_into(lanes: Vec<Lane>, ledger: &SharedLedger, shutdown: watch::Receiver<bool>) {
    let mut tasks = JoinSet::new();
    for lane in lanes {
        let ledger = ledger.clone();
        let shutdown = shutdown.clone();
        let sender = lane.orchestrator.sender();
        info!(sender = %sender, pairs = lane.specs.len(), "Starting lane");
        tasks.spawn(async move {
            lane.orchestrator.run_into(&lane.specs, &ledger, &shutdown).await;
            sender
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(sender) => debug!(sender = %sender, "Lane finished"),
            Err(e) => error!(error = %e, "Lane task aborted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::adapter::simulated::{SimCall, SimulatedChain};
    use crate::domain::TokenMeta;

    const ME: Address = Address::repeat_byte(0x01);

    fn deployment() -> Deployment {
        Deployment {
            factory: Address::repeat_byte(0xfa),
            router: Address::repeat_byte(0x0f),
            oracle: Address::repeat_byte(0x0c),
            wrapped_native: None,
        }
    }

    fn meta(symbol: &str, byte: u8) -> TokenMeta {
        TokenMeta {
            symbol: symbol.to_string(),
            address: Address::repeat_byte(byte),
            decimals: 18,
            requires_zero_reset: false,
        }
    }

    fn spec(a: TokenMeta, b: TokenMeta) -> PairSpec {
        let amount_a = a.parse_amount("100").unwrap().raw();
        let amount_b = b.parse_amount("300").unwrap().raw();
        let now = Utc::now();
        PairSpec::try_new(a, b, amount_a, amount_b, 100, now + Duration::minutes(20), now).unwrap()
    }

    fn funded(spec: &PairSpec) -> Arc<SimulatedChain> {
        let chain = Arc::new(SimulatedChain::new(ME));
        for side in [Side::A, Side::B] {
            chain.add_token(spec.token(side).address, false);
            chain.mint(spec.token(side).address, ME, spec.amount(side).raw());
        }
        chain
    }

    #[tokio::test]
    async fn failure_halts_pair_before_later_stages() {
        let spec = spec(meta("AAA", 0xaa), meta("BBB", 0xbb));
        let chain = funded(&spec);
        chain.fail_next(SimCall::AddLiquidity, "UniswapV2Router: INSUFFICIENT_A_AMOUNT");
        let orchestrator = WorkflowOrchestrator::new(chain.clone(), deployment(), WorkflowOptions::default());

        let entry = orchestrator.run_pair(&spec).await;

        assert!(matches!(
            entry.state,
            PairState::FailedAt {
                stage: Stage::LiquidityProvisioned,
                ..
            }
        ));
        assert!(!entry.steps.iter().any(|s| s.stage == Stage::GateChecked));
        assert!(chain.transactions_of(SimCall::AddOraclePair).is_empty());
    }

    #[tokio::test]
    async fn bootstrapped_pair_is_skipped_up_front() {
        let spec = spec(meta("AAA", 0xaa), meta("BBB", 0xbb));
        let chain = funded(&spec);
        let pair = chain.deploy_pair(spec.token_a().address, spec.token_b().address);
        chain.seed_reserves(pair, U256::from(5_000u64), U256::from(5_000u64), U256::from(5_000u64));
        chain.set_oracle_support(pair);
        let options = WorkflowOptions {
            min_liquidity: U256::from(1_000u64),
            ..WorkflowOptions::default()
        };
        let orchestrator = WorkflowOrchestrator::new(chain.clone(), deployment(), options);

        let entry = orchestrator.run_pair(&spec).await;

        assert_eq!(
            entry.state,
            PairState::Skipped {
                reason: SkipReason::AlreadyBootstrapped
            }
        );
        assert!(entry.steps.is_empty());
        assert!(chain.transactions().is_empty());
    }

    #[tokio::test]
    async fn funded_unregistered_pair_goes_straight_to_registration() {
        let spec = spec(meta("AAA", 0xaa), meta("BBB", 0xbb));
        let chain = Arc::new(SimulatedChain::new(ME));
        let pair = chain.deploy_pair(spec.token_a().address, spec.token_b().address);
        chain.seed_reserves(pair, U256::from(5_000u64), U256::from(5_000u64), U256::from(5_000u64));
        let options = WorkflowOptions {
            min_liquidity: U256::from(1_000u64),
            ..WorkflowOptions::default()
        };
        let orchestrator = WorkflowOrchestrator::new(chain.clone(), deployment(), options);

        let entry = orchestrator.run_pair(&spec).await;

        assert_eq!(entry.state, PairState::Registered);
        let provisioned = entry
            .steps
            .iter()
            .find(|s| s.stage == Stage::LiquidityProvisioned)
            .map(|s| &s.result);
        assert_eq!(provisioned, Some(&StepResult::skipped(SkipReason::AlreadyFunded)));
        assert!(chain.transactions_of(SimCall::Approve).is_empty());
        assert!(chain.transactions_of(SimCall::AddLiquidity).is_empty());
        assert_eq!(chain.transactions_of(SimCall::AddOraclePair).len(), 1);
    }

    #[test]
    fn lanes_must_not_share_a_sender() {
        let lane = |sender: Address| Lane {
            orchestrator: WorkflowOrchestrator::new(
                Arc::new(SimulatedChain::new(sender)),
                deployment(),
                WorkflowOptions::default(),
            ),
            specs: Vec::new(),
        };

        assert!(ensure_distinct_senders(&[lane(ME), lane(Address::repeat_byte(0x02))]).is_ok());
        match ensure_distinct_senders(&[lane(ME), lane(ME)]) {
            Err(crate::error::Error::Config(ConfigError::InvalidValue { field, .. })) => {
                assert_eq!(field, "lanes")
            }
            other => panic!("expected duplicate sender rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bootstrapped_check_can_be_disabled() {
        let spec = spec(meta("AAA", 0xaa), meta("BBB", 0xbb));
        let chain = funded(&spec);
        let pair = chain.deploy_pair(spec.token_a().address, spec.token_b().address);
        chain.seed_reserves(pair, U256::from(5_000u64), U256::from(15_000u64), U256::from(5_000u64));
        chain.set_oracle_support(pair);
        let options = WorkflowOptions {
            skip_bootstrapped: false,
            ..WorkflowOptions::default()
        };
        let orchestrator = WorkflowOrchestrator::new(chain.clone(), deployment(), options);

        let entry = orchestrator.run_pair(&spec).await;

        assert_eq!(entry.state, PairState::Registered);
        let last = entry.steps.last().map(|s| &s.result);
        assert_eq!(last, Some(&StepResult::skipped(SkipReason::AlreadyRegistered)));
        assert!(chain.transactions_of(SimCall::AddOraclePair).is_empty());
    }
}
