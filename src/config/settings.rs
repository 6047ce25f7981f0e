//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Configuration is loaded from a TOML file with environment variable overrides
//! for sensitive values like `WALLET_PRIVATE_KEY`.
//!
//! # Example
//!
//! ```no_run
//! use seedpool::config::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::logging::LoggingConfig;
use super::pairs::{find_token, PairConfig};
use super::wallet::{LaneConfig, WalletConfig, PRIMARY_KEY_ENV};
use crate::app::WorkflowOptions;
use crate::domain::{PairSpec, Side, TokenMeta, BPS_DENOMINATOR};
use crate::error::{ConfigError, Result};
use crate::port::Deployment;

/// Largest decimals value whose scale factor still fits in 256 bits.
const MAX_DECIMALS: u8 = 77;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub network: NetworkConfig,
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub lanes: Vec<LaneConfig>,
    #[serde(default)]
    pub tokens: Vec<TokenMeta>,
    #[serde(default)]
    pub pairs: Vec<PairConfig>,
}

/// RPC endpoint and transaction confirmation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    /// Expected chain id; checked against the endpoint when set.
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// Upper bound on waiting for a receipt after broadcast.
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
}

fn default_receipt_timeout_secs() -> u64 {
    120
}

fn default_confirmations() -> u64 {
    1
}

/// Addresses of the already-deployed protocol contracts.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractsConfig {
    pub factory: Address,
    pub router: Address,
    pub oracle: Address,
    /// Wrapped native-asset token; required for pairs with a `native` side.
    #[serde(default)]
    pub wrapped_native: Option<Address>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    /// Per-token reserve minimum in raw units (decimal or `0x` hex string).
    #[serde(default = "default_min_liquidity")]
    pub min_liquidity: String,
}

fn default_min_liquidity() -> String {
    "0".to_string()
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            min_liquidity: default_min_liquidity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default = "default_true")]
    pub allow_create: bool,
    #[serde(default = "default_true")]
    pub skip_bootstrapped: bool,
    #[serde(default = "default_slippage_bps")]
    pub default_slippage_bps: u32,
    /// Deadline offset applied to every pair at run start.
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_slippage_bps() -> u32 {
    50
}

fn default_deadline_secs() -> u64 {
    1200
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("seedpool-ledger.json")
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            allow_create: true,
            skip_bootstrapped: true,
            default_slippage_bps: default_slippage_bps(),
            deadline_secs: default_deadline_secs(),
            ledger_path: default_ledger_path(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// Loads the private key from the `WALLET_PRIVATE_KEY` environment variable
    /// or decrypts it from a keystore file if `keystore_path` is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The TOML content is malformed
    /// - Validation fails (e.g., unknown token symbols, slippage out of range)
    /// - Keystore decryption fails when using keystore authentication
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.wallet.load_key()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Validate configuration values.
    ///
    /// Checks that all required fields are present and values are within
    /// acceptable ranges, then resolves every pair once.
    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.network.rpc_url.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "rpc_url" }.into());
        }
        if let Err(e) = url::Url::parse(&self.network.rpc_url) {
            return Err(ConfigError::InvalidValue {
                field: "rpc_url",
                reason: e.to_string(),
            }
            .into());
        }
        if self.network.receipt_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "receipt_timeout_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.network.confirmations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "confirmations",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        self.min_liquidity()?;

        if self.workflow.default_slippage_bps >= BPS_DENOMINATOR {
            return Err(ConfigError::InvalidValue {
                field: "default_slippage_bps",
                reason: format!("must be below {BPS_DENOMINATOR}"),
            }
            .into());
        }
        if self.workflow.deadline_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "deadline_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        let mut symbols = HashSet::new();
        for token in &self.tokens {
            if !symbols.insert(token.symbol.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "tokens.symbol",
                    reason: format!("duplicate token symbol {}", token.symbol),
                }
                .into());
            }
            if token.decimals > MAX_DECIMALS {
                return Err(ConfigError::InvalidValue {
                    field: "tokens.decimals",
                    reason: format!("{} has {} decimals, max is {MAX_DECIMALS}", token.symbol, token.decimals),
                }
                .into());
            }
        }

        let mut lanes = HashSet::new();
        let mut key_envs = HashSet::from([PRIMARY_KEY_ENV]);
        for lane in &self.lanes {
            if lane.key_env.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "lanes.key_env",
                }
                .into());
            }
            // Each lane needs its own account: one nonce sequence per sender.
            if !key_envs.insert(lane.key_env.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "lanes.key_env",
                    reason: format!("lane {} reuses key {} of another sending account", lane.name, lane.key_env),
                }
                .into());
            }
            if !lanes.insert(lane.name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "lanes.name",
                    reason: format!("duplicate lane {}", lane.name),
                }
                .into());
            }
        }

        for (index, pair) in self.pairs.iter().enumerate() {
            if let Some(lane) = &pair.lane {
                if !lanes.contains(lane.as_str()) {
                    return Err(ConfigError::InvalidValue {
                        field: "pairs.lane",
                        reason: format!("pair {index} references unknown lane {lane}"),
                    }
                    .into());
                }
            }
            if let Some(side) = pair.native {
                let symbol = match side {
                    Side::A => &pair.token_a,
                    Side::B => &pair.token_b,
                };
                let native_token = find_token(&self.tokens, symbol).map(|t| t.address);
                match self.contracts.wrapped_native {
                    None => {
                        return Err(ConfigError::MissingField {
                            field: "wrapped_native",
                        }
                        .into())
                    }
                    Some(wrapped) if native_token.is_some_and(|t| t != wrapped) => {
                        return Err(ConfigError::InvalidValue {
                            field: "pairs.native",
                            reason: format!(
                                "pair {index}: native side {symbol} is not the wrapped native token"
                            ),
                        }
                        .into());
                    }
                    Some(_) => {}
                }
            }
        }

        let specs = self.pair_specs(Utc::now())?;
        let mut ids = HashSet::new();
        for spec in &specs {
            if !ids.insert(spec.id().clone()) {
                return Err(ConfigError::InvalidValue {
                    field: "pairs.id",
                    reason: format!("duplicate pair id {}", spec.id()),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Resolve every `[[pairs]]` entry into a validated spec.
    ///
    /// Deadlines are `now + workflow.deadline_secs`.
    #[allow(clippy::result_large_err)]
    pub fn pair_specs(&self, now: DateTime<Utc>) -> Result<Vec<PairSpec>> {
        self.pairs
            .iter()
            .enumerate()
            .map(|(index, pair)| {
                pair.to_spec(
                    index,
                    &self.tokens,
                    self.workflow.default_slippage_bps,
                    self.workflow.deadline_secs,
                    now,
                )
            })
            .collect()
    }

    /// Pair specs grouped by lane, in order of first appearance.
    ///
    /// `None` is the primary wallet.
    #[allow(clippy::result_large_err)]
    pub fn pair_specs_by_lane(&self, now: DateTime<Utc>) -> Result<Vec<(Option<String>, Vec<PairSpec>)>> {
        let specs = self.pair_specs(now)?;
        let mut groups: Vec<(Option<String>, Vec<PairSpec>)> = Vec::new();
        for (pair, spec) in self.pairs.iter().zip(specs) {
            match groups.iter_mut().find(|(lane, _)| *lane == pair.lane) {
                Some((_, specs)) => specs.push(spec),
                None => groups.push((pair.lane.clone(), vec![spec])),
            }
        }
        Ok(groups)
    }

    pub fn lane(&self, name: &str) -> Option<&LaneConfig> {
        self.lanes.iter().find(|l| l.name == name)
    }

    /// Oracle minimum per token in raw units.
    #[allow(clippy::result_large_err)]
    pub fn min_liquidity(&self) -> Result<U256> {
        U256::from_str(self.oracle.min_liquidity.trim()).map_err(|e| {
            ConfigError::InvalidValue {
                field: "min_liquidity",
                reason: e.to_string(),
            }
            .into()
        })
    }

    #[must_use]
    pub fn deployment(&self) -> Deployment {
        Deployment {
            factory: self.contracts.factory,
            router: self.contracts.router,
            oracle: self.contracts.oracle,
            wrapped_native: self.contracts.wrapped_native,
        }
    }

    #[allow(clippy::result_large_err)]
    pub fn workflow_options(&self) -> Result<WorkflowOptions> {
        Ok(WorkflowOptions {
            allow_create: self.workflow.allow_create,
            skip_bootstrapped: self.workflow.skip_bootstrapped,
            min_liquidity: self.min_liquidity()?,
        })
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
