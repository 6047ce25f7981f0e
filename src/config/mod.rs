//! TOML configuration: network, contracts, workflow switches, tokens and pairs.

mod logging;
mod pairs;
mod settings;
mod wallet;

pub use logging::LoggingConfig;
pub use pairs::PairConfig;
pub use settings::{Config, ContractsConfig, NetworkConfig, OracleConfig, WorkflowConfig};
pub use wallet::{LaneConfig, WalletConfig};
