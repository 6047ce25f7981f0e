//! Seedpool - liquidity bootstrap and oracle registration for constant-product AMMs.
//!
//! Given a deployed factory, router and price oracle, seedpool takes each
//! configured token pair from nothing to an oracle-registered pool: it checks
//! balances and allowances, resolves or creates the pair, provisions initial
//! liquidity, verifies the oracle's reserve minimum and registers the pair.
//! Every step's outcome is recorded in a [`app::WorkflowLedger`] so partial
//! runs can be audited and re-run safely.
//!
//! # Modules
//!
//! - [`domain`] - Chain-agnostic types: tokens, amounts, pairs, step results
//! - [`port`] - The [`port::ChainClient`] trait the workflow is written against
//! - [`app`] - Workflow components, the orchestrator and the ledger
//! - [`adapter`] - Chain client implementations (JSON-RPC via alloy, simulated)
//! - [`config`] - TOML configuration loading and validation
//! - [`cli`] - Command-line interface
//! - [`error`] - Error types for the crate
//!
//! # Features
//!
//! - `rpc` (default) - JSON-RPC chain client and keystore support
//! - `testkit` - In-memory `SimulatedChain` chain client for tests
//!
//! # Example
//!
//! ```no_run
//! use seedpool::config::Config;
//!
//! let config = Config::load("config.toml").unwrap();
//! let specs = config.pair_specs(chrono::Utc::now()).unwrap();
//! println!("{} pairs configured", specs.len());
//! ```

pub mod adapter;
pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;
