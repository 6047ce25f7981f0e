//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! # Available Ports
//!
//! - [`ChainClient`] - contract reads and transaction submission for one
//!   sending account

mod chain;

pub use chain::{
    AddLiquidity, AddLiquidityNative, ChainClient, Deployment, Reserves, TransferLog, TxReceipt,
};
