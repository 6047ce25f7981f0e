//! JSON-RPC chain client built on alloy.

mod client;
mod contracts;

pub use client::EvmChainClient;
