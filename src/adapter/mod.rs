//! Implementations of the chain port.

#[cfg(feature = "rpc")]
pub mod evm;

#[cfg(any(test, feature = "testkit"))]
pub mod simulated;
