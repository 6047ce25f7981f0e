//! Domain validation errors for core domain types.
//!
//! These errors are returned by `try_new` constructors when an input violates
//! a domain invariant (identical tokens, slippage out of range, deadlines in
//! the past, malformed amounts).

use alloy_primitives::Address;
use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A pair needs two distinct tokens.
    #[error("pair tokens must differ, got {token} twice")]
    IdenticalTokens {
        /// The token supplied on both sides.
        token: Address,
    },

    /// Slippage is expressed in basis points and must stay below 100%.
    #[error("slippage must be in [0, 10000) bps, got {bps}")]
    SlippageOutOfRange {
        /// The rejected basis-point value.
        bps: u32,
    },

    /// Deadlines are wall-clock instants that must lie in the future.
    #[error("deadline {deadline} is not in the future")]
    DeadlineInPast {
        /// The rejected deadline as a unix timestamp.
        deadline: i64,
    },

    /// Amount text could not be scaled into raw units.
    #[error("invalid amount '{value}': {reason}")]
    InvalidAmount {
        /// The text that failed to parse.
        value: String,
        /// Parser diagnostic.
        reason: String,
    },
}
