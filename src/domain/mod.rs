//! Chain-agnostic domain types: tokens, pairs, step outcomes.

pub mod error;

mod ids;
mod pair;
mod step;
mod token;

pub use error::DomainError;
pub use ids::{PairId, TxId};
pub use pair::{CanonicalPair, PairRecord, PairSpec, Side};
pub use step::{ErrorKind, Rung, SkipReason, Stage, StepData, StepResult};
pub use token::{min_with_slippage, TokenAmount, TokenMeta, BPS_DENOMINATOR};
