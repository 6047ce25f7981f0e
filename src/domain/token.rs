//! Token metadata and raw-unit amounts.

use alloy_primitives::utils::{format_units, parse_units};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Denominator for basis-point arithmetic.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Static facts about a fungible token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMeta {
    /// Display symbol, also used to reference the token from config.
    pub symbol: String,
    /// Contract address.
    pub address: Address,
    /// Decimal precision of raw units.
    pub decimals: u8,
    /// Token rejects changing a nonzero allowance to another nonzero value.
    #[serde(default)]
    pub requires_zero_reset: bool,
}

impl TokenMeta {
    /// Build an amount of this token from raw units.
    pub fn amount(&self, raw: U256) -> TokenAmount {
        TokenAmount::new(self.address, raw, self.decimals)
    }

    /// Build an amount of this token from a human-readable decimal string.
    pub fn parse_amount(&self, human: &str) -> Result<TokenAmount, DomainError> {
        TokenAmount::parse(self.address, human, self.decimals)
    }
}

/// An amount of a specific token in raw (smallest) units.
///
/// Raw units are unsigned so the non-negative invariant holds by
/// construction. Arithmetic between amounts requires the same token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    token: Address,
    raw: U256,
    decimals: u8,
}

impl TokenAmount {
    pub const fn new(token: Address, raw: U256, decimals: u8) -> Self {
        Self {
            token,
            raw,
            decimals,
        }
    }

    /// Scale a human-readable decimal string (e.g. `"1.5"`) into raw units.
    pub fn parse(token: Address, human: &str, decimals: u8) -> Result<Self, DomainError> {
        let trimmed = human.trim();
        if trimmed.starts_with('-') {
            return Err(DomainError::InvalidAmount {
                value: human.to_string(),
                reason: "amounts cannot be negative".to_string(),
            });
        }
        let parsed = parse_units(trimmed, decimals).map_err(|e| DomainError::InvalidAmount {
            value: human.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(token, parsed.get_absolute(), decimals))
    }

    pub const fn token(&self) -> Address {
        self.token
    }

    pub const fn raw(&self) -> U256 {
        self.raw
    }

    pub const fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    /// Human-readable rendering using the token's decimals.
    pub fn format(&self) -> String {
        format_units(self.raw, self.decimals).unwrap_or_else(|_| self.raw.to_string())
    }

    /// Slippage-bounded minimum: `raw * (10000 - bps) / 10000`, floored.
    pub fn min_with_slippage(&self, slippage_bps: u16) -> Self {
        Self::new(
            self.token,
            min_with_slippage(self.raw, slippage_bps),
            self.decimals,
        )
    }
}

/// Slippage-bounded minimum of a raw amount using integer floor division.
///
/// Callers validate `slippage_bps < 10000`; larger values saturate to zero.
/// Amounts too large to multiply directly are split into quotient and
/// remainder by the denominator, which gives the same floor.
pub fn min_with_slippage(desired: U256, slippage_bps: u16) -> U256 {
    let keep = U256::from(BPS_DENOMINATOR.saturating_sub(u32::from(slippage_bps)));
    let denominator = U256::from(BPS_DENOMINATOR);
    match desired.checked_mul(keep) {
        Some(product) => product / denominator,
        None => desired / denominator * keep + desired % denominator * keep / denominator,
    }
}
