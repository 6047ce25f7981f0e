//! `[[tokens]]` and `[[pairs]]` sections resolved into validated pair specs.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::domain::{PairSpec, Side, TokenMeta};
use crate::error::{ConfigError, Result};

/// One pool to bootstrap, referencing tokens by symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct PairConfig {
    /// Ledger key; defaults to `SYMA/SYMB`.
    #[serde(default)]
    pub id: Option<String>,
    pub token_a: String,
    pub token_b: String,
    /// Desired deposit of `token_a` in human units, e.g. `"100"` or `"0.5"`.
    pub amount_a: String,
    pub amount_b: String,
    /// Overrides `workflow.default_slippage_bps`.
    #[serde(default)]
    pub slippage_bps: Option<u32>,
    /// Side funded with the native asset (`"a"` or `"b"`).
    #[serde(default)]
    pub native: Option<Side>,
    /// Name of the lane (sending account) that bootstraps this pair.
    #[serde(default)]
    pub lane: Option<String>,
}

/// Look up a token by its configured symbol.
pub(crate) fn find_token<'a>(tokens: &'a [TokenMeta], symbol: &str) -> Option<&'a TokenMeta> {
    tokens.iter().find(|t| t.symbol == symbol)
}

impl PairConfig {
    /// Build the validated spec for this entry.
    ///
    /// `index` is the entry's position in `[[pairs]]`, used in diagnostics.
    #[allow(clippy::result_large_err)]
    pub(crate) fn to_spec(
        &self,
        index: usize,
        tokens: &[TokenMeta],
        default_slippage_bps: u32,
        deadline_secs: u64,
        now: DateTime<Utc>,
    ) -> Result<PairSpec> {
        let token_a = resolve(tokens, &self.token_a, index)?;
        let token_b = resolve(tokens, &self.token_b, index)?;

        let amount_a = token_a.parse_amount(&self.amount_a).map_err(|e| invalid("pairs.amount_a", index, e))?;
        let amount_b = token_b.parse_amount(&self.amount_b).map_err(|e| invalid("pairs.amount_b", index, e))?;
        if amount_a.is_zero() || amount_b.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "pairs.amount",
                reason: format!("pair {index}: desired amounts must be greater than 0"),
            }
            .into());
        }

        let deadline_secs = i64::try_from(deadline_secs).map_err(|e| invalid("workflow.deadline_secs", index, e))?;
        let deadline = now + Duration::seconds(deadline_secs);

        let mut spec = PairSpec::try_new(
            token_a.clone(),
            token_b.clone(),
            amount_a.raw(),
            amount_b.raw(),
            self.slippage_bps.unwrap_or(default_slippage_bps),
            deadline,
            now,
        )
        .map_err(|e| invalid("pairs", index, e))?;

        if let Some(id) = &self.id {
            spec = spec.with_id(id.as_str());
        }
        if let Some(side) = self.native {
            spec = spec.with_native(side);
        }
        Ok(spec)
    }
}

fn resolve<'a>(tokens: &'a [TokenMeta], symbol: &str, index: usize) -> Result<&'a TokenMeta> {
    find_token(tokens, symbol).ok_or_else(|| {
        ConfigError::UnknownToken {
            symbol: symbol.to_string(),
            pair: index,
        }
        .into()
    })
}

fn invalid(field: &'static str, index: usize, err: impl std::fmt::Display) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: format!("pair {index}: {err}"),
    }
    .into()
}
