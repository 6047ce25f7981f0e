//! Handler for `plan`: resolve the configured pairs and show the derived
//! transaction parameters without any chain access.

use std::path::Path;

use alloy_primitives::Address;
use chrono::Utc;

use crate::cli::output;
use crate::config::Config;
use crate::domain::{PairSpec, Side};
use crate::error::Result;

#[allow(clippy::result_large_err)]
pub fn execute<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = Config::load(config_path)?;
    let groups = config.pair_specs_by_lane(Utc::now())?;

    if groups.is_empty() {
        output::warn("No pairs configured");
        return Ok(());
    }

    output::key_value("Min liquidity", config.min_liquidity()?);
    output::key_value("Create pairs", config.workflow.allow_create);

    for (lane, specs) in &groups {
        let title = match lane {
            Some(name) => format!("Lane {name}"),
            None => "Primary wallet".to_string(),
        };
        output::section(&title);
        for spec in specs {
            print_pair(spec);
        }
    }
    Ok(())
}

fn print_pair(spec: &PairSpec) {
    let canonical = spec.canonical();
    let (min_a, min_b) = spec.min_amounts();

    output::note(&format!(
        "{}  {}/{}",
        spec.id(),
        spec.token_a().symbol,
        spec.token_b().symbol
    ));
    output::detail(
        "order",
        format!(
            "token0={} token1={}",
            symbol_of(spec, canonical.token0()),
            symbol_of(spec, canonical.token1())
        ),
    );
    for (side, min) in [(Side::A, min_a), (Side::B, min_b)] {
        let token = spec.token(side);
        let native = if spec.is_native(side) { " (native)" } else { "" };
        output::detail(
            &format!("{}{native}", token.symbol),
            format!("desired {} min {}", spec.amount(side).format(), min.format()),
        );
    }
    output::detail("slippage", format!("{} bps", spec.slippage_bps()));
    output::detail("deadline", spec.deadline().to_rfc3339());
}

fn symbol_of(spec: &PairSpec, address: Address) -> &str {
    if spec.token_a().address == address {
        &spec.token_a().symbol
    } else {
        &spec.token_b().symbol
    }
}
