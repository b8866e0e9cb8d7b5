use std::sync::LazyLock;

use metrix_core::{DataPoint, Metric};
use regex::Regex;

use crate::{collector::Collector, BoxFuture, Error};

use super::{command, pattern, MACOS};

static SPEED_LIMIT: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"CPU_Speed_Limit\s*=\s*(\d+)"));
static WARNING_LEVEL: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?i)warning level[^\d\n]*(\d+)"));

/**
The thermal state of the host, from 0 (nominal) to 3 (critical).

Reports nothing if `pmset` is unavailable.
*/
#[derive(Default)]
pub struct Thermal;

impl Collector for Thermal {
    fn name(&self) -> &'static str {
        "thermal"
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<Metric>, Error>> {
        Box::pin(async move {
            if !MACOS {
                return Ok(Vec::new());
            }

            let state = match command::run("pmset", &["-g", "therm"]).await {
                Ok(output) => parse_pmset(&output)?,
                Err(err) => {
                    emit::debug!("thermal state is unavailable: {err}");

                    return Ok(Vec::new());
                }
            };

            Ok(vec![Metric::gauge(
                "system.thermal.state",
                "enum",
                "Thermal state (0=nominal, 1=fair, 2=serious, 3=critical)",
            )
            .with_point(DataPoint::now(state as f64))])
        })
    }
}

/**
Parse the output of `pmset -g therm`.

The state is the worse of the CPU speed limit and any recorded warning level.
*/
fn parse_pmset(output: &str) -> Result<u8, Error> {
    let speed_limit = pattern(&SPEED_LIMIT)?
        .captures(output)
        .and_then(|captures| captures[1].parse::<u32>().ok())
        .unwrap_or(100);

    let from_speed_limit = match speed_limit {
        0..=49 => 3,
        50..=74 => 2,
        75..=99 => 1,
        _ => 0,
    };

    let from_warning_level = pattern(&WARNING_LEVEL)?
        .captures(output)
        .and_then(|captures| captures[1].parse::<u32>().ok())
        .map(|level| level.min(3) as u8)
        .unwrap_or(0);

    Ok(from_speed_limit.max(from_warning_level))
}
