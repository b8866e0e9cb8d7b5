use std::sync::LazyLock;

use metrix_core::{DataPoint, Metric, Timestamp};
use regex::Regex;

use crate::{collector::Collector, BoxFuture, Error};

use super::{command, pattern, ratio, MACOS};

static CHARGE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(\d+)%;\s*([^;]+)"));
static CYCLE_COUNT: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r#""CycleCount"\s*=\s*(\d+)"#));

/**
Charge level, charging state, and cycle count of the internal battery.

Hosts without an internal battery report nothing.
*/
#[derive(Default)]
pub struct Battery;

impl Collector for Battery {
    fn name(&self) -> &'static str {
        "battery"
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<Metric>, Error>> {
        Box::pin(async move {
            if !MACOS {
                return Ok(Vec::new());
            }

            let Some(status) = parse_pmset(&command::run("pmset", &["-g", "batt"]).await?)?
            else {
                return Ok(Vec::new());
            };

            let cycle_count = parse_cycle_count(&command::run("ioreg", &["-l"]).await?)?;

            let now = Timestamp::now();

            Ok(vec![
                Metric::gauge("system.battery.charge", "ratio", "Current charge level")
                    .with_point(DataPoint::new(now, status.charge)),
                Metric::gauge(
                    "system.battery.charging",
                    "boolean",
                    "Whether plugged in and charging",
                )
                .with_point(DataPoint::new(now, if status.charging { 1.0 } else { 0.0 })),
                Metric::gauge("system.battery.cycle_count", "cycles", "Battery cycle count")
                    .with_point(DataPoint::new(now, cycle_count as f64)),
            ])
        })
    }
}

#[derive(Debug, PartialEq)]
struct BatteryStatus {
    charge: f64,
    charging: bool,
}

/**
Parse the output of `pmset -g batt`.

Returns `None` if the host has no internal battery.
*/
fn parse_pmset(output: &str) -> Result<Option<BatteryStatus>, Error> {
    if !output.contains("InternalBattery") {
        return Ok(None);
    }

    let captures = pattern(&CHARGE)?
        .captures(output)
        .ok_or_else(|| Error::msg("failed to parse battery charge from pmset output"))?;

    let percent = captures[1]
        .parse::<f64>()
        .map_err(|e| Error::new("failed to parse battery charge from pmset output", e))?;

    let state = captures[2].trim();

    Ok(Some(BatteryStatus {
        charge: ratio(percent, 100.0),
        charging: state == "charging" || state == "finishing charge",
    }))
}

fn parse_cycle_count(output: &str) -> Result<u64, Error> {
    Ok(pattern(&CYCLE_COUNT)?
        .captures(output)
        .and_then(|captures| captures[1].parse().ok())
        .unwrap_or(0))
}
