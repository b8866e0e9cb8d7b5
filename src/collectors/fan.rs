use std::sync::LazyLock;

use metrix_core::{DataPoint, Metric, Timestamp};
use regex::Regex;

use crate::{collector::Collector, BoxFuture, Error};

use super::{command, pattern, MACOS};

static FAN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?i)Fan:\s*(\d+)\s*rpm"));

/**
Speed of each fan.

Reading fan speeds needs `powermetrics`, which needs root. The command is run through `sudo -n`,
so it fails rather than prompting when no password-less rule is configured. In that case, or on
machines without fans, nothing is reported.
*/
#[derive(Default)]
pub struct Fan;

impl Collector for Fan {
    fn name(&self) -> &'static str {
        "fan"
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<Metric>, Error>> {
        Box::pin(async move {
            if !MACOS {
                return Ok(Vec::new());
            }

            let output = match command::run(
                "sudo",
                &["-n", "powermetrics", "--samplers", "smc", "-i", "1", "-n", "1"],
            )
            .await
            {
                Ok(output) => output,
                Err(err) => {
                    emit::debug!("fan speeds are unavailable: {err}");

                    return Ok(Vec::new());
                }
            };

            let now = Timestamp::now();

            let speed = Metric::gauge(
                "system.fan.speed",
                "rpm",
                "Fan speed in revolutions per minute",
            )
            .with_points(
                parse_powermetrics(&output)?
                    .into_iter()
                    .enumerate()
                    .map(|(i, rpm)| {
                        DataPoint::new(now, rpm as f64).with_attribute("fan", format!("fan{i}"))
                    }),
            );

            if speed.is_empty() {
                return Ok(Vec::new());
            }

            Ok(vec![speed])
        })
    }
}

fn parse_powermetrics(output: &str) -> Result<Vec<u64>, Error> {
    Ok(pattern(&FAN)?
        .captures_iter(output)
        .filter_map(|captures| captures[1].parse().ok())
        .collect())
}
