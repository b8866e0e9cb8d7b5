use metrix_core::{DataPoint, Metric};

use crate::{collector::Collector, BoxFuture, Error};

use super::{command, MACOS};

/**
The number of connected Bluetooth devices.

Reports 0 if `system_profiler` fails.
*/
#[derive(Default)]
pub struct Bluetooth;

impl Collector for Bluetooth {
    fn name(&self) -> &'static str {
        "bluetooth"
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<Metric>, Error>> {
        Box::pin(async move {
            if !MACOS {
                return Ok(Vec::new());
            }

            let connected = match command::run("system_profiler", &["SPBluetoothDataType"]).await
            {
                Ok(output) => count_connected(&output),
                Err(err) => {
                    emit::debug!("bluetooth devices are unavailable: {err}");

                    0
                }
            };

            Ok(vec![Metric::gauge(
                "system.bluetooth.connected_devices",
                "count",
                "Number of connected Bluetooth devices",
            )
            .with_point(DataPoint::now(connected as f64))])
        })
    }
}

/**
Count the devices listed under `Connected:` in the output of `system_profiler SPBluetoothDataType`.

Device names are indented by exactly 10 spaces and end with a colon. Deeper lines are device
properties.
*/
fn count_connected(output: &str) -> usize {
    let mut connected = false;
    let mut count = 0;

    for line in output.lines() {
        let trimmed = line.trim();

        match trimmed {
            "Connected:" => {
                connected = true;
                continue;
            }
            "Not Connected:" | "Bluetooth Controller:" => {
                connected = false;
                continue;
            }
            _ => (),
        }

        let indent = line.len() - line.trim_start_matches(' ').len();

        if connected && indent == 10 && trimmed.len() > 1 && trimmed.ends_with(':') {
            count += 1;
        }
    }

    count
}
