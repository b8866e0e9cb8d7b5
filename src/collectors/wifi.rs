use metrix_core::{DataPoint, Metric};

use crate::{collector::Collector, BoxFuture, Error};

use super::{command, MACOS};

const AIRPORT: &str =
    "/System/Library/PrivateFrameworks/Apple80211.framework/Versions/Current/Resources/airport";

const INTERFACE: &str = "en0";

/**
Signal strength of the current Wi-Fi connection.

Reports nothing when there's no connection.
*/
#[derive(Default)]
pub struct Wifi;

impl Collector for Wifi {
    fn name(&self) -> &'static str {
        "wifi"
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<Metric>, Error>> {
        Box::pin(async move {
            if !MACOS {
                return Ok(Vec::new());
            }

            let output = match command::run(AIRPORT, &["-I"]).await {
                Ok(output) => output,
                Err(err) => {
                    emit::debug!("wifi status is unavailable: {err}");

                    return Ok(Vec::new());
                }
            };

            let Some(connection) = parse_airport(&output) else {
                return Ok(Vec::new());
            };

            Ok(vec![Metric::gauge(
                "system.wifi.signal_strength",
                "dBm",
                "RSSI of current Wi-Fi connection",
            )
            .with_point(
                DataPoint::now(connection.rssi as f64)
                    .with_attribute("ssid", connection.ssid)
                    .with_attribute("interface", INTERFACE),
            )])
        })
    }
}

#[derive(Debug, PartialEq)]
struct Connection {
    ssid: String,
    rssi: i64,
}

/**
Parse the output of `airport -I`.

Returns `None` unless both an SSID and a signal strength are present.
*/
fn parse_airport(output: &str) -> Option<Connection> {
    let mut ssid = None;
    let mut rssi = None;

    for line in output.lines().map(str::trim) {
        if let Some(value) = line.strip_prefix("SSID:") {
            ssid = Some(value.trim().to_owned()).filter(|ssid| !ssid.is_empty());
        } else if let Some(value) = line.strip_prefix("agrCtlRSSI:") {
            rssi = value.trim().parse().ok();
        }
    }

    Some(Connection {
        ssid: ssid?,
        rssi: rssi?,
    })
}
