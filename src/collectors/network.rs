use std::sync::Mutex;

use metrix_core::{DataPoint, Metric, Timestamp};
use sysinfo::Networks;

use crate::{collector::Collector, BoxFuture, Error};

/**
Total bytes received and transmitted by each network interface.

Values are cumulative, so they're reported as a counter.
*/
pub struct Network {
    networks: Mutex<Networks>,
}

impl Network {
    pub fn new() -> Self {
        Network {
            networks: Mutex::new(Networks::new_with_refreshed_list()),
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Network::new()
    }
}

impl Collector for Network {
    fn name(&self) -> &'static str {
        "network"
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<Metric>, Error>> {
        Box::pin(async move {
            let now = Timestamp::now();

            let mut io = Metric::counter(
                "system.network.io",
                "bytes",
                "Bytes transmitted/received",
            );

            {
                let mut networks = self.networks.lock().unwrap_or_else(|e| e.into_inner());
                networks.refresh(true);

                let mut interfaces = networks.iter().collect::<Vec<_>>();
                interfaces.sort_by(|(a, _), (b, _)| a.cmp(b));

                for (device, data) in interfaces {
                    io = io.with_points([
                        DataPoint::new(now, data.total_received() as f64)
                            .with_attribute("device", device.as_str())
                            .with_attribute("direction", "receive"),
                        DataPoint::new(now, data.total_transmitted() as f64)
                            .with_attribute("device", device.as_str())
                            .with_attribute("direction", "transmit"),
                    ]);
                }
            }

            if io.is_empty() {
                return Err(Error::msg("no network statistics found"));
            }

            Ok(vec![io])
        })
    }
}
