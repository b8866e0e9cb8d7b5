use metrix_core::{DataPoint, Metric, Timestamp};
use sysinfo::System;

use crate::{collector::Collector, BoxFuture, Error};

/**
The 1, 5, and 15 minute load averages.
*/
#[derive(Default)]
pub struct Load;

impl Collector for Load {
    fn name(&self) -> &'static str {
        "load"
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<Metric>, Error>> {
        Box::pin(async move {
            let load = System::load_average();
            let now = Timestamp::now();

            Ok(vec![Metric::gauge(
                "system.cpu.load_average",
                "1",
                "System load average",
            )
            .with_points([
                DataPoint::new(now, load.one).with_attribute("period", "1m"),
                DataPoint::new(now, load.five).with_attribute("period", "5m"),
                DataPoint::new(now, load.fifteen).with_attribute("period", "15m"),
            ])])
        })
    }
}
