use metrix_core::{DataPoint, Metric};
use sysinfo::System;

use crate::{collector::Collector, BoxFuture, Error};

/**
Whole seconds since the host booted.
*/
#[derive(Default)]
pub struct Uptime;

impl Collector for Uptime {
    fn name(&self) -> &'static str {
        "uptime"
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<Metric>, Error>> {
        Box::pin(async move {
            Ok(vec![Metric::gauge("system.uptime", "s", "Time since boot")
                .with_point(DataPoint::now(System::uptime() as f64))])
        })
    }
}
