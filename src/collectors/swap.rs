use std::sync::Mutex;

use metrix_core::{DataPoint, Metric, Timestamp};
use sysinfo::System;

use crate::{collector::Collector, BoxFuture, Error};

use super::ratio;

/**
Swap space in use and available.

A host without swap reports zero usage rather than nothing.
*/
pub struct Swap {
    system: Mutex<System>,
}

impl Swap {
    pub fn new() -> Self {
        Swap {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for Swap {
    fn default() -> Self {
        Swap::new()
    }
}

impl Collector for Swap {
    fn name(&self) -> &'static str {
        "swap"
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<Metric>, Error>> {
        Box::pin(async move {
            let (total, used, free) = {
                let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
                system.refresh_memory();

                (system.total_swap(), system.used_swap(), system.free_swap())
            };

            let now = Timestamp::now();

            Ok(vec![
                Metric::gauge("system.swap.usage", "bytes", "Swap space used")
                    .with_point(DataPoint::new(now, used as f64)),
                Metric::gauge("system.swap.available", "bytes", "Swap space available")
                    .with_point(DataPoint::new(now, free as f64)),
                Metric::gauge("system.swap.utilization", "ratio", "Swap usage percentage")
                    .with_point(DataPoint::new(now, ratio(used as f64, total as f64))),
            ])
        })
    }
}
