use std::sync::Mutex;

use metrix_core::{DataPoint, Metric, Timestamp};
use sysinfo::System;

use crate::{collector::Collector, BoxFuture, Error};

use super::ratio;

/**
Physical memory in use and available.
*/
pub struct Memory {
    system: Mutex<System>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new()
    }
}

impl Collector for Memory {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<Metric>, Error>> {
        Box::pin(async move {
            let (total, used, available) = {
                let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
                system.refresh_memory();

                (
                    system.total_memory(),
                    system.used_memory(),
                    system.available_memory(),
                )
            };

            if total == 0 {
                return Err(Error::msg("total memory is unavailable"));
            }

            let now = Timestamp::now();

            Ok(vec![
                Metric::gauge("system.memory.usage", "bytes", "Memory currently in use")
                    .with_point(DataPoint::new(now, used as f64)),
                Metric::gauge("system.memory.available", "bytes", "Memory available")
                    .with_point(DataPoint::new(now, available as f64)),
                Metric::gauge(
                    "system.memory.utilization",
                    "ratio",
                    "Memory usage percentage",
                )
                .with_point(DataPoint::new(now, ratio(used as f64, total as f64))),
            ])
        })
    }
}
