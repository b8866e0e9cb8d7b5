use std::sync::Mutex;

use metrix_core::{DataPoint, Metric};
use sysinfo::System;

use crate::{collector::Collector, BoxFuture, Error};

use super::ratio;

/**
Overall CPU utilization.

Utilization is measured between two refreshes, so the first value is taken against the moment
the collector was created.
*/
pub struct Cpu {
    system: Mutex<System>,
}

impl Cpu {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();

        Cpu {
            system: Mutex::new(system),
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Cpu::new()
    }
}

impl Collector for Cpu {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<Metric>, Error>> {
        Box::pin(async move {
            let usage = {
                let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
                system.refresh_cpu_usage();

                system.global_cpu_usage()
            };

            Ok(vec![Metric::gauge(
                "system.cpu.utilization",
                "ratio",
                "CPU usage percentage",
            )
            .with_point(DataPoint::now(ratio(usage as f64, 100.0)))])
        })
    }
}
