use std::sync::Mutex;

use metrix_core::{DataPoint, Metric, Timestamp};
use sysinfo::Disks;

use crate::{collector::Collector, BoxFuture, Error};

use super::ratio;

/**
Space used and available on each mounted disk.

Points carry the mount point as their `device` attribute.
*/
pub struct Disk {
    disks: Mutex<Disks>,
}

impl Disk {
    pub fn new() -> Self {
        Disk {
            disks: Mutex::new(Disks::new_with_refreshed_list()),
        }
    }
}

impl Default for Disk {
    fn default() -> Self {
        Disk::new()
    }
}

impl Collector for Disk {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<Metric>, Error>> {
        Box::pin(async move {
            let now = Timestamp::now();

            let mut usage = Metric::gauge("system.disk.usage", "bytes", "Disk space used");
            let mut available =
                Metric::gauge("system.disk.available", "bytes", "Disk space available");
            let mut utilization =
                Metric::gauge("system.disk.utilization", "ratio", "Disk usage percentage");

            {
                let mut disks = self.disks.lock().unwrap_or_else(|e| e.into_inner());
                disks.refresh(true);

                for disk in disks.list() {
                    let device = disk.mount_point().to_string_lossy().into_owned();

                    let total = disk.total_space();
                    let free = disk.available_space();
                    let used = total.saturating_sub(free);

                    let point = |value: f64| {
                        DataPoint::new(now, value).with_attribute("device", device.clone())
                    };

                    usage.data_points.push(point(used as f64));
                    available.data_points.push(point(free as f64));
                    utilization
                        .data_points
                        .push(point(ratio(used as f64, total as f64)));
                }
            }

            if usage.is_empty() {
                return Err(Error::msg("no disk statistics found"));
            }

            Ok(vec![usage, available, utilization])
        })
    }
}
