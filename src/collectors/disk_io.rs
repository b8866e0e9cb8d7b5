use std::sync::LazyLock;

use metrix_core::{DataPoint, Metric, Timestamp};
use regex::Regex;

use crate::{collector::Collector, BoxFuture, Error};

use super::{command, pattern, MACOS};

static STATISTICS: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r#""Statistics"\s*=\s*\{([^}]+)\}"#));
static FIELD: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r#""(Bytes|Operations) \((Read|Write)\)"=(\d+)"#));

/**
Cumulative bytes and operations read and written by each block storage driver.

Drivers that haven't seen any I/O are left out. Devices are named `disk0`, `disk1`, and so on in
the order they're reported.
*/
#[derive(Default)]
pub struct DiskIo;

impl Collector for DiskIo {
    fn name(&self) -> &'static str {
        "diskIo"
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<Metric>, Error>> {
        Box::pin(async move {
            if !MACOS {
                return Ok(Vec::new());
            }

            let output =
                command::run("ioreg", &["-c", "IOBlockStorageDriver", "-r", "-w", "0"]).await?;

            let stats = parse_ioreg(&output)?;

            if stats.is_empty() {
                return Err(Error::msg("no disk I/O statistics found"));
            }

            let now = Timestamp::now();

            let mut io = Metric::counter("system.disk.io", "bytes", "Bytes read/written");
            let mut operations = Metric::counter(
                "system.disk.operations",
                "operations",
                "Read/write operations",
            );

            for stat in stats {
                let point = |value: u64, direction: &str| {
                    DataPoint::new(now, value as f64)
                        .with_attribute("device", stat.device.clone())
                        .with_attribute("direction", direction)
                };

                io = io.with_points([
                    point(stat.bytes_read, "read"),
                    point(stat.bytes_written, "write"),
                ]);
                operations = operations.with_points([
                    point(stat.operations_read, "read"),
                    point(stat.operations_written, "write"),
                ]);
            }

            Ok(vec![io, operations])
        })
    }
}

#[derive(Debug, Default, PartialEq)]
struct DiskIoStats {
    device: String,
    bytes_read: u64,
    bytes_written: u64,
    operations_read: u64,
    operations_written: u64,
}

fn parse_ioreg(output: &str) -> Result<Vec<DiskIoStats>, Error> {
    let statistics = pattern(&STATISTICS)?;
    let field = pattern(&FIELD)?;

    let mut stats = Vec::new();

    for block in statistics.captures_iter(output) {
        let mut stat = DiskIoStats::default();

        for captures in field.captures_iter(&block[1]) {
            let value = captures[3].parse::<u64>().unwrap_or(0);

            match (&captures[1], &captures[2]) {
                ("Bytes", "Read") => stat.bytes_read = value,
                ("Bytes", "Write") => stat.bytes_written = value,
                ("Operations", "Read") => stat.operations_read = value,
                ("Operations", "Write") => stat.operations_written = value,
                _ => (),
            }
        }

        if stat.bytes_read > 0
            || stat.bytes_written > 0
            || stat.operations_read > 0
            || stat.operations_written > 0
        {
            stat.device = format!("disk{}", stats.len());
            stats.push(stat);
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ioreg_statistics() {
        let output = r#"+-o IOBlockStorageDriver  <class IOBlockStorageDriver, id 0x100000345, registered, matched, active, busy 0 (0 ms), retain 9>
    {
      "Statistics" = {"Operations (Write)"=1200,"Latency Time (Write)"=0,"Bytes (Read)"=4096000,"Errors (Write)"=0,"Total Time (Read)"=91021,"Operations (Read)"=350,"Bytes (Write)"=8192000}
    }
+-o IOBlockStorageDriver  <class IOBlockStorageDriver, id 0x100000400, registered, matched, active, busy 0 (0 ms), retain 9>
    {
      "Statistics" = {"Operations (Write)"=0,"Bytes (Read)"=0,"Operations (Read)"=0,"Bytes (Write)"=0}
    }
+-o IOBlockStorageDriver  <class IOBlockStorageDriver, id 0x100000500, registered, matched, active, busy 0 (0 ms), retain 9>
    {
      "Statistics" = {"Bytes (Read)"=512,"Operations (Read)"=1}
    }
"#;

        assert_eq!(
            vec![
                DiskIoStats {
                    device: "disk0".into(),
                    bytes_read: 4096000,
                    bytes_written: 8192000,
                    operations_read: 350,
                    operations_written: 1200,
                },
                DiskIoStats {
                    device: "disk1".into(),
                    bytes_read: 512,
                    operations_read: 1,
                    ..Default::default()
                },
            ],
            parse_ioreg(output).unwrap()
        );
    }

    #[test]
    fn parse_ioreg_empty() {
        assert!(parse_ioreg("").unwrap().is_empty());
    }
}
