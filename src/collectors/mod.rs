/*!
The collectors built into `metrix`.

CPU, memory, disk, network, load, swap, and uptime are read through `sysinfo` and work on any
platform it supports. The rest shell out to macOS system tools and report nothing elsewhere.
*/

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::{collector::Collector, Error};

mod battery;
mod bluetooth;
mod command;
mod cpu;
mod disk;
mod disk_io;
mod display;
mod fan;
mod load;
mod memory;
mod network;
mod swap;
mod thermal;
mod uptime;
mod wifi;

pub use self::{
    battery::Battery, bluetooth::Bluetooth, cpu::Cpu, disk::Disk, disk_io::DiskIo,
    display::Display, fan::Fan, load::Load, memory::Memory, network::Network, swap::Swap,
    thermal::Thermal, uptime::Uptime, wifi::Wifi,
};

const MACOS: bool = cfg!(target_os = "macos");

/**
Every built-in collector, in a fixed order.
*/
pub fn all() -> Vec<Arc<dyn Collector>> {
    vec![
        Arc::new(Cpu::new()),
        Arc::new(Memory::new()),
        Arc::new(Disk::new()),
        Arc::new(Network::new()),
        Arc::new(Load),
        Arc::new(Swap::new()),
        Arc::new(Battery),
        Arc::new(DiskIo),
        Arc::new(Uptime),
        Arc::new(Thermal),
        Arc::new(Wifi),
        Arc::new(Bluetooth),
        Arc::new(Display),
        Arc::new(Fan),
    ]
}

/**
`value / total`, clamped to `[0, 1]`.

A zero total gives zero.
*/
fn ratio(value: f64, total: f64) -> f64 {
    if total > 0.0 {
        (value / total).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn pattern(regex: &'static LazyLock<Result<Regex, regex::Error>>) -> Result<&'static Regex, Error> {
    LazyLock::force(regex)
        .as_ref()
        .map_err(|e| Error::new("invalid pattern", e.clone()))
}
