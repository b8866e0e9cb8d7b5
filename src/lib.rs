/*!
A lightweight host telemetry agent.

`metrix` gathers operating system metrics like CPU, memory, disk, and network usage on a fixed
interval and ships them to an OpenTelemetry-compatible collector as OTLP metrics.

The pieces fit together like this:

- A [`Registry`] holds the [`collector::Collector`]s that gather metrics. The ones built into
  `metrix` live in [`collectors`].
- A [`Pipeline`] collects from the registry and hands the resulting batch to an [`Export`],
  usually a [`metrix_otlp::Exporter`].
- A [`Scheduler`] runs the pipeline once per interval, never running two cycles at once.

```no_run
# async fn run() -> Result<(), metrix::Error> {
use std::sync::Arc;

use metrix::{Pipeline, Registry, Scheduler};

let registry = Registry::system();
let enabled = metrix::EnabledMetrics::all(registry.names());

let exporter = metrix_otlp::http("http://localhost:4318/v1/metrics").build()?;

let scheduler = Scheduler::new(
    10,
    Pipeline::new(Arc::new(metrix::device::detect()), registry, enabled, exporter),
)?;

scheduler.start();
metrix::scheduler::shutdown_on_signal(&scheduler).await?;
# Ok(())
# }
```
*/

pub mod cli;
pub mod collector;
pub mod collectors;
pub mod config;
pub mod device;
pub mod registry;
pub mod scheduler;

mod error;
mod internal_metrics;

pub use metrix_otlp::BoxFuture;

pub use self::{
    error::Error,
    internal_metrics::SchedulerMetrics,
    registry::{EnabledMetrics, Registry},
    scheduler::{Cycle, Export, Pipeline, Scheduler, State},
};
