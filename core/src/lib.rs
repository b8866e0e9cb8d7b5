/*!
The metric model shared by `metrix` collectors and exporters.

Collectors produce [`metric::Metric`]s made of timestamped [`metric::DataPoint`]s. A collection
cycle gathers them into a [`batch::MetricBatch`] alongside the [`resource::ResourceAttributes`]
of the host, which is then handed to an exporter.

This crate is pure data. It doesn't do any I/O.
*/

pub mod batch;
pub mod metric;
pub mod resource;
pub mod timestamp;

pub use self::{
    batch::MetricBatch,
    metric::{DataPoint, Metric, MetricKind},
    resource::ResourceAttributes,
    timestamp::Timestamp,
};
