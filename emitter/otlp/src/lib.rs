/*!
Ship [`metrix_core::MetricBatch`]es to an OpenTelemetry-compatible collector.

A batch is first converted into an OTLP `ExportMetricsServiceRequest` [`data::Envelope`], which
can be encoded as either JSON or binary protobuf. The [`Exporter`] then POSTs the encoded
envelope to an HTTP endpoint, or prints it when running in dry-run mode.

```no_run
# async fn send(batch: metrix_core::MetricBatch) -> Result<(), metrix_otlp::Error> {
let exporter = metrix_otlp::http("https://api.axiom.co/v1/metrics")
    .proto()
    .header("Authorization", "Bearer token123")
    .build()?;

exporter.send(&batch).await?;
# Ok(())
# }
```
*/

mod client;
pub mod data;
mod error;
mod internal_metrics;

pub use self::{client::*, error::*, internal_metrics::*};

/**
Start building an [`Exporter`] that sends to the given HTTP endpoint.
*/
pub fn http(endpoint: impl Into<String>) -> ExporterBuilder {
    ExporterBuilder::http(endpoint)
}
