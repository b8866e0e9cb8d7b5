mod export_metrics_service;
mod metric;

use std::marker::PhantomData;

use bytes::Bytes;
use metrix_core::{MetricBatch, MetricKind};

use crate::Error;

pub use self::{export_metrics_service::*, metric::*};

use super::{
    Attributes, EncodedPayload, Encoding, InstrumentationScope, Json, Proto, RawEncoder, Resource,
};

/**
The name of the instrumentation scope every metric is reported under.
*/
pub const SCOPE_NAME: &str = "metrix";

/**
The version of the instrumentation scope every metric is reported under.
*/
pub const SCOPE_VERSION: &str = env!("CARGO_PKG_VERSION");

/**
A string-valued attribute.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub name: String,
    pub version: String,
}

/**
An OTLP `ExportMetricsServiceRequest` for a single resource and scope.
*/
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub resource: Vec<Attribute>,
    pub scope: Scope,
    pub metrics: Vec<EnvelopeMetric>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeMetric {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub data: EnvelopeData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeData {
    Gauge {
        data_points: Vec<EnvelopePoint>,
    },
    Sum {
        aggregation_temporality: AggregationTemporality,
        is_monotonic: bool,
        data_points: Vec<EnvelopePoint>,
    },
}

impl EnvelopeData {
    pub fn data_points(&self) -> &[EnvelopePoint] {
        match self {
            EnvelopeData::Gauge { data_points } | EnvelopeData::Sum { data_points, .. } => {
                data_points
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopePoint {
    pub as_double: f64,
    pub time_unix_nano: u64,
    pub start_time_unix_nano: Option<u64>,
    pub attributes: Vec<Attribute>,
}

/**
Convert a batch into an envelope.

Gauges map onto OTLP gauges. Counters map onto cumulative, monotonic sums whose points report
a start time equal to their observation time.
*/
pub fn build_payload(batch: &MetricBatch) -> Envelope {
    let resource = vec![
        Attribute::new("host.name", &*batch.resource.hostname),
        Attribute::new("user.name", &*batch.resource.username),
    ];

    let metrics = batch
        .metrics
        .iter()
        .map(|metric| {
            let data_points = metric.data_points.iter();

            let data = match metric.kind {
                MetricKind::Gauge => EnvelopeData::Gauge {
                    data_points: data_points
                        .map(|point| EnvelopePoint {
                            as_double: point.value,
                            time_unix_nano: point.timestamp.as_unix_nanos(),
                            start_time_unix_nano: None,
                            attributes: attributes(&point.attributes),
                        })
                        .collect(),
                },
                MetricKind::Counter => EnvelopeData::Sum {
                    aggregation_temporality: AggregationTemporality::Cumulative,
                    is_monotonic: true,
                    data_points: data_points
                        .map(|point| {
                            let time_unix_nano = point.timestamp.as_unix_nanos();

                            // TODO: track the process start time so cumulative sums get a real window
                            EnvelopePoint {
                                as_double: point.value,
                                time_unix_nano,
                                start_time_unix_nano: Some(time_unix_nano),
                                attributes: attributes(&point.attributes),
                            }
                        })
                        .collect(),
                },
            };

            EnvelopeMetric {
                name: metric.name.clone(),
                description: metric.description.clone(),
                unit: metric.unit.clone(),
                data,
            }
        })
        .collect();

    Envelope {
        resource,
        scope: Scope {
            name: SCOPE_NAME.to_owned(),
            version: SCOPE_VERSION.to_owned(),
        },
        metrics,
    }
}

fn attributes<'a>(
    attributes: impl IntoIterator<Item = (&'a String, &'a String)>,
) -> Vec<Attribute> {
    attributes
        .into_iter()
        .map(|(k, v)| Attribute::new(&**k, &**v))
        .collect()
}

impl Envelope {
    /**
    Encode the envelope in the given wire format.
    */
    pub fn encode(&self, encoding: Encoding) -> Result<EncodedPayload, Error> {
        match encoding {
            Encoding::Json => self.encode_with::<Json>(),
            Encoding::Proto => self.encode_with::<Proto>(),
        }
    }

    /**
    Encode the envelope as compact OTLP/JSON.
    */
    pub fn to_json(&self) -> Result<String, Error> {
        let payload = self.encode_with::<Json>()?;

        String::from_utf8(payload.into_bytes().to_vec())
            .map_err(|e| Error::new("JSON payload was not valid UTF-8", e))
    }

    /**
    Encode the envelope as indented OTLP/JSON, for display.
    */
    pub fn to_json_pretty(&self) -> Result<String, Error> {
        let json = self.to_json()?;

        let value: serde_json::Value = serde_json::from_str(&json)
            .map_err(|e| Error::new("failed to parse encoded JSON payload", e))?;

        serde_json::to_string_pretty(&value)
            .map_err(|e| Error::new("failed to format JSON payload", e))
    }

    /**
    Encode the envelope as binary OTLP/protobuf.
    */
    pub fn to_protobuf(&self) -> Result<Bytes, Error> {
        Ok(self.encode_with::<Proto>()?.into_bytes())
    }

    fn encode_with<E: RawEncoder>(&self) -> Result<EncodedPayload, Error> {
        E::encode(ExportMetricsServiceRequest {
            resource_metrics: &[ResourceMetrics {
                resource: &Resource {
                    attributes: &Attributes(&self.resource),
                },
                scope_metrics: &[ScopeMetrics {
                    scope: &InstrumentationScope {
                        name: &*self.scope.name,
                        version: &*self.scope.version,
                    },
                    metrics: &EnvelopeMetrics::<E>::new(&self.metrics),
                }][..],
            }][..],
        })
    }
}

struct EnvelopeMetrics<'a, E> {
    metrics: &'a [EnvelopeMetric],
    _marker: PhantomData<E>,
}

impl<'a, E> EnvelopeMetrics<'a, E> {
    fn new(metrics: &'a [EnvelopeMetric]) -> Self {
        EnvelopeMetrics {
            metrics,
            _marker: PhantomData,
        }
    }
}

impl<'a, E: RawEncoder> sval::Value for EnvelopeMetrics<'a, E> {
    fn stream<'sval, S: sval::Stream<'sval> + ?Sized>(&'sval self, stream: &mut S) -> sval::Result {
        stream.seq_begin(Some(self.metrics.len()))?;

        for metric in self.metrics {
            stream.seq_value_begin()?;

            let data_points = NumberDataPoints::<E>::new(metric.data.data_points());

            let data = match metric.data {
                EnvelopeData::Gauge { .. } => MetricData::Gauge(Gauge {
                    data_points: &data_points,
                }),
                EnvelopeData::Sum {
                    aggregation_temporality,
                    is_monotonic,
                    ..
                } => MetricData::Sum(Sum {
                    data_points: &data_points,
                    aggregation_temporality,
                    is_monotonic,
                }),
            };

            stream.value_computed(&Metric {
                name: &metric.name,
                description: &metric.description,
                unit: &metric.unit,
                data: &data,
            })?;

            stream.seq_value_end()?;
        }

        stream.seq_end()
    }
}
