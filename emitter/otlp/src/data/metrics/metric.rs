use std::marker::PhantomData;

use sval_derive::Value;

use crate::data::{stream_field, Attributes, EnvelopePoint, RawEncoder};

#[derive(Value)]
pub struct Metric<'a, D: ?Sized> {
    #[sval(label = "name", index = 1)]
    pub name: &'a str,
    #[sval(label = "description", index = 2)]
    pub description: &'a str,
    #[sval(label = "unit", index = 3)]
    pub unit: &'a str,
    #[sval(flatten)]
    pub data: &'a D,
}

#[derive(Value)]
pub enum MetricData<'a, DP: ?Sized> {
    #[sval(label = "gauge", index = 5)]
    Gauge(Gauge<'a, DP>),
    #[sval(label = "sum", index = 7)]
    Sum(Sum<'a, DP>),
}

#[derive(Value)]
pub struct Gauge<'a, DP: ?Sized> {
    #[sval(label = "dataPoints", index = 1)]
    pub data_points: &'a DP,
}

#[derive(Value)]
pub struct Sum<'a, DP: ?Sized> {
    #[sval(label = "dataPoints", index = 1)]
    pub data_points: &'a DP,
    #[sval(label = "aggregationTemporality", index = 2)]
    pub aggregation_temporality: AggregationTemporality,
    #[sval(label = "isMonotonic", index = 3)]
    pub is_monotonic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum AggregationTemporality {
    Unspecified = 0,
    Delta = 1,
    Cumulative = 2,
}

impl sval::Value for AggregationTemporality {
    fn stream<'sval, S: sval::Stream<'sval> + ?Sized>(&'sval self, stream: &mut S) -> sval::Result {
        stream.i32(*self as i32)
    }
}

const DATA_POINT_ATTRIBUTES_LABEL: sval::Label =
    sval::Label::new("attributes").with_tag(&sval::tags::VALUE_IDENT);
const DATA_POINT_START_TIME_UNIX_NANO_LABEL: sval::Label =
    sval::Label::new("startTimeUnixNano").with_tag(&sval::tags::VALUE_IDENT);
const DATA_POINT_TIME_UNIX_NANO_LABEL: sval::Label =
    sval::Label::new("timeUnixNano").with_tag(&sval::tags::VALUE_IDENT);
const DATA_POINT_AS_DOUBLE_LABEL: sval::Label =
    sval::Label::new("asDouble").with_tag(&sval::tags::VALUE_IDENT);

const DATA_POINT_ATTRIBUTES_INDEX: sval::Index = sval::Index::new(7);
const DATA_POINT_START_TIME_UNIX_NANO_INDEX: sval::Index = sval::Index::new(2);
const DATA_POINT_TIME_UNIX_NANO_INDEX: sval::Index = sval::Index::new(3);
const DATA_POINT_AS_DOUBLE_INDEX: sval::Index = sval::Index::new(4);

/**
The data points of a metric, with timestamps in the representation chosen by `E`.
*/
pub(crate) struct NumberDataPoints<'a, E> {
    points: &'a [EnvelopePoint],
    _marker: PhantomData<E>,
}

impl<'a, E> NumberDataPoints<'a, E> {
    pub(crate) fn new(points: &'a [EnvelopePoint]) -> Self {
        NumberDataPoints {
            points,
            _marker: PhantomData,
        }
    }
}

impl<'a, E: RawEncoder> sval::Value for NumberDataPoints<'a, E> {
    fn stream<'sval, S: sval::Stream<'sval> + ?Sized>(&'sval self, stream: &mut S) -> sval::Result {
        stream.seq_begin(Some(self.points.len()))?;

        for point in self.points {
            stream.seq_value_begin()?;
            stream.value_computed(&NumberDataPoint::<E> {
                point,
                _marker: PhantomData,
            })?;
            stream.seq_value_end()?;
        }

        stream.seq_end()
    }
}

struct NumberDataPoint<'a, E> {
    point: &'a EnvelopePoint,
    _marker: PhantomData<E>,
}

impl<'a, E: RawEncoder> sval::Value for NumberDataPoint<'a, E> {
    fn stream<'sval, S: sval::Stream<'sval> + ?Sized>(&'sval self, stream: &mut S) -> sval::Result {
        let point = self.point;

        stream.record_tuple_begin(None, None, None, None)?;

        // Empty attributes and absent start times are left off the wire entirely
        if !point.attributes.is_empty() {
            stream_field(
                &mut *stream,
                &DATA_POINT_ATTRIBUTES_LABEL,
                &DATA_POINT_ATTRIBUTES_INDEX,
                |stream| stream.value_computed(&Attributes(&point.attributes)),
            )?;
        }

        if let Some(start_time_unix_nano) = point.start_time_unix_nano {
            stream_field(
                &mut *stream,
                &DATA_POINT_START_TIME_UNIX_NANO_LABEL,
                &DATA_POINT_START_TIME_UNIX_NANO_INDEX,
                |stream| stream.value_computed(&E::UnixNano::from(start_time_unix_nano)),
            )?;
        }

        stream_field(
            &mut *stream,
            &DATA_POINT_TIME_UNIX_NANO_LABEL,
            &DATA_POINT_TIME_UNIX_NANO_INDEX,
            |stream| stream.value_computed(&E::UnixNano::from(point.time_unix_nano)),
        )?;

        stream_field(
            &mut *stream,
            &DATA_POINT_AS_DOUBLE_LABEL,
            &DATA_POINT_AS_DOUBLE_INDEX,
            |stream| stream.f64(point.as_double),
        )?;

        stream.record_tuple_end(None, None, None)
    }
}
