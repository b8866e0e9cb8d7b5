/*!
The [`Metric`] and [`DataPoint`] types.
*/

use std::collections::BTreeMap;

use crate::timestamp::Timestamp;

/**
A single observation of a metric.
*/
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub timestamp: Timestamp,
    pub value: f64,
    /**
    Dimensions that distinguish this point from others in the same metric, like `device` or `direction`.
    */
    pub attributes: BTreeMap<String, String>,
}

impl DataPoint {
    pub fn new(timestamp: impl Into<Timestamp>, value: f64) -> Self {
        DataPoint {
            timestamp: timestamp.into(),
            value,
            attributes: BTreeMap::new(),
        }
    }

    /**
    Create a data point stamped with the current time.
    */
    pub fn now(value: f64) -> Self {
        DataPoint::new(Timestamp::now(), value)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/**
The shape of a metric.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /**
    An instantaneous value, like memory in use.
    */
    Gauge,
    /**
    A monotonically increasing cumulative total, like bytes received since boot.
    */
    Counter,
}

/**
A named series of data points collected in one cycle.
*/
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub kind: MetricKind,
    pub unit: String,
    pub description: String,
    pub data_points: Vec<DataPoint>,
}

impl Metric {
    pub fn new(
        kind: MetricKind,
        name: impl Into<String>,
        unit: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Metric {
            name: name.into(),
            kind,
            unit: unit.into(),
            description: description.into(),
            data_points: Vec::new(),
        }
    }

    pub fn gauge(
        name: impl Into<String>,
        unit: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Metric::new(MetricKind::Gauge, name, unit, description)
    }

    pub fn counter(
        name: impl Into<String>,
        unit: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Metric::new(MetricKind::Counter, name, unit, description)
    }

    pub fn with_point(mut self, point: DataPoint) -> Self {
        self.data_points.push(point);
        self
    }

    pub fn with_points(mut self, points: impl IntoIterator<Item = DataPoint>) -> Self {
        self.data_points.extend(points);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data_points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_counter() {
        let metric = Metric::counter("system.network.io", "By", "Network I/O").with_points([
            DataPoint::new(1_000u64, 10.0)
                .with_attribute("device", "en0")
                .with_attribute("direction", "receive"),
            DataPoint::new(1_000u64, 20.0)
                .with_attribute("device", "en0")
                .with_attribute("direction", "transmit"),
        ]);

        assert_eq!(MetricKind::Counter, metric.kind);
        assert_eq!(2, metric.data_points.len());
        assert_eq!(
            Some("transmit"),
            metric.data_points[1]
                .attributes
                .get("direction")
                .map(|v| &**v)
        );
        assert!(!metric.is_empty());
    }

    #[test]
    fn attributes_replace_by_key() {
        let point = DataPoint::new(0u64, 1.0)
            .with_attribute("device", "a")
            .with_attribute("device", "b");

        assert_eq!(1, point.attributes.len());
        assert_eq!("b", point.attributes["device"]);
    }
}
