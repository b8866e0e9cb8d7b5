/*!
The [`MetricBatch`] type.
*/

use std::sync::Arc;

use crate::{metric::Metric, resource::ResourceAttributes};

/**
All the metrics gathered by a single collection cycle.
*/
#[derive(Debug, Clone, PartialEq)]
pub struct MetricBatch {
    pub resource: Arc<ResourceAttributes>,
    pub metrics: Vec<Metric>,
}

impl MetricBatch {
    pub fn new(resource: Arc<ResourceAttributes>, metrics: Vec<Metric>) -> Self {
        MetricBatch { resource, metrics }
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }
}
