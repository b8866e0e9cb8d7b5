use sval_derive::Value;

use crate::data::{Attributes, InstrumentationScope, Resource};

#[derive(Value)]
pub struct ExportMetricsServiceRequest<'a, RM: ?Sized> {
    #[sval(label = "resourceMetrics", index = 1)]
    pub resource_metrics: &'a RM,
}

#[derive(Value)]
pub struct ResourceMetrics<'a, SM: ?Sized, R: ?Sized = Resource<'a, Attributes<'a>>> {
    #[sval(label = "resource", index = 1)]
    pub resource: &'a R,
    #[sval(label = "scopeMetrics", index = 2)]
    pub scope_metrics: &'a SM,
}

#[derive(Value)]
pub struct ScopeMetrics<'a, M: ?Sized, IS: ?Sized = InstrumentationScope<'a>> {
    #[sval(label = "scope", index = 1)]
    pub scope: &'a IS,
    #[sval(label = "metrics", index = 2)]
    pub metrics: &'a M,
}
