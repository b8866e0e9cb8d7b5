/*!
The [`Collector`] type.

A collector gathers one family of metrics, like CPU or memory, each time it's polled. See the
[`crate::collectors`] module for the collectors built into `metrix`.
*/

use std::{future::Future, sync::Arc};

use metrix_core::Metric;

use crate::{BoxFuture, Error};

/**
A source of metrics.
*/
pub trait Collector: Send + Sync {
    /**
    The name this collector is enabled or disabled by, like `cpu` or `diskIo`.
    */
    fn name(&self) -> &'static str;

    /**
    Gather the current value of this collector's metrics.

    A collector with nothing to report returns an empty list. It never returns metrics without any data points.
    */
    fn collect(&self) -> BoxFuture<'_, Result<Vec<Metric>, Error>>;
}

impl<T: Collector + ?Sized> Collector for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<Metric>, Error>> {
        (**self).collect()
    }
}

impl<T: Collector + ?Sized> Collector for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<Metric>, Error>> {
        (**self).collect()
    }
}

/**
A [`Collector`] from a function.

This type is returned by [`from_fn`].
*/
pub struct FromFn<F> {
    name: &'static str,
    collect: F,
}

/**
Create a [`Collector`] from a function that returns a future.

```
let collector = metrix::collector::from_fn("answers", || async {
    Ok(vec![metrix_core::Metric::gauge("answer", "1", "The answer")
        .with_point(metrix_core::DataPoint::now(42.0))])
});
```
*/
pub fn from_fn<F, Fut>(name: &'static str, collect: F) -> FromFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Metric>, Error>> + Send + 'static,
{
    FromFn { name, collect }
}

impl<F, Fut> Collector for FromFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Metric>, Error>> + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<Metric>, Error>> {
        Box::pin((self.collect)())
    }
}
