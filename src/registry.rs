/*!
The [`Registry`] type.
*/

use std::{collections::BTreeMap, sync::Arc};

use metrix_core::Metric;

use crate::collector::Collector;

/**
Which collectors are switched on, by name.

Collectors that aren't mentioned are switched off.
*/
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnabledMetrics(BTreeMap<String, bool>);

impl EnabledMetrics {
    pub fn new() -> Self {
        EnabledMetrics(BTreeMap::new())
    }

    /**
    Switch on every collector in `names`.
    */
    pub fn all<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        names.into_iter().map(|name| (name, true)).collect()
    }

    pub fn with(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.set(name, enabled);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, enabled: bool) {
        self.0.insert(name.into(), enabled);
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for EnabledMetrics {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        EnabledMetrics(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/**
A fixed set of collectors, polled together once per cycle.
*/
#[derive(Clone, Default)]
pub struct Registry {
    collectors: Vec<Arc<dyn Collector>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            collectors: Vec::new(),
        }
    }

    /**
    A registry with all of the collectors built into `metrix`.
    */
    pub fn system() -> Self {
        crate::collectors::all()
            .into_iter()
            .fold(Registry::new(), |registry, collector| {
                registry.with_arc(collector)
            })
    }

    pub fn with(self, collector: impl Collector + 'static) -> Self {
        self.with_arc(Arc::new(collector))
    }

    fn with_arc(mut self, collector: Arc<dyn Collector>) -> Self {
        self.collectors.push(collector);
        self
    }

    /**
    The names of all registered collectors, in registration order.
    */
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.collectors.iter().map(|collector| collector.name())
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /**
    Poll every enabled collector concurrently and gather their metrics.

    Each collector runs on its own task. A collector that fails or panics is logged and contributes
    nothing. This method never fails; if no collector succeeds the result is empty.
    */
    pub async fn collect_all(&self, enabled: &EnabledMetrics) -> Vec<Metric> {
        let tasks = self
            .collectors
            .iter()
            .filter(|collector| enabled.is_enabled(collector.name()))
            .map(|collector| {
                let collector = collector.clone();

                (
                    collector.name(),
                    tokio::spawn(async move { collector.collect().await }),
                )
            })
            .collect::<Vec<_>>();

        let mut metrics = Vec::new();

        for (collector, task) in tasks {
            match task.await {
                Ok(Ok(collected)) => {
                    metrics.extend(collected.into_iter().filter(|metric| !metric.is_empty()))
                }
                Ok(Err(err)) => {
                    emit::warn!("collector {collector} failed: {err}");
                }
                Err(err) => {
                    emit::warn!("collector {collector} panicked: {err}");
                }
            }
        }

        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use metrix_core::DataPoint;

    use crate::{collector, Error};

    fn gauge(name: &str) -> Metric {
        Metric::gauge(name, "1", "").with_point(DataPoint::new(1_000u64, 1.0))
    }

    #[tokio::test]
    async fn collect_all_isolates_failures() {
        let registry = Registry::new()
            .with(collector::from_fn("a", || async {
                Err(Error::msg("no battery"))
            }))
            .with(collector::from_fn("b", || async { Ok(vec![gauge("b.metric")]) }))
            .with(collector::from_fn("c", || async {
                if true {
                    panic!("collector c exploded");
                }

                Ok(vec![gauge("c.metric")])
            }));

        let metrics = registry
            .collect_all(&EnabledMetrics::all(["a", "b", "c"]))
            .await;

        assert_eq!(vec![gauge("b.metric")], metrics);
    }

    #[tokio::test]
    async fn collect_all_skips_disabled() {
        let calls = Arc::new(AtomicUsize::new(0));

        let registry = Registry::new()
            .with(collector::from_fn("cpu", || async { Ok(vec![gauge("cpu")]) }))
            .with(collector::from_fn("memory", {
                let calls = calls.clone();

                move || {
                    calls.fetch_add(1, Ordering::SeqCst);

                    async { Ok(vec![gauge("memory")]) }
                }
            }))
            .with(collector::from_fn("disk", || async { Ok(vec![gauge("disk")]) }));

        let metrics = registry
            .collect_all(
                &EnabledMetrics::new()
                    .with("cpu", true)
                    .with("memory", false),
            )
            .await;

        assert_eq!(vec![gauge("cpu")], metrics);
        assert_eq!(0, calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn collect_all_drops_empty_metrics() {
        let registry = Registry::new().with(collector::from_fn("empty", || async {
            Ok(vec![Metric::gauge("empty", "1", "")])
        }));

        assert!(registry
            .collect_all(&EnabledMetrics::all(["empty"]))
            .await
            .is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn collect_all_runs_concurrently() {
        let slow = || async {
            tokio::time::sleep(Duration::from_secs(1)).await;

            Ok(vec![gauge("slow")])
        };

        let registry = Registry::new()
            .with(collector::from_fn("a", slow))
            .with(collector::from_fn("b", slow))
            .with(collector::from_fn("c", slow));

        let started = tokio::time::Instant::now();

        let metrics = registry
            .collect_all(&EnabledMetrics::all(["a", "b", "c"]))
            .await;

        assert_eq!(3, metrics.len());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn enabled_metrics_defaults_to_off() {
        let enabled = EnabledMetrics::all(["cpu"]).with("wifi", false);

        assert!(enabled.is_enabled("cpu"));
        assert!(!enabled.is_enabled("wifi"));
        assert!(!enabled.is_enabled("fan"));
    }

    #[test]
    fn system_registers_every_collector() {
        let names = Registry::system().names().collect::<Vec<_>>();

        assert_eq!(
            vec![
                "cpu",
                "memory",
                "disk",
                "network",
                "load",
                "swap",
                "battery",
                "diskIo",
                "uptime",
                "thermal",
                "wifi",
                "bluetooth",
                "display",
                "fan",
            ],
            names
        );
    }
}
