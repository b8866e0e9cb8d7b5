use std::sync::atomic::{AtomicUsize, Ordering};

macro_rules! metrics {
    (
        $pub_container:ty {
            $field:ident: $internal_container:ident {
                $(
                    $(#[$meta:meta])*
                    $metric:ident: $ty:ident -> $pub_ty:ident,
                )*
            }
        }
    ) => {
        #[derive(Default)]
        pub(crate) struct $internal_container {
            $(
                $(#[$meta])*
                pub(crate) $metric: $ty,
            )*
        }

        impl $pub_container {
            $(
                $(#[$meta])*
                pub fn $metric(&self) -> $pub_ty {
                    self.$field.$metric.sample()
                }
            )*
        }
    };
}

#[derive(Default)]
pub(crate) struct Counter(AtomicUsize);

impl Counter {
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sample(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

/**
Self-diagnostics for a [`crate::scheduler::Scheduler`].
*/
pub struct SchedulerMetrics<'a> {
    pub(crate) metrics: &'a InternalMetrics,
}

metrics!(
    SchedulerMetrics<'_> {
        metrics: InternalMetrics {
            /**
            The interval timer fired.
            */
            ticks: Counter -> usize,
            /**
            The interval timer fired while a cycle was still in flight, so no new cycle was started.
            */
            ticks_skipped: Counter -> usize,
            /**
            A collection cycle started.
            */
            cycles_started: Counter -> usize,
            /**
            A cycle collected no metrics, so nothing was exported.
            */
            cycles_empty: Counter -> usize,
            /**
            A cycle exported its metrics.
            */
            cycles_exported: Counter -> usize,
            /**
            A cycle failed to export, or panicked.
            */
            cycles_failed: Counter -> usize,
        }
    }
);
