/*!
Periodic collection and export.

A [`Scheduler`] runs a [`Pipeline`] once per interval. Each run is a cycle: collect from every
enabled collector, then export the resulting batch. Cycles never overlap. If a cycle is still in
flight when the interval elapses, that tick is skipped rather than queued.
*/

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use metrix_core::{MetricBatch, ResourceAttributes};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::MissedTickBehavior,
};

use crate::{
    internal_metrics::{InternalMetrics, SchedulerMetrics},
    registry::{EnabledMetrics, Registry},
    BoxFuture, Error,
};

/**
Somewhere to send the batch collected in a cycle.
*/
pub trait Export: Send + Sync {
    fn export<'a>(&'a self, batch: &'a MetricBatch) -> BoxFuture<'a, Result<(), Error>>;
}

impl Export for metrix_otlp::Exporter {
    fn export<'a>(&'a self, batch: &'a MetricBatch) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            self.send(batch).await?;

            Ok(())
        })
    }
}

impl<T: Export + ?Sized> Export for Arc<T> {
    fn export<'a>(&'a self, batch: &'a MetricBatch) -> BoxFuture<'a, Result<(), Error>> {
        (**self).export(batch)
    }
}

impl<T: Export + ?Sized> Export for Box<T> {
    fn export<'a>(&'a self, batch: &'a MetricBatch) -> BoxFuture<'a, Result<(), Error>> {
        (**self).export(batch)
    }
}

/**
The outcome of a single cycle that didn't fail.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /**
    No metrics were collected, so nothing was exported.
    */
    Empty,
    /**
    The given number of metrics were exported.
    */
    Exported { metrics: usize },
}

/**
The work done in each cycle: which collectors to poll and where to send their metrics.
*/
pub struct Pipeline {
    resource: Arc<ResourceAttributes>,
    registry: Registry,
    enabled: EnabledMetrics,
    exporter: Box<dyn Export>,
}

impl Pipeline {
    pub fn new(
        resource: Arc<ResourceAttributes>,
        registry: Registry,
        enabled: EnabledMetrics,
        exporter: impl Export + 'static,
    ) -> Self {
        Pipeline {
            resource,
            registry,
            enabled,
            exporter: Box::new(exporter),
        }
    }

    /**
    Run a single cycle: collect, then export if anything was collected.
    */
    pub async fn run_cycle(&self) -> Result<Cycle, Error> {
        let metrics = self.registry.collect_all(&self.enabled).await;

        if metrics.is_empty() {
            return Ok(Cycle::Empty);
        }

        let batch = MetricBatch::new(self.resource.clone(), metrics);

        self.exporter.export(&batch).await?;

        Ok(Cycle::Exported {
            metrics: batch.len(),
        })
    }
}

/**
The lifecycle of a [`Scheduler`].
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Running,
    /**
    The scheduler has been stopped. It can't be started again.
    */
    Stopped,
}

/**
Runs a [`Pipeline`] on a fixed interval.
*/
pub struct Scheduler {
    interval: Duration,
    shared: Arc<Shared>,
    state: Mutex<State>,
    stop: watch::Sender<bool>,
    driver: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    pipeline: Pipeline,
    in_flight: AtomicBool,
    metrics: InternalMetrics,
}

impl Scheduler {
    /**
    Create a scheduler that runs `pipeline` every `interval_secs` seconds.

    The interval must be at least one second.
    */
    pub fn new(interval_secs: u64, pipeline: Pipeline) -> Result<Self, Error> {
        if interval_secs == 0 {
            return Err(Error::msg("the collection interval must be at least 1 second"));
        }

        let (stop, _) = watch::channel(false);

        Ok(Scheduler {
            interval: Duration::from_secs(interval_secs),
            shared: Arc::new(Shared {
                pipeline,
                in_flight: AtomicBool::new(false),
                metrics: InternalMetrics::default(),
            }),
            state: Mutex::new(State::Idle),
            stop,
            driver: tokio::sync::Mutex::new(None),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> State {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /**
    Get the self-diagnostics collected by this scheduler.
    */
    pub fn metrics(&self) -> SchedulerMetrics<'_> {
        SchedulerMetrics {
            metrics: &self.shared.metrics,
        }
    }

    /**
    Start running cycles.

    The first cycle starts right away. Calling this method on a scheduler that's already running
    or has been stopped does nothing.

    This method must be called from within a `tokio` runtime.
    */
    pub fn start(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if *state != State::Idle {
            return;
        }

        *state = State::Running;

        let driver = tokio::spawn(drive(
            self.shared.clone(),
            self.interval,
            self.stop.subscribe(),
        ));

        // The driver slot is only ever locked by `stop`, which can't run until `state` is released
        if let Ok(mut slot) = self.driver.try_lock() {
            *slot = Some(driver);
        }
    }

    /**
    Stop running cycles.

    This method waits for any in-flight cycle to finish before returning. It's safe to call more
    than once, and from more than one task. Every caller returns only after the in-flight cycle
    has finished.
    */
    pub async fn stop(&self) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = State::Stopped;

        self.stop.send_replace(true);

        let mut driver = self.driver.lock().await;

        if let Some(driver) = driver.take() {
            if let Err(err) = driver.await {
                emit::warn!("the scheduler driver panicked: {err}");
            }
        }
    }
}

async fn drive(shared: Arc<Shared>, interval: Duration, mut stop: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            biased;

            _ = stop.changed() => break,
            _ = ticker.tick() => (),
        }

        shared.metrics.ticks.increment();

        let Some(guard) = InFlight::acquire(&shared) else {
            shared.metrics.ticks_skipped.increment();

            emit::debug!("skipping a tick because the previous cycle is still in flight");

            continue;
        };

        if let Some(previous) = in_flight.take() {
            reap(&shared, previous).await;
        }

        let cycle = shared.clone();
        in_flight = Some(tokio::spawn(async move { cycle.run_cycle(guard).await }));
    }

    if let Some(last) = in_flight.take() {
        reap(&shared, last).await;
    }
}

async fn reap(shared: &Shared, cycle: JoinHandle<()>) {
    if let Err(err) = cycle.await {
        shared.metrics.cycles_failed.increment();

        emit::warn!("collection/export cycle panicked: {err}");
    }
}

impl Shared {
    async fn run_cycle(&self, _guard: InFlight) {
        self.metrics.cycles_started.increment();

        match self.pipeline.run_cycle().await {
            Ok(Cycle::Empty) => {
                self.metrics.cycles_empty.increment();

                emit::debug!("no metrics were collected, skipping export");
            }
            Ok(Cycle::Exported { metrics }) => {
                self.metrics.cycles_exported.increment();

                emit::debug!("exported {metrics} metrics");
            }
            Err(err) => {
                self.metrics.cycles_failed.increment();

                emit::warn!("collection/export cycle failed: {err}");
            }
        }
    }
}

/**
Marks a cycle as in flight until it's dropped.
*/
struct InFlight(Arc<Shared>);

impl InFlight {
    fn acquire(shared: &Arc<Shared>) -> Option<Self> {
        shared
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(shared.clone()))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::Release);
    }
}

/**
Wait for `SIGINT` or `SIGTERM`, then stop the scheduler.

The scheduler is stopped once, no matter how many signals arrive. This future completes after
the in-flight cycle, if any, has finished.
*/
pub async fn shutdown_on_signal(scheduler: &Scheduler) -> Result<(), Error> {
    shutdown_when(wait_for_signal(), scheduler).await
}

/**
Wait for `signal` to resolve with the name of what was received, then stop the scheduler.

If `signal` fails the scheduler is left running.
*/
pub async fn shutdown_when(
    signal: impl Future<Output = Result<&'static str, Error>>,
    scheduler: &Scheduler,
) -> Result<(), Error> {
    let signal = signal.await?;

    emit::info!("received {signal}, shutting down");

    scheduler.stop().await;

    emit::info!("shutdown complete");

    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<&'static str, Error> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())
        .map_err(|e| Error::new("failed to listen for SIGINT", e))?;
    let mut terminate = signal(SignalKind::terminate())
        .map_err(|e| Error::new("failed to listen for SIGTERM", e))?;

    tokio::select! {
        _ = interrupt.recv() => Ok("SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<&'static str, Error> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| Error::new("failed to listen for ctrl-c", e))?;

    Ok("ctrl-c")
}
