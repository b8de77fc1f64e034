//! Interval drivers running the core's estimator and receivers on tokio.
//!
//! Both drivers stop on cancellation before touching the store again, so a
//! dropped handle can never mutate shared state.

use std::sync::{mpsc, Arc};

use course_core::{
    Clock, Effect, GenerationSettings, GenerationStore, ProgressEstimator,
    StatusBroadcastReceiver, Surface, TickOutcome,
};
use course_logging::course_debug;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub trait EstimatorSink: Send + Sync {
    fn emit(&self, outcome: TickOutcome);
}

pub trait ReceiverSink: Send + Sync {
    fn emit(&self, surface: Surface, effect: Effect);
}

/// Forwards estimator outcomes into a std channel, mapped by `wrap`.
pub struct ChannelEstimatorSink<T> {
    tx: mpsc::Sender<T>,
    wrap: fn(TickOutcome) -> T,
}

impl<T> ChannelEstimatorSink<T> {
    pub fn new(tx: mpsc::Sender<T>, wrap: fn(TickOutcome) -> T) -> Self {
        Self { tx, wrap }
    }
}

impl<T: Send> EstimatorSink for ChannelEstimatorSink<T> {
    fn emit(&self, outcome: TickOutcome) {
        let _ = self.tx.send((self.wrap)(outcome));
    }
}

pub struct ChannelReceiverSink {
    tx: mpsc::Sender<(Surface, Effect)>,
}

impl ChannelReceiverSink {
    pub fn new(tx: mpsc::Sender<(Surface, Effect)>) -> Self {
        Self { tx }
    }
}

impl ReceiverSink for ChannelReceiverSink {
    fn emit(&self, surface: Surface, effect: Effect) {
        let _ = self.tx.send((surface, effect));
    }
}

/// Running timer task; cancelled when dropped.
#[derive(Debug)]
pub struct TimerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the task to wind down, e.g. after the estimator completed.
    pub async fn join(mut self) {
        let _ = (&mut self.task).await;
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Ticks `estimator` until its outcome says stop or the handle is dropped.
pub fn spawn_estimator(
    runtime: &Handle,
    store: GenerationStore,
    estimator: ProgressEstimator,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EstimatorSink>,
) -> TimerHandle {
    let token = CancellationToken::new();
    let cancelled = token.clone();
    let period = estimator.settings().estimator_interval;

    let task = runtime.spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let outcome = estimator.tick(&store, clock.now());
            sink.emit(outcome);
            if !outcome.should_continue() {
                course_debug!("Estimator stopping after {:?}", outcome);
                break;
            }
        }
    });

    TimerHandle { token, task }
}

/// Mounts a receiver for `surface` and polls until the handle is dropped.
pub fn mount_receiver(
    runtime: &Handle,
    surface: Surface,
    store: GenerationStore,
    settings: GenerationSettings,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ReceiverSink>,
) -> TimerHandle {
    let token = CancellationToken::new();
    let cancelled = token.clone();

    let task = runtime.spawn(async move {
        let (mut receiver, effects) =
            StatusBroadcastReceiver::mount(surface, &store, settings, clock.now());
        for effect in effects {
            sink.emit(surface, effect);
        }

        let mut ticker = interval(settings.normalized().poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; mounting already read the store.
        ticker.tick().await;
        loop {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => break,
                _ = ticker.tick() => {}
            }
            for effect in receiver.poll(&store, clock.now()) {
                sink.emit(surface, effect);
            }
        }
        receiver.unmount();
    });

    TimerHandle { token, task }
}
