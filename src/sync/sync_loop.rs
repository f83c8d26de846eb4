use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::traits::{RegisterChannel, TimestampSource};
use crate::error::RavennaError;
use crate::protocol::clock::{ClockOffsetEstimator, OffsetCorrection, TimestampPair};
use crate::types::SyncConfig;

/// Lifecycle of a [`SyncLoop`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    /// Created, not running
    Idle,
    /// Running, waiting for the next tick
    WaitingTick,
    /// Cancelled or stopped by a fatal error
    Stopped,
}

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timestamp read failed; nothing changed
    Skipped,
    /// The reading was processed and no correction was due
    Unchanged,
    /// A correction was written to the register
    Applied(OffsetCorrection),
}

/// Periodic clock alignment for one device
pub struct SyncLoop<S, R> {
    source: S,
    register: R,
    estimator: ClockOffsetEstimator,
    poll_interval: Duration,
    state: SyncState,
}

impl<S, R> std::fmt::Debug for SyncLoop<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncLoop")
            .field("estimator", &self.estimator)
            .field("poll_interval", &self.poll_interval)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<S: TimestampSource, R: RegisterChannel> SyncLoop<S, R> {
    /// Create a loop assuming the hardware currently runs with offset 0
    #[must_use]
    pub fn new(source: S, register: R, config: &SyncConfig) -> Self {
        let estimator = ClockOffsetEstimator::new(config.sample_rate, 0)
            .with_drift_threshold(config.drift_threshold);
        Self::with_estimator(source, register, estimator, config.poll_interval)
    }

    /// Create a loop around an existing estimator
    #[must_use]
    pub fn with_estimator(
        source: S,
        register: R,
        estimator: ClockOffsetEstimator,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            register,
            estimator,
            poll_interval,
            state: SyncState::Idle,
        }
    }

    /// Create a loop seeded with the offset the register currently holds.
    ///
    /// # Errors
    /// Returns the register's read error.
    pub async fn from_register(
        source: S,
        register: R,
        config: &SyncConfig,
    ) -> Result<Self, RavennaError> {
        let current = register.read_global_offset().await?;
        tracing::debug!(offset = current, "Seeding estimator from register");
        let estimator = ClockOffsetEstimator::new(config.sample_rate, current)
            .with_drift_threshold(config.drift_threshold);
        Ok(Self::with_estimator(
            source,
            register,
            estimator,
            config.poll_interval,
        ))
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// The estimator driving corrections
    #[must_use]
    pub fn estimator(&self) -> &ClockOffsetEstimator {
        &self.estimator
    }

    /// Interval between ticks
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Run one tick: read, estimate and write if a correction is due.
    ///
    /// Read failures are logged and reported as [`TickOutcome::Skipped`].
    ///
    /// # Errors
    /// Returns the register's write error; the estimator state is no
    /// longer trustworthy afterwards.
    pub async fn tick(&mut self) -> Result<TickOutcome, RavennaError> {
        match self.read_pair().await {
            Some(pair) => self.apply(pair).await,
            None => Ok(TickOutcome::Skipped),
        }
    }

    async fn read_pair(&self) -> Option<TimestampPair> {
        match self.source.read_timestamp_pair().await {
            Ok(pair) => Some(pair),
            Err(e) => {
                tracing::warn!(error = %e, "Timestamp read failed, skipping tick");
                None
            }
        }
    }

    async fn apply(&mut self, pair: TimestampPair) -> Result<TickOutcome, RavennaError> {
        let Some(correction) = self.estimator.process(pair) else {
            return Ok(TickOutcome::Unchanged);
        };

        if let Err(e) = self
            .register
            .write_global_offset(correction.new_offset)
            .await
        {
            tracing::error!(
                error = %e,
                new_offset = correction.new_offset,
                "Failed to write global sample offset"
            );
            return Err(e);
        }

        tracing::info!(
            old_offset = correction.old_offset,
            new_offset = correction.new_offset,
            "Global sample offset changed"
        );
        Ok(TickOutcome::Applied(correction))
    }

    /// Tick every poll interval until `shutdown` turns true or its sender
    /// is dropped, calling `on_change` after each written correction.
    ///
    /// Shutdown is checked before each tick and again between the
    /// timestamp read and the register write. A reading that arrives after
    /// cancellation is discarded without a write or callback.
    ///
    /// # Errors
    /// Returns the first register write error.
    pub async fn run<F>(
        &mut self,
        mut shutdown: watch::Receiver<bool>,
        mut on_change: F,
    ) -> Result<(), RavennaError>
    where
        F: FnMut(OffsetCorrection) + Send,
    {
        if *shutdown.borrow_and_update() {
            self.state = SyncState::Stopped;
            return Ok(());
        }

        let mut timer = tokio::time::interval(self.poll_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.state = SyncState::WaitingTick;

        tracing::info!(
            sample_rate = self.estimator.sample_rate(),
            offset = self.estimator.last_applied_offset(),
            interval = ?self.poll_interval,
            "Sync loop starting"
        );

        let result = loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Sync loop shutting down");
                        break Ok(());
                    }
                }

                _ = timer.tick() => {
                    let Some(pair) = self.read_pair().await else {
                        continue;
                    };
                    if is_cancelled(&shutdown) {
                        tracing::info!("Sync loop shutting down, discarding in-flight reading");
                        break Ok(());
                    }
                    match self.apply(pair).await {
                        Ok(TickOutcome::Applied(correction)) => on_change(correction),
                        Ok(TickOutcome::Skipped | TickOutcome::Unchanged) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "Sync loop stopped");
                            break Err(e);
                        }
                    }
                }
            }
        };

        self.state = SyncState::Stopped;
        result
    }
}

/// Shutdown was requested or the sender is gone.
fn is_cancelled(shutdown: &watch::Receiver<bool>) -> bool {
    shutdown.has_changed().is_err() || *shutdown.borrow()
}

impl<S, R> SyncLoop<S, R>
where
    S: TimestampSource + 'static,
    R: RegisterChannel + 'static,
{
    /// Move the loop onto its own task.
    pub fn spawn<F>(mut self, on_change: F) -> SyncHandle
    where
        F: FnMut(OffsetCorrection) + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move { self.run(shutdown_rx, on_change).await });
        SyncHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Owner side of a spawned [`SyncLoop`]
#[derive(Debug)]
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Result<(), RavennaError>>,
}

impl SyncHandle {
    /// Whether the loop has stopped on its own
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal shutdown and wait for the loop to finish.
    ///
    /// # Errors
    /// Returns the fatal error if the loop had already stopped on one.
    pub async fn shutdown(self) -> Result<(), RavennaError> {
        // The loop may already be gone after a fatal error.
        let _ = self.shutdown.send(true);
        self.join().await
    }

    /// Wait for the loop to stop on its own.
    ///
    /// # Errors
    /// Returns the fatal error that stopped the loop.
    pub async fn join(self) -> Result<(), RavennaError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Ok(()),
        }
    }
}
