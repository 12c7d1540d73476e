use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};

use crate::backend::SecretsBackend;
use crate::config::RunMode;
use crate::context::RunContext;
use crate::error::HarnessError;
use crate::fetch::{run_fetch, Completion};
use crate::stats::StatsSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Authenticating,
    Dispatching,
    AwaitingCompletion,
    Sleeping,
    Renewing,
    Done,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverState::Authenticating => "authenticating",
            DriverState::Dispatching => "dispatching",
            DriverState::AwaitingCompletion => "awaiting_completion",
            DriverState::Sleeping => "sleeping",
            DriverState::Renewing => "renewing",
            DriverState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Result of one fixed batch
#[derive(Debug, Clone, Copy)]
pub struct BatchSummary {
    pub cycle: u64,
    pub stats: StatsSnapshot,
    pub elapsed: Duration,
}

/// Orchestrates the configured run mode
pub struct Driver<B> {
    ctx: Arc<RunContext<B>>,
    state: Mutex<DriverState>,
    batches: Mutex<Vec<BatchSummary>>,
}

impl<B: SecretsBackend> Driver<B> {
    /// `ctx` is already authenticated, so the driver starts from there.
    pub fn new(ctx: Arc<RunContext<B>>) -> Self {
        Self {
            ctx,
            state: Mutex::new(DriverState::Authenticating),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> DriverState {
        *self.state.lock()
    }

    pub fn batches(&self) -> Vec<BatchSummary> {
        self.batches.lock().clone()
    }

    fn transition(&self, next: DriverState) {
        let mut state = self.state.lock();
        if *state != next {
            tracing::debug!(from = %*state, to = %next, "Driver state change");
            *state = next;
        }
    }

    /// Run until the mode finishes or a fatal error occurs
    pub async fn run(&self) -> Result<(), HarnessError> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Like [`Driver::run`], but stop dispatching and return `Ok` once
    /// `shutdown` resolves. In-flight requests are abandoned.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<(), HarnessError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let result = match self.ctx.config.mode {
            RunMode::Batch {
                count,
                repeat,
                sleep,
            } => self.run_batches(count, repeat, sleep, shutdown).await,
            RunMode::Unbounded => self.run_unbounded(shutdown).await,
        };

        self.transition(DriverState::Done);
        result
    }

    async fn run_batches<F>(
        &self,
        count: u64,
        repeat: bool,
        sleep: Duration,
        mut shutdown: Pin<&mut F>,
    ) -> Result<(), HarnessError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            count,
            concurrency = self.ctx.config.concurrency,
            repeat,
            "Starting batch mode"
        );

        let mut cycle = 0u64;
        loop {
            cycle += 1;

            if cycle > 1 {
                self.transition(DriverState::Authenticating);
                self.ctx.session.authenticate().await?;
            }

            let summary = tokio::select! {
                summary = self.run_batch(count, cycle) => summary?,
                _ = &mut shutdown => {
                    tracing::info!(cycle, "Shutdown requested, abandoning batch");
                    return Ok(());
                }
            };
            self.batches.lock().push(summary);

            if !repeat {
                return Ok(());
            }

            self.transition(DriverState::Sleeping);
            tracing::info!(sleep_secs = sleep.as_secs(), "Sleeping before next batch");
            tokio::select! {
                _ = tokio::time::sleep(sleep) => {}
                _ = &mut shutdown => {
                    tracing::info!(cycle, "Shutdown requested");
                    return Ok(());
                }
            }
        }
    }

    async fn run_batch(&self, count: u64, cycle: u64) -> Result<BatchSummary, HarnessError> {
        self.transition(DriverState::Dispatching);
        let before = self.ctx.stats.snapshot();
        let started = Instant::now();

        let mut tasks = JoinSet::new();
        for _ in 0..count {
            tasks.spawn(run_fetch(Arc::clone(&self.ctx), Completion::Batch));
        }

        self.transition(DriverState::AwaitingCompletion);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                // Dropping the set aborts the rest of the batch.
                Ok(Err(err)) => return Err(err),
                Err(err) => tracing::error!(error = %err, "Request task panicked"),
            }
        }

        let summary = BatchSummary {
            cycle,
            stats: self.ctx.stats.snapshot().since(&before),
            elapsed: started.elapsed(),
        };
        tracing::info!(
            cycle,
            issued = summary.stats.issued,
            succeeded = summary.stats.succeeded,
            failed = summary.stats.failed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            rps = summary.stats.rate(summary.elapsed),
            "Request batch is done"
        );
        Ok(summary)
    }

    async fn run_unbounded<F>(&self, mut shutdown: Pin<&mut F>) -> Result<(), HarnessError>
    where
        F: Future<Output = ()>,
    {
        let config = &self.ctx.config;
        tracing::info!(
            concurrency = config.concurrency,
            low_water_mark = config.low_water_mark,
            top_up = config.top_up,
            "Starting unbounded mode"
        );

        let (fatal_tx, mut fatal_rx) = mpsc::channel::<HarnessError>(1);
        let mut ticker = tokio::time::interval(config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                Some(err) = fatal_rx.recv() => return Err(err),
                _ = &mut shutdown => {
                    tracing::info!(backlog = self.ctx.backlog.get(), "Shutdown requested");
                    return Ok(());
                }
            }

            self.tick(&fatal_tx).await?;
        }
    }

    /// One control loop step. Top-up and renewal are independent and may
    /// both happen in the same tick.
    async fn tick(&self, fatal_tx: &mpsc::Sender<HarnessError>) -> Result<(), HarnessError> {
        let config = &self.ctx.config;

        if let Some(remaining) = self
            .ctx
            .backlog
            .top_up_if_below(config.low_water_mark, config.top_up)
        {
            self.transition(DriverState::Dispatching);
            tracing::info!(
                remaining,
                added = config.top_up,
                "Backlog below low-water mark, dispatching more requests"
            );
            for _ in 0..config.top_up {
                tokio::spawn(run_fetch(
                    Arc::clone(&self.ctx),
                    Completion::Backlog(fatal_tx.clone()),
                ));
            }
        }

        if self.ctx.session.needs_renewal(Utc::now()) {
            self.transition(DriverState::Renewing);
            self.ctx.session.authenticate().await?;
        }

        Ok(())
    }
}
