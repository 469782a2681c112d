//! Coordinator task: reset, deploy, monitor, reply

use std::time::{Duration, Instant};

use futures::future::join_all;
use queenboard::{Placement, RowRange, partition_rows};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{MonitorConfig, WorkerConfig};
use crate::state::{StateStore, StateSummary};
use crate::worker::{Worker, WorkerHandle, WorkerRole, WorkerSpec};

use super::messages::{CompletionReason, CoordCommand, CoordError, RunOutcome, RunRequest, RunStatus};

/// Request channel capacity
const CHANNEL_CAPACITY: usize = 64;

/// Grace period for a component to acknowledge a stop or a dispatch
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Live artifacts of one run, retired by the next run's reset
struct RunContext {
    run_id: Uuid,
    epoch: u64,
    n: u8,
    ranges: Vec<RowRange>,
    store: StateStore,
    workers: Vec<WorkerHandle>,
    started: Instant,
}

/// Handle to submit requests to the coordinator task
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<CoordCommand>,
}

impl CoordinatorHandle {
    /// Execute a full run and wait for its single reply
    pub async fn run(&self, request: RunRequest) -> Result<RunOutcome, CoordError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(CoordCommand::Run {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| CoordError::ChannelClosed)?;
        reply_rx.await.map_err(|_| CoordError::ChannelClosed)?
    }

    /// Summary of the current run's store, if any components are live
    pub async fn summary(&self) -> Result<Option<StateSummary>, CoordError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(CoordCommand::Summary { reply: reply_tx })
            .await
            .map_err(|_| CoordError::ChannelClosed)?;
        reply_rx.await.map_err(|_| CoordError::ChannelClosed)
    }

    /// Stop the coordinator, retiring any live components
    pub async fn shutdown(&self) -> Result<(), CoordError> {
        self.tx
            .send(CoordCommand::Shutdown)
            .await
            .map_err(|_| CoordError::ChannelClosed)
    }
}

/// The coordinator drives run lifecycles and owns surviving component handles
pub struct Coordinator {
    monitor: MonitorConfig,
    worker_config: WorkerConfig,
    tx: mpsc::Sender<CoordCommand>,
    rx: mpsc::Receiver<CoordCommand>,
    /// Components of the most recent run; a completed run's fleet stays up
    /// (the exhaustive worker keeps publishing) until the next reset
    current: Option<RunContext>,
    /// Generation counter stamped on every state mutation
    epoch: u64,
}

impl Coordinator {
    pub fn new(monitor: MonitorConfig, worker_config: WorkerConfig) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        Self {
            monitor,
            worker_config,
            tx,
            rx,
            current: None,
            epoch: 0,
        }
    }

    /// Handle for submitting requests
    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle { tx: self.tx.clone() }
    }

    /// Spawn the coordinator task and return its handle
    pub fn spawn(monitor: MonitorConfig, worker_config: WorkerConfig) -> CoordinatorHandle {
        let coordinator = Self::new(monitor, worker_config);
        let handle = coordinator.handle();
        tokio::spawn(coordinator.run());
        handle
    }

    /// Run the coordinator task until shutdown
    ///
    /// Requests are served in arrival order; a run occupies the task from
    /// reset through reply, so a second run queues behind it - its reset
    /// cannot start before the previous context is released.
    pub async fn run(mut self) {
        info!("Coordinator started");

        while let Some(command) = self.rx.recv().await {
            match command {
                CoordCommand::Run { request, reply } => {
                    let outcome = self.execute_run(request).await;
                    if reply.send(outcome).is_err() {
                        warn!("run caller went away before the reply");
                    }
                }
                CoordCommand::Summary { reply } => {
                    let summary = match &self.current {
                        Some(ctx) => ctx.store.summary().await.ok(),
                        None => None,
                    };
                    let _ = reply.send(summary);
                }
                CoordCommand::Shutdown => {
                    debug!("coordinator shutdown requested");
                    break;
                }
            }
        }

        self.reset_previous().await;
        info!("Coordinator stopped");
    }

    async fn execute_run(&mut self, request: RunRequest) -> Result<RunOutcome, CoordError> {
        let run_id = Uuid::now_v7();
        let started = Instant::now();
        info!(%run_id, n = request.n, workers = request.workers, "run accepted");

        // 1. retire whatever the previous run left behind, best-effort
        self.reset_previous().await;

        // 2. fresh generation, fresh state store
        self.epoch += 1;
        let store = StateStore::spawn(self.epoch);

        // 3. partition rows and deploy the fleet
        if request.n == 0 {
            return Err(CoordError::Deploy("board size must be at least 1".into()));
        }
        if request.workers == 0 {
            return Err(CoordError::Deploy("worker count must be at least 1".into()));
        }
        let ranges = partition_rows(request.n, request.workers);
        let mut workers = Vec::with_capacity(ranges.len());
        for (id, range) in ranges.iter().enumerate() {
            // the first worker is the designated exhaustive searcher; the
            // rest expand the frontier within their assigned rows
            let role = if id == 0 {
                WorkerRole::Exhaustive
            } else {
                WorkerRole::Frontier { rows: *range }
            };
            let handle = Worker::spawn(
                WorkerSpec {
                    id,
                    n: request.n,
                    role,
                },
                store.clone(),
                self.worker_config.throttle(),
                self.worker_config.channel_capacity,
            );
            info!(id, range = %range, "worker deployed for rows");
            workers.push(handle);
        }
        let workers_deployed = workers.len();

        let ctx = RunContext {
            run_id,
            epoch: self.epoch,
            n: request.n,
            ranges,
            store,
            workers,
            started,
        };

        if self.worker_config.seed_frontier {
            if let Err(e) = self.seed_frontier(&ctx).await {
                // keep the partially-deployed fleet for the next reset
                self.current = Some(ctx);
                return Err(e);
            }
        }

        // 4+5. monitor until the completion policy or the backstop fires
        let outcome = self.monitor_run(&ctx, workers_deployed).await;
        self.current = Some(ctx);
        Ok(outcome)
    }

    /// Dispatch the row-0 seed to the first frontier worker
    async fn seed_frontier(&self, ctx: &RunContext) -> Result<(), CoordError> {
        let Some(worker) = ctx
            .workers
            .iter()
            .find(|w| matches!(w.role, WorkerRole::Frontier { .. }))
        else {
            debug!("no frontier worker to seed");
            return Ok(());
        };

        let dispatch = tokio::time::timeout(REQUEST_TIMEOUT, worker.process(0, vec![Placement::empty()])).await;
        match dispatch {
            Ok(Ok(_)) => {
                debug!(id = worker.id, "frontier seeded");
                Ok(())
            }
            Ok(Err(e)) => Err(CoordError::Deploy(format!(
                "failed to seed frontier worker {}: {e}",
                worker.id
            ))),
            Err(_) => Err(CoordError::Deploy(format!(
                "seed dispatch to worker {} timed out",
                worker.id
            ))),
        }
    }

    /// Poll the store on the configured interval, racing the hard backstop
    ///
    /// Exactly one of the two arms returns; completing either drops the
    /// other, so the cancel-the-loser requirement holds by construction.
    async fn monitor_run(&self, ctx: &RunContext, workers_deployed: usize) -> RunOutcome {
        let period = self.monitor.interval();
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        let backstop = tokio::time::sleep(self.monitor.backstop());
        tokio::pin!(backstop);
        let mut checks: u32 = 0;

        loop {
            tokio::select! {
                _ = &mut backstop => {
                    let elapsed = ctx.started.elapsed();
                    warn!(
                        run_id = %ctx.run_id,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "backstop fired, cancelling monitor"
                    );
                    return RunOutcome {
                        run_id: ctx.run_id,
                        status: RunStatus::Timeout,
                        n: ctx.n,
                        total_solutions: 0,
                        solutions: Vec::new(),
                        elapsed_time_ms: elapsed.as_millis() as u64,
                        workers_deployed,
                        reason: None,
                    };
                }

                _ = interval.tick() => {
                    checks += 1;
                    let summary = match ctx.store.summary().await {
                        Ok(summary) => summary,
                        Err(e) => {
                            // missed tick; retried on the next interval
                            warn!(run_id = %ctx.run_id, error = %e, "progress check failed");
                            continue;
                        }
                    };
                    let elapsed = ctx.started.elapsed();
                    info!(
                        run_id = %ctx.run_id,
                        elapsed_ms = elapsed.as_millis() as u64,
                        total_solutions = summary.total_solutions,
                        "progress"
                    );

                    let reason = if summary.total_solutions > 0 {
                        Some(CompletionReason::SolutionsFound)
                    } else if checks >= self.monitor.tick_cap {
                        Some(CompletionReason::IterationCap)
                    } else if elapsed > self.monitor.soft_limit() {
                        Some(CompletionReason::TimeLimit)
                    } else {
                        None
                    };

                    if let Some(reason) = reason {
                        info!(run_id = %ctx.run_id, %reason, elapsed_ms = elapsed.as_millis() as u64, "run completed");
                        return RunOutcome {
                            run_id: ctx.run_id,
                            status: RunStatus::Completed,
                            n: ctx.n,
                            total_solutions: summary.total_solutions,
                            solutions: summary.solutions,
                            elapsed_time_ms: elapsed.as_millis() as u64,
                            workers_deployed,
                            reason: Some(reason),
                        };
                    }
                }
            }
        }
    }

    /// Retire the previous run's components, best-effort
    ///
    /// A component that fails to stop is logged and abandoned; the epoch
    /// guard keeps it from writing into the next run's store.
    async fn reset_previous(&mut self) {
        let Some(ctx) = self.current.take() else {
            debug!("no previous run to retire");
            return;
        };
        info!(
            run_id = %ctx.run_id,
            epoch = ctx.epoch,
            workers = ctx.ranges.len(),
            "retiring previous run"
        );

        join_all(ctx.workers.into_iter().map(|worker| worker.stop(REQUEST_TIMEOUT))).await;

        if let Err(e) = ctx.store.reset().await {
            warn!(error = %e, "previous store unreachable for reset");
        }
        if let Err(e) = ctx.store.shutdown().await {
            warn!(error = %e, "previous store did not accept shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_monitor() -> MonitorConfig {
        MonitorConfig {
            interval_ms: 10,
            tick_cap: 500,
            soft_limit_ms: 10_000,
            backstop_ms: 10_000,
        }
    }

    fn fast_workers() -> WorkerConfig {
        WorkerConfig {
            throttle_ms: 1,
            channel_capacity: 16,
            seed_frontier: false,
        }
    }

    #[tokio::test]
    async fn test_run_completes_on_first_solutions() {
        let coordinator = Coordinator::spawn(fast_monitor(), fast_workers());

        let outcome = coordinator.run(RunRequest { n: 4, workers: 2 }).await.unwrap();

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.reason, Some(CompletionReason::SolutionsFound));
        assert_eq!(outcome.n, 4);
        assert_eq!(outcome.workers_deployed, 2);
        assert!(outcome.total_solutions >= 1);
        // whatever was found by reply time is one of the two 4-queens solutions
        for solution in &outcome.solutions {
            assert!(
                solution == &Placement::from(vec![1, 3, 0, 2]) || solution == &Placement::from(vec![2, 0, 3, 1]),
                "unexpected solution {solution}"
            );
        }
    }

    #[tokio::test]
    async fn test_zero_board_is_a_deployment_failure() {
        let coordinator = Coordinator::spawn(fast_monitor(), fast_workers());

        let err = coordinator.run(RunRequest { n: 0, workers: 2 }).await.unwrap_err();
        assert!(matches!(err, CoordError::Deploy(_)));
    }

    #[tokio::test]
    async fn test_zero_workers_is_a_deployment_failure() {
        let coordinator = Coordinator::spawn(fast_monitor(), fast_workers());

        let err = coordinator.run(RunRequest { n: 4, workers: 0 }).await.unwrap_err();
        assert!(matches!(err, CoordError::Deploy(_)));
    }

    #[tokio::test]
    async fn test_backstop_fires_when_nothing_is_found() {
        // 3-queens has no solutions and the backstop beats the first check
        let monitor = MonitorConfig {
            interval_ms: 100,
            tick_cap: 500,
            soft_limit_ms: 10_000,
            backstop_ms: 30,
        };
        let coordinator = Coordinator::spawn(monitor, fast_workers());

        let outcome = coordinator.run(RunRequest { n: 3, workers: 1 }).await.unwrap();
        assert_eq!(outcome.status, RunStatus::Timeout);
        assert_eq!(outcome.reason, None);
        assert_eq!(outcome.total_solutions, 0);
    }

    #[tokio::test]
    async fn test_iteration_cap_completes_the_run() {
        let monitor = MonitorConfig {
            interval_ms: 5,
            tick_cap: 3,
            soft_limit_ms: 10_000,
            backstop_ms: 10_000,
        };
        let coordinator = Coordinator::spawn(monitor, fast_workers());

        let outcome = coordinator.run(RunRequest { n: 3, workers: 1 }).await.unwrap();
        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.reason, Some(CompletionReason::IterationCap));
        assert_eq!(outcome.total_solutions, 0);
    }

    #[tokio::test]
    async fn test_soft_time_limit_completes_the_run() {
        let monitor = MonitorConfig {
            interval_ms: 5,
            tick_cap: 10_000,
            soft_limit_ms: 1,
            backstop_ms: 10_000,
        };
        let coordinator = Coordinator::spawn(monitor, fast_workers());

        let outcome = coordinator.run(RunRequest { n: 3, workers: 1 }).await.unwrap();
        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.reason, Some(CompletionReason::TimeLimit));
    }

    #[tokio::test]
    async fn test_summary_is_none_before_any_run() {
        let coordinator = Coordinator::spawn(fast_monitor(), fast_workers());
        assert_eq!(coordinator.summary().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_summary_reflects_the_retained_run() {
        let coordinator = Coordinator::spawn(fast_monitor(), fast_workers());

        let outcome = coordinator.run(RunRequest { n: 4, workers: 2 }).await.unwrap();
        let summary = coordinator.summary().await.unwrap().expect("run context retained");
        assert!(summary.total_solutions >= outcome.total_solutions);
    }

    #[tokio::test]
    async fn test_consecutive_runs_reset_between_them() {
        let coordinator = Coordinator::spawn(fast_monitor(), fast_workers());

        let first = coordinator.run(RunRequest { n: 4, workers: 2 }).await.unwrap();
        let second = coordinator.run(RunRequest { n: 4, workers: 2 }).await.unwrap();

        assert_eq!(first.status, RunStatus::Completed);
        assert_eq!(second.status, RunStatus::Completed);
        assert_ne!(first.run_id, second.run_id);
        // the second run counts only its own generation's solutions
        assert!(second.total_solutions <= 2);
    }

    #[tokio::test]
    async fn test_seeded_frontier_populates_the_cache() {
        let workers = WorkerConfig {
            throttle_ms: 1,
            channel_capacity: 16,
            seed_frontier: true,
        };
        let coordinator = Coordinator::spawn(fast_monitor(), workers);

        coordinator.run(RunRequest { n: 6, workers: 2 }).await.unwrap();

        let summary = coordinator.summary().await.unwrap().expect("run context retained");
        assert!(summary.cache_size >= 1, "seed dispatch should populate row buckets");
    }
}
