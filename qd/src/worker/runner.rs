//! Worker task: exhaustive search and frontier expansion
//!
//! Both paths go through the same `is_safe` predicate; the only difference is
//! where results land. The exhaustive sweep publishes straight to the
//! solution ledger, frontier expansion republishes into the next row bucket
//! until it leaves the worker's assigned range.

use std::time::Duration;

use queenboard::{Placement, Solutions, is_safe};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::state::{SolutionNotice, StateStore};

use super::messages::{ProcessAck, WorkerCommand, WorkerError, WorkerRole};

/// Spawn-time configuration for one worker
#[derive(Debug, Clone, Copy)]
pub struct WorkerSpec {
    pub id: usize,
    pub n: u8,
    pub role: WorkerRole,
}

/// Handle kept by the coordinator for a deployed worker
#[derive(Debug)]
pub struct WorkerHandle {
    pub id: usize,
    pub role: WorkerRole,
    tx: mpsc::Sender<WorkerCommand>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Dispatch a work unit; resolves with the immediate acknowledgement
    pub async fn process(&self, row: u8, placements: Vec<Placement>) -> Result<ProcessAck, WorkerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(WorkerCommand::Process {
                row,
                placements,
                reply: reply_tx,
            })
            .await
            .map_err(|_| WorkerError::ChannelClosed)?;
        reply_rx.await.map_err(|_| WorkerError::ChannelClosed)
    }

    /// Ask the worker to stop, waiting up to `timeout`
    ///
    /// A worker that does not acknowledge in time is aborted; either way the
    /// handle is consumed and the task will not outlive this call by much.
    pub async fn stop(self, timeout: Duration) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let stopped = tokio::time::timeout(timeout, async {
            self.tx
                .send(WorkerCommand::Shutdown { reply: reply_tx })
                .await
                .ok()?;
            reply_rx.await.ok()
        })
        .await;

        match stopped {
            Ok(Some(())) => debug!(id = self.id, "worker stopped"),
            _ => {
                warn!(id = self.id, "worker did not stop in time, aborting");
                self.join.abort();
            }
        }
    }
}

/// A search worker; spawned onto the runtime, driven by its command channel
pub struct Worker {
    spec: WorkerSpec,
    store: StateStore,
    throttle: Duration,
    rx: mpsc::Receiver<WorkerCommand>,
    notices: broadcast::Receiver<SolutionNotice>,
    notices_open: bool,
}

impl Worker {
    /// Spawn a worker task and return the coordinator's handle to it
    pub fn spawn(spec: WorkerSpec, store: StateStore, throttle: Duration, channel_capacity: usize) -> WorkerHandle {
        let (tx, rx) = mpsc::channel(channel_capacity);
        let notices = store.subscribe();
        let worker = Worker {
            spec,
            store,
            throttle,
            rx,
            notices,
            notices_open: true,
        };
        let join = tokio::spawn(worker.run());
        info!(id = spec.id, role = ?spec.role, "worker spawned");

        WorkerHandle {
            id: spec.id,
            role: spec.role,
            tx,
            join,
        }
    }

    async fn run(mut self) {
        if self.spec.role == WorkerRole::Exhaustive {
            // complete sweep first; dispatched work queues until it finishes
            self.run_exhaustive().await;
        } else {
            debug!(id = self.spec.id, "worker waiting for work");
        }

        loop {
            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(WorkerCommand::Process { row, placements, reply }) => {
                        let _ = reply.send(ProcessAck::Processing);
                        self.expand_from(row, placements).await;
                    }
                    Some(WorkerCommand::Shutdown { reply }) => {
                        debug!(id = self.spec.id, "worker shutting down");
                        let _ = reply.send(());
                        break;
                    }
                    None => break,
                },
                notice = self.notices.recv(), if self.notices_open => match notice {
                    // informational only: an extension hook, not a completion signal
                    Ok(notice) => {
                        debug!(
                            id = self.spec.id,
                            number = notice.solution_number,
                            "solution broadcast received"
                        );
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(id = self.spec.id, skipped, "solution broadcasts lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        self.notices_open = false;
                    }
                },
            }
        }
    }

    /// Complete depth-first enumeration, publishing each solution as found
    async fn run_exhaustive(&mut self) {
        info!(id = self.spec.id, n = self.spec.n, "starting complete enumeration");
        let mut found = 0u64;
        for solution in Solutions::new(self.spec.n) {
            if let Err(e) = self.store.record_solution(solution).await {
                warn!(id = self.spec.id, error = %e, "stopping enumeration");
                return;
            }
            found += 1;
            tokio::task::yield_now().await;
        }
        info!(id = self.spec.id, found, "enumeration complete");
    }

    /// Frontier expansion from `row`, continuing while inside the assigned range
    ///
    /// `placements` must have length `row`; each is extended by every safe
    /// column. Survivors of the final row are recorded as solutions, anything
    /// else is appended to the next row bucket.
    async fn expand_from(&self, start_row: u8, placements: Vec<Placement>) {
        let n = self.spec.n;
        let mut row = start_row;
        let mut current = placements;

        while row < n {
            let mut next: Vec<Placement> = Vec::new();
            for placement in &current {
                for col in 0..n {
                    if is_safe(placement.columns(), col) {
                        next.push(placement.extended(col));
                    }
                }
            }
            let next_row = row + 1;
            debug!(
                id = self.spec.id,
                row = next_row,
                from = current.len(),
                to = next.len(),
                "expanded states"
            );

            if next_row == n {
                // survivors are complete solutions
                for solution in next {
                    if let Err(e) = self.store.record_solution(solution).await {
                        warn!(id = self.spec.id, error = %e, "abandoning sweep");
                        return;
                    }
                }
                return;
            }

            if next.is_empty() {
                return;
            }
            if let Err(e) = self.store.append_row(next_row, next.clone()).await {
                // a stale epoch or closed store both end this worker's sweep
                warn!(id = self.spec.id, row = next_row, error = %e, "abandoning sweep");
                return;
            }

            let in_range = match self.spec.role {
                WorkerRole::Frontier { rows } => rows.contains(next_row),
                WorkerRole::Exhaustive => false,
            };
            if !in_range {
                return;
            }

            // pace the message burst rate; not needed for correctness
            tokio::time::sleep(self.throttle).await;
            row = next_row;
            current = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use queenboard::RowRange;
    use std::time::Duration;

    fn placement(cols: &[u8]) -> Placement {
        Placement::from(cols.to_vec())
    }

    fn frontier_spec(id: usize, n: u8, start: u8, end: u8) -> WorkerSpec {
        WorkerSpec {
            id,
            n,
            role: WorkerRole::Frontier {
                rows: RowRange { start, end },
            },
        }
    }

    async fn wait_for_solutions(store: &StateStore, expected: u64) -> crate::state::StateSummary {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let summary = store.summary().await.unwrap();
                if summary.total_solutions >= expected {
                    return summary;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("workers did not produce the expected solutions in time")
    }

    #[tokio::test]
    async fn test_process_ack_is_immediate() {
        let store = StateStore::spawn(1);
        let handle = Worker::spawn(frontier_spec(1, 4, 0, 2), store, Duration::from_millis(1), 16);

        let ack = handle.process(1, vec![placement(&[0])]).await.unwrap();
        assert_eq!(ack, ProcessAck::Processing);
    }

    #[tokio::test]
    async fn test_single_step_expansion_is_exactly_the_safe_extensions() {
        let store = StateStore::spawn(1);
        // range ends at row 2, so the worker stops after one expansion
        let handle = Worker::spawn(frontier_spec(1, 4, 1, 2), store.clone(), Duration::from_millis(1), 16);

        handle
            .process(1, vec![placement(&[0]), placement(&[1])])
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut bucket = store.get_row(2).await.unwrap();
        bucket.sort_by_key(|p| p.columns().to_vec());
        // [0] extends to columns 2,3; [1] only to 3
        assert_eq!(
            bucket,
            vec![placement(&[0, 2]), placement(&[0, 3]), placement(&[1, 3])]
        );
        // nothing propagated past the worker's range
        assert!(store.get_row(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_final_row_expansion_records_solutions() {
        let store = StateStore::spawn(1);
        let handle = Worker::spawn(frontier_spec(1, 4, 3, 4), store.clone(), Duration::from_millis(1), 16);

        handle.process(3, vec![placement(&[1, 3, 0])]).await.unwrap();

        let summary = wait_for_solutions(&store, 1).await;
        assert_eq!(summary.solutions, vec![placement(&[1, 3, 0, 2])]);
        // solutions go to the ledger, not a bucket
        assert!(store.get_row(4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_full_range_propagation_finds_the_subtree_solutions() {
        let store = StateStore::spawn(1);
        let handle = Worker::spawn(frontier_spec(1, 4, 0, 4), store.clone(), Duration::from_millis(1), 16);

        // the whole row-0 frontier: expansion alone must find both solutions
        handle.process(0, vec![Placement::empty()]).await.unwrap();

        let summary = wait_for_solutions(&store, 2).await;
        let mut solutions = summary.solutions;
        solutions.sort_by_key(|p| p.columns().to_vec());
        assert_eq!(solutions, vec![placement(&[1, 3, 0, 2]), placement(&[2, 0, 3, 1])]);
    }

    #[tokio::test]
    async fn test_exhaustive_worker_finds_both_four_queens_solutions() {
        let store = StateStore::spawn(1);
        let spec = WorkerSpec {
            id: 0,
            n: 4,
            role: WorkerRole::Exhaustive,
        };
        let _handle = Worker::spawn(spec, store.clone(), Duration::from_millis(1), 16);

        let summary = wait_for_solutions(&store, 2).await;
        assert_eq!(summary.total_solutions, 2);
        assert_eq!(
            summary.solutions,
            vec![placement(&[1, 3, 0, 2]), placement(&[2, 0, 3, 1])]
        );
        // the exhaustive path never touches the buckets
        assert_eq!(summary.cache_size, 0);
    }

    #[tokio::test]
    async fn test_stale_epoch_abandons_the_sweep() {
        let store = StateStore::spawn(5);
        let stale = store.with_epoch(4);
        let handle = Worker::spawn(frontier_spec(1, 4, 0, 4), stale, Duration::from_millis(1), 16);

        handle.process(0, vec![Placement::empty()]).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        // every append was rejected; nothing landed anywhere
        let summary = store.summary().await.unwrap();
        assert_eq!(summary.total_solutions, 0);
        assert_eq!(summary.cache_size, 0);
    }

    #[tokio::test]
    async fn test_stop_shuts_the_worker_down() {
        let store = StateStore::spawn(1);
        let handle = Worker::spawn(frontier_spec(1, 4, 0, 2), store, Duration::from_millis(1), 16);

        handle.stop(Duration::from_secs(1)).await;
    }
}
