//! StateStore - actor that owns the shared frontier cache and solution ledger
//!
//! Processes commands via channels for safe concurrent access. Recorded
//! solutions are fanned out to subscribers on a broadcast channel; delivery
//! failure to any subscriber never fails the record.

use std::collections::{HashMap, HashSet};

use queenboard::Placement;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use super::messages::{StateCommand, StateError, StateResponse, StateSummary};

/// Command channel capacity
const COMMAND_CAPACITY: usize = 256;

/// Broadcast channel capacity; slow subscribers lag, they never block a record
const BROADCAST_CAPACITY: usize = 256;

/// Notification emitted once per recorded solution
///
/// Informational only: subscribers observe it, nothing in the core acts on
/// it. This is the extension point for e.g. cancellation-on-first-solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionNotice {
    pub solution_number: u64,
    pub solution: Placement,
}

/// Handle to send commands to the state store actor
///
/// Cheap to clone; every mutation issued through a handle is stamped with the
/// handle's epoch.
#[derive(Clone)]
pub struct StateStore {
    tx: mpsc::Sender<StateCommand>,
    notice_tx: broadcast::Sender<SolutionNotice>,
    epoch: u64,
}

impl StateStore {
    /// Spawn a state store actor for the run generation `epoch`
    pub fn spawn(epoch: u64) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let (notice_tx, _) = broadcast::channel(BROADCAST_CAPACITY);

        tokio::spawn(actor_loop(epoch, rx, notice_tx.clone()));
        info!(epoch, "StateStore spawned");

        Self { tx, notice_tx, epoch }
    }

    /// Epoch stamped on every mutation issued through this handle
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// A handle that stamps `epoch` on its mutations instead
    pub fn with_epoch(&self, epoch: u64) -> Self {
        Self {
            tx: self.tx.clone(),
            notice_tx: self.notice_tx.clone(),
            epoch,
        }
    }

    /// Subscribe to solution notifications
    ///
    /// Only notices recorded after subscription are received.
    pub fn subscribe(&self) -> broadcast::Receiver<SolutionNotice> {
        self.notice_tx.subscribe()
    }

    /// Current bucket for `row`; empty if absent
    pub async fn get_row(&self, row: u8) -> StateResponse<Vec<Placement>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::GetRow { row, reply: reply_tx })
            .await
            .map_err(|_| StateError::ChannelClosed)?;
        reply_rx.await.map_err(|_| StateError::ChannelClosed)
    }

    /// Union-merge `placements` into the bucket for `row`
    ///
    /// Acknowledged once the merge is applied; an acknowledged append is
    /// visible to every subsequent `get_row`.
    pub async fn append_row(&self, row: u8, placements: Vec<Placement>) -> StateResponse<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::AppendRow {
                epoch: self.epoch,
                row,
                placements,
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelClosed)?;
        reply_rx.await.map_err(|_| StateError::ChannelClosed)?
    }

    /// Append a full solution to the ledger; fire-and-forget
    pub async fn record_solution(&self, solution: Placement) -> StateResponse<()> {
        self.tx
            .send(StateCommand::RecordSolution {
                epoch: self.epoch,
                solution,
            })
            .await
            .map_err(|_| StateError::ChannelClosed)
    }

    /// Point-in-time summary of solutions and cache occupancy
    pub async fn summary(&self) -> StateResponse<StateSummary> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::Summary { reply: reply_tx })
            .await
            .map_err(|_| StateError::ChannelClosed)?;
        reply_rx.await.map_err(|_| StateError::ChannelClosed)
    }

    /// Clear all buckets and the ledger; safe on an already-empty store
    pub async fn reset(&self) -> StateResponse<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::Reset { reply: reply_tx })
            .await
            .map_err(|_| StateError::ChannelClosed)?;
        reply_rx.await.map_err(|_| StateError::ChannelClosed)
    }

    /// Stop the actor
    pub async fn shutdown(&self) -> StateResponse<()> {
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelClosed)
    }
}

async fn actor_loop(
    epoch: u64,
    mut rx: mpsc::Receiver<StateCommand>,
    notice_tx: broadcast::Sender<SolutionNotice>,
) {
    // The bucket map and the ledger are touched only from this task; the
    // command channel serializes access, so per-row reads are linearizable
    // and concurrent appends union without loss.
    let mut buckets: HashMap<u8, HashSet<Placement>> = HashMap::new();
    let mut solutions: Vec<Placement> = Vec::new();
    let mut solution_count: u64 = 0;

    while let Some(command) = rx.recv().await {
        match command {
            StateCommand::GetRow { row, reply } => {
                let states: Vec<Placement> = buckets
                    .get(&row)
                    .map(|bucket| bucket.iter().cloned().collect())
                    .unwrap_or_default();
                let _ = reply.send(states);
            }

            StateCommand::AppendRow {
                epoch: msg_epoch,
                row,
                placements,
                reply,
            } => {
                if msg_epoch != epoch {
                    warn!(current = epoch, got = msg_epoch, row, "discarding append from stale epoch");
                    let _ = reply.send(Err(StateError::StaleEpoch {
                        current: epoch,
                        got: msg_epoch,
                    }));
                    continue;
                }
                let bucket = buckets.entry(row).or_default();
                let incoming = placements.len();
                bucket.extend(placements);
                debug!(row, incoming, total = bucket.len(), "merged states into row bucket");
                let _ = reply.send(Ok(()));
            }

            StateCommand::RecordSolution {
                epoch: msg_epoch,
                solution,
            } => {
                if msg_epoch != epoch {
                    warn!(current = epoch, got = msg_epoch, "discarding solution from stale epoch");
                    continue;
                }
                solutions.push(solution.clone());
                solution_count += 1;
                info!(number = solution_count, %solution, "solution recorded");
                // No subscribers is fine; so is a lagging one
                let _ = notice_tx.send(SolutionNotice {
                    solution_number: solution_count,
                    solution,
                });
            }

            StateCommand::Summary { reply } => {
                let _ = reply.send(StateSummary {
                    total_solutions: solution_count,
                    solutions: solutions.clone(),
                    cache_size: buckets.len(),
                });
            }

            StateCommand::Reset { reply } => {
                buckets.clear();
                solutions.clear();
                solution_count = 0;
                info!("state reset");
                let _ = reply.send(());
            }

            StateCommand::Shutdown => {
                debug!("state store shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(cols: &[u8]) -> Placement {
        Placement::from(cols.to_vec())
    }

    #[tokio::test]
    async fn test_get_row_absent_is_empty() {
        let store = StateStore::spawn(1);
        assert_eq!(store.get_row(3).await.unwrap(), Vec::<Placement>::new());
    }

    #[tokio::test]
    async fn test_append_then_get_row() {
        let store = StateStore::spawn(1);
        store
            .append_row(2, vec![placement(&[0, 2]), placement(&[1, 3])])
            .await
            .unwrap();

        let mut rows = store.get_row(2).await.unwrap();
        rows.sort_by_key(|p| p.columns().to_vec());
        assert_eq!(rows, vec![placement(&[0, 2]), placement(&[1, 3])]);
    }

    #[tokio::test]
    async fn test_duplicate_append_does_not_grow_bucket() {
        let store = StateStore::spawn(1);
        store.append_row(2, vec![placement(&[0, 2])]).await.unwrap();
        store.append_row(2, vec![placement(&[0, 2])]).await.unwrap();

        assert_eq!(store.get_row(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_appends_from_two_handles_union() {
        let store = StateStore::spawn(1);
        let other = store.clone();

        store.append_row(2, vec![placement(&[0, 2])]).await.unwrap();
        other.append_row(2, vec![placement(&[1, 3])]).await.unwrap();

        assert_eq!(store.get_row(2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rows_are_independent() {
        let store = StateStore::spawn(1);
        store.append_row(1, vec![placement(&[0])]).await.unwrap();
        store.append_row(2, vec![placement(&[0, 2])]).await.unwrap();

        assert_eq!(store.get_row(1).await.unwrap().len(), 1);
        assert_eq!(store.get_row(2).await.unwrap().len(), 1);
        let summary = store.summary().await.unwrap();
        assert_eq!(summary.cache_size, 2);
    }

    #[tokio::test]
    async fn test_record_solution_counts_and_broadcasts() {
        let store = StateStore::spawn(1);
        let mut notices = store.subscribe();

        store.record_solution(placement(&[1, 3, 0, 2])).await.unwrap();

        let notice = notices.recv().await.unwrap();
        assert_eq!(notice.solution_number, 1);
        assert_eq!(notice.solution, placement(&[1, 3, 0, 2]));

        let summary = store.summary().await.unwrap();
        assert_eq!(summary.total_solutions, 1);
        assert_eq!(summary.solutions, vec![placement(&[1, 3, 0, 2])]);
    }

    #[tokio::test]
    async fn test_record_without_subscribers_is_fine() {
        let store = StateStore::spawn(1);
        store.record_solution(placement(&[1, 3, 0, 2])).await.unwrap();
        assert_eq!(store.summary().await.unwrap().total_solutions, 1);
    }

    #[tokio::test]
    async fn test_ledger_preserves_insertion_order() {
        let store = StateStore::spawn(1);
        store.record_solution(placement(&[1, 3, 0, 2])).await.unwrap();
        store.record_solution(placement(&[2, 0, 3, 1])).await.unwrap();

        let summary = store.summary().await.unwrap();
        assert_eq!(
            summary.solutions,
            vec![placement(&[1, 3, 0, 2]), placement(&[2, 0, 3, 1])]
        );
    }

    #[tokio::test]
    async fn test_reset_clears_buckets_and_ledger_together() {
        let store = StateStore::spawn(1);
        store.append_row(2, vec![placement(&[0, 2])]).await.unwrap();
        store.record_solution(placement(&[1, 3, 0, 2])).await.unwrap();

        store.reset().await.unwrap();

        let summary = store.summary().await.unwrap();
        assert_eq!(summary.total_solutions, 0);
        assert!(summary.solutions.is_empty());
        assert_eq!(summary.cache_size, 0);
        assert!(store.get_row(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_is_idempotent_and_safe_on_empty_store() {
        let store = StateStore::spawn(1);
        store.reset().await.unwrap();
        store.reset().await.unwrap();

        let summary = store.summary().await.unwrap();
        assert_eq!(summary.total_solutions, 0);
        assert_eq!(summary.cache_size, 0);
    }

    #[tokio::test]
    async fn test_counter_restarts_after_reset() {
        let store = StateStore::spawn(1);
        store.record_solution(placement(&[1, 3, 0, 2])).await.unwrap();
        store.reset().await.unwrap();

        let mut notices = store.subscribe();
        store.record_solution(placement(&[2, 0, 3, 1])).await.unwrap();
        assert_eq!(notices.recv().await.unwrap().solution_number, 1);
    }

    #[tokio::test]
    async fn test_stale_epoch_append_is_rejected() {
        let store = StateStore::spawn(5);
        let stale = store.with_epoch(4);

        let err = stale.append_row(2, vec![placement(&[0, 2])]).await.unwrap_err();
        assert_eq!(err, StateError::StaleEpoch { current: 5, got: 4 });
        assert!(store.get_row(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_epoch_solution_is_discarded() {
        let store = StateStore::spawn(5);
        let stale = store.with_epoch(4);

        // fire-and-forget: the send succeeds, the record is dropped
        stale.record_solution(placement(&[1, 3, 0, 2])).await.unwrap();

        assert_eq!(store.summary().await.unwrap().total_solutions, 0);
    }

    #[tokio::test]
    async fn test_shutdown_closes_the_channel() {
        let store = StateStore::spawn(1);
        store.shutdown().await.unwrap();

        // the actor is gone; subsequent requests fail with ChannelClosed
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(store.get_row(0).await.unwrap_err(), StateError::ChannelClosed);
    }
}
