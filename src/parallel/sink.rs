//! Result collection for parallel processing
//!
//! Runs on the calling thread: receives chunk results in completion order
//! and merges them. Merging is the only synchronization point of a run.

use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

use crate::aggregate::MapMerger;
use crate::error::{Error, Result};
use crate::stats::ProcessingStats;

use super::types::WorkerReport;

/// Drain every worker report, merging successful chunks.
///
/// Keeps receiving after a failure so that no worker blocks on a full result
/// channel; the first error is returned once all workers have hung up.
pub(crate) fn collect_results(
    result_receiver: Receiver<WorkerReport>,
    merger: &mut MapMerger,
    stats: &mut ProcessingStats,
    abort: &Arc<AtomicBool>,
) -> Result<()> {
    let mut first_error: Option<Error> = None;

    while let Ok(report) = result_receiver.recv() {
        match report {
            Ok(result) => {
                if first_error.is_some() {
                    continue;
                }
                trace!(
                    chunk = result.chunk_id,
                    keys = result.map.len(),
                    "merging chunk result"
                );
                stats.merge_worker(&result.worker_stats);
                merger.push(result.map);
            }
            Err(e) => {
                abort.store(true, Ordering::Relaxed);
                if first_error.is_none() {
                    warn!(error = %e, "chunk failed, aborting run");
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_bytes;
    use crate::config::MergeStrategy;
    use crate::parallel::types::ChunkResult;
    use crossbeam_channel::unbounded;

    fn ok_report(id: u64, bytes: &[u8]) -> WorkerReport {
        let mut worker_stats = ProcessingStats::default();
        worker_stats.chunks = 1;
        Ok(ChunkResult {
            chunk_id: id,
            map: aggregate_bytes(bytes),
            worker_stats,
        })
    }

    #[test]
    fn test_collects_in_any_order() {
        let (tx, rx) = unbounded();
        tx.send(ok_report(2, b"k;3\n")).unwrap();
        tx.send(ok_report(0, b"k;1\n")).unwrap();
        tx.send(ok_report(1, b"j;2\n")).unwrap();
        drop(tx);

        let mut merger = MapMerger::new(MergeStrategy::Incremental);
        let mut stats = ProcessingStats::default();
        collect_results(rx, &mut merger, &mut stats, &Arc::new(AtomicBool::new(false))).unwrap();

        assert_eq!(merger.merged(), 3);
        assert_eq!(stats.chunks, 3);
        let map = merger.finish();
        assert_eq!(map[&b"k".to_vec()].count, 2);
    }

    #[test]
    fn test_first_error_wins_and_sets_abort() {
        let (tx, rx) = unbounded();
        tx.send(ok_report(0, b"k;1\n")).unwrap();
        tx.send(Err(Error::stream_read(1, 10, std::io::Error::other("first"))))
            .unwrap();
        tx.send(Err(Error::stream_read(2, 20, std::io::Error::other("second"))))
            .unwrap();
        tx.send(ok_report(3, b"k;1\n")).unwrap();
        drop(tx);

        let abort = Arc::new(AtomicBool::new(false));
        let mut merger = MapMerger::new(MergeStrategy::Tree);
        let mut stats = ProcessingStats::default();
        let err = collect_results(rx, &mut merger, &mut stats, &abort).unwrap_err();

        assert!(matches!(err, Error::ChunkRead { chunk: 1, .. }));
        assert!(abort.load(Ordering::Relaxed));
        assert_eq!(merger.merged(), 1);
    }
}
