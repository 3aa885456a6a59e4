//! Worker thread for parallel processing
//!
//! Each worker owns the chunk it is folding and the map it builds; nothing
//! is shared with other workers while aggregating.

use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

use crate::aggregate::ChunkAggregator;
use crate::error::{Error, Result};
use crate::readers::ChunkSource;

use super::types::{ChunkResult, WorkMessage, WorkerReport};

/// Worker thread: aggregates chunks until the work queue closes or the run
/// is aborted
pub(crate) fn worker_thread(
    worker_id: usize,
    work_receiver: Receiver<WorkMessage>,
    result_sender: Sender<WorkerReport>,
    source: Option<Arc<dyn ChunkSource>>,
    abort: Arc<AtomicBool>,
) {
    let started = Instant::now();
    let mut aggregator = ChunkAggregator::new();
    let mut chunks = 0u64;

    while let Ok(work_msg) = work_receiver.recv() {
        if abort.load(Ordering::Relaxed) {
            break;
        }

        let report = process_chunk(&mut aggregator, work_msg, source.as_deref());
        let failed = report.is_err();
        if failed {
            abort.store(true, Ordering::Relaxed);
        } else {
            chunks += 1;
        }

        if result_sender.send(report).is_err() || failed {
            break;
        }
    }

    debug!(
        worker = worker_id,
        chunks,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "worker finished"
    );
}

fn process_chunk(
    aggregator: &mut ChunkAggregator,
    work_msg: WorkMessage,
    source: Option<&dyn ChunkSource>,
) -> Result<ChunkResult> {
    let chunk_id = match work_msg {
        WorkMessage::Range(range) => {
            let source = source.ok_or_else(|| {
                Error::Config("byte-range chunk dispatched without a source".into())
            })?;
            let bytes =
                source
                    .read_range(range.start, range.end)
                    .map_err(|e| Error::ChunkRead {
                        chunk: range.id,
                        start: range.start,
                        end: range.end,
                        source: e,
                    })?;
            trace!(chunk = range.id, bytes = bytes.len(), "folding range");
            aggregator.fold_bytes(&bytes);
            range.id
        }
        WorkMessage::LineBatch(batch) => {
            trace!(chunk = batch.id, bytes = batch.bytes.len(), "folding line batch");
            aggregator.fold_bytes(&batch.bytes);
            batch.id
        }
    };

    aggregator.finish_chunk();
    let (map, worker_stats) = aggregator.take();
    Ok(ChunkResult {
        chunk_id,
        map,
        worker_stats,
    })
}
