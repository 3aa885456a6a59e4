//! Dispatcher thread logic for parallel processing
//!
//! Feeds chunks to the workers: either pre-planned byte ranges or line
//! batches cut from a stream.

use crossbeam_channel::Sender;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::partition::ChunkRange;

use super::types::{LineBatch, WorkMessage};

/// Range dispatcher thread - sends planned chunks to the workers.
/// Returns the number of chunks handed out.
pub(crate) fn range_dispatcher_thread(
    chunks: Vec<ChunkRange>,
    work_sender: Sender<WorkMessage>,
    abort: Arc<AtomicBool>,
) -> Result<u64> {
    let mut sent = 0u64;
    for chunk in chunks {
        if abort.load(Ordering::Relaxed) {
            debug!(sent, "dispatch stopped after failure");
            break;
        }
        if work_sender.send(WorkMessage::Range(chunk)).is_err() {
            // all workers gone
            break;
        }
        sent += 1;
    }
    Ok(sent)
}

/// Stream batcher thread - reads whole lines and sends them in batches of
/// roughly `batch_bytes`. Returns the number of batches handed out.
pub(crate) fn stream_batcher_thread<R: BufRead>(
    mut reader: R,
    work_sender: Sender<WorkMessage>,
    batch_bytes: usize,
    abort: Arc<AtomicBool>,
) -> Result<u64> {
    let mut batch_id = 0u64;
    let mut batch_offset = 0u64;
    let mut consumed = 0u64;
    let mut current = Vec::with_capacity(batch_bytes + 1024);

    loop {
        if abort.load(Ordering::Relaxed) {
            debug!(batch_id, "batching stopped after failure");
            return Ok(batch_id);
        }

        let read = match reader.read_until(b'\n', &mut current) {
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                abort.store(true, Ordering::Relaxed);
                return Err(Error::stream_read(batch_id, consumed, e));
            }
        };
        consumed += read as u64;

        let at_eof = read == 0;
        if (at_eof && !current.is_empty()) || current.len() >= batch_bytes {
            let batch = LineBatch {
                id: batch_id,
                offset: batch_offset,
                bytes: std::mem::replace(&mut current, Vec::with_capacity(batch_bytes + 1024)),
            };
            trace!(batch = batch.id, bytes = batch.bytes.len(), "sending line batch");
            if work_sender.send(WorkMessage::LineBatch(batch)).is_err() {
                return Ok(batch_id);
            }
            batch_id += 1;
            batch_offset = consumed;
        }

        if at_eof {
            return Ok(batch_id);
        }
    }
}
