//! Main parallel processor
//!
//! Contains the ParallelProcessor struct that orchestrates the parallel pipeline.

use crossbeam_channel::bounded;
use std::io::BufRead;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info};

use crate::aggregate::{Aggregation, MapMerger};
use crate::error::{Error, Result};
use crate::partition::Partitioner;
use crate::readers::ChunkSource;
use crate::stats::ProcessingStats;

use super::batching::{range_dispatcher_thread, stream_batcher_thread};
use super::sink::collect_results;
use super::types::{ParallelConfig, WorkMessage, WorkerReport};
use super::worker::worker_thread;

/// Main parallel processor
pub struct ParallelProcessor {
    config: ParallelConfig,
}

impl ParallelProcessor {
    pub fn new(config: ParallelConfig) -> Self {
        Self { config }
    }

    /// Aggregate a byte-addressable source: plan line-aligned chunks, let
    /// each worker read and fold its own ranges.
    pub fn process_source(&self, source: Arc<dyn ChunkSource>) -> Result<Aggregation> {
        let chunks = Partitioner::new(source.as_ref(), self.config.sizing)
            .plan(self.config.num_workers)
            .map_err(|e| Error::stream_read(0, 0, e))?;
        info!(
            bytes = source.len(),
            chunks = chunks.len(),
            workers = self.config.num_workers,
            "aggregating in parallel"
        );

        self.run_pipeline(Some(source), move |work_sender, abort| {
            range_dispatcher_thread(chunks, work_sender, abort)
        })
    }

    /// Aggregate a stream that cannot be addressed by offset: a batcher
    /// thread cuts it into line batches.
    pub fn process_stream<R: BufRead + Send + 'static>(&self, reader: R) -> Result<Aggregation> {
        let batch_bytes = self.config.sizing.min_bytes.max(1) as usize;
        info!(
            batch_bytes,
            workers = self.config.num_workers,
            "aggregating stream in parallel"
        );

        self.run_pipeline(None, move |work_sender, abort| {
            stream_batcher_thread(reader, work_sender, batch_bytes, abort)
        })
    }

    fn run_pipeline<D>(
        &self,
        source: Option<Arc<dyn ChunkSource>>,
        dispatch: D,
    ) -> Result<Aggregation>
    where
        D: FnOnce(crossbeam_channel::Sender<WorkMessage>, Arc<AtomicBool>) -> Result<u64>
            + Send
            + 'static,
    {
        let mut stats = ProcessingStats::new();
        stats.parallel = true;
        stats.workers = self.config.num_workers;

        let abort = Arc::new(AtomicBool::new(false));
        let (work_sender, work_receiver) = bounded::<WorkMessage>(self.config.buffer_size.max(1));
        let (result_sender, result_receiver) =
            bounded::<WorkerReport>(self.config.num_workers.max(1) * 2);

        // Start dispatcher thread
        let dispatch_handle = {
            let abort = abort.clone();
            thread::spawn(move || dispatch(work_sender, abort))
        };

        // Start worker threads
        let mut worker_handles: Vec<JoinHandle<()>> = Vec::with_capacity(self.config.num_workers);
        for worker_id in 0..self.config.num_workers {
            let work_receiver = work_receiver.clone();
            let result_sender = result_sender.clone();
            let source = source.clone();
            let abort = abort.clone();

            let handle = thread::Builder::new()
                .name(format!("keystat-worker-{}", worker_id))
                .spawn(move || {
                    worker_thread(worker_id, work_receiver, result_sender, source, abort)
                })
                .map_err(Error::Spawn)?;
            worker_handles.push(handle);
        }

        // Drop our ends so the channels close when the threads finish
        drop(work_receiver);
        drop(result_sender);

        let merge_started = Instant::now();
        let mut merger = MapMerger::new(self.config.merge);
        let collected = collect_results(result_receiver, &mut merger, &mut stats, &abort);

        // Wait for all threads to complete
        let dispatched = dispatch_handle
            .join()
            .unwrap_or_else(|_| {
                Err(Error::ThreadPanic {
                    thread: "dispatcher".to_string(),
                })
            });

        let mut panicked = None;
        for (idx, handle) in worker_handles.into_iter().enumerate() {
            if handle.join().is_err() && panicked.is_none() {
                panicked = Some(idx);
            }
        }

        collected?;
        let dispatched = dispatched?;
        if let Some(worker) = panicked {
            return Err(Error::ThreadPanic {
                thread: format!("worker {}", worker),
            });
        }
        if merger.merged() != dispatched {
            return Err(Error::IncompleteRun {
                expected: dispatched,
                received: merger.merged(),
            });
        }

        let map = merger.finish();
        debug!(
            chunks = dispatched,
            keys = map.len(),
            merge_ms = merge_started.elapsed().as_millis() as u64,
            "merged chunk results"
        );

        stats.distinct_keys = map.len();
        stats.finish();
        Ok(Aggregation { map, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_bytes;
    use crate::config::MergeStrategy;
    use crate::partition::ChunkSizing;
    use crate::readers::MemorySource;
    use std::io::{self, Cursor};

    fn config(workers: usize, chunk: u64, merge: MergeStrategy) -> ParallelConfig {
        ParallelConfig {
            num_workers: workers,
            sizing: ChunkSizing {
                min_bytes: chunk,
                max_bytes: chunk,
            },
            merge,
            buffer_size: workers * 2,
        }
    }

    fn sample_input() -> Vec<u8> {
        let mut data = Vec::new();
        for i in 0..500 {
            data.extend_from_slice(format!("key{};{}.{}\n", i % 17, i % 41 - 20, i % 10).as_bytes());
        }
        data.extend_from_slice(b"broken line\n");
        data
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let data = sample_input();
        let expected = aggregate_bytes(&data);

        for merge in [MergeStrategy::Incremental, MergeStrategy::Tree] {
            for workers in [1, 2, 4] {
                let processor = ParallelProcessor::new(config(workers, 97, merge));
                let result = processor
                    .process_source(Arc::new(MemorySource::new(data.clone())))
                    .unwrap();
                assert_eq!(result.map.len(), expected.len());
                for (key, stat) in &expected {
                    let got = result.map[key];
                    assert_eq!(got.count, stat.count);
                    assert_eq!(got.min, stat.min);
                    assert_eq!(got.max, stat.max);
                    assert!((got.sum - stat.sum).abs() < 1e-9);
                }
                assert_eq!(result.stats.lines_read, 501);
                assert_eq!(result.stats.malformed.total(), 1);
                assert!(result.stats.chunks > 1);
            }
        }
    }

    #[test]
    fn test_stream_matches_sequential() {
        let data = sample_input();
        let expected = aggregate_bytes(&data);
        let processor = ParallelProcessor::new(config(3, 64, MergeStrategy::Incremental));
        let result = processor.process_stream(Cursor::new(data)).unwrap();
        assert_eq!(result.map.len(), expected.len());
        assert_eq!(result.stats.lines_parsed, 500);
    }

    #[test]
    fn test_empty_source() {
        let processor = ParallelProcessor::new(config(2, 16, MergeStrategy::Incremental));
        let result = processor
            .process_source(Arc::new(MemorySource::new(Vec::new())))
            .unwrap();
        assert!(result.map.is_empty());
        assert_eq!(result.stats.chunks, 0);
    }

    /// Source whose reads fail past a given offset.
    struct FlakySource {
        inner: MemorySource,
        fail_from: u64,
    }

    impl ChunkSource for FlakySource {
        fn len(&self) -> u64 {
            self.inner.len()
        }

        fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
            if offset >= self.fail_from {
                return Err(io::Error::other("injected read failure"));
            }
            let n = buf.len().min((self.fail_from - offset) as usize);
            self.inner.read_at(offset, &mut buf[..n])
        }
    }

    #[test]
    fn test_chunk_read_failure_fails_the_run() {
        let data = sample_input();
        let fail_from = data.len() as u64 - 100;
        // plan against a healthy source, then fail reads for the last chunk
        let source = FlakySource {
            inner: MemorySource::new(data),
            fail_from,
        };
        let processor = ParallelProcessor::new(config(2, 4096, MergeStrategy::Incremental));
        let err = processor.process_source(Arc::new(source)).unwrap_err();
        assert!(matches!(err, Error::ChunkRead { .. }), "got {:?}", err);
    }
}
