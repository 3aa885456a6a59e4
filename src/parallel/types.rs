//! Type definitions for parallel processing
//!
//! Contains work messages, chunk results and configuration.

use crate::aggregate::AggregateMap;
use crate::config::{MergeStrategy, PerformanceConfig};
use crate::error::Error;
use crate::partition::{ChunkRange, ChunkSizing};
use crate::stats::ProcessingStats;

/// Configuration for parallel processing
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    pub num_workers: usize,
    pub sizing: ChunkSizing,
    pub merge: MergeStrategy,
    /// Work queue capacity; bounds the number of chunks held in memory but
    /// not yet picked up by a worker.
    pub buffer_size: usize,
}

impl ParallelConfig {
    pub fn from_performance(perf: &PerformanceConfig) -> Self {
        let num_workers = perf.effective_threads();
        Self {
            num_workers,
            sizing: perf.chunk_sizing(),
            merge: perf.merge,
            buffer_size: num_workers * 2,
        }
    }
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self::from_performance(&PerformanceConfig::default())
    }
}

/// Whole lines cut from a streamed input
#[derive(Debug, Clone)]
pub struct LineBatch {
    pub id: u64,
    /// Offset of the first byte within the (decompressed) stream
    pub offset: u64,
    pub bytes: Vec<u8>,
}

/// Message type for distributing work to workers
#[derive(Debug)]
pub(crate) enum WorkMessage {
    /// Byte range the worker reads from the shared source itself
    Range(ChunkRange),
    /// Lines already read by the batcher
    LineBatch(LineBatch),
}

/// Result of aggregating one chunk
#[derive(Debug)]
pub struct ChunkResult {
    pub chunk_id: u64,
    pub map: AggregateMap,
    pub worker_stats: ProcessingStats,
}

/// What a worker sends back for each chunk
pub(crate) type WorkerReport = Result<ChunkResult, Error>;
