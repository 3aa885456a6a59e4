//! Parallel aggregation for keystat
//!
//! Splits the input into chunks, folds each chunk on a worker thread and
//! merges the per-chunk maps on the calling thread.
//!
//! # Module Structure
//!
//! - `types`: Work messages, chunk results, and configuration
//! - `batching`: Range dispatcher and stream batcher threads
//! - `worker`: Worker thread folding one chunk at a time
//! - `sink`: Result collection and merging
//! - `processor`: Main ParallelProcessor orchestration

mod batching;
mod processor;
mod sink;
mod types;
mod worker;

// Re-export public types
pub use processor::ParallelProcessor;
pub use types::{ChunkResult, LineBatch, ParallelConfig};
