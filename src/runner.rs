//! Run execution module
//!
//! Decides between the sequential and parallel paths, runs the aggregation
//! and publishes the formatted result.

use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::aggregate::{Aggregation, ChunkAggregator};
use crate::config::{KeystatConfig, OutputConfig, PerformanceConfig};
use crate::error::{Error, Result};
use crate::formatters::{format_map, FormatOptions};
use crate::parallel::{ParallelConfig, ParallelProcessor};
use crate::platform;
use crate::readers::{ChunkSource, FileSource, Input, SourceReader};
use crate::stats::ProcessingStats;

const SEQUENTIAL_BUFFER_BYTES: usize = 256 * 1024;

/// Open the configured input and aggregate it.
pub fn aggregate(config: &KeystatConfig) -> Result<Aggregation> {
    let input = Input::open(&config.input.path)?;
    debug!(input = ?input, "opened input");
    aggregate_input(input, &config.performance)
}

/// Aggregate an already opened input, in parallel when it is large enough.
pub fn aggregate_input(input: Input, perf: &PerformanceConfig) -> Result<Aggregation> {
    match input {
        Input::Seekable(source) => aggregate_file(source, perf),
        Input::Stream { reader, .. } => aggregate_stream(reader, perf),
    }
}

fn aggregate_file(source: FileSource, perf: &PerformanceConfig) -> Result<Aggregation> {
    let len = source.len();
    if !perf.should_use_parallel(len) {
        info!(bytes = len, "aggregating sequentially");
        let reader = BufReader::with_capacity(SEQUENTIAL_BUFFER_BYTES, SourceReader::new(&source));
        return aggregate_sequential(reader, len);
    }

    let processor = ParallelProcessor::new(ParallelConfig::from_performance(perf));
    processor.process_source(Arc::new(source))
}

fn aggregate_stream<R: BufRead + Send + 'static>(
    mut reader: R,
    perf: &PerformanceConfig,
) -> Result<Aggregation> {
    if perf.effective_threads() <= 1 {
        info!("aggregating stream sequentially");
        return aggregate_sequential(reader, 0);
    }

    // Buffer the head of the stream; if it ends there, workers are not worth it.
    let threshold = perf.small_input_bytes;
    let mut prefix = Vec::new();
    (&mut reader)
        .take(threshold)
        .read_to_end(&mut prefix)
        .map_err(|e| Error::stream_read(0, 0, e))?;

    if (prefix.len() as u64) < threshold {
        info!(bytes = prefix.len(), "small stream, aggregating sequentially");
        let len = prefix.len() as u64;
        return aggregate_sequential(Cursor::new(prefix), len);
    }

    let processor = ParallelProcessor::new(ParallelConfig::from_performance(perf));
    processor.process_stream(Cursor::new(prefix).chain(reader))
}

/// Fold a whole reader on the calling thread.
///
/// `expected_len` is only used to describe the failing range when a read
/// fails; pass 0 when the length is unknown.
pub fn aggregate_sequential<R: BufRead>(mut reader: R, expected_len: u64) -> Result<Aggregation> {
    let mut stats = ProcessingStats::new();
    stats.workers = 1;

    let mut aggregator = ChunkAggregator::new();
    let mut line = Vec::with_capacity(256);
    let mut consumed = 0u64;

    loop {
        line.clear();
        let read = match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(Error::ChunkRead {
                    chunk: 0,
                    start: consumed,
                    end: expected_len.max(consumed),
                    source: e,
                })
            }
        };
        consumed += read as u64;
        aggregator.fold_bytes(&line);
    }

    if consumed > 0 {
        aggregator.finish_chunk();
    }
    let (map, worker_stats) = aggregator.into_parts();
    stats.merge_worker(&worker_stats);
    stats.distinct_keys = map.len();
    stats.finish();
    Ok(Aggregation { map, stats })
}

/// Format the aggregate and write it to the configured output.
pub fn publish(output: &OutputConfig, aggregation: &Aggregation) -> Result<()> {
    let started = Instant::now();
    let lines = format_map(
        &aggregation.map,
        FormatOptions {
            rounding: output.rounding,
            key_order: output.key_order,
        },
    );
    platform::write_output(&output.path, &lines)?;
    debug!(
        lines = lines.len(),
        output = %output.path,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "published output"
    );
    Ok(())
}
