//! Per-key statistics, chunk folding and merging.
//!
//! [`PartialStat`] with [`PartialStat::merge`] is a commutative monoid (minus
//! the identity, which is never materialized). That is what makes the final
//! result independent of how the input was chunked and in which order worker
//! results arrive.

use std::collections::HashMap;

use crate::config::MergeStrategy;
use crate::parsers::parse_line;
use crate::stats::ProcessingStats;

/// Running min/max/sum/count for one key. `count` is always at least 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialStat {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: u64,
}

impl PartialStat {
    /// Stat for a key's first observed value.
    pub fn new(value: f64) -> Self {
        Self {
            min: value,
            max: value,
            sum: value,
            count: 1,
        }
    }

    pub fn add(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.count += 1;
    }

    /// Combine with another stat for the same key.
    pub fn merge(&mut self, other: &PartialStat) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
    }

    /// Arithmetic mean, kept inside `[min, max]`.
    ///
    /// A sum of values near `f64::MAX` overflows to infinity (or NaN when
    /// both signs overflow); the true mean always lies within the observed
    /// range, so it is clamped there, and the midpoint of the range stands in
    /// for NaN.
    pub fn mean(&self) -> f64 {
        let mean = self.sum / self.count as f64;
        if mean.is_nan() {
            return self.min / 2.0 + self.max / 2.0;
        }
        mean.clamp(self.min, self.max)
    }
}

/// Key (raw bytes, compared exactly) to its stats.
pub type AggregateMap = HashMap<Vec<u8>, PartialStat>;

/// Fold `b` into `a`, key by key. Keys present on one side only are moved
/// over unchanged.
pub fn merge_maps(mut a: AggregateMap, mut b: AggregateMap) -> AggregateMap {
    if a.len() < b.len() {
        std::mem::swap(&mut a, &mut b);
    }
    merge_into(&mut a, b);
    a
}

/// Fold `other` into `target` in place.
pub fn merge_into(target: &mut AggregateMap, other: AggregateMap) {
    target.reserve(other.len().saturating_sub(target.len()));
    for (key, stat) in other {
        match target.get_mut(&key) {
            Some(existing) => existing.merge(&stat),
            None => {
                target.insert(key, stat);
            }
        }
    }
}

/// Balanced pairwise reduction of many partial maps.
pub fn tree_merge(mut maps: Vec<AggregateMap>) -> AggregateMap {
    while maps.len() > 1 {
        let mut next = Vec::with_capacity(maps.len().div_ceil(2));
        let mut iter = maps.into_iter();
        while let Some(left) = iter.next() {
            match iter.next() {
                Some(right) => next.push(merge_maps(left, right)),
                None => next.push(left),
            }
        }
        maps = next;
    }
    maps.pop().unwrap_or_default()
}

/// Accumulates worker results according to a [`MergeStrategy`].
#[derive(Debug)]
pub struct MapMerger {
    strategy: MergeStrategy,
    running: AggregateMap,
    pending: Vec<AggregateMap>,
    merged: u64,
}

impl MapMerger {
    pub fn new(strategy: MergeStrategy) -> Self {
        Self {
            strategy,
            running: AggregateMap::new(),
            pending: Vec::new(),
            merged: 0,
        }
    }

    pub fn push(&mut self, map: AggregateMap) {
        self.merged += 1;
        match self.strategy {
            MergeStrategy::Incremental => {
                let running = std::mem::take(&mut self.running);
                self.running = merge_maps(running, map);
            }
            MergeStrategy::Tree => self.pending.push(map),
        }
    }

    /// Number of partial maps received so far.
    pub fn merged(&self) -> u64 {
        self.merged
    }

    pub fn finish(self) -> AggregateMap {
        match self.strategy {
            MergeStrategy::Incremental => self.running,
            MergeStrategy::Tree => tree_merge(self.pending),
        }
    }
}

/// Final aggregate of a run plus the counters collected while building it.
#[derive(Debug, Default)]
pub struct Aggregation {
    pub map: AggregateMap,
    pub stats: ProcessingStats,
}

/// Folds the lines of one chunk into an [`AggregateMap`].
///
/// Owns no state beyond the chunk it is folding; malformed lines are counted
/// in the aggregator's stats and otherwise ignored.
#[derive(Debug, Default)]
pub struct ChunkAggregator {
    map: AggregateMap,
    stats: ProcessingStats,
}

impl ChunkAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one line (without its `\n`).
    pub fn fold_line(&mut self, line: &[u8]) {
        self.stats.lines_read += 1;
        match parse_line(line) {
            Ok(record) => {
                self.stats.lines_parsed += 1;
                // get_mut first so existing keys are not reallocated
                match self.map.get_mut(record.key) {
                    Some(stat) => stat.add(record.value),
                    None => {
                        self.map
                            .insert(record.key.to_vec(), PartialStat::new(record.value));
                    }
                }
            }
            Err(reason) => self.stats.malformed.record(reason),
        }
    }

    /// Fold a buffer of `\n`-separated lines. A trailing newline does not
    /// produce an extra empty line.
    pub fn fold_bytes(&mut self, buf: &[u8]) {
        if buf.is_empty() {
            return;
        }
        self.stats.bytes_read += buf.len() as u64;
        let body = buf.strip_suffix(b"\n").unwrap_or(buf);
        for line in body.split(|&b| b == b'\n') {
            self.fold_line(line);
        }
    }

    /// Mark one chunk as completed in the stats.
    pub fn finish_chunk(&mut self) {
        self.stats.chunks += 1;
    }

    /// Hand over the map and counters collected so far, leaving the
    /// aggregator empty.
    pub fn take(&mut self) -> (AggregateMap, ProcessingStats) {
        (
            std::mem::take(&mut self.map),
            std::mem::take(&mut self.stats),
        )
    }

    pub fn into_parts(self) -> (AggregateMap, ProcessingStats) {
        (self.map, self.stats)
    }
}

/// Aggregate a single buffer in one go.
pub fn aggregate_bytes(buf: &[u8]) -> AggregateMap {
    let mut aggregator = ChunkAggregator::new();
    aggregator.fold_bytes(buf);
    aggregator.into_parts().0
}
