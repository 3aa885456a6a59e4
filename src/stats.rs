use std::time::{Duration, Instant};

use serde::Serialize;

use crate::parsers::MalformedLine;

/// Statistics collected while aggregating an input
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingStats {
    pub lines_read: u64,
    pub lines_parsed: u64,
    pub malformed: MalformedCounts,
    pub bytes_read: u64,
    pub chunks: u64,
    pub workers: usize,
    pub distinct_keys: usize,
    pub parallel: bool,
    #[serde(serialize_with = "serialize_millis", rename = "processing_time_ms")]
    pub processing_time: Duration,
    #[serde(skip)]
    pub start_time: Option<Instant>,
}

/// Skipped-line counts, one slot per [`MalformedLine`] reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MalformedCounts([u64; 4]);

impl MalformedCounts {
    pub fn record(&mut self, reason: MalformedLine) {
        self.0[reason.index()] += 1;
    }

    pub fn get(&self, reason: MalformedLine) -> u64 {
        self.0[reason.index()]
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    pub fn merge(&mut self, other: &MalformedCounts) {
        for (mine, theirs) in self.0.iter_mut().zip(other.0.iter()) {
            *mine += theirs;
        }
    }
}

impl Serialize for MalformedCounts {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(MalformedLine::ALL.len()))?;
        for reason in MalformedLine::ALL {
            map.serialize_entry(&reason, &self.get(reason))?;
        }
        map.end()
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Fold a worker's counters into this one.
    pub fn merge_worker(&mut self, worker: &ProcessingStats) {
        self.lines_read += worker.lines_read;
        self.lines_parsed += worker.lines_parsed;
        self.malformed.merge(&worker.malformed);
        self.bytes_read += worker.bytes_read;
        self.chunks += worker.chunks;
    }

    pub fn finish(&mut self) {
        if let Some(start) = self.start_time {
            self.processing_time = start.elapsed();
        }
    }

    pub fn format_stats(&self) -> String {
        let mut output = format!(
            "Lines processed: {} total, {} parsed, {} skipped",
            self.lines_read,
            self.lines_parsed,
            self.malformed.total()
        );

        if self.malformed.total() > 0 {
            let reasons: Vec<String> = MalformedLine::ALL
                .iter()
                .filter(|r| self.malformed.get(**r) > 0)
                .map(|r| format!("{} {}", self.malformed.get(*r), r))
                .collect();
            output.push_str(&format!(" ({})", reasons.join(", ")));
        }

        output.push_str(&format!("; {} distinct keys", self.distinct_keys));

        if self.parallel {
            output.push_str(&format!(
                "; {} chunks on {} workers",
                self.chunks, self.workers
            ));
        } else {
            output.push_str("; sequential");
        }

        let processing_time_ms = self.processing_time.as_millis();
        output.push_str(&format!(" in {}ms", processing_time_ms));

        if processing_time_ms > 0 && self.lines_read > 0 {
            let lines_per_sec = (self.lines_read as f64 * 1000.0) / processing_time_ms as f64;
            output.push_str(&format!(" ({:.0} lines/s)", lines_per_sec));
        }

        output
    }
}
