//! Line parser for `key;value` records.
//!
//! Parsing is pure and allocation-free: the returned [`Record`] borrows its
//! key from the input line.

use std::fmt;

use serde::Serialize;

/// Field delimiter between key and value.
pub const DELIMITER: u8 = b';';

/// One parsed `key;value` line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record<'a> {
    pub key: &'a [u8],
    pub value: f64,
}

/// Why a line was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedLine {
    /// No `;` in the line (this includes blank lines).
    MissingDelimiter,
    /// More than one `;`, so the key boundary is ambiguous.
    AmbiguousKey,
    /// Nothing before the delimiter.
    EmptyKey,
    /// Value is not a finite decimal number.
    InvalidValue,
}

impl MalformedLine {
    pub const ALL: [MalformedLine; 4] = [
        MalformedLine::MissingDelimiter,
        MalformedLine::AmbiguousKey,
        MalformedLine::EmptyKey,
        MalformedLine::InvalidValue,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MalformedLine::MissingDelimiter => "missing delimiter",
            MalformedLine::AmbiguousKey => "ambiguous key",
            MalformedLine::EmptyKey => "empty key",
            MalformedLine::InvalidValue => "invalid value",
        }
    }
}

impl fmt::Display for MalformedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for MalformedLine {}

/// Parse one line with its `\n` already removed.
///
/// A trailing `\r` is dropped so CRLF input behaves like LF input. The value
/// may carry surrounding ASCII whitespace; the key is taken byte-for-byte.
pub fn parse_line(line: &[u8]) -> Result<Record<'_>, MalformedLine> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);

    let split = line
        .iter()
        .position(|&b| b == DELIMITER)
        .ok_or(MalformedLine::MissingDelimiter)?;
    let (key, rest) = (&line[..split], &line[split + 1..]);

    if rest.contains(&DELIMITER) {
        return Err(MalformedLine::AmbiguousKey);
    }
    if key.is_empty() {
        return Err(MalformedLine::EmptyKey);
    }

    Ok(Record {
        key,
        value: parse_value(rest)?,
    })
}

fn parse_value(raw: &[u8]) -> Result<f64, MalformedLine> {
    let text = std::str::from_utf8(raw)
        .map_err(|_| MalformedLine::InvalidValue)?
        .trim_matches(|c: char| c.is_ascii_whitespace());

    // f64's FromStr also accepts "inf" and "NaN", which are not decimals.
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(MalformedLine::InvalidValue),
    }
}
