use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};

/// Standard Unix exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidUsage = 2,
}

impl ExitCode {
    pub fn exit(self) -> ! {
        process::exit(self as i32)
    }
}

/// Create a helpful error message for file creation failures
fn create_helpful_error_message(path: &Path, error: &io::Error) -> String {
    let base_msg = format!("cannot create output file '{}': {}", path.display(), error);

    let suggestion = match error.kind() {
        io::ErrorKind::PermissionDenied => {
            if path.parent().is_some_and(|p| !p.exists()) {
                "suggestion: parent directory does not exist, create it first"
            } else {
                "suggestion: check file permissions or choose a writable location"
            }
        }
        io::ErrorKind::NotFound => "suggestion: parent directory does not exist, create it first",
        io::ErrorKind::AlreadyExists if path.is_dir() => {
            "suggestion: path points to a directory, specify a filename instead"
        }
        io::ErrorKind::InvalidInput => "suggestion: check for invalid characters in filename",
        _ => return base_msg,
    };

    format!("{}\n{}", base_msg, suggestion)
}

/// Output file that only appears at its destination once fully written.
///
/// Lines go to a temporary file in the destination directory; `commit`
/// flushes and renames it over the destination. Dropping without
/// committing removes the temporary file and leaves the destination alone.
pub struct SafeFileOut {
    writer: BufWriter<NamedTempFile>,
    path: PathBuf,
}

impl SafeFileOut {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.is_dir() {
            let e = io::Error::new(io::ErrorKind::AlreadyExists, "is a directory");
            return Err(output_error(&path, e));
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = NamedTempFile::new_in(dir).map_err(|e| output_error(&path, e))?;
        debug!(temp = %temp.path().display(), "staging output");

        Ok(Self {
            writer: BufWriter::new(temp),
            path,
        })
    }

    pub fn write_line(&mut self, line: &[u8]) -> Result<()> {
        self.writer
            .write_all(line)
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(|e| self.write_error(e))
    }

    /// Flush and atomically move the staged file into place.
    pub fn commit(self) -> Result<()> {
        let path = self.path;
        let temp = self
            .writer
            .into_inner()
            .map_err(|e| output_error(&path, e.into_error()))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| output_error(&path, e))?;
        temp.persist(&path)
            .map_err(|e| output_error(&path, e.error))?;
        Ok(())
    }

    fn write_error(&self, e: io::Error) -> Error {
        Error::OutputWrite {
            path: self.path.display().to_string(),
            source: e,
        }
    }
}

fn output_error(path: &Path, e: io::Error) -> Error {
    let message = create_helpful_error_message(path, &e);
    Error::OutputWrite {
        path: path.display().to_string(),
        source: io::Error::new(e.kind(), message),
    }
}

/// Write result lines to stdout.
pub fn write_stdout(lines: &[Vec<u8>]) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let write = |out: &mut BufWriter<io::StdoutLock<'_>>| -> io::Result<()> {
        for line in lines {
            out.write_all(line)?;
            out.write_all(b"\n")?;
        }
        out.flush()
    };
    write(&mut out).map_err(|e| Error::OutputWrite {
        path: "-".to_string(),
        source: e,
    })
}

/// Publish result lines to `path`, or stdout for `-`.
pub fn write_output(path: &str, lines: &[Vec<u8>]) -> Result<()> {
    if path == "-" {
        return write_stdout(lines);
    }

    let mut out = SafeFileOut::new(path)?;
    for line in lines {
        out.write_line(line)?;
    }
    out.commit()
}
