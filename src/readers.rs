//! Input sources.
//!
//! Plain files are exposed as a [`ChunkSource`] so workers can read their own
//! byte ranges independently. Stdin and compressed files cannot be addressed
//! by offset and are read as a single line stream instead.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::decompression::{maybe_decompress, Compression};
use crate::error::{Error, Result};

/// Byte-addressable input that can be shared between worker threads.
pub trait ChunkSource: Send + Sync {
    /// Total size in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read bytes starting at `offset`; returns 0 at end of input.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Read exactly `start..end`. Running out of input before `end` is an
    /// error, since the range was planned against [`ChunkSource::len`].
    fn read_range(&self, start: u64, end: u64) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; (end - start) as usize];
        let mut filled = 0;
        while filled < buf.len() {
            match self.read_at(start + filled as u64, &mut buf[filled..]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("input ended at byte {}", start + filled as u64),
                    ))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(buf)
    }
}

/// A regular file read with positional reads.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    len: u64,
    path: PathBuf,
}

impl FileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let open = |path: &Path| -> io::Result<(File, u64)> {
            let file = File::open(path)?;
            let len = file.metadata()?.len();
            Ok((file, len))
        };
        match open(&path) {
            Ok((file, len)) => Ok(Self { file, len, path }),
            Err(source) => Err(Error::InputOpen { path, source }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChunkSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    #[cfg(unix)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(&self.file, buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(&self.file, buf, offset)
    }
}

/// In-memory input, used for small buffers and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource(Vec<u8>);

impl MemorySource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }
}

impl ChunkSource for MemorySource {
    fn len(&self) -> u64 {
        self.0.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let start = (offset as usize).min(self.0.len());
        let n = buf.len().min(self.0.len() - start);
        buf[..n].copy_from_slice(&self.0[start..start + n]);
        Ok(n)
    }
}

/// Sequential [`Read`] over a [`ChunkSource`], for inputs too small to be
/// worth partitioning.
pub struct SourceReader<'a> {
    source: &'a dyn ChunkSource,
    pos: u64,
}

impl<'a> SourceReader<'a> {
    pub fn new(source: &'a dyn ChunkSource) -> Self {
        Self { source, pos: 0 }
    }
}

impl Read for SourceReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.source.len() {
            return Ok(0);
        }
        let n = self.source.read_at(self.pos, buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

/// An opened input, ready for aggregation.
pub enum Input {
    /// Plain file: partitioned by byte offset.
    Seekable(FileSource),
    /// Stdin or compressed file: read front to back as lines.
    Stream {
        reader: Box<dyn BufRead + Send>,
        compression: Compression,
        name: String,
    },
}

impl std::fmt::Debug for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::Seekable(source) => write!(f, "Input::Seekable({})", source.path().display()),
            Input::Stream {
                compression, name, ..
            } => write!(f, "Input::Stream({}, {:?})", name, compression),
        }
    }
}

impl Input {
    /// Open `path`, or stdin for `-`.
    pub fn open(path: &str) -> Result<Self> {
        if path == "-" {
            let (compression, reader) =
                maybe_decompress(io::stdin()).map_err(|source| Error::InputOpen {
                    path: PathBuf::from("<stdin>"),
                    source,
                })?;
            return Ok(Input::Stream {
                reader: Box::new(BufReader::new(reader)),
                compression,
                name: "<stdin>".to_string(),
            });
        }

        let compression = sniff_file(Path::new(path)).map_err(|source| Error::InputOpen {
            path: PathBuf::from(path),
            source,
        })?;

        match compression {
            Compression::None => Ok(Input::Seekable(FileSource::open(path)?)),
            _ => {
                let open_err = |source| Error::InputOpen {
                    path: PathBuf::from(path),
                    source,
                };
                let file = File::open(path).map_err(open_err)?;
                let (compression, reader) = maybe_decompress(file).map_err(open_err)?;
                Ok(Input::Stream {
                    reader: Box::new(BufReader::new(reader)),
                    compression,
                    name: path.to_string(),
                })
            }
        }
    }
}

fn sniff_file(path: &Path) -> io::Result<Compression> {
    let mut head = [0u8; 4];
    let mut file = File::open(path)?;
    let mut n = 0;
    while n < head.len() {
        match file.read(&mut head[n..])? {
            0 => break,
            read => n += read,
        }
    }
    Ok(Compression::detect(&head[..n]))
}
