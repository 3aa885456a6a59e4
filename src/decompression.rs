use flate2::read::MultiGzDecoder;
use std::io::{Chain, Cursor, Read};

/// Compression format of an input, detected from its magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    /// 1F 8B 08
    Gzip,
    /// 28 B5 2F FD
    Zstd,
}

impl Compression {
    /// Classify the first bytes of a stream
    pub fn detect(head: &[u8]) -> Self {
        if head.len() >= 3 && head[0] == 0x1F && head[1] == 0x8B && head[2] == 0x08 {
            Compression::Gzip
        } else if head.len() >= 4
            && head[0] == 0x28
            && head[1] == 0xB5
            && head[2] == 0x2F
            && head[3] == 0xFD
        {
            Compression::Zstd
        } else {
            Compression::None
        }
    }
}

/// Read up to 4 bytes, looping over short reads so pipes are classified
/// correctly.
fn read_head<R: Read>(reader: &mut R) -> std::io::Result<([u8; 4], usize)> {
    let mut head = [0u8; 4];
    let mut n = 0;
    while n < head.len() {
        match reader.read(&mut head[n..]) {
            Ok(0) => break,
            Ok(read) => n += read,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok((head, n))
}

/// Magic bytes detection for any Read type.
/// Returns the detected format and a reader yielding decompressed bytes.
pub fn maybe_decompress<R: Read + Send + 'static>(
    mut reader: R,
) -> std::io::Result<(Compression, Box<dyn Read + Send>)> {
    let (head, n) = read_head(&mut reader)?;

    // Put the read bytes back in front using a cursor chain
    let prefix = Cursor::new(head[..n].to_vec());
    let chained: Chain<Cursor<Vec<u8>>, R> = prefix.chain(reader);

    let compression = Compression::detect(&head[..n]);
    let reader: Box<dyn Read + Send> = match compression {
        Compression::Gzip => Box::new(MultiGzDecoder::new(chained)),
        Compression::Zstd => Box::new(zstd::Decoder::new(chained)?),
        Compression::None => Box::new(chained),
    };
    Ok((compression, reader))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_plain_passthrough() -> std::io::Result<()> {
        let (compression, mut reader) = maybe_decompress(Cursor::new(b"a;1.0\nb;2.0\n".to_vec()))?;
        let mut content = String::new();
        reader.read_to_string(&mut content)?;

        assert_eq!(compression, Compression::None);
        assert_eq!(content, "a;1.0\nb;2.0\n");
        Ok(())
    }

    #[test]
    fn test_short_input_is_plain() -> std::io::Result<()> {
        let (compression, mut reader) = maybe_decompress(Cursor::new(b"x".to_vec()))?;
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        assert_eq!(compression, Compression::None);
        assert_eq!(content, "x");
        Ok(())
    }

    #[test]
    fn test_gzip_roundtrip() -> std::io::Result<()> {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"Paris;10.0\nOslo;-5.5\n")?;
        let compressed = encoder.finish()?;

        let (compression, mut reader) = maybe_decompress(Cursor::new(compressed))?;
        let mut content = String::new();
        reader.read_to_string(&mut content)?;

        assert_eq!(compression, Compression::Gzip);
        assert_eq!(content, "Paris;10.0\nOslo;-5.5\n");
        Ok(())
    }

    #[test]
    fn test_zstd_roundtrip() -> std::io::Result<()> {
        let compressed = zstd::encode_all(&b"Lima;3.0\n"[..], 0)?;

        let (compression, mut reader) = maybe_decompress(Cursor::new(compressed))?;
        let mut content = String::new();
        reader.read_to_string(&mut content)?;

        assert_eq!(compression, Compression::Zstd);
        assert_eq!(content, "Lima;3.0\n");
        Ok(())
    }

    #[test]
    fn test_magic_bytes_detection() {
        assert_eq!(Compression::detect(&[0x1F, 0x8B, 0x08, 0x00]), Compression::Gzip);
        assert_eq!(Compression::detect(&[0x28, 0xB5, 0x2F, 0xFD]), Compression::Zstd);
        assert_eq!(Compression::detect(b"key;"), Compression::None);
        assert_eq!(Compression::detect(&[0x28, 0xB5]), Compression::None);
    }
}
