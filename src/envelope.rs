//! The compression envelope: a fixed magic + version prefix followed by a
//! zstd-framed stream of opcodes (spec.md §4.6, §6 "Delta file layout").
//! Everything after the prefix is compressed; there is no other framing.

use std::io::{self, Read, Write};

use crate::error::{Result, TarDiffError};
use crate::options::Options;

/// Stable, project-specific magic token opening every delta file.
pub const MAGIC: &[u8; 8] = b"tar-diff";
/// Current opcode-stream format version. Bump and gate on this when the
/// opcode wire format changes incompatibly.
pub const FORMAT_VERSION: u8 = 1;

/// Write the magic+version prefix, then hand back a zstd encoder the
/// caller can stream the opcode bytes through.
pub fn open_writer<W: Write>(mut out: W, options: &Options) -> Result<zstd::Encoder<'static, W>> {
    out.write_all(MAGIC)?;
    out.write_all(&[FORMAT_VERSION])?;
    let encoder = zstd::Encoder::new(out, options.compression_level)?;
    Ok(encoder)
}

/// Read and validate the magic+version prefix, then hand back a zstd
/// decoder positioned at the start of the opcode stream. Rejects any
/// mismatch before a single opcode byte is produced.
pub fn open_reader<R: Read>(mut input: R) -> Result<zstd::Decoder<'static, io::BufReader<R>>> {
    let mut magic = [0u8; 8];
    input.read_exact(&mut magic).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            TarDiffError::UnexpectedEndOfInput("delta file shorter than magic+version prefix".to_string())
        } else {
            e.into()
        }
    })?;
    let mut version = [0u8; 1];
    input.read_exact(&mut version)?;

    if &magic != MAGIC || version[0] != FORMAT_VERSION {
        return Err(TarDiffError::UnsupportedDeltaVersion {
            expected_magic: MAGIC,
            expected_version: FORMAT_VERSION,
            actual_magic: magic.to_vec(),
            actual_version: version[0],
        });
    }

    Ok(zstd::Decoder::new(input)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_roundtrip() {
        let mut buf = Vec::new();
        {
            let mut w = open_writer(&mut buf, &Options::default()).unwrap();
            w.write_all(b"hello opcodes").unwrap();
            w.finish().unwrap();
        }
        let mut r = open_reader(Cursor::new(buf)).unwrap();
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello opcodes");
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut buf = Vec::new();
        {
            let mut w = open_writer(&mut buf, &Options::default()).unwrap();
            w.write_all(b"x").unwrap();
            w.finish().unwrap();
        }
        buf[0] = b'X';
        let err = open_reader(Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, TarDiffError::UnsupportedDeltaVersion { .. }));
    }

    #[test]
    fn test_bad_version_rejected() {
        let mut buf = Vec::new();
        {
            let mut w = open_writer(&mut buf, &Options::default()).unwrap();
            w.write_all(b"x").unwrap();
            w.finish().unwrap();
        }
        buf[8] = FORMAT_VERSION + 1;
        let err = open_reader(Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, TarDiffError::UnsupportedDeltaVersion { .. }));
    }

    #[test]
    fn test_too_short_is_fatal() {
        let err = open_reader(Cursor::new(vec![1, 2, 3])).unwrap_err();
        assert!(matches!(err, TarDiffError::UnexpectedEndOfInput(_)));
    }
}
