//! Low-level, byte-exact tar header parsing.
//!
//! The scanner needs the *exact* on-disk header bytes so the encoder can
//! replay them verbatim and the reconstructed archive matches the original
//! byte-for-byte. The `tar` crate's high-level `Archive`/`Entries` API
//! normalizes GNU long-name and PAX extension records into a single logical
//! entry, which would lose the extension blocks' raw bytes. This module
//! reads the 512-byte header grammar directly instead, exactly as spec'd.

use std::io::{self, Read};

use crate::error::{Result, TarDiffError};

/// Tar header/data blocks are always padded to this size.
pub const BLOCK_SIZE: usize = 512;

/// Type byte for a plain regular file (both the modern `'0'` and the
/// legacy NUL value used by old archives).
pub const TYPEFLAG_REGULAR: u8 = b'0';
pub const TYPEFLAG_REGULAR_LEGACY: u8 = 0;
/// Type byte for a hardlink entry.
pub const TYPEFLAG_LINK: u8 = b'1';

/// A parsed view over one raw 512-byte tar header block.
pub struct RawHeader {
    pub bytes: [u8; BLOCK_SIZE],
}

impl RawHeader {
    /// Read one header block from `r`. Returns `Ok(None)` at a clean EOF
    /// (no bytes read at all), matching tar's "ran out of archive" case.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Option<Self>> {
        let mut bytes = [0u8; BLOCK_SIZE];
        let mut read_total = 0;
        while read_total < BLOCK_SIZE {
            let n = r.read(&mut bytes[read_total..])?;
            if n == 0 {
                break;
            }
            read_total += n;
        }
        if read_total == 0 {
            return Ok(None);
        }
        if read_total != BLOCK_SIZE {
            return Err(TarDiffError::UnexpectedEndOfInput(format!(
                "truncated tar header: read {} of {} bytes",
                read_total, BLOCK_SIZE
            )));
        }
        Ok(Some(Self { bytes }))
    }

    /// A header block of all zero bytes marks the end of the archive.
    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    pub fn typeflag(&self) -> u8 {
        self.bytes[156]
    }

    pub fn name(&self) -> Result<String> {
        parse_ascii_field(&self.bytes[0..100])
    }

    pub fn linkname(&self) -> Result<String> {
        parse_ascii_field(&self.bytes[157..257])
    }

    /// Payload size in bytes, per the POSIX octal field or the GNU
    /// base-256 extension used for files too large to fit in an octal field.
    pub fn size(&self) -> Result<u64> {
        parse_size_field(&self.bytes[124..136])
    }

    /// Number of 512-byte blocks (including padding) occupied by this
    /// entry's data region.
    pub fn data_blocks(&self) -> Result<u64> {
        let size = self.size()?;
        Ok(size.div_ceil(BLOCK_SIZE as u64))
    }
}

fn parse_ascii_field(field: &[u8]) -> Result<String> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    std::str::from_utf8(&field[..end])
        .map(|s| s.to_string())
        .map_err(|e| TarDiffError::MalformedTar(format!("non-utf8 tar field: {e}")))
}

fn parse_size_field(field: &[u8]) -> Result<u64> {
    if field[0] & 0x80 != 0 {
        // GNU base-256 encoding: high bit marks binary, remaining 95 bits
        // (we only use the low 64) are a big-endian magnitude.
        let mut value: u64 = 0;
        for &b in &field[1..] {
            value = (value << 8) | b as u64;
        }
        return Ok(value);
    }
    let text = parse_ascii_field(field)?;
    let trimmed = text.trim_matches(|c: char| c == ' ' || c == '\0');
    if trimmed.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(trimmed, 8)
        .map_err(|e| TarDiffError::MalformedTar(format!("invalid tar size field {trimmed:?}: {e}")))
}

/// Round a length up to the next 512-byte boundary and return the padding
/// byte count required to reach it.
pub fn padding_for(len: u64) -> u64 {
    let rem = len % BLOCK_SIZE as u64;
    if rem == 0 {
        0
    } else {
        BLOCK_SIZE as u64 - rem
    }
}

/// Copy exactly `count` bytes from `r` to `out`, treating a short read as
/// a fatal truncation.
pub fn copy_exact<R: Read>(r: &mut R, out: &mut Vec<u8>, count: u64) -> Result<()> {
    let mut remaining = count;
    let mut buf = [0u8; 65536];
    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = r.read(&mut buf[..want])?;
        if n == 0 {
            return Err(TarDiffError::UnexpectedEndOfInput(
                "stream ended while copying tar data region".to_string(),
            ));
        }
        out.extend_from_slice(&buf[..n]);
        remaining -= n as u64;
    }
    Ok(())
}

/// Skip exactly `count` bytes from `r`.
pub fn skip_exact<R: Read>(r: &mut R, count: u64) -> Result<()> {
    let mut remaining = count;
    let mut buf = [0u8; 65536];
    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = r.read(&mut buf[..want])?;
        if n == 0 {
            return Err(TarDiffError::UnexpectedEndOfInput(
                "stream ended while skipping tar data region".to_string(),
            ));
        }
        remaining -= n as u64;
    }
    Ok(())
}

/// Whether the first two bytes of a stream are the gzip magic number.
pub fn is_gzip_magic(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

/// Materialize a possibly gzip-compressed tar stream into a fully
/// decompressed, seekable temporary file. Returns the input untouched
/// (rewound to its start) when it is already a plain tar.
pub fn materialize_seekable<R: Read + io::Seek>(mut input: R) -> Result<std::fs::File> {
    let mut magic = [0u8; 2];
    let n = input.read(&mut magic)?;
    input.seek(io::SeekFrom::Start(0))?;

    if n == 2 && is_gzip_magic(&magic) {
        let mut decoder = flate2::read::GzDecoder::new(input);
        let mut tmp = tempfile::tempfile()?;
        io::copy(&mut decoder, &mut tmp)?;
        tmp.seek(io::SeekFrom::Start(0))?;
        Ok(tmp)
    } else {
        let mut tmp = tempfile::tempfile()?;
        io::copy(&mut input, &mut tmp)?;
        tmp.seek(io::SeekFrom::Start(0))?;
        Ok(tmp)
    }
}
