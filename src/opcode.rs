//! The opcode stream: the typed instruction sequence that drives tar
//! reconstruction on the apply side. Tag bytes and integer encoding are an
//! implementation choice (spec.md §4.4, §9 Open Question); this module
//! fixes them and keeps them stable behind the envelope's version byte.
//!
//! `HEADER`'s payload is reused for any verbatim byte span that needs no
//! content matching: a single 512-byte header, a non-regular entry's
//! header+data+padding captured as one unit by the scanner, or the
//! archive's trailing end-of-archive padding. All of these are "tar
//! skeleton" in spec.md's terms, never matched against old content.

use std::io::{Read, Write};

use crate::error::{Result, TarDiffError};
use crate::varint;

const TAG_HEADER: u8 = 0x01;
const TAG_DATA_LITERAL: u8 = 0x02;
const TAG_DATA_COPY: u8 = 0x03;
const TAG_DATA_BSDIFF: u8 = 0x04;
const TAG_PAD: u8 = 0x05;
const TAG_END: u8 = 0x06;

/// One instruction in the opcode stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opcode {
    /// Emit these bytes verbatim into the output tar.
    Header(Vec<u8>),
    /// Emit these bytes as a file payload.
    DataLiteral(Vec<u8>),
    /// Emit `length` bytes read from the old archive at `source_index`.
    DataCopy { source_index: u64, length: u64 },
    /// Reconstruct `new_length` bytes by applying `payload` (an encoded
    /// bsdiff control/diff/extra triple) to the old entry at `source_index`.
    DataBsdiff {
        source_index: u64,
        new_length: u64,
        payload: Vec<u8>,
    },
    /// Emit `count` zero bytes (tar block padding).
    Pad(u64),
    /// Terminate the opcode stream.
    End,
}

impl Opcode {
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        match self {
            Opcode::Header(bytes) => {
                w.write_all(&[TAG_HEADER])?;
                varint::write_u64(w, bytes.len() as u64)?;
                w.write_all(bytes)?;
            }
            Opcode::DataLiteral(bytes) => {
                w.write_all(&[TAG_DATA_LITERAL])?;
                varint::write_u64(w, bytes.len() as u64)?;
                w.write_all(bytes)?;
            }
            Opcode::DataCopy { source_index, length } => {
                w.write_all(&[TAG_DATA_COPY])?;
                varint::write_u64(w, *source_index)?;
                varint::write_u64(w, *length)?;
            }
            Opcode::DataBsdiff {
                source_index,
                new_length,
                payload,
            } => {
                w.write_all(&[TAG_DATA_BSDIFF])?;
                varint::write_u64(w, *source_index)?;
                varint::write_u64(w, *new_length)?;
                varint::write_u64(w, payload.len() as u64)?;
                w.write_all(payload)?;
            }
            Opcode::Pad(count) => {
                w.write_all(&[TAG_PAD])?;
                varint::write_u64(w, *count)?;
            }
            Opcode::End => {
                w.write_all(&[TAG_END])?;
            }
        }
        Ok(())
    }

    /// Read the next opcode. Returns `Ok(None)` only at a clean EOF before
    /// any tag byte was read (the stream should always be closed with an
    /// explicit `End`; this is for defensive handling of short streams).
    pub fn read<R: Read>(r: &mut R) -> Result<Option<Opcode>> {
        let mut tag = [0u8; 1];
        let n = read_fill(r, &mut tag)?;
        if n == 0 {
            return Ok(None);
        }

        let op = match tag[0] {
            TAG_HEADER => Opcode::Header(read_length_prefixed(r)?),
            TAG_DATA_LITERAL => Opcode::DataLiteral(read_length_prefixed(r)?),
            TAG_DATA_COPY => {
                let source_index = varint::read_u64(r)?;
                let length = varint::read_u64(r)?;
                Opcode::DataCopy { source_index, length }
            }
            TAG_DATA_BSDIFF => {
                let source_index = varint::read_u64(r)?;
                let new_length = varint::read_u64(r)?;
                let payload = read_length_prefixed(r)?;
                Opcode::DataBsdiff {
                    source_index,
                    new_length,
                    payload,
                }
            }
            TAG_PAD => Opcode::Pad(varint::read_u64(r)?),
            TAG_END => Opcode::End,
            other => return Err(TarDiffError::UnknownOpcode(other)),
        };
        Ok(Some(op))
    }
}

fn read_length_prefixed<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let len = varint::read_u64(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Like `Read::read_exact` but treats a zero-byte read at the very start as
/// EOF instead of an error, so callers can tell "no more opcodes" apart
/// from "stream ended mid-opcode".
fn read_fill<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<usize> {
    match r.read(buf) {
        Ok(0) => Ok(0),
        Ok(n) if n == buf.len() => Ok(n),
        Ok(n) => {
            r.read_exact(&mut buf[n..])?;
            Ok(buf.len())
        }
        Err(e) => Err(e.into()),
    }
}
