//! Applier: the "expect op" state machine that consumes an opcode stream
//! and reconstructs the new archive byte-for-byte (spec.md §4.5).

use std::io::{Read, Write};

use crate::bsdiff;
use crate::data_source::DataSource;
use crate::error::{Result, TarDiffError};
use crate::opcode::Opcode;

/// Apply a decoded opcode stream (as produced by [`crate::envelope::open_reader`])
/// to `out`, resolving `DataCopy`/`DataBsdiff` references through `source`.
/// Stops at the first `End` opcode and rejects any trailing data after it.
pub fn apply<R: Read, W: Write>(opcodes: &mut R, source: &mut dyn DataSource, out: &mut W) -> Result<()> {
    loop {
        let op = Opcode::read(opcodes)?.ok_or_else(|| {
            TarDiffError::UnexpectedEndOfInput("opcode stream ended without an End opcode".to_string())
        })?;

        match op {
            Opcode::Header(bytes) => out.write_all(&bytes)?,
            Opcode::DataLiteral(bytes) => out.write_all(&bytes)?,
            Opcode::DataCopy { source_index, length } => {
                let bytes = source.read(source_index)?;
                if bytes.len() as u64 != length {
                    return Err(TarDiffError::DataSourceMiss {
                        reference: source_index.to_string(),
                        detail: format!("expected {length} bytes, source has {}", bytes.len()),
                    });
                }
                out.write_all(&bytes)?;
            }
            Opcode::DataBsdiff {
                source_index,
                new_length,
                payload,
            } => {
                let old_bytes = source.read(source_index)?;
                let decoded = bsdiff::Payload::decode(&payload)?;
                let reconstructed = bsdiff::apply(&old_bytes, &decoded, new_length)?;
                out.write_all(&reconstructed)?;
            }
            Opcode::Pad(count) => {
                out.write_all(&vec![0u8; count as usize])?;
            }
            Opcode::End => break,
        }
    }

    if Opcode::read(opcodes)?.is_some() {
        return Err(TarDiffError::MalformedTar(
            "opcode stream continues after its End opcode".to_string(),
        ));
    }

    Ok(())
}
