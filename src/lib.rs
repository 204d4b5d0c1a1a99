//! Binary delta generation and application between tar archives.
//!
//! Two entry points cover the whole library: [`generate_delta`] scans an
//! old and new tar archive and writes a compressed opcode stream
//! describing how to reconstruct the new one; [`apply_delta`] reads that
//! stream back against the old archive and reconstructs the new one
//! byte-for-byte. The modules below implement each stage of that pipeline
//! and are public so callers needing finer control (custom data sources,
//! inspecting the analysis before choosing strategies) can assemble it
//! themselves.

pub mod analysis;
pub mod applier;
pub mod bsdiff;
pub mod cli;
pub mod data_source;
pub mod encoder;
pub mod envelope;
pub mod error;
pub mod matcher;
pub mod opcode;
pub mod options;
pub mod scanner;
pub mod tar_io;
pub mod varint;

pub use error::{Result, TarDiffError};
pub use options::Options;

use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

/// Scan `old_tar_path` and `new_tar_path` (each optionally gzip-compressed)
/// and write the compressed delta file describing how to reconstruct the
/// new archive from the old one to `out`.
pub fn generate_delta<W: Write>(
    old_tar_path: &Path,
    new_tar_path: &Path,
    options: &Options,
    out: W,
) -> Result<()> {
    options.validate()?;

    tracing::info!(old = %old_tar_path.display(), new = %new_tar_path.display(), "scanning archives");
    let mut old_stream = tar_io::materialize_seekable(File::open(old_tar_path)?)?;
    let mut new_stream = tar_io::materialize_seekable(File::open(new_tar_path)?)?;

    let old_info = scanner::scan(&mut old_stream)?;
    let new_info = scanner::scan(&mut new_stream)?;
    tracing::debug!(
        old_entries = old_info.entries.len(),
        new_entries = new_info.entries.len(),
        "scan complete"
    );

    let delta_analysis = analysis::analyze(&old_info, &new_info);
    let mut old_source = data_source::FilesystemDataSource::new(old_stream, &old_info);

    let mut envelope_out = envelope::open_writer(out, options)?;
    encoder::diff(
        &mut new_stream,
        &new_info,
        &old_info,
        &mut old_source,
        &delta_analysis,
        options,
        &mut envelope_out,
    )?;
    envelope_out.finish()?;
    Ok(())
}

/// Read a delta file from `delta_in` and reconstruct the new archive
/// against `old_tar_path` (optionally gzip-compressed), writing the
/// reconstructed tar stream to `out`.
pub fn apply_delta<R: Read, W: Write>(delta_in: R, old_tar_path: &Path, mut out: W) -> Result<()> {
    let mut opcodes = envelope::open_reader(delta_in)?;

    let mut old_stream = tar_io::materialize_seekable(File::open(old_tar_path)?)?;
    let old_info = scanner::scan(&mut old_stream)?;
    let mut old_source = data_source::FilesystemDataSource::new(old_stream, &old_info);

    applier::apply(&mut opcodes, &mut old_source, &mut out)
}
