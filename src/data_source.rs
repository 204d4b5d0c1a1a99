//! Resolves an opcode's `source_index` (an old-archive entry index) to the
//! bytes of that entry's payload, for [`crate::opcode::Opcode::DataCopy`]
//! and [`crate::opcode::Opcode::DataBsdiff`].
//!
//! The only implementation needed here reads from the old archive's own
//! materialized, seekable tar stream — both the encoder (building bsdiff
//! payloads) and the applier (reconstructing `DataCopy`/`DataBsdiff`
//! entries) go through the same trait so a future source (e.g. reading
//! from an already-extracted directory tree) can be swapped in without
//! touching either driver.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{Result, TarDiffError};
use crate::scanner::ArchiveInfo;

/// Resolves old-archive entry indices to their content bytes.
pub trait DataSource {
    fn read(&mut self, source_index: u64) -> Result<Vec<u8>>;
}

/// Reads entry payloads directly out of the old archive's seekable tar
/// stream, using the old archive's [`ArchiveInfo`] for offsets and sizes.
pub struct FilesystemDataSource<'a, R> {
    stream: R,
    old: &'a ArchiveInfo,
}

impl<'a, R: Read + Seek> FilesystemDataSource<'a, R> {
    pub fn new(stream: R, old: &'a ArchiveInfo) -> Self {
        Self { stream, old }
    }
}

impl<'a, R: Read + Seek> DataSource for FilesystemDataSource<'a, R> {
    fn read(&mut self, source_index: u64) -> Result<Vec<u8>> {
        let index = usize::try_from(source_index).map_err(|_| {
            TarDiffError::DataSourceMiss {
                reference: source_index.to_string(),
                detail: "index does not fit in usize".to_string(),
            }
        })?;

        if index >= self.old.entries.len() {
            return Err(TarDiffError::DataSourceMiss {
                reference: source_index.to_string(),
                detail: "no such old-archive entry".to_string(),
            });
        }
        let file = match &self.old.entries[index] {
            crate::scanner::Entry::Regular(f) => f,
            _ => {
                return Err(TarDiffError::DataSourceMiss {
                    reference: source_index.to_string(),
                    detail: "old-archive entry is not a regular file".to_string(),
                })
            }
        };

        self.stream.seek(SeekFrom::Start(file.data_offset))?;
        let mut buf = vec![0u8; file.size as usize];
        self.stream.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                TarDiffError::DataSourceMiss {
                    reference: source_index.to_string(),
                    detail: "old archive is shorter than the recorded entry size".to_string(),
                }
            } else {
                e.into()
            }
        })?;
        Ok(buf)
    }
}
