//! Tar scanner: iterates the 512-byte header grammar of a tar stream and
//! builds an immutable [`ArchiveInfo`] summary (entries, content digest
//! index, path index).

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};

use sha2::{Digest, Sha256};

use crate::error::{Result, TarDiffError};
use crate::tar_io::{self, RawHeader, BLOCK_SIZE, TYPEFLAG_LINK, TYPEFLAG_REGULAR, TYPEFLAG_REGULAR_LEGACY};

/// A regular file entry: the unit of content matching.
#[derive(Debug, Clone)]
pub struct RegularFile {
    pub index: usize,
    pub path: String,
    pub header: [u8; BLOCK_SIZE],
    pub size: u64,
    pub data_offset: u64,
    pub digest: [u8; 32],
}

/// A hardlink entry, resolved against `by_path` at match time.
#[derive(Debug, Clone)]
pub struct Hardlink {
    pub index: usize,
    pub path: String,
    pub linkname: String,
    pub header: [u8; BLOCK_SIZE],
}

/// Everything that is not a regular file or a resolvable hardlink:
/// directories, symlinks, devices, GNU long-name/PAX extension records.
/// Captured as opaque, verbatim bytes (header plus any data region and its
/// padding) so it can be replayed exactly.
#[derive(Debug, Clone)]
pub struct OtherEntry {
    pub index: usize,
    pub raw: Vec<u8>,
}

/// One archive entry in original-archive order.
#[derive(Debug, Clone)]
pub enum Entry {
    Regular(RegularFile),
    Hardlink(Hardlink),
    Other(OtherEntry),
}

impl Entry {
    pub fn index(&self) -> usize {
        match self {
            Entry::Regular(f) => f.index,
            Entry::Hardlink(h) => h.index,
            Entry::Other(o) => o.index,
        }
    }
}

/// Immutable summary of one scanned tar archive.
#[derive(Debug, Default)]
pub struct ArchiveInfo {
    /// All entries, dense and in original archive order.
    pub entries: Vec<Entry>,
    /// Indices into `entries` that are regular files, in order.
    pub files: Vec<usize>,
    /// Indices into `entries` that are hardlinks, in order.
    pub hardlinks: Vec<usize>,
    /// Content digest -> indices into `entries` sharing that digest, order preserved.
    pub by_digest: HashMap<[u8; 32], Vec<usize>>,
    /// Path -> index into `entries` of the *last* regular file with that path.
    pub by_path: HashMap<String, usize>,
    /// Trailing end-of-archive padding, captured verbatim.
    pub trailer: Vec<u8>,
}

impl ArchiveInfo {
    pub fn file(&self, entry_index: usize) -> &RegularFile {
        match &self.entries[entry_index] {
            Entry::Regular(f) => f,
            _ => panic!("entry {entry_index} is not a regular file"),
        }
    }

    pub fn hardlink(&self, entry_index: usize) -> &Hardlink {
        match &self.entries[entry_index] {
            Entry::Hardlink(h) => h,
            _ => panic!("entry {entry_index} is not a hardlink"),
        }
    }

    /// First candidate (stable, smallest index) sharing `digest`, if any.
    pub fn first_by_digest(&self, digest: &[u8; 32]) -> Option<&RegularFile> {
        self.by_digest
            .get(digest)
            .and_then(|indices| indices.first())
            .map(|&idx| self.file(idx))
    }

    /// The regular file resolved by path (last-definition-wins), if any.
    pub fn by_path(&self, path: &str) -> Option<&RegularFile> {
        self.by_path.get(path).map(|&idx| self.file(idx))
    }
}

/// Scan a seekable tar stream, producing its [`ArchiveInfo`].
///
/// `stream` must already be positioned at the start of the archive. Fatal
/// on truncated archives or malformed headers; unknown type bytes are
/// tolerated and preserved as [`Entry::Other`].
pub fn scan<R: Read + Seek>(stream: &mut R) -> Result<ArchiveInfo> {
    let mut info = ArchiveInfo::default();
    let mut index = 0usize;

    loop {
        let header_pos = stream.stream_position()?;
        let header = match RawHeader::read_from(stream)? {
            Some(h) => h,
            None => break,
        };

        if header.is_zero() {
            // End-of-archive marker: capture everything from here to EOF
            // verbatim (normally 1024 zero bytes) so it round-trips exactly.
            stream.seek(SeekFrom::Start(header_pos))?;
            let mut trailer = Vec::new();
            stream.read_to_end(&mut trailer)?;
            info.trailer = trailer;
            break;
        }

        let typeflag = header.typeflag();
        let size = header.size()?;

        match typeflag {
            TYPEFLAG_REGULAR | TYPEFLAG_REGULAR_LEGACY => {
                let path = header.name()?;
                let data_offset = stream.stream_position()?;

                let mut hasher = Sha256::new();
                let mut remaining = size;
                let mut buf = [0u8; 65536];
                while remaining > 0 {
                    let want = remaining.min(buf.len() as u64) as usize;
                    let n = stream.read(&mut buf[..want])?;
                    if n == 0 {
                        return Err(TarDiffError::UnexpectedEndOfInput(format!(
                            "truncated payload for {path}"
                        )));
                    }
                    hasher.update(&buf[..n]);
                    remaining -= n as u64;
                }
                let digest: [u8; 32] = hasher.finalize().into();

                let padding = tar_io::padding_for(size);
                tar_io::skip_exact(stream, padding)?;

                let entry = RegularFile {
                    index,
                    path: path.clone(),
                    header: header.bytes,
                    size,
                    data_offset,
                    digest,
                };

                info.files.push(index);
                info.by_digest.entry(digest).or_default().push(index);
                info.by_path.insert(path, index);
                info.entries.push(Entry::Regular(entry));
            }
            TYPEFLAG_LINK => {
                let path = header.name()?;
                let linkname = header.linkname()?;
                // Hardlink entries carry no data region per the tar format.
                let entry = Hardlink {
                    index,
                    path,
                    linkname,
                    header: header.bytes,
                };
                info.hardlinks.push(index);
                info.entries.push(Entry::Hardlink(entry));
            }
            _ => {
                let mut raw = Vec::with_capacity(BLOCK_SIZE);
                raw.extend_from_slice(&header.bytes);
                let padded = size + tar_io::padding_for(size);
                tar_io::copy_exact(stream, &mut raw, padded)?;
                info.entries.push(Entry::Other(OtherEntry { index, raw }));
            }
        }

        index += 1;
    }

    reclassify_dangling_hardlinks(&mut info);

    Ok(info)
}

/// Hardlinks whose `linkname` does not resolve to a regular file present in
/// this same archive cannot be matched at patch time, so they are demoted to
/// [`Entry::Other`] and carried through verbatim instead.
fn reclassify_dangling_hardlinks(info: &mut ArchiveInfo) {
    let dangling: Vec<usize> = info
        .hardlinks
        .iter()
        .copied()
        .filter(|&idx| {
            let linkname = match &info.entries[idx] {
                Entry::Hardlink(h) => &h.linkname,
                _ => unreachable!("hardlinks index only ever points at Entry::Hardlink"),
            };
            info.by_path.get(linkname).is_none()
        })
        .collect();

    if dangling.is_empty() {
        return;
    }

    info.hardlinks.retain(|idx| !dangling.contains(idx));
    for idx in dangling {
        let header = match &info.entries[idx] {
            Entry::Hardlink(h) => h.header,
            _ => unreachable!("hardlinks index only ever points at Entry::Hardlink"),
        };
        info.entries[idx] = Entry::Other(OtherEntry {
            index: idx,
            raw: header.to_vec(),
        });
    }
}
