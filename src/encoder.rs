//! Encoder: walks the new archive's entries in original order and emits
//! the opcode stream that reconstructs it (spec.md §4.4), choosing each
//! regular file's strategy via [`crate::matcher::decide`].

use std::io::{Read, Seek, SeekFrom, Write};

use crate::analysis::DeltaAnalysis;
use crate::bsdiff;
use crate::data_source::DataSource;
use crate::error::Result;
use crate::matcher::{self, Strategy};
use crate::opcode::Opcode;
use crate::options::Options;
use crate::scanner::{ArchiveInfo, Entry};
use crate::tar_io;

/// Emit the opcode stream reconstructing `new_info`'s archive onto `out`.
/// `new_stream` must be seekable and positioned anywhere (each file
/// payload read seeks explicitly); `old_source` resolves copy/bsdiff
/// references against the old archive.
pub fn diff<N: Read + Seek, W: Write>(
    new_stream: &mut N,
    new_info: &ArchiveInfo,
    old_info: &ArchiveInfo,
    old_source: &mut dyn DataSource,
    analysis: &DeltaAnalysis,
    options: &Options,
    out: &mut W,
) -> Result<()> {
    for entry in &new_info.entries {
        match entry {
            Entry::Other(o) => {
                Opcode::Header(o.raw.clone()).write(out)?;
            }
            Entry::Hardlink(h) => {
                Opcode::Header(h.header.to_vec()).write(out)?;
            }
            Entry::Regular(f) => {
                Opcode::Header(f.header.to_vec()).write(out)?;

                let target = analysis
                    .target_info_by_index
                    .get(&f.index)
                    .expect("every regular file has an analysis entry");
                let strategy = matcher::decide(target, old_info, new_info, options);

                match strategy {
                    Strategy::Hardlink => {
                        unreachable!("a regular file never resolves to Strategy::Hardlink")
                    }
                    Strategy::Copy { old_index } => {
                        Opcode::DataCopy {
                            source_index: old_index as u64,
                            length: f.size,
                        }
                        .write(out)?;
                    }
                    Strategy::Bsdiff { old_index } => {
                        let old_bytes = old_source.read(old_index as u64)?;
                        let new_bytes = read_payload(new_stream, f.data_offset, f.size)?;
                        let payload = bsdiff::generate(&old_bytes, &new_bytes);
                        Opcode::DataBsdiff {
                            source_index: old_index as u64,
                            new_length: f.size,
                            payload: payload.encode(),
                        }
                        .write(out)?;
                    }
                    Strategy::Literal => {
                        let new_bytes = read_payload(new_stream, f.data_offset, f.size)?;
                        Opcode::DataLiteral(new_bytes).write(out)?;
                    }
                }

                let padding = tar_io::padding_for(f.size);
                if padding > 0 {
                    Opcode::Pad(padding).write(out)?;
                }
            }
        }
    }

    if !new_info.trailer.is_empty() {
        Opcode::Header(new_info.trailer.clone()).write(out)?;
    }
    Opcode::End.write(out)?;
    Ok(())
}

fn read_payload<N: Read + Seek>(stream: &mut N, offset: u64, size: u64) -> Result<Vec<u8>> {
    stream.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; size as usize];
    stream.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::data_source::FilesystemDataSource;
    use crate::scanner::scan;
    use std::io::Cursor;

    fn build_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_path(name).unwrap();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_entry_type(tar::EntryType::Regular);
            header.set_cksum();
            builder.append(&header, *data).unwrap();
        }
        builder.finish().unwrap();
        builder.into_inner().unwrap()
    }

    fn read_all_opcodes(bytes: &[u8]) -> Vec<Opcode> {
        let mut cursor = Cursor::new(bytes.to_vec());
        let mut ops = Vec::new();
        while let Some(op) = Opcode::read(&mut cursor).unwrap() {
            let is_end = op == Opcode::End;
            ops.push(op);
            if is_end {
                break;
            }
        }
        ops
    }

    #[test]
    fn test_identical_file_becomes_data_copy() {
        let old_bytes = build_tar(&[("file.txt", b"same content")]);
        let new_bytes = build_tar(&[("file.txt", b"same content")]);

        let old_info = scan(&mut Cursor::new(old_bytes.clone())).unwrap();
        let new_info = scan(&mut Cursor::new(new_bytes.clone())).unwrap();
        let analysis = analyze(&old_info, &new_info);
        let options = Options::default();

        let mut old_source = FilesystemDataSource::new(Cursor::new(old_bytes), &old_info);
        let mut new_stream = Cursor::new(new_bytes);
        let mut out = Vec::new();
        diff(&mut new_stream, &new_info, &old_info, &mut old_source, &analysis, &options, &mut out).unwrap();

        let ops = read_all_opcodes(&out);
        assert!(ops.iter().any(|op| matches!(op, Opcode::DataCopy { .. })));
        assert_eq!(ops.last(), Some(&Opcode::End));
    }

    #[test]
    fn test_modified_same_path_file_becomes_bsdiff() {
        let old_bytes = build_tar(&[("file.txt", b"the quick brown fox jumps over the lazy dog")]);
        let new_bytes = build_tar(&[("file.txt", b"the quick brown fox leaps over the lazy dog today")]);

        let old_info = scan(&mut Cursor::new(old_bytes.clone())).unwrap();
        let new_info = scan(&mut Cursor::new(new_bytes.clone())).unwrap();
        let analysis = analyze(&old_info, &new_info);
        let options = Options::default();

        let mut old_source = FilesystemDataSource::new(Cursor::new(old_bytes), &old_info);
        let mut new_stream = Cursor::new(new_bytes);
        let mut out = Vec::new();
        diff(&mut new_stream, &new_info, &old_info, &mut old_source, &analysis, &options, &mut out).unwrap();

        let ops = read_all_opcodes(&out);
        assert!(ops.iter().any(|op| matches!(op, Opcode::DataBsdiff { .. })));
    }

    #[test]
    fn test_brand_new_file_becomes_literal() {
        let old_bytes = build_tar(&[]);
        let new_bytes = build_tar(&[("new.txt", b"nothing like this existed before")]);

        let old_info = scan(&mut Cursor::new(old_bytes.clone())).unwrap();
        let new_info = scan(&mut Cursor::new(new_bytes.clone())).unwrap();
        let analysis = analyze(&old_info, &new_info);
        let options = Options::default();

        let mut old_source = FilesystemDataSource::new(Cursor::new(old_bytes), &old_info);
        let mut new_stream = Cursor::new(new_bytes);
        let mut out = Vec::new();
        diff(&mut new_stream, &new_info, &old_info, &mut old_source, &analysis, &options, &mut out).unwrap();

        let ops = read_all_opcodes(&out);
        assert!(ops
            .iter()
            .any(|op| matches!(op, Opcode::DataLiteral(bytes) if bytes == b"nothing like this existed before")));
    }
}
