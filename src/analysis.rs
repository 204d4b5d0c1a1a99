//! Delta analysis: pairs an old archive's [`ArchiveInfo`] with a new
//! archive's, producing `target_info_by_index` — one entry per regular
//! file and hardlink of the new archive, carrying the candidate old-archive
//! references the matcher will choose between.

use std::collections::BTreeMap;

use crate::scanner::{ArchiveInfo, Entry};

/// What a new-archive target entry is, and which old-archive entries are
/// candidate sources for it.
pub enum TargetInfo {
    Regular {
        new_index: usize,
        /// Old-archive entry indices sharing this target's content digest,
        /// in old-archive order (stable tie-break: smallest index first).
        digest_candidates: Vec<usize>,
        /// Old-archive entry index sharing this target's path, if any —
        /// the bsdiff candidate.
        path_candidate: Option<usize>,
    },
    Hardlink {
        new_index: usize,
    },
}

impl TargetInfo {
    pub fn new_index(&self) -> usize {
        match self {
            TargetInfo::Regular { new_index, .. } => *new_index,
            TargetInfo::Hardlink { new_index } => *new_index,
        }
    }
}

/// The result of pairing an old and new archive's info.
pub struct DeltaAnalysis {
    pub target_info_by_index: BTreeMap<usize, TargetInfo>,
}

/// Build the delta analysis for `old` -> `new`.
pub fn analyze(old: &ArchiveInfo, new: &ArchiveInfo) -> DeltaAnalysis {
    let mut target_info_by_index = BTreeMap::new();

    for &new_index in &new.files {
        let file = new.file(new_index);

        let digest_candidates = old
            .by_digest
            .get(&file.digest)
            .cloned()
            .unwrap_or_default();

        let path_candidate = old.by_path.get(&file.path).copied();

        target_info_by_index.insert(
            new_index,
            TargetInfo::Regular {
                new_index,
                digest_candidates,
                path_candidate,
            },
        );
    }

    for &new_index in &new.hardlinks {
        target_info_by_index.insert(new_index, TargetInfo::Hardlink { new_index });
    }

    // Sanity: every regular file and hardlink entry of `new` must appear.
    debug_assert_eq!(
        target_info_by_index.len(),
        new.files.len() + new.hardlinks.len()
    );
    debug_assert!(new.entries.iter().all(|e| match e {
        Entry::Other(_) => !target_info_by_index.contains_key(&e.index()),
        _ => target_info_by_index.contains_key(&e.index()),
    }));

    DeltaAnalysis { target_info_by_index }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;
    use std::io::Cursor;

    fn build_tar(entries: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, linkname, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_path(name).unwrap();
            header.set_mode(0o644);
            if let Some(link) = linkname {
                header.set_entry_type(tar::EntryType::Link);
                header.set_link_name(link).unwrap();
                header.set_size(0);
                header.set_cksum();
                builder.append(&header, std::io::empty()).unwrap();
            } else {
                header.set_size(data.len() as u64);
                header.set_entry_type(tar::EntryType::Regular);
                header.set_cksum();
                builder.append(&header, *data).unwrap();
            }
        }
        builder.finish().unwrap();
        builder.into_inner().unwrap()
    }

    #[test]
    fn test_hardlink_in_target_info() {
        let new_bytes = build_tar(&[("file.txt", None, b"content"), ("link.txt", Some("file.txt"), b"")]);
        let old_bytes = build_tar(&[]);

        let new_info = scan(&mut Cursor::new(new_bytes)).unwrap();
        let old_info = scan(&mut Cursor::new(old_bytes)).unwrap();

        let analysis = analyze(&old_info, &new_info);
        let hl_info = analysis.target_info_by_index.get(&1).expect("hardlink at index 1");
        assert!(matches!(hl_info, TargetInfo::Hardlink { .. }));
    }

    #[test]
    fn test_only_new_archive_entries_present() {
        let new_bytes = build_tar(&[
            ("file.txt", None, b"first"),
            ("file.txt", None, b"second"),
            ("link1.txt", Some("file.txt"), b""),
            ("link2.txt", Some("file.txt"), b""),
        ]);
        let old_bytes = build_tar(&[("file2.txt", None, b"third"), ("link3", Some("file2.txt"), b"")]);

        let new_info = scan(&mut Cursor::new(new_bytes)).unwrap();
        let old_info = scan(&mut Cursor::new(old_bytes)).unwrap();

        let analysis = analyze(&old_info, &new_info);
        assert_eq!(
            analysis.target_info_by_index.len(),
            new_info.files.len() + new_info.hardlinks.len()
        );
        for i in 0..4 {
            assert!(analysis.target_info_by_index.contains_key(&i));
        }
    }

    #[test]
    fn test_digest_candidate_found_across_archives() {
        let new_bytes = build_tar(&[("b.txt", None, b"shared")]);
        let old_bytes = build_tar(&[("a.txt", None, b"shared")]);

        let new_info = scan(&mut Cursor::new(new_bytes)).unwrap();
        let old_info = scan(&mut Cursor::new(old_bytes)).unwrap();

        let analysis = analyze(&old_info, &new_info);
        match analysis.target_info_by_index.get(&0).unwrap() {
            TargetInfo::Regular { digest_candidates, .. } => assert_eq!(digest_candidates, &vec![0]),
            _ => panic!("expected regular target"),
        }
    }
}
