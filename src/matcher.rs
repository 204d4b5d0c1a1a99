//! Matcher: picks a reconstruction strategy for each new-archive target,
//! in the priority order fixed by spec.md §4.3.

use crate::analysis::TargetInfo;
use crate::options::Options;
use crate::scanner::ArchiveInfo;

/// The chosen reconstruction strategy for one target entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Target is a hardlink; no content payload needed.
    Hardlink,
    /// Exact digest match against an old-archive entry.
    Copy { old_index: usize },
    /// No digest match, but a same-path old entry within the size cap.
    Bsdiff { old_index: usize },
    /// No usable old-archive candidate.
    Literal,
}

/// Decide the strategy for `target`, consulting both archives for sizes.
pub fn decide(target: &TargetInfo, old: &ArchiveInfo, new: &ArchiveInfo, options: &Options) -> Strategy {
    match target {
        TargetInfo::Hardlink { .. } => Strategy::Hardlink,
        TargetInfo::Regular {
            new_index,
            digest_candidates,
            path_candidate,
        } => {
            // Ties broken by smallest old index; by_digest preserves scan
            // (and therefore index) order, so the first candidate wins.
            if let Some(&old_index) = digest_candidates.first() {
                return Strategy::Copy { old_index };
            }

            if let Some(&old_index) = path_candidate.as_ref() {
                let new_size = new.file(*new_index).size;
                let old_size = old.file(old_index).size;
                if options.within_bsdiff_cap(new_size) && options.within_bsdiff_cap(old_size) {
                    return Strategy::Bsdiff { old_index };
                }
            }

            Strategy::Literal
        }
    }
}
