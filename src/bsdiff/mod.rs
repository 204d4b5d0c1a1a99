//! Classic bsdiff subcodec (spec.md §4.7): a three-substream control/diff/
//! extra delta between one old-entry payload and one new-entry payload.
//!
//! Reconstruction applies, for each control triple `(add_len, copy_len,
//! seek)` in order: `add_len` bytes of `diff` added byte-wise to the source
//! at the current cursor (consuming `add_len` bytes of `diff` and advancing
//! the cursor by `add_len`), then `copy_len` bytes taken verbatim from the
//! next unconsumed span of `extra`, then the cursor seeks by the signed
//! `seek`. This matches the textbook bsdiff/bspatch control loop.
//!
//! `generate` does not attempt Colin Percival's full approximate-match
//! scoring; it finds exact longest matches via a suffix array and folds any
//! unmatched span into `add_len` against whatever the old cursor currently
//! points at, falling back to `copy_len` once old content runs out. Simpler
//! and non-optimal, which spec.md explicitly allows.

mod suffix;

use crate::error::{Result, TarDiffError};
use crate::varint;

const MIN_MATCH_LEN: usize = 8;

/// One decoded bsdiff payload: the three substreams plus the control triples
/// tying them together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// `(add_len, copy_len, seek)` triples, applied in order.
    pub control: Vec<(u64, u64, i64)>,
    pub diff: Vec<u8>,
    pub extra: Vec<u8>,
}

impl Payload {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        varint::write_u64(&mut buf, self.control.len() as u64).expect("writing to Vec cannot fail");
        for &(add_len, copy_len, seek) in &self.control {
            varint::write_u64(&mut buf, add_len).expect("writing to Vec cannot fail");
            varint::write_u64(&mut buf, copy_len).expect("writing to Vec cannot fail");
            varint::write_i64(&mut buf, seek).expect("writing to Vec cannot fail");
        }
        varint::write_u64(&mut buf, self.diff.len() as u64).expect("writing to Vec cannot fail");
        buf.extend_from_slice(&self.diff);
        varint::write_u64(&mut buf, self.extra.len() as u64).expect("writing to Vec cannot fail");
        buf.extend_from_slice(&self.extra);
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Payload> {
        let mut cursor = std::io::Cursor::new(bytes);
        let n = varint::read_u64(&mut cursor)? as usize;
        let mut control = Vec::with_capacity(n);
        for _ in 0..n {
            let add_len = varint::read_u64(&mut cursor)?;
            let copy_len = varint::read_u64(&mut cursor)?;
            let seek = varint::read_i64(&mut cursor)?;
            control.push((add_len, copy_len, seek));
        }
        let diff_len = varint::read_u64(&mut cursor)? as usize;
        let mut diff = vec![0u8; diff_len];
        std::io::Read::read_exact(&mut cursor, &mut diff)
            .map_err(|_| TarDiffError::BsdiffFailure("truncated diff substream".to_string()))?;
        let extra_len = varint::read_u64(&mut cursor)? as usize;
        let mut extra = vec![0u8; extra_len];
        std::io::Read::read_exact(&mut cursor, &mut extra)
            .map_err(|_| TarDiffError::BsdiffFailure("truncated extra substream".to_string()))?;
        Ok(Payload { control, diff, extra })
    }
}

/// Compute a bsdiff [`Payload`] reconstructing `new` from `old`.
pub fn generate(old: &[u8], new: &[u8]) -> Payload {
    let sa = suffix::build_suffix_array(old);
    let mut control = Vec::new();
    let mut diff = Vec::new();
    let mut extra = Vec::new();

    let mut scan = 0usize;
    let mut cursor = 0i64;

    while scan < new.len() {
        let (match_pos, match_len) = suffix::longest_match(old, &sa, &new[scan..]);

        if match_len < MIN_MATCH_LEN {
            // No further usable match: drain the rest of `new`, folding as
            // much as possible into `add` against whatever old content sits
            // at the cursor, and the remainder into `extra`.
            let remaining = new.len() - scan;
            let add_len = (old.len() as i64 - cursor).max(0).min(remaining as i64) as usize;
            let extra_len = remaining - add_len;

            for i in 0..add_len {
                let old_byte = old[cursor as usize + i];
                let new_byte = new[scan + i];
                diff.push(new_byte.wrapping_sub(old_byte));
            }
            extra.extend_from_slice(&new[scan + add_len..scan + add_len + extra_len]);
            control.push((add_len as u64, extra_len as u64, 0));

            cursor += add_len as i64;
            scan = new.len();
            break;
        }

        let seek_needed = match_pos as i64 - cursor;
        if seek_needed != 0 {
            control.push((0, 0, seek_needed));
            cursor += seek_needed;
        }

        control.push((match_len as u64, 0, 0));
        diff.extend(std::iter::repeat(0u8).take(match_len));
        cursor += match_len as i64;
        scan += match_len;
    }

    if control.is_empty() {
        // `new` is empty: a single no-op triple gives the patch side a
        // well-defined (empty) control stream to iterate.
        control.push((0, 0, 0));
    }

    Payload { control, diff, extra }
}

/// Apply `payload` to `old`, reconstructing the new-entry payload.
pub fn apply(old: &[u8], payload: &Payload, expected_len: u64) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len as usize);
    let mut cursor: i64 = 0;
    let mut diff_pos = 0usize;
    let mut extra_pos = 0usize;

    for &(add_len, copy_len, seek) in &payload.control {
        let add_len = add_len as usize;
        let copy_len = copy_len as usize;

        if add_len > 0 {
            let start = usize::try_from(cursor)
                .map_err(|_| TarDiffError::BsdiffFailure(format!("negative source cursor {cursor}")))?;
            let end = start
                .checked_add(add_len)
                .ok_or_else(|| TarDiffError::BsdiffFailure("add length overflow".to_string()))?;
            if end > old.len() {
                return Err(TarDiffError::BsdiffFailure(format!(
                    "add region [{start}, {end}) exceeds old payload of {} bytes",
                    old.len()
                )));
            }
            let diff_end = diff_pos.checked_add(add_len).ok_or_else(|| {
                TarDiffError::BsdiffFailure("diff substream length overflow".to_string())
            })?;
            if diff_end > payload.diff.len() {
                return Err(TarDiffError::BsdiffFailure("diff substream exhausted".to_string()));
            }
            for i in 0..add_len {
                out.push(old[start + i].wrapping_add(payload.diff[diff_pos + i]));
            }
            diff_pos = diff_end;
            cursor += add_len as i64;
        }

        if copy_len > 0 {
            let extra_end = extra_pos.checked_add(copy_len).ok_or_else(|| {
                TarDiffError::BsdiffFailure("extra substream length overflow".to_string())
            })?;
            if extra_end > payload.extra.len() {
                return Err(TarDiffError::BsdiffFailure("extra substream exhausted".to_string()));
            }
            out.extend_from_slice(&payload.extra[extra_pos..extra_end]);
            extra_pos = extra_end;
        }

        cursor += seek;
    }

    if out.len() as u64 != expected_len {
        return Err(TarDiffError::BsdiffFailure(format!(
            "reconstructed {} bytes, expected {expected_len}",
            out.len()
        )));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_similar_content() {
        let old = b"the quick brown fox jumps over the lazy dog".to_vec();
        let new = b"the quick brown fox leaps over the lazy dog and runs away".to_vec();
        let payload = generate(&old, &new);
        let reconstructed = apply(&old, &payload, new.len() as u64).unwrap();
        assert_eq!(reconstructed, new);
    }

    #[test]
    fn test_roundtrip_identical_content() {
        let old = b"identical payload bytes go here".to_vec();
        let new = old.clone();
        let payload = generate(&old, &new);
        let reconstructed = apply(&old, &payload, new.len() as u64).unwrap();
        assert_eq!(reconstructed, new);
        // Every byte matched, so the diff substream is all zero and extra is empty.
        assert!(payload.diff.iter().all(|&b| b == 0));
        assert!(payload.extra.is_empty());
    }

    #[test]
    fn test_roundtrip_wholly_unrelated_content() {
        let old = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_vec();
        let new = b"the entire replacement content is unrelated to the source".to_vec();
        let payload = generate(&old, &new);
        let reconstructed = apply(&old, &payload, new.len() as u64).unwrap();
        assert_eq!(reconstructed, new);
    }

    #[test]
    fn test_roundtrip_empty_new() {
        let old = b"some old content".to_vec();
        let new: Vec<u8> = Vec::new();
        let payload = generate(&old, &new);
        let reconstructed = apply(&old, &payload, 0).unwrap();
        assert_eq!(reconstructed, new);
    }

    #[test]
    fn test_roundtrip_empty_old() {
        let old: Vec<u8> = Vec::new();
        let new = b"brand new content with no prior source".to_vec();
        let payload = generate(&old, &new);
        let reconstructed = apply(&old, &payload, new.len() as u64).unwrap();
        assert_eq!(reconstructed, new);
    }

    #[test]
    fn test_payload_encode_decode_roundtrip() {
        let old = b"the quick brown fox jumps over the lazy dog".to_vec();
        let new = b"the quick brown fox leaps over the lazy dog and runs away".to_vec();
        let payload = generate(&old, &new);
        let decoded = Payload::decode(&payload.encode()).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_apply_rejects_length_mismatch() {
        let old = b"source bytes".to_vec();
        let new = b"source replaced".to_vec();
        let payload = generate(&old, &new);
        let err = apply(&old, &payload, new.len() as u64 + 1).unwrap_err();
        assert!(matches!(err, TarDiffError::BsdiffFailure(_)));
    }
}
