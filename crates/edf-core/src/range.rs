//! Byte range bookkeeping: merging known spans and deriving unknown gaps.

use std::fmt;

use serde::Serialize;

use crate::error::{EdfError, Result};

/// Half-open byte range `[start, end)`. Never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ByteRange {
    start: usize,
    end: usize,
}

impl ByteRange {
    /// `None` unless `start < end`.
    pub fn new(start: usize, end: usize) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Range of `len` bytes starting at `start`.
    pub fn with_len(start: usize, len: usize) -> Option<Self> {
        Self::new(start, start.checked_add(len)?)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Whether `other` lies entirely inside `self`.
    pub fn covers(&self, other: &ByteRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}..0x{:X}", self.start, self.end)
    }
}

/// Sort and merge overlapping or adjacent ranges.
pub fn merge(mut ranges: Vec<ByteRange>) -> Vec<ByteRange> {
    ranges.sort();
    let mut merged: Vec<ByteRange> = Vec::with_capacity(ranges.len());
    for r in ranges {
        match merged.last_mut() {
            Some(last) if r.start <= last.end => last.end = last.end.max(r.end),
            _ => merged.push(r),
        }
    }
    merged
}

/// Gaps of `[0, file_len)` not covered by `known`.
///
/// `known` need not be sorted or merged; spans reaching past `file_len` are
/// clipped.
pub fn compute_unknown(file_len: usize, known: &[ByteRange]) -> Vec<ByteRange> {
    let merged = merge(clip(file_len, known));
    gaps(file_len, &merged)
}

fn clip(file_len: usize, known: &[ByteRange]) -> Vec<ByteRange> {
    known
        .iter()
        .filter_map(|r| ByteRange::new(r.start, r.end.min(file_len)))
        .collect()
}

fn gaps(file_len: usize, merged: &[ByteRange]) -> Vec<ByteRange> {
    let mut out = Vec::new();
    let mut cursor = 0;
    for r in merged {
        out.extend(ByteRange::new(cursor, r.start));
        cursor = r.end;
    }
    out.extend(ByteRange::new(cursor, file_len));
    out
}

/// Check that `known` and `unknown` tile `[0, file_len)` exactly.
///
/// Both inputs must be sorted and internally disjoint.
pub fn verify_partition(file_len: usize, known: &[ByteRange], unknown: &[ByteRange]) -> Result<()> {
    let mut all: Vec<ByteRange> = known.iter().chain(unknown).copied().collect();
    all.sort();

    let mut cursor = 0;
    for r in &all {
        if r.start < cursor {
            return Err(EdfError::Partition {
                detail: format!("range {r} overlaps previous range ending at 0x{cursor:X}"),
            });
        }
        if r.start > cursor {
            return Err(EdfError::Partition {
                detail: format!("bytes 0x{cursor:X}..0x{:X} are unaccounted for", r.start),
            });
        }
        cursor = r.end;
    }
    if cursor != file_len {
        return Err(EdfError::Partition {
            detail: format!("coverage ends at 0x{cursor:X}, file length is 0x{file_len:X}"),
        });
    }
    Ok(())
}

/// Known/unknown split of a whole file, verified on construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeMap {
    file_len: usize,
    known: Vec<ByteRange>,
    unknown: Vec<ByteRange>,
}

impl RangeMap {
    pub fn compute(file_len: usize, known: &[ByteRange]) -> Result<Self> {
        let known = merge(clip(file_len, known));
        let unknown = gaps(file_len, &known);
        verify_partition(file_len, &known, &unknown)?;
        Ok(Self {
            file_len,
            known,
            unknown,
        })
    }

    pub fn file_len(&self) -> usize {
        self.file_len
    }

    /// Merged known ranges in file order.
    pub fn known(&self) -> &[ByteRange] {
        &self.known
    }

    /// Unknown regions in file order.
    pub fn unknown(&self) -> &[ByteRange] {
        &self.unknown
    }

    pub fn known_bytes(&self) -> usize {
        self.known.iter().map(ByteRange::len).sum()
    }

    pub fn unknown_bytes(&self) -> usize {
        self.unknown.iter().map(ByteRange::len).sum()
    }

    /// Fraction of the file covered by known ranges, `0.0..=1.0`.
    pub fn coverage(&self) -> f64 {
        if self.file_len == 0 {
            return 0.0;
        }
        self.known_bytes() as f64 / self.file_len as f64
    }
}
