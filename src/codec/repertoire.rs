//! Character repertoires for the 15-bit text codec.
//!
//! Two disjoint sets of printable BMP characters: a 32768-strong interior
//! repertoire (one character per full 15-bit group) and a 128-strong
//! terminal repertoire (one character for a final 7-bit group). Both are
//! built from contiguous fully-assigned ranges, so membership and index
//! arithmetic are range walks instead of table lookups.

/// A repertoire of code points, addressed by a dense index.
pub(crate) struct Repertoire {
    /// (first code point, length) per range, in index order.
    ranges: &'static [(u32, u32)],
    /// Total number of code points across all ranges.
    size: u32,
}

/// Interior repertoire: 2^15 code points, 15 bits per character.
/// CJK Extension A, CJK Unified Ideographs, and a Hangul slice.
pub(crate) const FULL: Repertoire = Repertoire {
    ranges: &[(0x3400, 6582), (0x4E00, 20940), (0xAC00, 5246)],
    size: 1 << FULL_BITS,
};

/// Terminal repertoire: 2^7 code points, 7 bits, Latin Extended-B.
/// Only ever valid as the last character of an encoded string.
pub(crate) const TERMINAL: Repertoire = Repertoire {
    ranges: &[(0x0180, 128)],
    size: 1 << TERMINAL_BITS,
};

/// Bits carried by an interior character.
pub(crate) const FULL_BITS: u32 = 15;

/// Bits carried by a terminal character.
pub(crate) const TERMINAL_BITS: u32 = 7;

impl Repertoire {
    /// The character at `index`. Callers mask indices to the repertoire
    /// size, so the walk always lands inside a range.
    pub(crate) fn char_at(&self, index: u32) -> char {
        debug_assert!(index < self.size);

        let mut remaining = index;
        for &(start, len) in self.ranges {
            if remaining < len {
                return char::from_u32(start + remaining)
                    .expect("repertoire ranges hold valid scalar values");
            }
            remaining -= len;
        }

        unreachable!("index masked to repertoire size")
    }

    /// The index of `ch`, or `None` when the character is foreign.
    pub(crate) fn index_of(&self, ch: char) -> Option<u32> {
        let cp = ch as u32;
        let mut base = 0;
        for &(start, len) in self.ranges {
            if cp >= start && cp < start + len {
                return Some(base + (cp - start));
            }
            base += len;
        }
        None
    }
}
