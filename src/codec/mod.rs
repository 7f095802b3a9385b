//! Compact lossless binary-to-text codec for embedded payloads.
//!
//! The payload has to live inside a metadata string with practical size
//! and character-set constraints, so bytes are gzip-compressed and then
//! packed 15 bits per character into fixed repertoires of printable
//! characters. The codec has no awareness of what the payload means;
//! `decode(encode(x)) == x` for every byte string, including the empty
//! one.

mod repertoire;

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use repertoire::{FULL, FULL_BITS, TERMINAL, TERMINAL_BITS};

/// Format error during decode. Fatal to the single decode call only; a
/// caller expanding several libraries may skip the offending one and
/// continue with the rest.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum CodecError {
    #[error("unrecognized character `{ch}` at position {position}")]
    #[diagnostic(code(stowage::codec::unknown_character))]
    UnknownCharacter { ch: char, position: usize },

    #[error("terminal character at position {position} is not last")]
    #[diagnostic(code(stowage::codec::misplaced_terminal))]
    MisplacedTerminal { position: usize },

    #[error("trailing padding bits are not all ones")]
    #[diagnostic(code(stowage::codec::bad_padding))]
    BadPadding,

    #[error("corrupt or truncated compressed stream")]
    #[diagnostic(code(stowage::codec::corrupt_stream))]
    CorruptStream(#[source] std::io::Error),
}

/// Encode arbitrary bytes into a compact printable string.
pub fn encode(bytes: &[u8]) -> String {
    pack(&compress(bytes))
}

/// Decode a string produced by [`encode`] back into the original bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    decompress(&unpack(text)?)
}

/// Pack bytes 15 bits at a time into repertoire characters.
///
/// Bit order is big-endian within each group. A final group holding fewer
/// than 15 meaningful bits is padded with 1-bits: up to 7 bits when at
/// most 7 remain (drawn from the terminal repertoire, so decoding can
/// tell the cases apart), up to 15 otherwise.
pub fn pack(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut acc: u32 = 0;
    let mut pending: u32 = 0;

    for &byte in bytes {
        acc = (acc << 8) | byte as u32;
        pending += 8;
        if pending >= FULL_BITS {
            pending -= FULL_BITS;
            out.push(FULL.char_at((acc >> pending) & ((1 << FULL_BITS) - 1)));
            acc &= (1 << pending) - 1;
        }
    }

    if pending > 0 {
        if pending <= TERMINAL_BITS {
            let pad = TERMINAL_BITS - pending;
            out.push(TERMINAL.char_at((acc << pad) | ((1 << pad) - 1)));
        } else {
            let pad = FULL_BITS - pending;
            out.push(FULL.char_at((acc << pad) | ((1 << pad) - 1)));
        }
    }

    out
}

/// Unpack repertoire characters back into bytes.
pub fn unpack(text: &str) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    let mut acc: u32 = 0;
    let mut pending: u32 = 0;
    let mut terminal_seen = false;

    for (position, ch) in text.chars().enumerate() {
        if terminal_seen {
            // A terminal character closed the stream one position ago
            return Err(CodecError::MisplacedTerminal {
                position: position - 1,
            });
        }

        let (value, bits) = if let Some(index) = FULL.index_of(ch) {
            (index, FULL_BITS)
        } else if let Some(index) = TERMINAL.index_of(ch) {
            terminal_seen = true;
            (index, TERMINAL_BITS)
        } else {
            return Err(CodecError::UnknownCharacter { ch, position });
        };

        acc = (acc << bits) | value;
        pending += bits;
        while pending >= 8 {
            pending -= 8;
            out.push((acc >> pending) as u8);
            acc &= (1 << pending) - 1;
        }
    }

    // Whatever remains below a byte boundary is padding and must be ones
    if acc != (1 << pending) - 1 {
        return Err(CodecError::BadPadding);
    }

    Ok(out)
}

fn compress(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .expect("writing to an in-memory buffer cannot fail");
    encoder
        .finish()
        .expect("finishing an in-memory gzip stream cannot fail")
}

fn decompress(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(CodecError::CorruptStream)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic byte generator for round-trip coverage.
    fn pseudo_random_bytes(len: usize, mut seed: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
            out.push((seed >> 24) as u8);
        }
        out
    }

    #[test]
    fn test_round_trip_empty() {
        assert_eq!(decode(&encode(&[])).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_round_trip_all_byte_values() {
        let bytes: Vec<u8> = (0..=255).collect();
        assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn test_round_trip_every_small_length() {
        // Lengths 1..=40 cover every (8 * len) mod 15 residue twice, so
        // both final-character paths get exercised.
        for len in 1..=40 {
            let bytes = pseudo_random_bytes(len, len as u32);
            assert_eq!(decode(&encode(&bytes)).unwrap(), bytes, "len {}", len);
        }
    }

    #[test]
    fn test_round_trip_large_compressible_payload() {
        let bytes = "using System;\nclass Program {}\n".repeat(500).into_bytes();
        let encoded = encode(&bytes);

        assert!(encoded.chars().count() < bytes.len() / 2);
        assert_eq!(decode(&encoded).unwrap(), bytes);
    }

    #[test]
    fn test_pack_length_arithmetic() {
        // 15 bytes = 120 bits = exactly 8 full characters
        assert_eq!(pack(&[0xAB; 15]).chars().count(), 8);
        // 1 byte = 8 bits = one full character with 7 padding bits
        assert_eq!(pack(&[0x00]).chars().count(), 1);
        // 3 bytes = 24 bits = one full character + 9 bits -> full character
        assert_eq!(pack(&[1, 2, 3]).chars().count(), 2);
        assert_eq!(pack(&[]), "");
    }

    #[test]
    fn test_terminal_character_marks_seven_bit_tail() {
        // 2 bytes = 16 bits = one full character + 1 bit -> terminal
        let packed: Vec<char> = pack(&[0xFF, 0xFF]).chars().collect();
        assert_eq!(packed.len(), 2);
        assert!(repertoire::FULL.index_of(packed[0]).is_some());
        assert!(repertoire::TERMINAL.index_of(packed[1]).is_some());
    }

    #[test]
    fn test_unpack_round_trip() {
        for len in [0, 1, 2, 14, 15, 16, 29, 30, 31] {
            let bytes = pseudo_random_bytes(len, 7);
            assert_eq!(unpack(&pack(&bytes)).unwrap(), bytes, "len {}", len);
        }
    }

    #[test]
    fn test_foreign_character_rejected() {
        let mut text = pack(&[1, 2, 3, 4]);
        text.push('A');

        match unpack(&text) {
            Err(CodecError::UnknownCharacter { ch: 'A', .. }) => {}
            other => panic!("expected UnknownCharacter, got {:?}", other),
        }
    }

    #[test]
    fn test_interior_terminal_rejected() {
        let terminal = repertoire::TERMINAL.char_at(0x7F);
        let interior = repertoire::FULL.char_at(0);
        let text: String = [terminal, interior].iter().collect();

        match unpack(&text) {
            Err(CodecError::MisplacedTerminal { position: 0 }) => {}
            other => panic!("expected MisplacedTerminal, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_compressed_stream_rejected() {
        let encoded = encode(b"some payload worth compressing");
        let truncated: String = encoded.chars().take(2).collect();

        assert!(matches!(
            decode(&truncated),
            Err(CodecError::CorruptStream(_)) | Err(CodecError::BadPadding)
        ));
    }
}
