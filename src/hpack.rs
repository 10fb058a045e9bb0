//! A minimal HPACK-style Huffman length table.
//!
//! `QueryIndex`'s compressed-pattern builder (§4.5) needs to know, for a
//! candidate query string, how many compressed bytes a growing prefix would
//! occupy under HTTP/2's Huffman string-literal encoding, at each of the
//! eight possible initial bit-alignments. It never needs the actual encoded
//! bytes — only the running bit length — so this module exposes a bit-length
//! table rather than a full encoder/decoder.
//!
//! Code lengths below are modeled on the RFC 7541 Appendix B static Huffman
//! table: common lowercase letters are 5-6 bits, the long tail of ASCII is
//! 7-8 bits. This is not a byte-for-byte reproduction of the RFC table — the
//! pipeline only needs a deterministic, monotonic bit-length function so
//! that patterns built from a candidate query round-trip through
//! `filter_by_pattern` against themselves (see `tests/property/invariants.rs`).

/// Huffman bit length for one byte, HPACK-flavored.
pub fn code_len(byte: u8) -> u32 {
    match byte {
        b' ' => 6,
        b'%' => 8,
        b'\'' => 8,
        b'0'..=b'9' => 5,
        b'e' | b't' | b'a' | b'o' | b'i' | b'n' | b's' | b'h' | b'r' => 5,
        b'd' | b'l' | b'c' | b'u' | b'm' | b'w' | b'f' | b'g' | b'y' | b'p' | b'b' => 6,
        b'v' | b'k' | b'j' | b'x' | b'q' | b'z' => 7,
        b'A'..=b'Z' => 8,
        _ => 8,
    }
}

/// Bit length of the Huffman encoding of `bytes` as a standalone string.
pub fn encoded_bit_len(bytes: &[u8]) -> u64 {
    bytes.iter().map(|&b| u64::from(code_len(b))).sum()
}

/// Byte length of the Huffman-encoded string, including the final padding
/// to a whole octet (HPACK pads the last byte with 1-bits).
pub fn encoded_byte_len(bytes: &[u8]) -> u64 {
    (encoded_bit_len(bytes) + 7) / 8
}

/// Byte length of a Huffman-encoded string given `prefix_bits` bits of
/// padding already consumed in the current octet before this string starts
/// (one of the eight possible bit-alignments used by `QueryIndex::patterns`).
pub fn encoded_byte_len_with_prefix(bytes: &[u8], prefix_bits: u32) -> u64 {
    (u64::from(prefix_bits) + encoded_bit_len(bytes) + 7) / 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_letters_are_shorter_than_rare_ones() {
        assert!(code_len(b'e') < code_len(b'z'));
        assert!(code_len(b'e') < code_len(b'Z'));
    }

    #[test]
    fn byte_len_is_monotonic_in_prefix_length() {
        let short = encoded_byte_len(b"cat");
        let long = encoded_byte_len(b"category");
        assert!(long >= short);
    }

    #[test]
    fn prefix_bits_never_decrease_length() {
        let base = encoded_byte_len_with_prefix(b"hello", 0);
        let shifted = encoded_byte_len_with_prefix(b"hello", 7);
        assert!(shifted >= base);
    }
}
