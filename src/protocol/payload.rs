//! Base64 file payloads.
//!
//! File contents cross the wire as standard-alphabet base64 so the frame
//! terminator can never appear inside them. A sender may encode a large
//! file in chunks and write the encoded chunks back to back; when a chunk
//! length is not a multiple of three its padding lands mid-body. Decoding
//! therefore restarts after every padded quad, which yields exactly the
//! bytes the sender encoded.

use base64::engine::general_purpose::STANDARD;
use base64::{DecodeError, Engine as _};

/// Encodes file bytes for the wire.
pub fn encode_payload(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes `data` as back-to-back base64 chunks of `chunk_size` raw bytes.
pub fn encode_chunked(data: &[u8], chunk_size: usize) -> String {
    let chunk_size = chunk_size.max(1);
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4 + 4);
    for chunk in data.chunks(chunk_size) {
        STANDARD.encode_string(chunk, &mut out);
    }
    out
}

/// Decodes a payload made of one or more concatenated base64 segments.
///
/// Whitespace inside the payload (such as a CRLF between segments) is not
/// skipped and fails decoding.
pub fn decode_payload(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    let mut rest = encoded.trim().as_bytes();
    let mut out = Vec::with_capacity(rest.len() / 4 * 3);

    while !rest.is_empty() {
        // Padding always closes the quad it sits in.
        let end = match rest.iter().position(|&b| b == b'=') {
            Some(pos) => (pos / 4 + 1) * 4,
            None => rest.len(),
        };
        let end = end.min(rest.len());
        STANDARD.decode_vec(&rest[..end], &mut out)?;
        rest = &rest[end..];
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_payload() {
        assert_eq!(encode_payload(b"AB"), "QUI=");
        assert_eq!(encode_payload(b""), "");
    }

    #[test]
    fn test_decode_single_segment() {
        assert_eq!(decode_payload("QUI=").unwrap(), b"AB");
        assert_eq!(decode_payload("aGVsbG8gd29ybGQ=").unwrap(), b"hello world");
    }

    #[test]
    fn test_decode_concatenated_padded_segments() {
        // "A" and "A" encoded separately, then concatenated
        assert_eq!(decode_payload("QQ==QQ==").unwrap(), b"AA");
    }

    #[test]
    fn test_chunked_encoding_decodes_to_original() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        for chunk_size in [1, 2, 3, 7, 1024, 20_000] {
            let encoded = encode_chunked(&data, chunk_size);
            assert_eq!(decode_payload(&encoded).unwrap(), data, "chunk size {}", chunk_size);
        }
    }

    #[test]
    fn test_decode_rejects_invalid_alphabet() {
        assert!(decode_payload("not base64!").is_err());
    }

    #[test]
    fn test_decode_rejects_missing_padding() {
        assert!(decode_payload("QUI").is_err());
    }

    #[test]
    fn test_decode_rejects_stray_padding() {
        assert!(decode_payload("Q===").is_err());
    }

    #[test]
    fn test_decode_rejects_interior_whitespace() {
        assert!(decode_payload("QQ==\r\nQQ==").is_err());
        assert!(decode_payload("QUJD REVG").is_err());
    }
}
