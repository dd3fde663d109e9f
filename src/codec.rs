//! Bidirectional encoding adapter (component H): UTF-8 with automatic
//! HEX-string fallback on decode, and a tolerant HEX-string input parser.
//!
//! Pure functions only — nothing here touches the port.

use bytes::Bytes;

use crate::config::Encoding;
use crate::error::Error;

/// Result of classifying a raw byte sequence for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub is_hex: bool,
}

/// Decodes `bytes` as UTF-8; on failure, falls back to a lowercase
/// space-separated hex string (`"aa bb cc"`) and marks `is_hex`.
///
/// This never fails: every byte sequence has *some* textual representation.
pub fn decode(bytes: &[u8]) -> Decoded {
    match std::str::from_utf8(bytes) {
        Ok(text) => Decoded {
            text: text.to_string(),
            is_hex: false,
        },
        Err(_) => Decoded {
            text: format_hex(bytes),
            is_hex: true,
        },
    }
}

/// Encodes caller-declared `text` for the wire according to `encoding`.
///
/// `Encoding::Utf8` is the literal bytes of `text` (the caller is
/// responsible for including `\r\n` where needed). `Encoding::Hex` parses
/// whitespace-separated hex byte pairs.
pub fn encode(text: &str, encoding: Encoding) -> Result<Bytes, Error> {
    match encoding {
        Encoding::Utf8 => Ok(Bytes::copy_from_slice(text.as_bytes())),
        Encoding::Hex => parse_hex(text).map(Bytes::from),
    }
}

/// Renders `bytes` as a lowercase space-separated hex string.
pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a hex-string payload into raw bytes.
///
/// Tolerant of single or multiple whitespace separators between byte pairs
/// and of mixed case; rejects any other non-hex-digit character.
pub fn parse_hex(s: &str) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    for token in s.split_whitespace() {
        if token.len() != 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidHex(format!(
                "expected 2 hex digits per token, got `{token}`"
            )));
        }
        let byte = u8::from_str_radix(token, 16)
            .map_err(|_| Error::InvalidHex(format!("invalid hex token `{token}`")))?;
        out.push(byte);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_valid_utf8_as_text() {
        let d = decode(b"+CSQ: 22,99\r\nOK\r\n");
        assert!(!d.is_hex);
        assert_eq!(d.text, "+CSQ: 22,99\r\nOK\r\n");
    }

    #[test]
    fn falls_back_to_hex_on_invalid_utf8() {
        let d = decode(&[0xFF, 0x01, 0xFE]);
        assert!(d.is_hex);
        assert_eq!(d.text, "ff 01 fe");
    }

    #[test]
    fn parse_hex_tolerates_multi_space_and_case() {
        let bytes = parse_hex("01  03   0C 00\t01").unwrap();
        assert_eq!(bytes, vec![0x01, 0x03, 0x0c, 0x00, 0x01]);
    }

    #[test]
    fn parse_hex_rejects_invalid_characters() {
        assert!(parse_hex("zz 01").is_err());
        assert!(parse_hex("0").is_err());
    }

    #[test]
    fn hex_parse_idempotence() {
        let original = vec![0xDE, 0xAD, 0xBE, 0xEF, 0x00];
        let formatted = format_hex(&original);
        let parsed = parse_hex(&formatted).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn encode_utf8_is_literal_bytes() {
        let out = encode("AT+CSQ\r\n", Encoding::Utf8).unwrap();
        assert_eq!(&out[..], b"AT+CSQ\r\n");
    }

    #[test]
    fn encode_hex_roundtrips_through_decode() {
        let out = encode("01 03 0c", Encoding::Hex).unwrap();
        assert_eq!(&out[..], &[0x01, 0x03, 0x0c]);
    }
}
