//! Base64 helpers for every byte field that crosses the blob boundary.

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::error::{KeychainError, Result};

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|e| KeychainError::MalformedInput(format!("invalid base64: {e}")))
}

/// Decodes base64 into a fixed-size array, rejecting any other length.
pub fn decode_array<const N: usize>(text: &str, field: &str) -> Result<[u8; N]> {
    let bytes = decode(text)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        KeychainError::MalformedInput(format!("{field} must be {N} bytes, got {len}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_array_checks_length() {
        let text = encode(&[1u8; 12]);
        assert_eq!(decode_array::<12>(&text, "nonce").unwrap(), [1u8; 12]);

        match decode_array::<16>(&text, "salt") {
            Err(KeychainError::MalformedInput(msg)) => assert!(msg.contains("salt")),
            other => panic!("expected MalformedInput, got: {other:?}"),
        }
    }

    #[test]
    fn invalid_base64_is_malformed() {
        assert!(matches!(
            decode("not base64!"),
            Err(KeychainError::MalformedInput(_))
        ));
    }
}
