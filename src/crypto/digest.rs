use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::{DIGEST_LEN, encoding};

pub fn sha256(data: &[u8]) -> [u8; DIGEST_LEN] {
    Sha256::digest(data).into()
}

/// Map key under which a domain's record is stored.
///
/// One-way: the blob never carries the plaintext domain name.
pub fn index_key(name: &str) -> String {
    encoding::encode(&sha256(name.as_bytes()))
}

/// Detached checksum over the exact blob text.
pub fn checksum(blob: &str) -> String {
    encoding::encode(&sha256(blob.as_bytes()))
}

/// Compares a supplied checksum against the blob in constant time.
///
/// An undecodable checksum never matches.
pub fn checksum_matches(blob: &str, expected: &str) -> bool {
    let Ok(expected) = encoding::decode(expected.trim()) else {
        return false;
    };
    let actual = sha256(blob.as_bytes());
    expected.len() == DIGEST_LEN && bool::from(actual.as_slice().ct_eq(expected.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        let digest = sha256(b"abc");
        assert_eq!(
            encoding::encode(&digest),
            "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0="
        );
    }

    #[test]
    fn index_key_hides_name() {
        let key = index_key("example.com");
        assert!(!key.contains("example"));
        assert_eq!(key, index_key("example.com"));
        assert_ne!(key, index_key("example.org"));
    }

    #[test]
    fn checksum_matches_only_same_blob() {
        let sum = checksum("{\"a\":1}");
        assert!(checksum_matches("{\"a\":1}", &sum));
        assert!(!checksum_matches("{\"a\":2}", &sum));
        assert!(!checksum_matches("{\"a\":1}", "garbage"));
        assert!(!checksum_matches("{\"a\":1}", ""));
    }
}
