//! Durable representation of a keychain.
//!
//! A dump is a JSON text (the blob) plus a detached SHA-256 checksum over its
//! exact bytes. Parsing is version-aware and strict: anything that does not
//! match the schema is rejected before a key is derived.

use serde::Deserialize;

use crate::crypto::{self, SALT_LEN, digest};
use crate::error::{KeychainError, Result};
use crate::store::Store;

pub mod v1;

/// A dumped keychain: the blob and its detached checksum.
///
/// Both are opaque text to storage and must be kept byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub blob: String,
    pub checksum: String,
}

/// Salt and records recovered from a blob.
pub(crate) struct KeychainState {
    pub salt: [u8; SALT_LEN],
    pub store: Store,
}

#[derive(Deserialize)]
struct VersionTag {
    version: u8,
}

/// Serializes a keychain state and checksums the result.
pub(crate) fn dump(salt: &[u8; SALT_LEN], store: &Store) -> Result<Snapshot> {
    let blob = v1::serialize(salt, store)?;
    let checksum = crypto::checksum(&blob);
    Ok(Snapshot { blob, checksum })
}

/// Verifies `checksum` (when given) and then parses the blob.
///
/// # Errors
///
/// - [`KeychainError::TamperDetected`] if the checksum does not match. This is
///   checked before the blob is even parsed.
/// - [`KeychainError::MalformedInput`] if the blob is not a supported keychain.
pub(crate) fn load(blob: &str, checksum: Option<&str>) -> Result<KeychainState> {
    if let Some(expected) = checksum {
        if !digest::checksum_matches(blob, expected) {
            tracing::warn!("keychain checksum mismatch");
            return Err(KeychainError::TamperDetected);
        }
    }

    parse(blob)
}

/// Parses a blob, dispatching on its `version` field.
pub(crate) fn parse(blob: &str) -> Result<KeychainState> {
    let tag: VersionTag = serde_json::from_str(blob)
        .map_err(|e| KeychainError::MalformedInput(format!("not a keychain blob: {e}")))?;

    match tag.version {
        v1::VERSION_V1 => v1::parse(blob),
        v => Err(KeychainError::MalformedInput(format!(
            "unsupported version: {v}"
        ))),
    }
}
