//! Blob format v1.
//!
//! ```text
//! {"version":1,"salt":"<b64>","kvs":{"<b64 sha256(name)>":{"ciphertext":"<b64>","nonce":"<b64>"}}}
//! ```
//!
//! Records are ordered by index key, so a given state always serializes to
//! the same text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::KeychainState;
use crate::crypto::{DIGEST_LEN, NONCE_LEN, SALT_LEN, TAG_LEN, encoding};
use crate::error::{KeychainError, Result};
use crate::store::{Record, Store};

/// Current file format version.
pub const VERSION_V1: u8 = 1;

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct KeychainFileV1 {
    version: u8,
    salt: String,
    kvs: BTreeMap<String, RecordV1>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordV1 {
    ciphertext: String,
    nonce: String,
}

/// Serializes a salt and store to v1 blob text.
pub fn serialize(salt: &[u8; SALT_LEN], store: &Store) -> Result<String> {
    let kvs = store
        .records()
        .iter()
        .map(|(index, record)| {
            (
                index.clone(),
                RecordV1 {
                    ciphertext: encoding::encode(record.ciphertext()),
                    nonce: encoding::encode(record.nonce()),
                },
            )
        })
        .collect();

    let file = KeychainFileV1 {
        version: VERSION_V1,
        salt: encoding::encode(salt),
        kvs,
    };

    serde_json::to_string(&file)
        .map_err(|e| KeychainError::MalformedInput(format!("failed to encode keychain: {e}")))
}

/// Parses v1 blob text.
///
/// # Errors
///
/// Returns [`KeychainError::MalformedInput`] if a field is missing or unknown,
/// or if any byte field has the wrong encoding or length.
pub(crate) fn parse(blob: &str) -> Result<KeychainState> {
    let file: KeychainFileV1 = serde_json::from_str(blob)
        .map_err(|e| KeychainError::MalformedInput(format!("invalid v1 keychain: {e}")))?;

    if file.version != VERSION_V1 {
        return Err(KeychainError::MalformedInput(
            "wrong version for v1 parser".into(),
        ));
    }

    let salt = encoding::decode_array::<SALT_LEN>(&file.salt, "salt")?;

    let mut records = BTreeMap::new();
    for (index, record) in file.kvs {
        encoding::decode_array::<DIGEST_LEN>(&index, "index key")?;

        let nonce = encoding::decode_array::<NONCE_LEN>(&record.nonce, "nonce")?;
        let ciphertext = encoding::decode(&record.ciphertext)?;
        if ciphertext.len() < TAG_LEN {
            return Err(KeychainError::MalformedInput(
                "ciphertext shorter than authentication tag".into(),
            ));
        }

        records.insert(index, Record::new(ciphertext, nonce));
    }

    Ok(KeychainState {
        salt,
        store: Store::from_records(records),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::index_key;

    fn blob_with(record: &str) -> String {
        format!(
            r#"{{"version":1,"salt":"{}","kvs":{{"{}":{}}}}}"#,
            encoding::encode(&[1u8; 16]),
            index_key("example.com"),
            record
        )
    }

    fn valid_record() -> String {
        format!(
            r#"{{"ciphertext":"{}","nonce":"{}"}}"#,
            encoding::encode(&[0u8; 20]),
            encoding::encode(&[2u8; 12])
        )
    }

    #[test]
    fn parse_accepts_well_formed_blob() {
        let state = parse(&blob_with(&valid_record())).unwrap();
        assert_eq!(state.salt, [1u8; 16]);
        assert_eq!(state.store.len(), 1);

        let record = &state.store.records()[&index_key("example.com")];
        assert_eq!(record.nonce(), &[2u8; 12]);
        assert_eq!(record.ciphertext(), &[0u8; 20]);
    }

    #[test]
    fn serialize_then_parse_is_byte_stable() {
        let blob = blob_with(&valid_record());
        let state = parse(&blob).unwrap();
        assert_eq!(serialize(&state.salt, &state.store).unwrap(), blob);
    }

    #[test]
    fn empty_store_serializes() {
        let blob = serialize(&[0u8; 16], &Store::new()).unwrap();
        assert_eq!(blob, r#"{"version":1,"salt":"AAAAAAAAAAAAAAAAAAAAAA==","kvs":{}}"#);
        assert!(parse(&blob).unwrap().store.is_empty());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let blob = r#"{"version":1,"salt":"AAAAAAAAAAAAAAAAAAAAAA==","kvs":{},"extra":true}"#;
        assert!(matches!(parse(blob), Err(KeychainError::MalformedInput(_))));
    }

    #[test]
    fn missing_salt_is_rejected() {
        assert!(matches!(
            parse(r#"{"version":1,"kvs":{}}"#),
            Err(KeychainError::MalformedInput(_))
        ));
    }

    #[test]
    fn short_salt_is_rejected() {
        let blob = format!(
            r#"{{"version":1,"salt":"{}","kvs":{{}}}}"#,
            encoding::encode(&[1u8; 8])
        );
        assert!(matches!(parse(&blob), Err(KeychainError::MalformedInput(_))));
    }

    #[test]
    fn plaintext_index_key_is_rejected() {
        let blob = format!(
            r#"{{"version":1,"salt":"{}","kvs":{{"example.com":{}}}}}"#,
            encoding::encode(&[1u8; 16]),
            valid_record()
        );
        assert!(matches!(parse(&blob), Err(KeychainError::MalformedInput(_))));
    }

    #[test]
    fn bad_nonce_length_is_rejected() {
        let record = format!(
            r#"{{"ciphertext":"{}","nonce":"{}"}}"#,
            encoding::encode(&[0u8; 20]),
            encoding::encode(&[2u8; 24])
        );
        assert!(matches!(
            parse(&blob_with(&record)),
            Err(KeychainError::MalformedInput(_))
        ));
    }

    #[test]
    fn truncated_ciphertext_is_rejected() {
        let record = format!(
            r#"{{"ciphertext":"{}","nonce":"{}"}}"#,
            encoding::encode(&[0u8; 4]),
            encoding::encode(&[2u8; 12])
        );
        assert!(matches!(
            parse(&blob_with(&record)),
            Err(KeychainError::MalformedInput(_))
        ));
    }

    #[test]
    fn record_with_extra_field_is_rejected() {
        let record = format!(
            r#"{{"ciphertext":"{}","nonce":"{}","name":"example.com"}}"#,
            encoding::encode(&[0u8; 20]),
            encoding::encode(&[2u8; 12])
        );
        assert!(matches!(
            parse(&blob_with(&record)),
            Err(KeychainError::MalformedInput(_))
        ));
    }
}
