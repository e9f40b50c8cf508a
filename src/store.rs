use crate::crypto::{self, MasterKey, NONCE_LEN, RandomSource};
use crate::error::{KeychainError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use zeroize::Zeroizing;

/// One encrypted credential as it sits in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    ciphertext: Vec<u8>,
    nonce: [u8; NONCE_LEN],
}

impl Record {
    pub(crate) fn new(ciphertext: Vec<u8>, nonce: [u8; NONCE_LEN]) -> Self {
        Self { ciphertext, nonce }
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }
}

/// Plaintext sealed inside every record: the domain travels with its value.
#[derive(Serialize)]
struct BoundSecretRef<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BoundSecret {
    name: String,
    value: String,
}

/// Index key -> encrypted record.
#[derive(Debug, Default, Clone)]
pub struct Store {
    records: BTreeMap<String, Record>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_records(records: BTreeMap<String, Record>) -> Self {
        Self { records }
    }

    pub(crate) fn records(&self) -> &BTreeMap<String, Record> {
        &self.records
    }

    #[cfg(test)]
    pub(crate) fn records_mut(&mut self) -> &mut BTreeMap<String, Record> {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &MasterKey, name: &str) -> Result<Option<String>> {
        let Some(record) = self.records.get(&crypto::index_key(name)) else {
            return Ok(None);
        };

        let secret = open(key, record)?;
        if secret.name != name {
            tracing::warn!("decrypted record is bound to a different domain");
            return Err(KeychainError::NameMismatch);
        }

        Ok(Some(secret.value))
    }

    /// Upserts `name`, sealing it under a fresh nonce.
    pub fn set(
        &mut self,
        key: &MasterKey,
        rng: &mut dyn RandomSource,
        name: &str,
        value: &str,
    ) -> Result<()> {
        let plaintext = Zeroizing::new(
            serde_json::to_vec(&BoundSecretRef { name, value })
                .map_err(|e| KeychainError::Crypto(format!("failed to encode record: {e}")))?,
        );
        let (ciphertext, nonce) = crypto::encrypt(key, rng, &plaintext)?;

        self.records
            .insert(crypto::index_key(name), Record::new(ciphertext, nonce));
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.records.remove(&crypto::index_key(name)).is_some()
    }

    /// Decrypts the record at `index` and checks it hashes back to `index`.
    fn open_indexed(key: &MasterKey, index: &str, record: &Record) -> Result<BoundSecret> {
        let secret = open(key, record)?;
        if crypto::index_key(&secret.name) != index {
            tracing::warn!("record is stored under an index key that does not match its domain");
            return Err(KeychainError::NameMismatch);
        }
        Ok(secret)
    }

    /// Checks the first record only; used to reject a wrong password early.
    pub fn probe(&self, key: &MasterKey) -> Result<()> {
        if let Some((index, record)) = self.records.iter().next() {
            Self::open_indexed(key, index, record)?;
        }
        Ok(())
    }

    /// Every domain name in the store, sorted. Checks every record.
    pub fn names(&self, key: &MasterKey) -> Result<Vec<String>> {
        let mut names = self
            .records
            .iter()
            .map(|(index, record)| Self::open_indexed(key, index, record).map(|s| s.name))
            .collect::<Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }
}

fn open(key: &MasterKey, record: &Record) -> Result<BoundSecret> {
    let plaintext = crypto::decrypt(key, &record.nonce, &record.ciphertext).inspect_err(|_| {
        tracing::warn!("record failed authentication");
    })?;
    serde_json::from_slice(&plaintext)
        .map_err(|_| KeychainError::MalformedInput("record payload is not a bound secret".into()))
}
