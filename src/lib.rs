//! Password-protected credential keychain.
//!
//! One master password is stretched with PBKDF2-HMAC-SHA256 into an
//! AES-256-GCM key. Each domain's secret is sealed together with the domain
//! name under a fresh nonce and filed under the SHA-256 of the name, so the
//! dump reveals neither secrets nor which domains are stored. A dump is a JSON
//! blob plus a detached SHA-256 checksum; `load` refuses a blob whose checksum
//! does not match before deriving any key.
//!
//! ```rust,no_run
//! use keychest::Keychain;
//! use zeroize::Zeroizing;
//!
//! # fn example() -> keychest::Result<()> {
//! let mut keychain = Keychain::init(Zeroizing::new("master".to_string()))?;
//! keychain.set("example.com", "hunter2")?;
//! let snapshot = keychain.dump()?;
//!
//! let keychain = Keychain::load(
//!     Zeroizing::new("master".to_string()),
//!     &snapshot.blob,
//!     Some(snapshot.checksum.as_str()),
//! )?;
//! assert_eq!(keychain.get("example.com")?.as_deref(), Some("hunter2"));
//! # Ok(())
//! # }
//! ```

mod config;
mod crypto;
mod error;
mod format;
mod storage;
mod store;

pub use crate::config::{Config, DEFAULT_USER, default_store_dir};
pub use crate::crypto::{OsRandom, RandomSource};
pub use crate::error::{KeychainError, Result};
pub use crate::format::Snapshot;
pub use crate::storage::{BlobStore, FileStorage, MemoryStorage};
use crate::crypto::{MasterKey, SALT_LEN, random::generate_salt};
use store::Store;
use zeroize::{Zeroize, Zeroizing};

pub struct Keychain {
    store: Store,
    key: MasterKey,
    salt: [u8; SALT_LEN],
    rng: Box<dyn RandomSource>,
}

impl Drop for Keychain {
    fn drop(&mut self) {
        self.salt.zeroize();
    }
}

impl std::fmt::Debug for Keychain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keychain")
            .field("records", &self.store.len())
            .finish_non_exhaustive()
    }
}

impl Keychain {
    /// Creates an empty keychain protected by `password`.
    pub fn init(password: Zeroizing<String>) -> Result<Self> {
        Self::init_with_rng(password, Box::new(OsRandom))
    }

    /// Like [`Keychain::init`], drawing the salt and every nonce from `rng`.
    pub fn init_with_rng(
        password: Zeroizing<String>,
        mut rng: Box<dyn RandomSource>,
    ) -> Result<Self> {
        let salt = generate_salt(rng.as_mut())?;
        let key = crypto::derive_key(&password, &salt);
        drop(password);

        tracing::debug!("initialized empty keychain");

        Ok(Self {
            store: Store::new(),
            key,
            salt,
            rng,
        })
    }

    /// Restores a keychain from a dumped blob.
    ///
    /// When `checksum` is given it is verified against the blob before
    /// anything else happens. If the store has records, one is decrypted
    /// to reject a wrong password immediately.
    ///
    /// # Errors
    ///
    /// - [`KeychainError::TamperDetected`] on checksum mismatch.
    /// - [`KeychainError::MalformedInput`] if the blob is not a keychain.
    /// - [`KeychainError::WrongPassword`] if the probe record fails to decrypt.
    /// - [`KeychainError::NameMismatch`] if the probe record sits under the
    ///   wrong index key.
    pub fn load(password: Zeroizing<String>, blob: &str, checksum: Option<&str>) -> Result<Self> {
        Self::load_with_rng(password, blob, checksum, Box::new(OsRandom))
    }

    pub fn load_with_rng(
        password: Zeroizing<String>,
        blob: &str,
        checksum: Option<&str>,
        rng: Box<dyn RandomSource>,
    ) -> Result<Self> {
        let state = format::load(blob, checksum)?;

        let key = crypto::derive_key(&password, &state.salt);
        drop(password);

        state.store.probe(&key)?;

        tracing::debug!(records = state.store.len(), "loaded keychain");

        Ok(Self {
            store: state.store,
            key,
            salt: state.salt,
            rng,
        })
    }

    /// Serializes the keychain into a blob and its detached checksum.
    pub fn dump(&self) -> Result<Snapshot> {
        let snapshot = format::dump(&self.salt, &self.store)?;
        tracing::debug!(
            records = self.store.len(),
            bytes = snapshot.blob.len(),
            "dumped keychain"
        );
        Ok(snapshot)
    }

    /// Returns the secret stored for `name`, or `None` if there is none.
    pub fn get(&self, name: &str) -> Result<Option<String>> {
        self.store.get(&self.key, name)
    }

    /// Stores `value` for `name`, replacing any previous value.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.store.set(&self.key, self.rng.as_mut(), name, value)
    }

    /// Returns `true` if a record for `name` existed and was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.store.remove(name)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// All stored domain names, sorted.
    pub fn domains(&self) -> Result<Vec<String>> {
        self.store.names(&self.key)
    }

    /// Decrypts every record and checks it is filed under its own domain.
    ///
    /// Returns the number of records checked.
    pub fn verify(&self) -> Result<usize> {
        Ok(self.store.names(&self.key)?.len())
    }

    /// Dumps the keychain and hands the snapshot to `storage` under `user_id`.
    pub fn save_to(&self, storage: &mut dyn BlobStore, user_id: &str) -> Result<()> {
        storage.save(user_id, &self.dump()?)
    }

    /// Loads `user_id`'s snapshot from `storage`, always verifying its
    /// checksum. Returns `None` if the user has no keychain.
    pub fn load_from(
        storage: &dyn BlobStore,
        user_id: &str,
        password: Zeroizing<String>,
    ) -> Result<Option<Self>> {
        match storage.load(user_id)? {
            Some(snapshot) => {
                Self::load(password, &snapshot.blob, Some(snapshot.checksum.as_str())).map(Some)
            }
            None => Ok(None),
        }
    }
}
