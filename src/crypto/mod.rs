//! Cryptographic primitives for the keychain.
//!
//! Provides key derivation, record encryption, hashing, encoding helpers,
//! and the random source every nonce and salt comes from.

pub mod aead;
pub mod digest;
pub mod encoding;
pub mod kdf;
pub mod random;

pub use aead::{decrypt, encrypt};
pub use digest::{checksum, index_key};
pub use kdf::{MasterKey, derive_key};
pub use random::{OsRandom, RandomSource};

/// Length of the salt (16 bytes).
pub const SALT_LEN: usize = 16;
/// Length of the nonce (12 bytes for AES-256-GCM).
pub const NONCE_LEN: usize = 12;
/// Length of the encryption key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;
/// Length of a SHA-256 digest.
pub const DIGEST_LEN: usize = 32;
