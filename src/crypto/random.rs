use super::{NONCE_LEN, SALT_LEN};
use crate::error::{KeychainError, Result};
use getrandom::fill;

/// Source of cryptographically secure random bytes.
///
/// Every salt and nonce the keychain emits is drawn from one of these.
pub trait RandomSource: Send {
    fn fill(&mut self, buf: &mut [u8]) -> Result<()>;
}

/// The operating system's CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        fill(buf).map_err(|_| KeychainError::Crypto("OS random generator unavailable".into()))
    }
}

/// Generate salt
pub fn generate_salt(rng: &mut dyn RandomSource) -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)?;
    Ok(salt)
}

/// Generate a fresh AES-GCM nonce
pub fn generate_nonce(rng: &mut dyn RandomSource) -> Result<[u8; NONCE_LEN]> {
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill(&mut nonce)?;
    Ok(nonce)
}
