use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

use super::{KEY_LEN, SALT_LEN};

/// PBKDF2 iteration count shared by `init` and `load`.
///
/// Changing it makes every existing dump undecryptable.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// The symmetric key derived from the master password.
///
/// Lives only in memory and is wiped on drop.
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}

/// Derive encryption key from password
pub fn derive_key(password: &str, salt: &[u8; SALT_LEN]) -> MasterKey {
    derive_key_with_iterations(password, salt, PBKDF2_ITERATIONS)
}

fn derive_key_with_iterations(password: &str, salt: &[u8], iterations: u32) -> MasterKey {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    MasterKey(key)
}
