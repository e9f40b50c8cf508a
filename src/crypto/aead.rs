use super::{NONCE_LEN, kdf::MasterKey, random::{RandomSource, generate_nonce}};
use crate::error::{KeychainError, Result};
use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use zeroize::Zeroizing;

/// Encrypt plaintext under a fresh nonce drawn from `rng`.
pub fn encrypt(
    key: &MasterKey,
    rng: &mut dyn RandomSource,
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; NONCE_LEN])> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    let nonce = generate_nonce(rng)?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| KeychainError::Crypto("encryption failed".into()))?;

    Ok((ciphertext, nonce))
}

/// Decrypt ciphertext
///
/// Any tag mismatch is reported as [`KeychainError::WrongPassword`].
pub fn decrypt(
    key: &MasterKey,
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| KeychainError::WrongPassword)?;
    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{OsRandom, TAG_LEN, derive_key};

    fn key(password: &str) -> MasterKey {
        derive_key(password, &[9u8; 16])
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = key("pw");
        let (ciphertext, nonce) = encrypt(&key, &mut OsRandom, b"secret data").unwrap();

        assert_eq!(ciphertext.len(), b"secret data".len() + TAG_LEN);
        let plaintext = decrypt(&key, &nonce, &ciphertext).unwrap();
        assert_eq!(plaintext.as_slice(), b"secret data");
    }

    #[test]
    fn wrong_key_fails() {
        let (ciphertext, nonce) = encrypt(&key("pw"), &mut OsRandom, b"secret").unwrap();
        assert!(matches!(
            decrypt(&key("other"), &nonce, &ciphertext),
            Err(KeychainError::WrongPassword)
        ));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = key("pw");
        let (mut ciphertext, nonce) = encrypt(&key, &mut OsRandom, b"secret").unwrap();
        ciphertext[0] ^= 0x01;
        assert!(matches!(
            decrypt(&key, &nonce, &ciphertext),
            Err(KeychainError::WrongPassword)
        ));
    }

    #[test]
    fn tampered_nonce_fails() {
        let key = key("pw");
        let (ciphertext, mut nonce) = encrypt(&key, &mut OsRandom, b"secret").unwrap();
        nonce[11] ^= 0x80;
        assert!(decrypt(&key, &nonce, &ciphertext).is_err());
    }

    #[test]
    fn same_plaintext_encrypts_differently() {
        let key = key("pw");
        let (c1, n1) = encrypt(&key, &mut OsRandom, b"same").unwrap();
        let (c2, n2) = encrypt(&key, &mut OsRandom, b"same").unwrap();
        assert_ne!(n1, n2);
        assert_ne!(c1, c2);
    }
}
