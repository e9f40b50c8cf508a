use thiserror::Error;

/// Errors surfaced by the keychain and its storage collaborators.
///
/// Absence is not an error: `get` returns `Ok(None)` and `remove` returns
/// `false` for names that were never stored.
#[derive(Debug, Error)]
pub enum KeychainError {
    /// A record failed GCM authentication under the derived key.
    #[error("wrong master password or corrupted record")]
    WrongPassword,

    /// The supplied checksum does not match the blob.
    #[error("integrity check failed: keychain data was tampered with")]
    TamperDetected,

    /// A record decrypted fine but belongs to a different domain.
    #[error("record does not belong to the requested domain")]
    NameMismatch,

    #[error("malformed keychain data: {0}")]
    MalformedInput(String),

    #[error("cryptographic primitive failed: {0}")]
    Crypto(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KeychainError>;
