//! Persistence collaborators for keychain snapshots.
//!
//! Storage never interprets a snapshot: the blob and checksum are written and
//! returned exactly as `Keychain::dump` produced them.

use crate::error::{KeychainError, Result};
use crate::format::Snapshot;
use getrandom::fill;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const BLOB_EXT: &str = "keychain";
const CHECKSUM_EXT: &str = "sha256";

/// A place that holds one snapshot per user id.
pub trait BlobStore {
    fn save(&mut self, user_id: &str, snapshot: &Snapshot) -> Result<()>;

    /// Returns `None` when nothing was ever saved for `user_id`.
    fn load(&self, user_id: &str) -> Result<Option<Snapshot>>;

    fn exists(&self, user_id: &str) -> Result<bool> {
        Ok(self.load(user_id)?.is_some())
    }
}

/// Rejects user ids that would not map to a single plain file name.
pub fn validate_user_id(user_id: &str) -> Result<()> {
    let valid = !user_id.is_empty()
        && !user_id.starts_with('.')
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(())
    } else {
        Err(KeychainError::Storage(format!("invalid user id '{user_id}'")))
    }
}

/// Snapshots stored as files in one directory.
///
/// User `u` is kept in `u.keychain` (the blob) and `u.sha256` (the checksum).
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Returns the directory holding the snapshots.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user_id: &str, ext: &str) -> Result<PathBuf> {
        validate_user_id(user_id)?;
        Ok(self.dir.join(format!("{user_id}.{ext}")))
    }

    /// Writes `data` to `path` using atomic write.
    ///
    /// 1. Writing data to a temporary file with random name
    /// 2. Syncing the temporary file to disk
    /// 3. Atomically replacing the old file with the new one
    /// 4. Syncing the parent directory to ensure the rename is persisted
    ///
    /// Creates parent directories if they don't exist.
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let tmp_path = random_tmp_path(path)?;

        // securely create temp file (fail if exists)
        let mut tmp_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;

        tmp_file.write_all(data)?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        if let Err(e) = atomic_replace(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        // fsync directory
        #[cfg(not(target_os = "windows"))]
        File::open(&self.dir)?.sync_all()?;

        Ok(())
    }
}

impl BlobStore for FileStorage {
    /// Writes the checksum first, then the blob, so a blob is never visible
    /// without its checksum.
    fn save(&mut self, user_id: &str, snapshot: &Snapshot) -> Result<()> {
        let blob_path = self.path_for(user_id, BLOB_EXT)?;
        let checksum_path = self.path_for(user_id, CHECKSUM_EXT)?;

        self.write_atomic(&checksum_path, snapshot.checksum.as_bytes())?;
        self.write_atomic(&blob_path, snapshot.blob.as_bytes())?;

        tracing::debug!(user_id, dir = %self.dir.display(), "saved keychain snapshot");
        Ok(())
    }

    fn load(&self, user_id: &str) -> Result<Option<Snapshot>> {
        let blob = match fs::read_to_string(self.path_for(user_id, BLOB_EXT)?) {
            Ok(blob) => blob,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let checksum = match fs::read_to_string(self.path_for(user_id, CHECKSUM_EXT)?) {
            Ok(checksum) => checksum,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(KeychainError::Storage(format!(
                    "checksum for user '{user_id}' is missing"
                )));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Some(Snapshot { blob, checksum }))
    }

    fn exists(&self, user_id: &str) -> Result<bool> {
        Ok(self.path_for(user_id, BLOB_EXT)?.exists())
    }
}

/// Snapshots held in process memory, keyed by user id.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    snapshots: HashMap<String, Snapshot>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryStorage {
    fn save(&mut self, user_id: &str, snapshot: &Snapshot) -> Result<()> {
        self.snapshots.insert(user_id.to_string(), snapshot.clone());
        Ok(())
    }

    fn load(&self, user_id: &str) -> Result<Option<Snapshot>> {
        Ok(self.snapshots.get(user_id).cloned())
    }
}

/// Generates a unique temporary file path in the same directory.
///
/// Format: `filename.tmp.<randomhex>`
fn random_tmp_path(path: &Path) -> Result<PathBuf> {
    let mut buf = [0u8; 8]; // 64 bit entropy
    fill(&mut buf)
        .map_err(|_| KeychainError::Crypto("OS random generator unavailable".into()))?;

    let rand_string = buf.iter().map(|b| format!("{:02x}", b)).collect::<String>();

    let file_name = path
        .file_name()
        .ok_or_else(|| KeychainError::Storage("storage path has no file name".into()))?
        .to_string_lossy();

    Ok(path.with_file_name(format!("{}.tmp.{}", file_name, rand_string)))
}

/// Atomically replaces the target file with the temporary file.
///
/// Uses Windows `ReplaceFileW` API with `REPLACEFILE_WRITE_THROUGH` flag
/// when the target already exists.
#[cfg(target_os = "windows")]
fn atomic_replace(tmp_path: &Path, target: &Path) -> Result<()> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::{REPLACEFILE_WRITE_THROUGH, ReplaceFileW};

    if !target.exists() {
        fs::rename(tmp_path, target)?;
        return Ok(());
    }

    fn to_wide(s: &OsStr) -> Vec<u16> {
        s.encode_wide().chain(std::iter::once(0)).collect()
    }

    let target_w = to_wide(target.as_os_str());
    let tmp_w = to_wide(tmp_path.as_os_str());

    // SAFETY:
    // - Strings are valid UTF-16 and null-terminated
    // - Pointers remain valid during the call
    // - Windows does not retain the pointers after return
    let result = unsafe {
        ReplaceFileW(
            target_w.as_ptr(),
            tmp_w.as_ptr(),
            std::ptr::null(),
            REPLACEFILE_WRITE_THROUGH,
            std::ptr::null(),
            std::ptr::null(),
        )
    };

    if result == 0 {
        return Err(std::io::Error::last_os_error().into());
    }

    Ok(())
}

/// On Unix, `rename()` is atomic when both paths are on the same filesystem.
#[cfg(not(target_os = "windows"))]
fn atomic_replace(tmp_path: &Path, target: &Path) -> Result<()> {
    fs::rename(tmp_path, target)?;
    Ok(())
}
