//! Where keychains live and whose keychain is in use.

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::{KeychainError, Result};
use crate::storage::{FileStorage, validate_user_id};

pub const DEFAULT_USER: &str = "default";

/// Explicit storage context, passed to whatever needs to persist a keychain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    store_dir: PathBuf,
    user: String,
}

impl Config {
    pub fn new(store_dir: PathBuf, user: impl Into<String>) -> Result<Self> {
        let user = user.into();
        validate_user_id(&user)?;
        Ok(Self { store_dir, user })
    }

    /// Fills unset values with the platform data directory and the default
    /// user.
    pub fn resolve(store_dir: Option<PathBuf>, user: Option<String>) -> Result<Self> {
        let store_dir = match store_dir {
            Some(dir) => dir,
            None => default_store_dir()?,
        };
        Self::new(store_dir, user.unwrap_or_else(|| DEFAULT_USER.to_string()))
    }

    pub fn store_dir(&self) -> &PathBuf {
        &self.store_dir
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn storage(&self) -> FileStorage {
        FileStorage::new(self.store_dir.clone())
    }
}

pub fn default_store_dir() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "keychest").ok_or_else(|| {
        KeychainError::Storage("could not determine platform directories".into())
    })?;

    Ok(project_dirs.data_dir().to_path_buf())
}
