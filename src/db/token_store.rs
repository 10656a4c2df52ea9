// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Keyed single-record slots for cached tokens.
//!
//! Each session key owns at most one [`CachedToken`]. Writes replace the
//! previous record unconditionally.

use crate::error::AppError;
use crate::models::CachedToken;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Durable storage for one token record per key.
pub trait TokenStore: Send + Sync {
    /// Load the record for `key`, `Ok(None)` if there is none.
    fn load(&self, key: &str) -> Result<Option<CachedToken>, AppError>;

    /// Persist `token` for `key`, replacing any previous record.
    fn save(&self, key: &str, token: &CachedToken) -> Result<(), AppError>;

    /// Remove the record for `key`. Removing a missing record succeeds.
    fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// Stores each record as a JSON file inside a cache directory.
///
/// File names are the SHA-256 of the key, so arbitrary session keys never
/// escape the directory.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, key: &str) -> Result<Option<CachedToken>, AppError> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::Storage(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| AppError::Storage(format!("corrupt token file {}: {}", path.display(), e)))
    }

    fn save(&self, key: &str, token: &CachedToken) -> Result<(), AppError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::Storage(format!("failed to create {}: {}", self.dir.display(), e))
        })?;

        let path = self.path_for(key);
        let content = serde_json::to_string(token)
            .map_err(|e| AppError::Storage(format!("failed to serialize token: {}", e)))?;

        // Write then rename so readers never observe a half-written file
        let temp_path = path.with_extension("json.tmp");
        write_private(&temp_path, content.as_bytes())
            .map_err(|e| AppError::Storage(format!("failed to write token file: {}", e)))?;

        fs::rename(&temp_path, &path)
            .map_err(|e| AppError::Storage(format!("failed to replace token file: {}", e)))?;

        tracing::debug!(path = %path.display(), "Token saved");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Token file removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!(
                "failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Write `bytes` to `path`, owner read/write only on Unix from creation on.
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;

    // A stale temp file keeps its old mode; narrow it explicitly
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(bytes)?;
    file.sync_all()
}

/// Process-local store, for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    tokens: DashMap<String, CachedToken>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tokens.contains_key(key)
    }
}

impl TokenStore for InMemoryTokenStore {
    fn load(&self, key: &str) -> Result<Option<CachedToken>, AppError> {
        Ok(self.tokens.get(key).map(|t| t.clone()))
    }

    fn save(&self, key: &str, token: &CachedToken) -> Result<(), AppError> {
        self.tokens.insert(key.to_string(), token.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), AppError> {
        self.tokens.remove(key);
        Ok(())
    }
}
