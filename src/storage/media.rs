use std::{
    fmt::Display,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use log::{debug, info};
use sha2::{Digest, Sha256};

use crate::{error::ErrorType, processing::data_loader::OutputFormat};

const DIGEST_CHARS: usize = 16;
const MAX_STEM_CHARS: usize = 64;

/// A file name that is safe to join onto the media root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaName(String);

impl MediaName {
    /// Checks a client supplied name. This is the only way such a name
    /// reaches the filesystem.
    pub fn parse(name: &str) -> Result<Self, ErrorType> {
        let invalid = name.is_empty()
            || name.starts_with('.')
            || name.contains("..")
            || name.chars().any(|c| matches!(c, '/' | '\\') || c.is_control());

        if invalid {
            Err(ErrorType::InvalidName(name.to_string()))
        } else {
            Ok(MediaName(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MediaName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keeps ascii alphanumerics, `-` and `_` of the upload's file stem.
pub fn sanitize_stem(original_filename: &str) -> String {
    let stem = Path::new(original_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    let clean: String = stem
        .chars()
        .take(MAX_STEM_CHARS)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if clean.is_empty() {
        "image".into()
    } else {
        clean
    }
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn ensure_root(&self) -> Result<(), ErrorType> {
        std::fs::create_dir_all(&self.root)?;
        info!("Media root: {}", self.root.display());
        Ok(())
    }

    /// `<digest>_<stem>.<ext>`; identical uploads get identical names.
    pub fn stored_name(&self, original_filename: &str, bytes: &[u8], format: OutputFormat) -> MediaName {
        let digest = hex::encode(Sha256::digest(bytes));

        MediaName(format!(
            "{}_{}.{}",
            &digest[..DIGEST_CHARS],
            sanitize_stem(original_filename),
            format.extension()
        ))
    }

    pub fn derived_name(&self, prefix: &str, stored: &MediaName) -> MediaName {
        MediaName(format!("{}_{}", prefix, stored))
    }

    pub fn path(&self, name: &MediaName) -> PathBuf {
        self.root.join(name.as_str())
    }

    pub fn url(&self, name: &MediaName) -> String {
        format!("{}{}", self.url_prefix, name)
    }

    /// Writes to a hidden temp file in the root, then renames it over
    /// `name`. Readers see either the old file or the new one, never a prefix.
    pub fn write(&self, name: &MediaName, bytes: &[u8]) -> Result<(), ErrorType> {
        let path = self.path(name);
        debug!("writing {} bytes to {}", bytes.len(), path.display());

        let mut file = tempfile::Builder::new()
            .prefix(".partial")
            .tempfile_in(&self.root)?;
        file.write_all(bytes)?;
        file.persist(&path).map_err(|e| ErrorType::Io(e.error))?;
        Ok(())
    }

    pub async fn read(&self, name: &MediaName) -> Result<Vec<u8>, ErrorType> {
        let path = self.path(name);
        debug!("reading {}", path.display());

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ErrorType::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}
