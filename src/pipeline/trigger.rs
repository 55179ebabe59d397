//! "File uploaded" trigger: event shape, object storage access and the
//! integrity check run before a pipeline execution.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {bucket}/{path}")]
    NotFound { bucket: String, path: String },

    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Event delivered once per uploaded file. `id` is the file id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadedEvent {
    pub id: String,
    pub user_id: String,
    pub bucket: String,
    pub path: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub hash_sha256: Option<String>,
    /// Declared content type.
    #[serde(default)]
    pub file_type: Option<String>,
}

impl FileUploadedEvent {
    /// Reject events the pipeline cannot act on.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("id", &self.id),
            ("userId", &self.user_id),
            ("bucket", &self.bucket),
            ("path", &self.path),
        ] {
            if value.trim().is_empty() {
                return Err(format!("'{field}' must not be empty"));
            }
        }
        Ok(())
    }

    /// Name used for extension-based classification.
    pub fn display_name(&self) -> &str {
        if self.original_name.trim().is_empty() {
            &self.path
        } else {
            &self.original_name
        }
    }
}

/// Read access to uploaded file bytes.
pub trait ObjectStore {
    fn fetch(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StorageError>;
}

/// Object store on the local filesystem: `<root>/<bucket>/<path>`.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, bucket: &str, path: &str) -> Result<PathBuf, StorageError> {
        let mut resolved = self.root.clone();
        for part in [bucket, path] {
            let candidate = Path::new(part);
            let safe = candidate
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
            if part.is_empty() || !safe {
                return Err(StorageError::InvalidPath(format!("{bucket}/{path}")));
            }
            resolved.push(candidate);
        }
        Ok(resolved)
    }
}

impl ObjectStore for LocalObjectStore {
    fn fetch(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StorageError> {
        let full = self.resolve(bucket, path)?;
        match std::fs::read(&full) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                path: path.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Compare fetched bytes against the declared size and SHA-256.
/// Mismatches are logged; execution continues either way.
pub fn verify_integrity(event: &FileUploadedEvent, bytes: &[u8]) -> bool {
    let mut intact = true;

    if let Some(expected) = event.size_bytes {
        if expected != bytes.len() as u64 {
            tracing::warn!(
                file_id = %event.id,
                expected,
                actual = bytes.len(),
                "Uploaded file size does not match event"
            );
            intact = false;
        }
    }

    if let Some(expected) = event.hash_sha256.as_deref().filter(|h| !h.trim().is_empty()) {
        let actual = sha256_hex(bytes);
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            tracing::warn!(file_id = %event.id, "Uploaded file hash does not match event");
            intact = false;
        }
    }

    intact
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
