//! File fingerprint strategies.
//!
//! # Overview
//!
//! A fingerprint is an opaque string key. Files sharing a fingerprint are
//! grouped together as duplicates. Two strategies are built in:
//!
//! - [`NameSize`]: `basename-size`, a single metadata read per file. Files
//!   with different names never match, and content changes go unnoticed.
//! - [`ContentDigest`]: hex digest of the full file content (BLAKE3 or
//!   SHA-256), streamed in fixed-size chunks.
//!
//! Any `Fn(&Path) -> Result<Fingerprint, HashError> + Send + Sync` is also a
//! [`Fingerprinter`], so callers can plug in their own strategy. A strategy
//! must be deterministic and must never modify the filesystem.

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::HashError;

/// Read buffer size for content hashing.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Identity key for a file under some strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap a key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Fingerprint {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for Fingerprint {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Strategy that turns a file path into a [`Fingerprint`].
pub trait Fingerprinter: Send + Sync {
    /// Compute the fingerprint of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] if the file cannot be stat'ed, opened, or read.
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, HashError>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> Fingerprinter for F
where
    F: Fn(&Path) -> Result<Fingerprint, HashError> + Send + Sync,
{
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, HashError> {
        self(path)
    }
}

/// `basename-size` fingerprint.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameSize;

impl Fingerprinter for NameSize {
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, HashError> {
        let metadata = fs::metadata(path).map_err(|e| HashError::from_io(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        Ok(Fingerprint(format!("{}-{}", name, metadata.len())))
    }

    fn name(&self) -> &str {
        "name-size"
    }
}

/// Digest algorithm used by [`ContentDigest`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// BLAKE3 (default)
    #[default]
    Blake3,
    /// SHA-256
    Sha256,
}

/// Hex digest of the whole file content.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentDigest {
    algorithm: DigestAlgorithm,
}

impl ContentDigest {
    /// Create a content digest strategy for `algorithm`.
    #[must_use]
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The configured algorithm.
    #[must_use]
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }
}

impl Fingerprinter for ContentDigest {
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, HashError> {
        let file = fs::File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let key = match self.algorithm {
            DigestAlgorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                stream_into(file, path, |chunk| {
                    hasher.update(chunk);
                })?;
                hasher.finalize().to_hex().to_string()
            }
            DigestAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                stream_into(file, path, |chunk| hasher.update(chunk))?;
                format!("{:x}", hasher.finalize())
            }
        };
        Ok(Fingerprint(key))
    }

    fn name(&self) -> &str {
        match self.algorithm {
            DigestAlgorithm::Blake3 => "blake3",
            DigestAlgorithm::Sha256 => "sha256",
        }
    }
}

/// Feed `reader` to `update` in chunks until EOF.
fn stream_into<R: Read>(
    mut reader: R,
    path: &Path,
    mut update: impl FnMut(&[u8]),
) -> Result<(), HashError> {
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(n) => update(&buffer[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(HashError::from_io(path, e)),
        }
    }
}

/// Built-in strategy selector, used by configuration and the CLI.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// File name plus size (fast, metadata only)
    #[default]
    Name,
    /// Digest of the full content
    Content,
}

impl Strategy {
    /// Build the fingerprinter for this strategy.
    ///
    /// `digest` is only used by [`Strategy::Content`].
    #[must_use]
    pub fn fingerprinter(self, digest: DigestAlgorithm) -> Arc<dyn Fingerprinter> {
        match self {
            Self::Name => Arc::new(NameSize),
            Self::Content => Arc::new(ContentDigest::new(digest)),
        }
    }
}
