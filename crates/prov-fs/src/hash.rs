//! SHA-256 content identity
//!
//! A single canonical digest format (`sha256:<hex>`) identifies every byte
//! sequence tracked by the workspace: files on disk, archive entries, and
//! whole archives. Equality of two `ContentHash` values is treated as
//! byte-identity of the underlying content.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Prefix for the canonical string form of a hash
const PREFIX: &str = "sha256:";

/// Buffer size for streaming file hashing
const READ_BUF: usize = 64 * 1024;

/// A 256-bit content digest.
///
/// Displayed and serialized as `"sha256:<64 lowercase hex digits>"` so
/// persisted documents stay grep-able and diff-friendly. Ordered so that
/// hash-keyed collections serialize in a stable order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Wrap a raw 32-byte digest.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the lowercase hex digits without the `sha256:` prefix.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for b in self.0 {
            use std::fmt::Write;
            write!(out, "{b:02x}").expect("writing to String cannot fail");
        }
        out
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PREFIX, self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full digests make test output unreadable; eight hex digits are
        // plenty to tell values apart in logs.
        write!(f, "ContentHash({}…)", &self.to_hex()[..8])
    }
}

impl FromStr for ContentHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.strip_prefix(PREFIX).ok_or_else(|| Error::InvalidHash {
            value: s.to_string(),
        })?;
        if hex.len() != 64 {
            return Err(Error::InvalidHash {
                value: s.to_string(),
            });
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk).map_err(|_| Error::InvalidHash {
                value: s.to_string(),
            })?;
            bytes[i] = u8::from_str_radix(pair, 16).map_err(|_| Error::InvalidHash {
                value: s.to_string(),
            })?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Compute the digest of an in-memory byte sequence.
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    ContentHash(hasher.finalize().into())
}

/// Compute the digest of a file's contents by streaming.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be opened or read. No retry is
/// attempted; retry policy belongs to the caller.
pub fn hash_file(path: &Path) -> Result<ContentHash> {
    let file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = std::io::BufReader::with_capacity(READ_BUF, file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; READ_BUF];
    loop {
        let n = reader.read(&mut buf).map_err(|e| Error::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(ContentHash(hasher.finalize().into()))
}
