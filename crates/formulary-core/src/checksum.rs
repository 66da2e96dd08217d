//! SHA-256 checksums for source archives and resources.
//!
//! A formula declares a checksum for every archive it fetches. The value is
//! either a real 64-digit SHA-256 hex digest or a *placeholder* left in by a
//! formula author who has not cut a release yet. Placeholders disable
//! verification for that one archive.

use std::fmt;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
const SHA256_HEX_LEN: usize = 64;

/// Marker that identifies a placeholder checksum (case-insensitive).
const PLACEHOLDER_MARKER: &str = "placeholder";

/// A declared archive checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Checksum {
    /// A verified SHA-256 digest, stored as lowercase hex.
    Sha256(String),
    /// A stand-in value; the archive is not verified.
    Placeholder(String),
}

/// Error returned when a checksum string is neither a digest nor a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid sha256 checksum '{0}': expected 64 hex digits or a placeholder")]
pub struct InvalidChecksum(pub String);

impl Checksum {
    /// Parse a declared checksum.
    ///
    /// Empty strings and values containing `placeholder` are placeholders.
    /// Anything else must be exactly 64 hex digits.
    pub fn parse(raw: &str) -> Result<Self, InvalidChecksum> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.to_ascii_lowercase().contains(PLACEHOLDER_MARKER) {
            return Ok(Self::Placeholder(trimmed.to_string()));
        }
        if trimmed.len() == SHA256_HEX_LEN && trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Ok(Self::Sha256(trimmed.to_ascii_lowercase()));
        }
        Err(InvalidChecksum(raw.to_string()))
    }

    /// Returns `true` for a placeholder checksum.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    /// The digest to verify against, or `None` for a placeholder.
    pub fn digest(&self) -> Option<&str> {
        match self {
            Self::Sha256(hex) => Some(hex),
            Self::Placeholder(_) => None,
        }
    }

    /// The checksum as written in the formula (digest normalised to lowercase).
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sha256(s) | Self::Placeholder(s) => s,
        }
    }

    /// Check an actual digest against this checksum.
    ///
    /// Placeholders accept any digest.
    pub fn matches(&self, actual: &str) -> bool {
        match self {
            Self::Sha256(expected) => expected.eq_ignore_ascii_case(actual),
            Self::Placeholder(_) => true,
        }
    }
}

impl TryFrom<String> for Checksum {
    type Error = InvalidChecksum;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Checksum> for String {
    fn from(value: Checksum) -> Self {
        match value {
            Checksum::Sha256(s) | Checksum::Placeholder(s) => s,
        }
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes the lowercase hex SHA-256 digest of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// A writer adapter that hashes everything written through it.
///
/// Used to verify downloads while they stream to disk, so an archive is
/// never read twice.
pub struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> HashingWriter<W> {
    /// Wrap `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    /// Number of bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Finish hashing, returning the inner writer and the hex digest.
    pub fn finish(self) -> (W, String) {
        (self.inner, format!("{:x}", self.hasher.finalize()))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Hash everything readable from `reader`.
pub fn sha256_reader<R: io::Read>(mut reader: R) -> io::Result<String> {
    let mut writer = HashingWriter::new(io::sink());
    io::copy(&mut reader, &mut writer)?;
    Ok(writer.finish().1)
}
